//! Recast Input Tracker
//!
//! Samples the global pointer once per captured frame so the overlay
//! compositor can draw trails, highlights, and click ripples. Uses a
//! pluggable backend architecture:
//!
//! - **DeviceQuery:** Polls the OS pointer through `device_query`
//! - **Stub / Scripted:** Fixed or pre-recorded samples for tests
//!
//! Sampling is pull-based and synchronous; the video path calls
//! [`PointerTracker::poll`] from its own thread.

pub mod backends;
pub mod tracker;

use recast_common::error::RecastResult;
use serde::{Deserialize, Serialize};

pub use backends::{detect_best_backend, DeviceQueryBackend, ScriptedBackend, StubBackend};
pub use tracker::{ClickDetector, PointerState, PointerTracker};

/// One reading of the global pointer, in virtual-desktop pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointerSample {
    pub x: i32,
    pub y: i32,
    pub left_down: bool,
}

impl PointerSample {
    pub fn new(x: i32, y: i32, left_down: bool) -> Self {
        Self { x, y, left_down }
    }
}

/// Trait for pointer sampling backends.
///
/// Backends are not required to be `Send`: some platform handles are tied
/// to the thread that opened them, so callers construct the backend on the
/// thread that polls it.
pub trait PointerBackend {
    /// Read the current pointer position and left-button state.
    fn sample(&mut self) -> RecastResult<PointerSample>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
