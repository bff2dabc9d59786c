//! Recast Session Model
//!
//! Defines the data contracts consumed by a recording session:
//! - **Geometry:** Capture rectangles and target frame sizes
//! - **Audio:** Source modes, device kinds, and stream constants
//! - **Overlays:** Watermark and mouse-effect settings
//!
//! These types are plain, serializable snapshots. They are read once at
//! session start and never re-queried while recording.

pub mod audio;
pub mod color;
pub mod geometry;
pub mod mouse;
pub mod watermark;

pub use audio::*;
pub use color::*;
pub use geometry::*;
pub use mouse::*;
pub use watermark::*;

/// Errors raised while parsing model values from user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("Invalid {what}: {input:?} ({reason})")]
    Parse {
        what: &'static str,
        input: String,
        reason: String,
    },
}

impl ModelError {
    pub(crate) fn parse(what: &'static str, input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            what,
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
