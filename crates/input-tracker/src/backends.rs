//! Pointer sampling backend implementations.

use std::collections::VecDeque;

use device_query::{DeviceQuery, DeviceState};
use recast_common::error::{RecastError, RecastResult};

use crate::{PointerBackend, PointerSample};

/// `device_query` reports buttons 1-indexed; slot 1 is the left button.
const LEFT_BUTTON: usize = 1;

/// Polls the OS pointer through `device_query`.
pub struct DeviceQueryBackend {
    state: DeviceState,
}

impl DeviceQueryBackend {
    pub fn new() -> RecastResult<Self> {
        Ok(Self {
            state: open_device_state()?,
        })
    }
}

#[cfg(target_os = "linux")]
fn open_device_state() -> RecastResult<DeviceState> {
    DeviceState::checked_new().ok_or_else(|| {
        RecastError::unsupported("cannot connect to the X display for pointer sampling")
    })
}

#[cfg(not(target_os = "linux"))]
fn open_device_state() -> RecastResult<DeviceState> {
    Ok(DeviceState::new())
}

impl PointerBackend for DeviceQueryBackend {
    fn sample(&mut self) -> RecastResult<PointerSample> {
        let mouse = self.state.get_mouse();
        let (x, y) = mouse.coords;
        let left_down = mouse
            .button_pressed
            .get(LEFT_BUTTON)
            .copied()
            .unwrap_or(false);
        Ok(PointerSample { x, y, left_down })
    }

    fn name(&self) -> &str {
        "device_query"
    }
}

/// Stub backend that always reports the same sample.
pub struct StubBackend {
    sample: PointerSample,
}

impl StubBackend {
    pub fn new(sample: PointerSample) -> Self {
        Self { sample }
    }

    /// Pointer parked at the origin with no buttons held.
    pub fn idle() -> Self {
        Self::new(PointerSample::default())
    }
}

impl PointerBackend for StubBackend {
    fn sample(&mut self) -> RecastResult<PointerSample> {
        Ok(self.sample)
    }

    fn name(&self) -> &str {
        "stub"
    }
}

/// Replays pre-recorded samples in order, then repeats the last one.
pub struct ScriptedBackend {
    pending: VecDeque<PointerSample>,
    last: PointerSample,
}

impl ScriptedBackend {
    pub fn new(samples: impl IntoIterator<Item = PointerSample>) -> Self {
        Self {
            pending: samples.into_iter().collect(),
            last: PointerSample::default(),
        }
    }

    /// Samples not yet replayed.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl PointerBackend for ScriptedBackend {
    fn sample(&mut self) -> RecastResult<PointerSample> {
        if let Some(next) = self.pending.pop_front() {
            self.last = next;
        }
        Ok(self.last)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Detect the best available pointer backend for the current system.
pub fn detect_best_backend() -> Box<dyn PointerBackend> {
    match DeviceQueryBackend::new() {
        Ok(backend) => {
            tracing::info!("Using device_query pointer backend");
            Box::new(backend)
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                "Using stub pointer backend; mouse effects will stay at the origin"
            );
            Box::new(StubBackend::idle())
        }
    }
}
