//! Per-frame pointer tracking with left-button edge detection.

use crate::{PointerBackend, PointerSample};

/// Log a sampling failure on the first occurrence and every Nth after it.
const FAILURE_LOG_EVERY: u64 = 100;

/// Turns a stream of button levels into press edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickDetector {
    was_down: bool,
}

impl ClickDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the current level; returns `true` only on an up-to-down edge.
    pub fn update(&mut self, down: bool) -> bool {
        let pressed = down && !self.was_down;
        self.was_down = down;
        pressed
    }
}

/// Pointer state handed to the compositor for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerState {
    /// Global pointer position in virtual-desktop pixels.
    pub x: i32,
    pub y: i32,
    /// A new left-button press happened since the previous poll.
    pub pressed: bool,
}

/// Couples a backend with click edge detection.
pub struct PointerTracker {
    backend: Box<dyn PointerBackend>,
    detector: ClickDetector,
    last: PointerSample,
    failures: u64,
}

impl PointerTracker {
    pub fn new(backend: Box<dyn PointerBackend>) -> Self {
        tracing::debug!(backend = %backend.name(), "Pointer tracker created");
        Self {
            backend,
            detector: ClickDetector::new(),
            last: PointerSample::default(),
            failures: 0,
        }
    }

    /// Sample the pointer. A failed read reuses the last known position
    /// and never reports a press.
    pub fn poll(&mut self) -> PointerState {
        match self.backend.sample() {
            Ok(sample) => {
                self.last = sample;
                let pressed = self.detector.update(sample.left_down);
                PointerState {
                    x: sample.x,
                    y: sample.y,
                    pressed,
                }
            }
            Err(e) => {
                if self.failures % FAILURE_LOG_EVERY == 0 {
                    tracing::warn!(
                        error = %e,
                        failures = self.failures + 1,
                        "Pointer sampling failed; reusing last position"
                    );
                }
                self.failures += 1;
                PointerState {
                    x: self.last.x,
                    y: self.last.y,
                    pressed: false,
                }
            }
        }
    }

    /// Number of failed samples so far.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ScriptedBackend;
    use proptest::prelude::*;
    use recast_common::error::{RecastError, RecastResult};

    #[test]
    fn press_is_reported_once_per_hold() {
        let samples = [false, true, true, true, false, true]
            .into_iter()
            .map(|down| PointerSample::new(10, 20, down));
        let mut tracker = PointerTracker::new(Box::new(ScriptedBackend::new(samples)));

        let presses: Vec<bool> = (0..6).map(|_| tracker.poll().pressed).collect();
        assert_eq!(presses, vec![false, true, false, false, false, true]);
    }

    struct FlakyBackend {
        calls: u32,
    }

    impl PointerBackend for FlakyBackend {
        fn sample(&mut self) -> RecastResult<PointerSample> {
            self.calls += 1;
            if self.calls == 1 {
                Ok(PointerSample::new(5, 6, false))
            } else {
                Err(RecastError::unsupported("pointer gone"))
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[test]
    fn failed_sample_reuses_last_position() {
        let mut tracker = PointerTracker::new(Box::new(FlakyBackend { calls: 0 }));
        tracker.poll();
        let state = tracker.poll();
        assert_eq!((state.x, state.y), (5, 6));
        assert!(!state.pressed);
        assert_eq!(tracker.failures(), 1);
    }

    proptest! {
        #[test]
        fn presses_match_rising_edges(levels in prop::collection::vec(any::<bool>(), 0..200)) {
            let mut detector = ClickDetector::new();
            let presses = levels.iter().filter(|&&down| detector.update(down)).count();
            let mut previous = false;
            let mut edges = 0;
            for &down in &levels {
                if down && !previous {
                    edges += 1;
                }
                previous = down;
            }
            prop_assert_eq!(presses, edges);
        }
    }
}
