//! Session statistics.

use std::sync::atomic::{AtomicU64, Ordering};

/// Runtime statistics from a finished (or running) session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Frames grabbed from the display.
    pub frames_captured: u64,

    /// Frames written by repeating the previous frame after a failed grab.
    pub frames_reemitted: u64,

    /// Failed screen grabs.
    pub capture_misses: u64,

    /// Audio chunks written to the intermediate stream.
    pub chunks_written: u64,

    /// Chunks whose noise reduction failed and were written raw.
    pub dsp_passthroughs: u64,
}

impl PipelineStats {
    /// Frames written to the intermediate video, captured or repeated.
    pub fn frames_written(&self) -> u64 {
        self.frames_captured + self.frames_reemitted
    }

    /// Re-emitted frames as a percentage of all written frames.
    pub fn reemit_rate(&self) -> f64 {
        let total = self.frames_written();
        if total == 0 {
            return 0.0;
        }
        self.frames_reemitted as f64 / total as f64 * 100.0
    }
}

/// Lock-free counters the capture paths update while running.
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub frames_captured: AtomicU64,
    pub frames_reemitted: AtomicU64,
    pub capture_misses: AtomicU64,
    pub chunks_written: AtomicU64,
    pub dsp_passthroughs: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_reemitted: self.frames_reemitted.load(Ordering::Relaxed),
            capture_misses: self.capture_misses.load(Ordering::Relaxed),
            chunks_written: self.chunks_written.load(Ordering::Relaxed),
            dsp_passthroughs: self.dsp_passthroughs.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reemit_rate_counts_repeated_frames() {
        let stats = PipelineStats {
            frames_captured: 90,
            frames_reemitted: 10,
            ..Default::default()
        };
        assert_eq!(stats.frames_written(), 100);
        assert!((stats.reemit_rate() - 10.0).abs() < 1e-9);
        assert_eq!(PipelineStats::default().reemit_rate(), 0.0);
    }
}
