//! Clock and timing utilities for stream synchronization.
//!
//! Both capture paths read one [`ActiveClock`] that starts with the session
//! and stands still while it is paused, so video timestamps and the audio
//! sample count agree on how much was recorded.

use std::time::{Duration, Instant};

/// Accumulates recording time, excluding the intervals spent paused.
///
/// Frame presentation timestamps come from this clock so a pause leaves no
/// gap in the encoded stream.
#[derive(Debug, Clone)]
pub struct ActiveClock {
    started: Instant,
    paused_total: Duration,
    paused_since: Option<Instant>,
}

impl ActiveClock {
    /// Start an active clock at `now`.
    pub fn start_at(now: Instant) -> Self {
        Self {
            started: now,
            paused_total: Duration::ZERO,
            paused_since: None,
        }
    }

    /// Stop accumulating time. Repeated calls are ignored.
    pub fn pause_at(&mut self, now: Instant) {
        if self.paused_since.is_none() {
            self.paused_since = Some(now);
        }
    }

    /// Resume accumulating time. Ignored when not paused.
    pub fn resume_at(&mut self, now: Instant) {
        if let Some(since) = self.paused_since.take() {
            self.paused_total += now.saturating_duration_since(since);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused_since.is_some()
    }

    /// Active time at `now`.
    pub fn elapsed_at(&self, now: Instant) -> Duration {
        let reference = self.paused_since.unwrap_or(now).min(now);
        reference
            .saturating_duration_since(self.started)
            .saturating_sub(self.paused_total)
    }

    /// Active time right now.
    pub fn elapsed(&self) -> Duration {
        self.elapsed_at(Instant::now())
    }
}

/// Best-effort loop pacing: sleep for the tick interval minus the time the
/// iteration already spent working.
#[derive(Debug)]
pub struct FramePacer {
    interval: Duration,
    tick_started: Instant,
}

impl FramePacer {
    /// Create a pacer targeting the given rate in Hz.
    pub fn new(target_hz: u32) -> Self {
        Self {
            interval: Duration::from_nanos(1_000_000_000 / target_hz.max(1) as u64),
            tick_started: Instant::now(),
        }
    }

    /// Mark the start of an iteration.
    pub fn begin_tick(&mut self) {
        self.tick_started = Instant::now();
    }

    /// Remaining sleep for the current iteration given `now`.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.interval
            .saturating_sub(now.saturating_duration_since(self.tick_started))
    }

    /// Sleep out the rest of the current iteration.
    pub fn wait(&self) {
        let remaining = self.remaining_at(Instant::now());
        if !remaining.is_zero() {
            std::thread::sleep(remaining);
        }
    }

    /// Target interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_clock_excludes_paused_intervals() {
        let t0 = Instant::now();
        let mut clock = ActiveClock::start_at(t0);
        clock.pause_at(t0 + Duration::from_secs(2));
        assert_eq!(
            clock.elapsed_at(t0 + Duration::from_secs(5)),
            Duration::from_secs(2)
        );
        clock.resume_at(t0 + Duration::from_secs(6));
        assert_eq!(
            clock.elapsed_at(t0 + Duration::from_secs(7)),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn active_clock_ignores_double_pause_and_stray_resume() {
        let t0 = Instant::now();
        let mut clock = ActiveClock::start_at(t0);
        clock.resume_at(t0 + Duration::from_secs(1));
        clock.pause_at(t0 + Duration::from_secs(1));
        clock.pause_at(t0 + Duration::from_secs(3));
        clock.resume_at(t0 + Duration::from_secs(4));
        assert_eq!(
            clock.elapsed_at(t0 + Duration::from_secs(4)),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn pacer_subtracts_processing_time() {
        let mut pacer = FramePacer::new(30);
        pacer.begin_tick();
        let start = pacer.tick_started;
        let remaining = pacer.remaining_at(start + Duration::from_millis(10));
        assert_eq!(remaining, pacer.interval() - Duration::from_millis(10));
        assert!(pacer
            .remaining_at(start + Duration::from_millis(50))
            .is_zero());
    }
}
