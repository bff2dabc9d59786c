//! Shared session control.
//!
//! Both capture paths poll one [`SessionControl`] every cycle. The state is
//! an atomic so polling never takes a lock; transitions take the clock lock
//! so the state and the active clock always change together.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use recast_common::clock::ActiveClock;

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SessionState {
    /// Session created but not started.
    Idle = 0,
    /// Both paths are capturing.
    Recording = 1,
    /// Paths are alive but skip their work.
    Paused = 2,
    /// Paths are winding down; the controller is joining and muxing.
    Stopping = 3,
    /// Output finalized.
    Stopped = 4,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Recording,
            2 => SessionState::Paused,
            3 => SessionState::Stopping,
            4 => SessionState::Stopped,
            _ => SessionState::Idle,
        }
    }

    /// Whether capture paths should exit.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopping | SessionState::Stopped)
    }

    /// Whether a session in this state has been started and not yet stopped.
    pub fn is_active(self) -> bool {
        matches!(self, SessionState::Recording | SessionState::Paused)
    }
}

/// Atomic session state plus a generation counter bumped on every
/// transition, shared by `Arc` between the controller and both paths.
#[derive(Debug)]
pub struct SessionControl {
    state: AtomicU8,
    generation: AtomicU64,
    clock: Mutex<Option<ActiveClock>>,
}

impl Default for SessionControl {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionControl {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SessionState::Idle as u8),
            generation: AtomicU64::new(0),
            clock: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of transitions taken so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_recording(&self) -> bool {
        self.state() == SessionState::Recording
    }

    /// `Idle -> Recording`; starts the active clock.
    pub fn start(&self) -> bool {
        self.start_at(Instant::now())
    }

    pub fn start_at(&self, now: Instant) -> bool {
        self.transition(&[SessionState::Idle], SessionState::Recording, |clock| {
            *clock = Some(ActiveClock::start_at(now));
        })
    }

    /// `Recording -> Paused`; the active clock stops advancing.
    pub fn pause(&self) -> bool {
        self.pause_at(Instant::now())
    }

    pub fn pause_at(&self, now: Instant) -> bool {
        self.transition(&[SessionState::Recording], SessionState::Paused, |clock| {
            if let Some(clock) = clock.as_mut() {
                clock.pause_at(now);
            }
        })
    }

    /// `Paused -> Recording`.
    pub fn resume(&self) -> bool {
        self.resume_at(Instant::now())
    }

    pub fn resume_at(&self, now: Instant) -> bool {
        self.transition(&[SessionState::Paused], SessionState::Recording, |clock| {
            if let Some(clock) = clock.as_mut() {
                clock.resume_at(now);
            }
        })
    }

    /// `Recording | Paused -> Stopping`; freezes the active clock.
    pub fn stop(&self) -> bool {
        self.stop_at(Instant::now())
    }

    pub fn stop_at(&self, now: Instant) -> bool {
        self.transition(
            &[SessionState::Recording, SessionState::Paused],
            SessionState::Stopping,
            |clock| {
                if let Some(clock) = clock.as_mut() {
                    clock.pause_at(now);
                }
            },
        )
    }

    /// `Stopping -> Stopped`, once the output is final.
    pub fn finish(&self) -> bool {
        self.transition(&[SessionState::Stopping], SessionState::Stopped, |_| {})
    }

    /// `Idle -> Stopping`: tells paths that never started to exit.
    pub(crate) fn abort(&self) -> bool {
        self.transition(&[SessionState::Idle], SessionState::Stopping, |_| {})
    }

    /// `Stopping -> Idle` after an aborted start.
    pub(crate) fn reset(&self) -> bool {
        self.transition(&[SessionState::Stopping], SessionState::Idle, |clock| {
            *clock = None;
        })
    }

    /// Recording time so far, excluding pauses. Zero before start.
    pub fn active_elapsed(&self) -> Duration {
        self.lock_clock()
            .as_ref()
            .map(ActiveClock::elapsed)
            .unwrap_or(Duration::ZERO)
    }

    fn transition(
        &self,
        from: &[SessionState],
        to: SessionState,
        update_clock: impl FnOnce(&mut Option<ActiveClock>),
    ) -> bool {
        let mut clock = self.lock_clock();
        let current = self.state();
        if !from.contains(&current) {
            tracing::debug!(?current, requested = ?to, "Ignoring session transition");
            return false;
        }
        update_clock(&mut clock);
        self.state.store(to as u8, Ordering::Release);
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(from = ?current, ?to, generation, "Session transition");
        true
    }

    fn lock_clock(&self) -> MutexGuard<'_, Option<ActiveClock>> {
        self.clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
