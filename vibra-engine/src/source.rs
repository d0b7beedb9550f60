//! Playback source interface and a simulated player
//!
//! The engine never owns the playback clock; it samples it through
//! [`PlaybackSource`]. State changes and seeks are not part of this read-side
//! interface: the session owner forwards those to the scheduler's
//! notification handlers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use tracing::debug;

/// Read-side view of an external media player
pub trait PlaybackSource: Send + Sync {
    /// Current playback position in milliseconds from media start
    fn position_ms(&self) -> u64;

    /// Whether the position is actively advancing
    fn is_playing(&self) -> bool;
}

/// Wall-clock-driven playback position
struct SimClock {
    /// Position at the last play/pause/seek transition
    base_position_ms: u64,
    /// When playback last resumed; `None` while paused
    resumed_at: Option<Instant>,
}

/// A playback source driven by wall-clock time
///
/// Simulates a media player for the demo runner: position advances in real
/// time (scaled by `rate`) while playing, freezes while paused, and clamps
/// at the media duration.
pub struct SimulatedPlayer {
    duration_ms: u64,
    rate: f64,
    clock: Mutex<SimClock>,
    playing: AtomicBool,
}

impl SimulatedPlayer {
    pub fn new(duration_ms: u64) -> Self {
        Self::with_rate(duration_ms, 1.0)
    }

    /// `rate` scales simulated time: 2.0 plays back twice as fast
    pub fn with_rate(duration_ms: u64, rate: f64) -> Self {
        Self {
            duration_ms,
            rate: rate.max(0.0),
            clock: Mutex::new(SimClock {
                base_position_ms: 0,
                resumed_at: None,
            }),
            playing: AtomicBool::new(false),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    /// Start or resume playback
    pub fn play(&self) {
        let mut clock = self.lock_clock();
        if clock.resumed_at.is_none() {
            clock.resumed_at = Some(Instant::now());
        }
        self.playing.store(true, Ordering::Release);
        debug!(position_ms = Self::position_locked(&clock, self.rate, self.duration_ms), "Simulated player playing");
    }

    /// Freeze the position
    pub fn pause(&self) {
        let mut clock = self.lock_clock();
        clock.base_position_ms = Self::position_locked(&clock, self.rate, self.duration_ms);
        clock.resumed_at = None;
        self.playing.store(false, Ordering::Release);
        debug!(position_ms = clock.base_position_ms, "Simulated player paused");
    }

    /// Jump to a new position; returns `(old_ms, new_ms)` for the
    /// discontinuity notification
    pub fn seek_to(&self, position_ms: u64) -> (u64, u64) {
        let mut clock = self.lock_clock();
        let old = Self::position_locked(&clock, self.rate, self.duration_ms);
        let new = position_ms.min(self.duration_ms);
        clock.base_position_ms = new;
        if clock.resumed_at.is_some() {
            clock.resumed_at = Some(Instant::now());
        }
        debug!(old_position_ms = old, new_position_ms = new, "Simulated player seek");
        (old, new)
    }

    /// Whether the simulated media has run out
    pub fn is_ended(&self) -> bool {
        self.position_ms() >= self.duration_ms
    }

    fn lock_clock(&self) -> MutexGuard<'_, SimClock> {
        // Nothing holding this lock can panic; poisoning would be a bug here
        self.clock.lock().expect("simulated player clock poisoned")
    }

    fn position_locked(clock: &SimClock, rate: f64, duration_ms: u64) -> u64 {
        let elapsed_ms = match clock.resumed_at {
            Some(resumed_at) => (resumed_at.elapsed().as_millis() as f64 * rate) as u64,
            None => 0,
        };
        (clock.base_position_ms + elapsed_ms).min(duration_ms)
    }
}

impl PlaybackSource for SimulatedPlayer {
    fn position_ms(&self) -> u64 {
        let clock = self.lock_clock();
        Self::position_locked(&clock, self.rate, self.duration_ms)
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire) && !self.is_ended()
    }
}
