//! Timeline synchronization scheduler
//!
//! Keeps actuator dispatch aligned with playback position: samples the
//! playback clock on a fixed cadence, fires each timeline event at most once
//! per continuous playback segment within a bounded tolerance window, and
//! re-synchronizes across seeks and playback-state changes.
//!
//! The polling loop is one sequential tokio task; ticks never overlap. All
//! bookkeeping is written only from that task. External callers interact
//! through `start`/`stop` and the `notify_*` handlers, which enqueue signals
//! the loop applies at the next tick boundary.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vibra_common::config::EngineConfig;
use vibra_common::events::{PlaybackState, VibraEvent};
use vibra_common::timeline::{HapticEvent, Timeline};

use crate::actuator::ActuatorDriver;
use crate::mapper::EffectMapper;
use crate::source::PlaybackSource;
use crate::state::SharedState;

/// Scheduler timing parameters
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Half-width of the firing window around an event timestamp (ms)
    pub tolerance_ms: u64,

    /// Sampling cadence of the polling loop
    pub poll_interval: Duration,
}

impl SchedulerConfig {
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            tolerance_ms: config.tolerance_ms,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_engine(&EngineConfig::default())
    }
}

/// External signals applied at the next tick boundary
#[derive(Debug, Clone)]
enum Signal {
    StateChanged(PlaybackState),
    Discontinuity {
        old_position_ms: u64,
        new_position_ms: u64,
    },
}

/// Per-session scheduling engine
///
/// Bound to one timeline, one playback source, and one actuator driver for
/// the lifetime of a playback session. Clone handles freely; they all drive
/// the same loop.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

struct Inner {
    session_id: Uuid,
    timeline: Timeline,
    source: Arc<dyn PlaybackSource>,
    driver: Arc<dyn ActuatorDriver>,
    mapper: EffectMapper,
    state: Arc<SharedState>,
    config: SchedulerConfig,

    /// Events already dispatched in the current continuous segment.
    /// Written only by the loop task; cleared and re-seeded on seeks.
    fired: Mutex<HashSet<HapticEvent>>,

    /// Signals queued by notification handlers, drained at each tick
    signals: Mutex<VecDeque<Signal>>,

    /// Whether the polling loop is active
    running: AtomicBool,

    /// Incremented on every start; a loop task whose epoch falls behind has
    /// been superseded by a restart and exits without touching anything
    epoch: AtomicU64,

    /// Wakes the loop out of its inter-tick sleep on stop
    stop: Notify,
}

impl Scheduler {
    pub(crate) fn new(
        session_id: Uuid,
        timeline: Timeline,
        source: Arc<dyn PlaybackSource>,
        driver: Arc<dyn ActuatorDriver>,
        mapper: EffectMapper,
        state: Arc<SharedState>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                session_id,
                timeline,
                source,
                driver,
                mapper,
                state,
                config,
                fired: Mutex::new(HashSet::new()),
                signals: Mutex::new(VecDeque::new()),
                running: AtomicBool::new(false),
                epoch: AtomicU64::new(0),
                stop: Notify::new(),
            }),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.inner.session_id
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Start the polling loop. No-op when already running.
    ///
    /// Must be called from within a tokio runtime; the loop is a single
    /// spawned task.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            debug!(session_id = %self.inner.session_id, "Scheduler already running");
            return;
        }

        info!(session_id = %self.inner.session_id, "Scheduler starting");
        self.inner.state.broadcast_event(VibraEvent::SchedulerStarted {
            session_id: self.inner.session_id,
            timestamp: Utc::now(),
        });

        let epoch = self.inner.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run(epoch).await;
        });
    }

    /// Stop the polling loop. Idempotent; cancels a pending inter-tick wait
    /// promptly. Bookkeeping is preserved: only discontinuities clear it.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::AcqRel) {
            info!(session_id = %self.inner.session_id, "Scheduler stop requested");
            self.inner.stop.notify_waiters();
        }
    }

    /// Playback state change reported by the session owner
    ///
    /// Safe to call from any task; takes effect no later than the next tick.
    /// `Playing` also starts the loop when it is not running.
    pub fn notify_playback_state(&self, state: PlaybackState) {
        let old = self.inner.state.set_playback_state(state);
        if old != state {
            debug!(session_id = %self.inner.session_id, %old, %state, "Playback state changed");
            self.inner.state.broadcast_event(VibraEvent::PlaybackStateChanged {
                session_id: self.inner.session_id,
                old_state: old,
                new_state: state,
                timestamp: Utc::now(),
            });
        }
        self.inner.enqueue(Signal::StateChanged(state));

        if state == PlaybackState::Playing {
            self.start();
        }
    }

    /// Position jump (seek) reported by the session owner
    pub fn notify_discontinuity(&self, old_position_ms: u64, new_position_ms: u64) {
        debug!(
            session_id = %self.inner.session_id,
            old_position_ms,
            new_position_ms,
            "Position discontinuity reported"
        );
        self.inner.enqueue(Signal::Discontinuity {
            old_position_ms,
            new_position_ms,
        });
    }

    /// Player error reported by the session owner
    ///
    /// Stops the loop. Bookkeeping is preserved: an error implies no seek.
    pub fn notify_player_error(&self, description: &str) {
        error!(session_id = %self.inner.session_id, "Player error: {description}");
        self.stop();
    }
}

impl Inner {
    fn enqueue(&self, signal: Signal) {
        self.signals
            .lock()
            .expect("scheduler signal queue poisoned")
            .push_back(signal);
    }

    /// The polling loop. Runs until stopped; one tick per poll interval.
    async fn run(self: Arc<Self>, epoch: u64) {
        let mut tick = interval(self.config.poll_interval);
        // Late ticks resume the normal cadence instead of bursting
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = self.stop.notified() => {}
            }
            if self.epoch.load(Ordering::Acquire) != epoch {
                // A stop/start cycle overtook this task; the replacement
                // loop owns the state now
                return;
            }
            if !self.running.load(Ordering::Acquire) {
                break;
            }

            self.tick_once();

            if !self.running.load(Ordering::Acquire) {
                break;
            }
        }

        info!(session_id = %self.session_id, "Scheduler stopped");
        self.state.broadcast_event(VibraEvent::SchedulerStopped {
            session_id: self.session_id,
            timestamp: Utc::now(),
        });
    }

    /// One tick: apply queued signals, then scan for due events
    fn tick_once(&self) {
        self.apply_pending_signals();

        if !self.running.load(Ordering::Acquire) {
            return;
        }
        if !self.source.is_playing() {
            // Paused or buffering: keep looping so resume needs no re-init
            return;
        }
        if !self.state.haptics_enabled() {
            // Skipped dispatch does not advance bookkeeping; events whose
            // window is still open fire late if haptics come back on
            return;
        }

        let position_ms = self.source.position_ms();
        self.scan_due_events(position_ms);
    }

    fn apply_pending_signals(&self) {
        loop {
            let signal = self
                .signals
                .lock()
                .expect("scheduler signal queue poisoned")
                .pop_front();
            let Some(signal) = signal else { break };

            match signal {
                Signal::Discontinuity {
                    old_position_ms,
                    new_position_ms,
                } => {
                    self.resync_at(new_position_ms);
                    self.state.broadcast_event(VibraEvent::PositionDiscontinuity {
                        session_id: self.session_id,
                        old_position_ms,
                        new_position_ms,
                        timestamp: Utc::now(),
                    });
                }
                Signal::StateChanged(state) => match state {
                    PlaybackState::Ended | PlaybackState::Idle => {
                        info!(session_id = %self.session_id, "Playback {state}; stopping scheduler loop");
                        self.running.store(false, Ordering::Release);
                    }
                    // Pausing and buffering keep the loop alive; Playing was
                    // already handled at notification time
                    _ => {}
                },
            }
        }
    }

    /// Fire every not-yet-fired event whose timestamp falls inside the
    /// tolerance window around `position_ms`, in ascending timestamp order
    fn scan_due_events(&self, position_ms: u64) {
        let window_start = position_ms.saturating_sub(self.config.tolerance_ms);
        let window_end = position_ms + self.config.tolerance_ms;

        let mut fired = self.fired.lock().expect("fired set poisoned");
        for event in self.timeline.events_in_range(window_start, window_end) {
            if fired.contains(event) {
                continue;
            }

            let Some(effect) = self.mapper.map(event) else {
                // Nothing the actuator can do with this event; it stays
                // unfired and ages out of its window
                debug!(timestamp_ms = event.timestamp, "No concrete effect for event");
                continue;
            };

            match self.driver.dispatch(&effect) {
                Ok(()) => {
                    debug!(
                        timestamp_ms = event.timestamp,
                        position_ms, "Fired haptic event"
                    );
                    fired.insert(event.clone());
                    self.state.broadcast_event(VibraEvent::EffectDispatched {
                        session_id: self.session_id,
                        event_timestamp_ms: event.timestamp,
                        position_ms,
                        effect,
                        timestamp: Utc::now(),
                    });
                }
                Err(e) => {
                    // Left unfired: retried on the next tick while the
                    // window is open, silently lost once it passes
                    warn!(
                        timestamp_ms = event.timestamp,
                        position_ms, "Dispatch failed: {e}"
                    );
                    self.state.broadcast_event(VibraEvent::DispatchFailed {
                        session_id: self.session_id,
                        event_timestamp_ms: event.timestamp,
                        position_ms,
                        reason: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }
    }

    /// Reset bookkeeping after a position jump
    ///
    /// Everything strictly before the new window becomes "already fired" so
    /// a forward seek does not replay the skipped span; events whose window
    /// still straddles the new position stay eligible. A backward seek seeds
    /// nothing below the new position, making replays possible on purpose.
    fn resync_at(&self, new_position_ms: u64) {
        let horizon = new_position_ms.saturating_sub(self.config.tolerance_ms);

        let mut fired = self.fired.lock().expect("fired set poisoned");
        fired.clear();
        for event in self.timeline.events() {
            if event.timestamp >= horizon {
                break;
            }
            fired.insert(event.clone());
        }
        debug!(
            new_position_ms,
            seeded = fired.len(),
            "Re-synchronized fired bookkeeping"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibra_common::effect::ConcreteEffect;
    use vibra_common::timeline::{EventKind, PrimitiveId, TimelineDocument};
    use crate::capabilities::ActuatorCapabilities;

    struct ScriptedSource {
        position_ms: AtomicU64,
        playing: AtomicBool,
    }

    impl ScriptedSource {
        fn new() -> Self {
            Self {
                position_ms: AtomicU64::new(0),
                playing: AtomicBool::new(true),
            }
        }

        fn set_position(&self, ms: u64) {
            self.position_ms.store(ms, Ordering::Relaxed);
        }

        fn set_playing(&self, playing: bool) {
            self.playing.store(playing, Ordering::Relaxed);
        }
    }

    impl PlaybackSource for ScriptedSource {
        fn position_ms(&self) -> u64 {
            self.position_ms.load(Ordering::Relaxed)
        }

        fn is_playing(&self) -> bool {
            self.playing.load(Ordering::Relaxed)
        }
    }

    #[derive(Default)]
    struct RecordingActuator {
        effects: Mutex<Vec<ConcreteEffect>>,
        fail: AtomicBool,
    }

    impl RecordingActuator {
        fn count(&self) -> usize {
            self.effects.lock().unwrap().len()
        }

        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::Relaxed);
        }
    }

    impl ActuatorDriver for RecordingActuator {
        fn dispatch(&self, effect: &ConcreteEffect) -> crate::Result<()> {
            if self.fail.load(Ordering::Relaxed) {
                return Err(crate::Error::Actuator("policy block".into()));
            }
            self.effects.lock().unwrap().push(effect.clone());
            Ok(())
        }

        fn cancel_all(&self) {}
    }

    fn event_at(t: u64) -> HapticEvent {
        HapticEvent {
            timestamp: t,
            kind: EventKind::Primitive,
            primitive: Some(PrimitiveId::Click),
            timings: None,
            amplitudes: None,
            repeat: 1,
            strength: None,
            duration_override: None,
        }
    }

    struct Fixture {
        scheduler: Scheduler,
        source: Arc<ScriptedSource>,
        driver: Arc<RecordingActuator>,
    }

    fn fixture(timestamps: &[u64]) -> Fixture {
        let source = Arc::new(ScriptedSource::new());
        let driver = Arc::new(RecordingActuator::default());
        let timeline = Timeline::from_document(TimelineDocument {
            version: 1,
            events: timestamps.iter().copied().map(event_at).collect(),
        })
        .unwrap();

        let scheduler = Scheduler::new(
            Uuid::new_v4(),
            timeline,
            Arc::clone(&source) as Arc<dyn PlaybackSource>,
            Arc::clone(&driver) as Arc<dyn ActuatorDriver>,
            EffectMapper::new(ActuatorCapabilities::full()),
            Arc::new(SharedState::default()),
            SchedulerConfig::default(),
        );
        // Drive ticks by hand without spawning the loop task
        scheduler.inner.running.store(true, Ordering::Release);

        Fixture {
            scheduler,
            source,
            driver,
        }
    }

    fn tick_at(f: &Fixture, position_ms: u64) {
        f.source.set_position(position_ms);
        f.scheduler.inner.tick_once();
    }

    #[test]
    fn test_fires_only_inside_tolerance_window() {
        let f = fixture(&[1000]);

        tick_at(&f, 984); // one ms outside
        assert_eq!(f.driver.count(), 0);

        tick_at(&f, 985); // window edge, inclusive
        assert_eq!(f.driver.count(), 1);

        tick_at(&f, 1015); // other edge: already fired, no repeat
        assert_eq!(f.driver.count(), 1);
    }

    #[test]
    fn test_window_upper_edge_fires() {
        let f = fixture(&[1000]);
        tick_at(&f, 1015);
        assert_eq!(f.driver.count(), 1);

        let f = fixture(&[1000]);
        tick_at(&f, 1016);
        assert_eq!(f.driver.count(), 0);
    }

    #[test]
    fn test_at_most_once_across_ticks() {
        let f = fixture(&[1000]);
        for position in [990, 995, 1000, 1005, 1010] {
            tick_at(&f, position);
        }
        assert_eq!(f.driver.count(), 1);
    }

    #[test]
    fn test_due_events_dispatch_in_timestamp_order() {
        let f = fixture(&[1010, 1000, 1005]);
        f.source.set_position(1005);
        f.scheduler.inner.tick_once();
        assert_eq!(f.driver.count(), 3);

        // All three were due on the same tick; the scan walks the sorted
        // timeline, so dispatch order is ascending regardless of input order
        let fired = f.scheduler.inner.fired.lock().unwrap();
        assert_eq!(fired.len(), 3);
    }

    #[test]
    fn test_failed_dispatch_retries_within_window() {
        let f = fixture(&[1000]);

        f.driver.set_failing(true);
        tick_at(&f, 995);
        assert_eq!(f.driver.count(), 0);

        // Still inside the window: the retry is just the next poll
        f.driver.set_failing(false);
        tick_at(&f, 1011);
        assert_eq!(f.driver.count(), 1);
    }

    #[test]
    fn test_expired_window_is_permanently_skipped() {
        let f = fixture(&[1000]);

        f.driver.set_failing(true);
        tick_at(&f, 1000);
        f.driver.set_failing(false);

        // Window has passed; stale feedback is worthless
        tick_at(&f, 1100);
        assert_eq!(f.driver.count(), 0);
    }

    #[test]
    fn test_skips_dispatch_while_not_playing() {
        let f = fixture(&[1000]);
        f.source.set_playing(false);
        tick_at(&f, 1000);
        assert_eq!(f.driver.count(), 0);

        // Resume inside the window: fires without re-initialization
        f.source.set_playing(true);
        tick_at(&f, 1010);
        assert_eq!(f.driver.count(), 1);
    }

    #[test]
    fn test_skips_dispatch_while_disabled() {
        let f = fixture(&[1000]);
        f.scheduler.inner.state.set_haptics_enabled(false);
        tick_at(&f, 1000);
        assert_eq!(f.driver.count(), 0);

        // Re-enabled with the window still open: fires late
        f.scheduler.inner.state.set_haptics_enabled(true);
        tick_at(&f, 1012);
        assert_eq!(f.driver.count(), 1);
    }

    #[test]
    fn test_forward_seek_reseeds_passed_events() {
        let f = fixture(&[1000, 5000, 6000]);

        f.scheduler.notify_discontinuity(0, 6000);
        tick_at(&f, 6000);

        // 1000 and 5000 are seeded as fired (< 5985); 6000 straddles the
        // new position and fires normally
        assert_eq!(f.driver.count(), 1);

        tick_at(&f, 6016);
        assert_eq!(f.driver.count(), 1);
    }

    #[test]
    fn test_backward_seek_allows_replay() {
        let f = fixture(&[1000]);

        tick_at(&f, 1000);
        assert_eq!(f.driver.count(), 1);

        f.scheduler.notify_discontinuity(1000, 900);
        tick_at(&f, 1000);
        assert_eq!(f.driver.count(), 2);
    }

    #[test]
    fn test_seek_near_zero_seeds_nothing() {
        let f = fixture(&[0, 5]);
        f.scheduler.notify_discontinuity(5000, 10);
        tick_at(&f, 10);
        // Horizon saturates at 0, so both early events stay eligible
        assert_eq!(f.driver.count(), 2);
    }

    #[test]
    fn test_ended_state_halts_dispatch() {
        let f = fixture(&[1000]);

        f.scheduler.notify_playback_state(PlaybackState::Ended);
        tick_at(&f, 1000);

        assert!(!f.scheduler.is_running());
        assert_eq!(f.driver.count(), 0);
    }

    #[test]
    fn test_pause_state_keeps_bookkeeping_running() {
        let f = fixture(&[1000]);

        f.scheduler.notify_playback_state(PlaybackState::Paused);
        f.scheduler.inner.apply_pending_signals();
        assert!(f.scheduler.is_running());
    }

    #[test]
    fn test_player_error_stops_but_preserves_fired() {
        let f = fixture(&[1000, 5000]);
        tick_at(&f, 1000);
        assert_eq!(f.driver.count(), 1);

        f.scheduler.notify_player_error("decoder died");
        assert!(!f.scheduler.is_running());

        // No implicit seek: the fired event stays fired
        assert_eq!(f.scheduler.inner.fired.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_identical_events_fire_once_per_segment() {
        // Two byte-identical events share one identity
        let f = fixture(&[1000, 1000]);
        tick_at(&f, 1000);
        assert_eq!(f.driver.count(), 1);
    }
}
