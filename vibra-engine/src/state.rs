//! Shared engine state
//!
//! Thread-safe state shared between the scheduler loop, the engine facade,
//! and external callers: the haptics enable flag, the last observed playback
//! state, and the event broadcaster.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::debug;

use vibra_common::events::{PlaybackState, VibraEvent};

/// State accessible by all engine components
pub struct SharedState {
    /// Externally owned enable/disable signal, sampled once per tick
    haptics_enabled: AtomicBool,

    /// Last playback state reported by the playback source
    playback_state: Mutex<PlaybackState>,

    /// Event broadcaster for engine observers
    event_tx: broadcast::Sender<VibraEvent>,
}

impl SharedState {
    pub fn new(event_capacity: usize) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        Self {
            haptics_enabled: AtomicBool::new(true),
            playback_state: Mutex::new(PlaybackState::Idle),
            event_tx,
        }
    }

    /// Broadcast an event to all subscribers
    pub fn broadcast_event(&self, event: VibraEvent) {
        // No receivers is fine
        let _ = self.event_tx.send(event);
    }

    /// Subscribe to the engine event stream
    pub fn subscribe_events(&self) -> broadcast::Receiver<VibraEvent> {
        self.event_tx.subscribe()
    }

    pub fn haptics_enabled(&self) -> bool {
        self.haptics_enabled.load(Ordering::Relaxed)
    }

    /// Flip the enable flag; broadcasts only on an actual change
    pub fn set_haptics_enabled(&self, enabled: bool) {
        let was = self.haptics_enabled.swap(enabled, Ordering::Relaxed);
        if was != enabled {
            debug!(enabled, "Haptics toggled");
            self.broadcast_event(VibraEvent::HapticsToggled {
                enabled,
                timestamp: Utc::now(),
            });
        }
    }

    pub fn playback_state(&self) -> PlaybackState {
        *self.playback_state.lock().expect("playback state lock poisoned")
    }

    /// Record a new playback state, returning the previous one
    pub fn set_playback_state(&self, state: PlaybackState) -> PlaybackState {
        let mut guard = self.playback_state.lock().expect("playback state lock poisoned");
        std::mem::replace(&mut *guard, state)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new(100)
    }
}
