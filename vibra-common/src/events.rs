//! Engine event types
//!
//! Events broadcast by the engine to its subscribers (UI layers, monitors,
//! tests). Serializable so they can be forwarded over any transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::effect::ConcreteEffect;

/// Playback state as reported by the playback source
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// Player released or not yet prepared
    Idle,
    /// Stalled waiting for media data
    Buffering,
    /// Position advancing
    Playing,
    /// Position frozen, resumable
    Paused,
    /// End of media reached
    Ended,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "idle"),
            PlaybackState::Buffering => write!(f, "buffering"),
            PlaybackState::Playing => write!(f, "playing"),
            PlaybackState::Paused => write!(f, "paused"),
            PlaybackState::Ended => write!(f, "ended"),
        }
    }
}

/// Vibra engine event types
///
/// Broadcast to every subscriber; dropped silently when nobody listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VibraEvent {
    /// Scheduler polling loop started for a session
    SchedulerStarted {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Scheduler polling loop stopped
    SchedulerStopped {
        session_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// A timeline event was mapped and handed to the actuator
    EffectDispatched {
        session_id: Uuid,
        /// Timeline timestamp of the fired event (milliseconds)
        event_timestamp_ms: u64,
        /// Sampled playback position at dispatch time (milliseconds)
        position_ms: u64,
        /// The concrete effect that was dispatched
        effect: ConcreteEffect,
        timestamp: DateTime<Utc>,
    },

    /// A dispatch attempt failed
    ///
    /// The event stays eligible while its tolerance window is open and is
    /// silently lost once the window passes.
    DispatchFailed {
        session_id: Uuid,
        event_timestamp_ms: u64,
        position_ms: u64,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// Playback state change observed from the playback source
    PlaybackStateChanged {
        session_id: Uuid,
        old_state: PlaybackState,
        new_state: PlaybackState,
        timestamp: DateTime<Utc>,
    },

    /// Position jump (seek) observed from the playback source
    PositionDiscontinuity {
        session_id: Uuid,
        old_position_ms: u64,
        new_position_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Haptic output was enabled or disabled
    HapticsToggled {
        enabled: bool,
        timestamp: DateTime<Utc>,
    },
}
