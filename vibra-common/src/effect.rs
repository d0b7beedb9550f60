//! Concrete actuator effects
//!
//! Output of the effect mapper and input to actuator drivers. Which variant
//! an abstract event degrades to depends on the capability snapshot the
//! mapper was built with; drivers execute whatever variant they receive.

use serde::{Deserialize, Serialize};

use crate::timeline::PrimitiveId;

/// A concrete effect an actuator driver can execute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConcreteEffect {
    /// Composed playback of a named primitive at a scaled intensity
    PrimitiveComposition {
        id: PrimitiveId,
        /// Playback intensity in `[0.0, 1.0]`
        intensity: f32,
        /// Whether the composition loops until cancelled
        repeating: bool,
    },

    /// Explicit (duration, amplitude) waveform segments
    Waveform {
        timings: Vec<u64>,
        amplitudes: Vec<u8>,
    },

    /// Single fixed-duration buzz for motors without amplitude control
    SimplePulse { duration_ms: u64 },
}

impl ConcreteEffect {
    /// Nominal total duration of the effect in milliseconds
    ///
    /// Repeating compositions report one iteration; primitives report 0
    /// since their duration is platform-defined.
    pub fn nominal_duration_ms(&self) -> u64 {
        match self {
            ConcreteEffect::PrimitiveComposition { .. } => 0,
            ConcreteEffect::Waveform { timings, .. } => timings.iter().sum(),
            ConcreteEffect::SimplePulse { duration_ms } => *duration_ms,
        }
    }
}

impl std::fmt::Display for ConcreteEffect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcreteEffect::PrimitiveComposition {
                id,
                intensity,
                repeating,
            } => {
                write!(f, "primitive {id} @ {intensity:.2}")?;
                if *repeating {
                    write!(f, " (repeating)")?;
                }
                Ok(())
            }
            ConcreteEffect::Waveform { timings, .. } => {
                write!(
                    f,
                    "waveform ({} segments, {}ms)",
                    timings.len(),
                    self.nominal_duration_ms()
                )
            }
            ConcreteEffect::SimplePulse { duration_ms } => {
                write!(f, "pulse ({duration_ms}ms)")
            }
        }
    }
}
