//! Actuator capability snapshot
//!
//! Describes what the underlying actuator can do. Computed once per
//! device/session by the platform layer and read-only to the engine; any
//! capability the platform cannot answer reads as `false`, so mapping
//! degrades toward the coarsest representation instead of failing.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use vibra_common::timeline::PrimitiveId;

/// Snapshot of actuator capabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorCapabilities {
    /// Whether an actuator is present at all
    pub has_actuator: bool,

    /// Whether composed primitive playback is available
    pub supports_primitive_composition: bool,

    /// The primitives the actuator can compose
    #[serde(default)]
    pub supported_primitives: HashSet<PrimitiveId>,

    /// Whether explicit (timing, amplitude) waveforms are supported
    pub supports_waveform: bool,
}

impl ActuatorCapabilities {
    /// Full tier: every primitive plus custom waveforms
    pub fn full() -> Self {
        Self {
            has_actuator: true,
            supports_primitive_composition: true,
            supported_primitives: PrimitiveId::ALL.into_iter().collect(),
            supports_waveform: true,
        }
    }

    /// Amplitude-controlled motor without primitive composition
    pub fn waveform_only() -> Self {
        Self {
            has_actuator: true,
            supports_primitive_composition: false,
            supported_primitives: HashSet::new(),
            supports_waveform: true,
        }
    }

    /// Binary motor: on/off vibration only
    pub fn basic() -> Self {
        Self {
            has_actuator: true,
            supports_primitive_composition: false,
            supported_primitives: HashSet::new(),
            supports_waveform: false,
        }
    }

    /// No actuator present
    pub fn none() -> Self {
        Self {
            has_actuator: false,
            supports_primitive_composition: false,
            supported_primitives: HashSet::new(),
            supports_waveform: false,
        }
    }

    /// Whether one specific primitive can be played as a composition
    pub fn is_primitive_supported(&self, id: PrimitiveId) -> bool {
        self.supports_primitive_composition && self.supported_primitives.contains(&id)
    }
}

impl FromStr for ActuatorCapabilities {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::full()),
            "waveform" | "waveform-only" => Ok(Self::waveform_only()),
            "basic" => Ok(Self::basic()),
            "none" => Ok(Self::none()),
            other => Err(format!(
                "unknown capability tier '{other}' (expected full, waveform-only, basic, or none)"
            )),
        }
    }
}
