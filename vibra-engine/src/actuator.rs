//! Actuator driver interface
//!
//! Executes concrete effects on the underlying device. `dispatch` must hand
//! the effect to the hardware and return without waiting for the effect to
//! play out; the scheduler treats a returned error as "not fired" and lets
//! the event retry while its tolerance window is still open.

use tracing::{debug, info};

use vibra_common::effect::ConcreteEffect;

use crate::Result;

/// Executes concrete effects on an actuator
pub trait ActuatorDriver: Send + Sync {
    /// Hand one effect to the device
    ///
    /// Must not block for the duration of the effect. Errors include
    /// transient device faults and policy denials (e.g. a system-level
    /// do-not-disturb block), which are only discoverable at dispatch time.
    fn dispatch(&self, effect: &ConcreteEffect) -> Result<()>;

    /// Stop any in-flight or repeating effect immediately
    fn cancel_all(&self);
}

/// Driver that logs effects instead of vibrating
///
/// Stands in for real hardware in the demo runner.
#[derive(Debug, Default)]
pub struct ConsoleActuator;

impl ActuatorDriver for ConsoleActuator {
    fn dispatch(&self, effect: &ConcreteEffect) -> Result<()> {
        info!("haptic: {effect}");
        Ok(())
    }

    fn cancel_all(&self) {
        debug!("haptic: cancel all");
    }
}

/// Driver that accepts everything and does nothing
///
/// Useful when no actuator is present but callers still want the scheduling
/// pipeline (and its events) to run.
#[derive(Debug, Default)]
pub struct NullActuator;

impl ActuatorDriver for NullActuator {
    fn dispatch(&self, _effect: &ConcreteEffect) -> Result<()> {
        Ok(())
    }

    fn cancel_all(&self) {}
}
