//! Engine facade
//!
//! Owns the actuator driver, capability snapshot, and mapper; hands out
//! per-session schedulers bound to one timeline and one playback source, and
//! offers one-shot playback helpers for feedback outside any timeline.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use vibra_common::config::EngineConfig;
use vibra_common::timeline::{EventKind, HapticEvent, PrimitiveId, Timeline};

use crate::actuator::ActuatorDriver;
use crate::capabilities::ActuatorCapabilities;
use crate::mapper::EffectMapper;
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::source::PlaybackSource;
use crate::state::SharedState;
use crate::Result;

/// Haptic playback engine
///
/// One instance per device; playback sessions are created per media item
/// via [`HapticsEngine::start_session`].
pub struct HapticsEngine {
    driver: Arc<dyn ActuatorDriver>,
    mapper: EffectMapper,
    state: Arc<SharedState>,
    scheduler_config: SchedulerConfig,
}

impl HapticsEngine {
    pub fn new(
        driver: Arc<dyn ActuatorDriver>,
        capabilities: ActuatorCapabilities,
        config: &EngineConfig,
    ) -> Self {
        info!(
            has_actuator = capabilities.has_actuator,
            composition = capabilities.supports_primitive_composition,
            waveform = capabilities.supports_waveform,
            "Creating haptics engine"
        );
        Self {
            driver,
            mapper: EffectMapper::new(capabilities),
            state: Arc::new(SharedState::new(config.event_channel_capacity)),
            scheduler_config: SchedulerConfig::from_engine(config),
        }
    }

    pub fn capabilities(&self) -> &ActuatorCapabilities {
        self.mapper.capabilities()
    }

    /// Shared state handle: enable flag and event subscription
    pub fn shared_state(&self) -> Arc<SharedState> {
        Arc::clone(&self.state)
    }

    /// Map and dispatch a single event immediately, outside any timeline
    ///
    /// Returns `Ok(false)` when the actuator cannot produce anything for the
    /// event (not an error).
    pub fn play_event(&self, event: &HapticEvent) -> Result<bool> {
        let Some(effect) = self.mapper.map(event) else {
            debug!("No concrete effect for one-shot event");
            return Ok(false);
        };
        self.driver.dispatch(&effect)?;
        debug!("Played one-shot effect: {effect}");
        Ok(true)
    }

    /// One-shot primitive at the given intensity (clamped to `[0.0, 1.0]`)
    pub fn play_primitive(&self, id: PrimitiveId, intensity: f32) -> Result<bool> {
        let strength = (intensity.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.play_event(&HapticEvent {
            timestamp: 0,
            kind: EventKind::Primitive,
            primitive: Some(id),
            timings: None,
            amplitudes: None,
            repeat: 1,
            strength: Some(strength),
            duration_override: None,
        })
    }

    /// One-shot custom waveform
    pub fn play_waveform(&self, timings: Vec<u64>, amplitudes: Vec<u8>) -> Result<bool> {
        if timings.len() != amplitudes.len() {
            return Err(vibra_common::Error::Validation(format!(
                "waveform has {} timings but {} amplitudes",
                timings.len(),
                amplitudes.len()
            ))
            .into());
        }
        self.play_event(&HapticEvent {
            timestamp: 0,
            kind: EventKind::Waveform,
            primitive: None,
            timings: Some(timings),
            amplitudes: Some(amplitudes),
            repeat: 1,
            strength: None,
            duration_override: None,
        })
    }

    /// Begin a playback session binding one timeline to one playback source
    ///
    /// The returned handle owns the session's scheduler; the caller wires the
    /// player's callbacks to the scheduler's `notify_*` handlers and is
    /// responsible for explicit teardown via [`SessionHandle::shutdown`].
    pub fn start_session(
        &self,
        timeline: Timeline,
        source: Arc<dyn PlaybackSource>,
    ) -> SessionHandle {
        let session_id = Uuid::new_v4();
        info!(%session_id, events = timeline.len(), "Starting haptic session");

        let scheduler = Scheduler::new(
            session_id,
            timeline,
            source,
            Arc::clone(&self.driver),
            self.mapper.clone(),
            Arc::clone(&self.state),
            self.scheduler_config,
        );

        SessionHandle {
            scheduler,
            driver: Arc::clone(&self.driver),
        }
    }

    /// Stop any in-flight or repeating effect immediately
    pub fn cancel(&self) {
        self.driver.cancel_all();
    }
}

/// Handle to one playback session
///
/// Dropping the handle does not stop the loop; teardown is explicit so an
/// owner can keep the session alive across its own restructuring.
pub struct SessionHandle {
    scheduler: Scheduler,
    driver: Arc<dyn ActuatorDriver>,
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.scheduler.session_id()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Stop the scheduling loop and cancel outstanding effects. Idempotent.
    pub fn shutdown(&self) {
        info!(session_id = %self.scheduler.session_id(), "Session shutdown");
        self.scheduler.stop();
        self.driver.cancel_all();
    }
}
