//! Capability-aware effect mapping
//!
//! Translates abstract timeline events into the best concrete effect the
//! actuator can reproduce, degrading through a deterministic fallback chain:
//! primitive composition, then a waveform approximation of the primitive,
//! then a coarse fixed-duration pulse for binary motors. Mapping is pure:
//! identical inputs always yield identical output, and unmappable events
//! produce `None` rather than an error.

use tracing::debug;

use vibra_common::effect::ConcreteEffect;
use vibra_common::timeline::{EventKind, HapticEvent, PrimitiveId};

use crate::capabilities::ActuatorCapabilities;

/// Strength applied when an event carries no override
const DEFAULT_STRENGTH: u8 = 255;

/// Maps abstract haptic events to concrete effects for one capability profile
#[derive(Debug, Clone)]
pub struct EffectMapper {
    capabilities: ActuatorCapabilities,
}

impl EffectMapper {
    pub fn new(capabilities: ActuatorCapabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> &ActuatorCapabilities {
        &self.capabilities
    }

    /// Map an event to the best available concrete effect
    ///
    /// Returns `None` when the actuator cannot produce anything for the
    /// event; callers treat that as a no-op, never as an error.
    pub fn map(&self, event: &HapticEvent) -> Option<ConcreteEffect> {
        if !self.capabilities.has_actuator {
            return None;
        }
        match event.kind {
            EventKind::Primitive => self.map_primitive(event),
            EventKind::Waveform => self.map_waveform(event),
        }
    }

    fn map_primitive(&self, event: &HapticEvent) -> Option<ConcreteEffect> {
        let strength = event.strength.unwrap_or(DEFAULT_STRENGTH);
        match event.primitive {
            Some(id) if self.capabilities.is_primitive_supported(id) => {
                Some(ConcreteEffect::PrimitiveComposition {
                    id,
                    intensity: f32::from(strength) / 255.0,
                    repeating: event.repeat > 1,
                })
            }
            primitive => self.approximate_primitive(primitive, strength),
        }
    }

    /// Degraded rendering of a primitive: a waveform approximation where
    /// amplitude control exists, otherwise a coarse fixed-duration pulse
    fn approximate_primitive(
        &self,
        primitive: Option<PrimitiveId>,
        amp: u8,
    ) -> Option<ConcreteEffect> {
        if self.capabilities.supports_waveform {
            let (timings, amplitudes) = primitive_waveform(primitive, amp);
            debug!(?primitive, "Degrading primitive to waveform approximation");
            return Some(ConcreteEffect::Waveform {
                timings,
                amplitudes,
            });
        }

        // Binary motors have no amplitude control; strength is dropped and
        // only the characteristic duration survives.
        let duration_ms = match primitive {
            Some(PrimitiveId::HeavyClick) => 100,
            Some(PrimitiveId::Tick) => 20,
            Some(PrimitiveId::Thud) => 80,
            _ => 50,
        };
        debug!(?primitive, duration_ms, "Degrading primitive to simple pulse");
        Some(ConcreteEffect::SimplePulse { duration_ms })
    }

    fn map_waveform(&self, event: &HapticEvent) -> Option<ConcreteEffect> {
        match (&event.timings, &event.amplitudes) {
            (Some(timings), Some(amplitudes))
                if self.capabilities.supports_waveform && timings.len() == amplitudes.len() =>
            {
                Some(ConcreteEffect::Waveform {
                    timings: timings.clone(),
                    amplitudes: amplitudes.clone(),
                })
            }
            (Some(timings), _) => {
                let duration_ms: u64 = timings.iter().sum();
                debug!(duration_ms, "Degrading waveform to simple pulse");
                Some(ConcreteEffect::SimplePulse { duration_ms })
            }
            _ => None,
        }
    }
}

/// Waveform approximation table for primitives
///
/// Each entry alternates off/on segments; `amp` is the event strength
/// already defaulted by the caller. `None` (no primitive name) approximates
/// as a plain click.
fn primitive_waveform(primitive: Option<PrimitiveId>, amp: u8) -> (Vec<u64>, Vec<u8>) {
    match primitive {
        Some(PrimitiveId::HeavyClick) => (vec![0, 100, 20, 50], vec![0, amp, 0, amp / 2]),
        Some(PrimitiveId::Tick) => (vec![0, 20], vec![0, amp]),
        Some(PrimitiveId::Thud) => (vec![0, 80], vec![0, amp]),
        Some(PrimitiveId::Spin) => (vec![0, 50, 30, 50, 30, 50], vec![0, amp, 0, amp, 0, amp]),
        Some(PrimitiveId::QuickRise) => (vec![0, 100], vec![0, amp]),
        Some(PrimitiveId::SlowRise) => (vec![0, 200], vec![0, amp]),
        Some(PrimitiveId::QuickFall) => (vec![0, 50, 50], vec![amp, amp, 0]),
        Some(PrimitiveId::Click) | None => (vec![0, 50], vec![0, amp]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibra_common::timeline::EventKind;

    fn primitive_event(id: PrimitiveId, strength: Option<u8>, repeat: u32) -> HapticEvent {
        HapticEvent {
            timestamp: 1000,
            kind: EventKind::Primitive,
            primitive: Some(id),
            timings: None,
            amplitudes: None,
            repeat,
            strength,
            duration_override: None,
        }
    }

    fn waveform_event(timings: Vec<u64>, amplitudes: Vec<u8>) -> HapticEvent {
        HapticEvent {
            timestamp: 1000,
            kind: EventKind::Waveform,
            primitive: None,
            timings: Some(timings),
            amplitudes: Some(amplitudes),
            repeat: 1,
            strength: None,
            duration_override: None,
        }
    }

    #[test]
    fn test_primitive_composition_on_full_tier() {
        let mapper = EffectMapper::new(ActuatorCapabilities::full());
        let effect = mapper
            .map(&primitive_event(PrimitiveId::Click, Some(200), 1))
            .unwrap();

        match effect {
            ConcreteEffect::PrimitiveComposition {
                id,
                intensity,
                repeating,
            } => {
                assert_eq!(id, PrimitiveId::Click);
                assert!((intensity - 200.0 / 255.0).abs() < 1e-6);
                assert!(!repeating);
            }
            other => panic!("expected composition, got {other:?}"),
        }
    }

    #[test]
    fn test_default_strength_is_full_intensity() {
        let mapper = EffectMapper::new(ActuatorCapabilities::full());
        let effect = mapper
            .map(&primitive_event(PrimitiveId::Thud, None, 1))
            .unwrap();
        match effect {
            ConcreteEffect::PrimitiveComposition { intensity, .. } => {
                assert_eq!(intensity, 1.0);
            }
            other => panic!("expected composition, got {other:?}"),
        }
    }

    #[test]
    fn test_repeat_requests_repeating_composition() {
        let mapper = EffectMapper::new(ActuatorCapabilities::full());
        let effect = mapper
            .map(&primitive_event(PrimitiveId::Spin, None, 3))
            .unwrap();
        assert!(matches!(
            effect,
            ConcreteEffect::PrimitiveComposition { repeating: true, .. }
        ));
    }

    #[test]
    fn test_primitive_degrades_to_waveform_approximation() {
        // Composition unsupported, waveform available: CLICK at strength 200
        // approximates as [0,50] / [0,200]
        let mapper = EffectMapper::new(ActuatorCapabilities::waveform_only());
        let effect = mapper
            .map(&primitive_event(PrimitiveId::Click, Some(200), 1))
            .unwrap();

        assert_eq!(
            effect,
            ConcreteEffect::Waveform {
                timings: vec![0, 50],
                amplitudes: vec![0, 200],
            }
        );
    }

    #[test]
    fn test_unsupported_primitive_degrades_even_with_composition() {
        let caps = ActuatorCapabilities {
            has_actuator: true,
            supports_primitive_composition: true,
            supported_primitives: [PrimitiveId::Click].into_iter().collect(),
            supports_waveform: true,
        };
        let mapper = EffectMapper::new(caps);
        let effect = mapper
            .map(&primitive_event(PrimitiveId::Spin, Some(255), 1))
            .unwrap();

        assert_eq!(
            effect,
            ConcreteEffect::Waveform {
                timings: vec![0, 50, 30, 50, 30, 50],
                amplitudes: vec![0, 255, 0, 255, 0, 255],
            }
        );
    }

    #[test]
    fn test_heavy_click_approximation_halves_tail() {
        let mapper = EffectMapper::new(ActuatorCapabilities::waveform_only());
        let effect = mapper
            .map(&primitive_event(PrimitiveId::HeavyClick, Some(201), 1))
            .unwrap();

        assert_eq!(
            effect,
            ConcreteEffect::Waveform {
                timings: vec![0, 100, 20, 50],
                // Integer halving, like the tail segment of the real effect
                amplitudes: vec![0, 201, 0, 100],
            }
        );
    }

    #[test]
    fn test_quick_fall_leads_with_amplitude() {
        let mapper = EffectMapper::new(ActuatorCapabilities::waveform_only());
        let effect = mapper
            .map(&primitive_event(PrimitiveId::QuickFall, Some(128), 1))
            .unwrap();

        assert_eq!(
            effect,
            ConcreteEffect::Waveform {
                timings: vec![0, 50, 50],
                amplitudes: vec![128, 128, 0],
            }
        );
    }

    #[test]
    fn test_primitive_degrades_to_pulse_on_basic_tier() {
        // No composition, no waveform: HEAVY_CLICK becomes a 100ms pulse
        let mapper = EffectMapper::new(ActuatorCapabilities::basic());
        let effect = mapper
            .map(&primitive_event(PrimitiveId::HeavyClick, None, 1))
            .unwrap();
        assert_eq!(effect, ConcreteEffect::SimplePulse { duration_ms: 100 });

        let effect = mapper
            .map(&primitive_event(PrimitiveId::Tick, None, 1))
            .unwrap();
        assert_eq!(effect, ConcreteEffect::SimplePulse { duration_ms: 20 });

        // Primitives without a characteristic duration use the click default
        let effect = mapper
            .map(&primitive_event(PrimitiveId::SlowRise, None, 1))
            .unwrap();
        assert_eq!(effect, ConcreteEffect::SimplePulse { duration_ms: 50 });
    }

    #[test]
    fn test_waveform_passes_through_verbatim() {
        let mapper = EffectMapper::new(ActuatorCapabilities::full());
        let effect = mapper
            .map(&waveform_event(vec![0, 40, 10, 40], vec![0, 255, 0, 128]))
            .unwrap();

        assert_eq!(
            effect,
            ConcreteEffect::Waveform {
                timings: vec![0, 40, 10, 40],
                amplitudes: vec![0, 255, 0, 128],
            }
        );
    }

    #[test]
    fn test_waveform_degrades_to_total_duration_pulse() {
        let mapper = EffectMapper::new(ActuatorCapabilities::basic());
        let effect = mapper
            .map(&waveform_event(vec![0, 40, 10, 40], vec![0, 255, 0, 128]))
            .unwrap();
        assert_eq!(effect, ConcreteEffect::SimplePulse { duration_ms: 90 });
    }

    #[test]
    fn test_no_actuator_maps_nothing() {
        let mapper = EffectMapper::new(ActuatorCapabilities::none());
        assert!(mapper
            .map(&primitive_event(PrimitiveId::Click, None, 1))
            .is_none());
        assert!(mapper
            .map(&waveform_event(vec![0, 50], vec![0, 255]))
            .is_none());
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let mapper = EffectMapper::new(ActuatorCapabilities::waveform_only());
        let event = primitive_event(PrimitiveId::Spin, Some(77), 2);
        assert_eq!(mapper.map(&event), mapper.map(&event));
    }
}
