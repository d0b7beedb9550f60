//! Haptic timeline data model
//!
//! Parses timeline documents and exposes an immutable, validated [`Timeline`]
//! with the queries the scheduler needs: events sorted by timestamp, inclusive
//! range lookup, and next-event-after lookup.
//!
//! Wire format (field names match the published timeline documents):
//!
//! ```json
//! {
//!   "version": 1,
//!   "events": [
//!     {"t": 1000, "type": "primitive", "primitive": "CLICK", "strength": 200},
//!     {"t": 2500, "type": "waveform", "timings": [0, 50], "amplitudes": [0, 255]}
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Named actuator primitive
///
/// A short, platform-defined haptic waveform addressed by symbolic name.
/// Unknown names are rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrimitiveId {
    Click,
    Tick,
    Thud,
    HeavyClick,
    Spin,
    QuickRise,
    SlowRise,
    QuickFall,
}

impl PrimitiveId {
    /// All primitives, in declaration order
    pub const ALL: [PrimitiveId; 8] = [
        PrimitiveId::Click,
        PrimitiveId::Tick,
        PrimitiveId::Thud,
        PrimitiveId::HeavyClick,
        PrimitiveId::Spin,
        PrimitiveId::QuickRise,
        PrimitiveId::SlowRise,
        PrimitiveId::QuickFall,
    ];
}

impl std::fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveId::Click => write!(f, "CLICK"),
            PrimitiveId::Tick => write!(f, "TICK"),
            PrimitiveId::Thud => write!(f, "THUD"),
            PrimitiveId::HeavyClick => write!(f, "HEAVY_CLICK"),
            PrimitiveId::Spin => write!(f, "SPIN"),
            PrimitiveId::QuickRise => write!(f, "QUICK_RISE"),
            PrimitiveId::SlowRise => write!(f, "SLOW_RISE"),
            PrimitiveId::QuickFall => write!(f, "QUICK_FALL"),
        }
    }
}

/// Event kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Named platform primitive
    Primitive,
    /// Explicit (duration, amplitude) segment list
    Waveform,
}

/// A single haptic event on the timeline
///
/// Value-comparable by all fields, array contents included; the scheduler's
/// at-most-once bookkeeping relies on this identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HapticEvent {
    /// Milliseconds from media start
    #[serde(rename = "t")]
    pub timestamp: u64,

    /// Event kind
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Symbolic primitive name, present iff `kind` is `Primitive`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primitive: Option<PrimitiveId>,

    /// Segment durations in milliseconds, present iff `kind` is `Waveform`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timings: Option<Vec<u64>>,

    /// Segment amplitudes (0-255), same length as `timings`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amplitudes: Option<Vec<u8>>,

    /// Number of times to play; >1 requests a repeating composition
    #[serde(default = "default_repeat")]
    pub repeat: u32,

    /// Strength override (0-255); absent means full strength
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<u8>,

    /// Duration override in milliseconds, reserved for collaborators;
    /// carried through untouched
    #[serde(rename = "duration", default, skip_serializing_if = "Option::is_none")]
    pub duration_override: Option<u64>,
}

fn default_repeat() -> u32 {
    1
}

impl HapticEvent {
    /// Check structural consistency between `kind` and the populated fields
    fn validate(&self) -> std::result::Result<(), String> {
        match self.kind {
            EventKind::Primitive => {
                if self.primitive.is_none() {
                    return Err(format!(
                        "primitive event at {}ms is missing a primitive name",
                        self.timestamp
                    ));
                }
                if self.timings.is_some() || self.amplitudes.is_some() {
                    return Err(format!(
                        "primitive event at {}ms carries waveform arrays",
                        self.timestamp
                    ));
                }
            }
            EventKind::Waveform => {
                if self.primitive.is_some() {
                    return Err(format!(
                        "waveform event at {}ms carries a primitive name",
                        self.timestamp
                    ));
                }
                let (timings, amplitudes) = match (&self.timings, &self.amplitudes) {
                    (Some(t), Some(a)) => (t, a),
                    _ => {
                        return Err(format!(
                            "waveform event at {}ms is missing timings or amplitudes",
                            self.timestamp
                        ));
                    }
                };
                if timings.len() != amplitudes.len() {
                    return Err(format!(
                        "waveform event at {}ms has {} timings but {} amplitudes",
                        self.timestamp,
                        timings.len(),
                        amplitudes.len()
                    ));
                }
            }
        }
        if self.repeat < 1 {
            return Err(format!("event at {}ms has repeat count 0", self.timestamp));
        }
        Ok(())
    }
}

/// Raw parsed timeline document, prior to validation
///
/// Kept separate from [`Timeline`] so catalog entries can carry the parsed
/// form around without committing to validation until a session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineDocument {
    pub version: u32,
    pub events: Vec<HapticEvent>,
}

impl TimelineDocument {
    /// Parse a timeline document from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Immutable, validated haptic timeline for one media item
///
/// Events are stably sorted by timestamp at construction; ties keep their
/// document order. A `Timeline` is only ever produced from a document that
/// passed validation in full, so consumers never observe a partially-valid
/// timeline.
#[derive(Debug, Clone)]
pub struct Timeline {
    version: u32,
    events: Vec<HapticEvent>,
}

impl Timeline {
    /// Validate a parsed document and build the sorted timeline
    pub fn from_document(doc: TimelineDocument) -> Result<Self> {
        for event in &doc.events {
            event.validate().map_err(Error::Validation)?;
        }
        let mut events = doc.events;
        events.sort_by_key(|e| e.timestamp);
        Ok(Self {
            version: doc.version,
            events,
        })
    }

    /// Parse and validate a timeline straight from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_document(TimelineDocument::from_json(json)?)
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// All events, sorted ascending by timestamp
    pub fn events(&self) -> &[HapticEvent] {
        &self.events
    }

    /// Events whose timestamp lies in `[start_ms, end_ms]` inclusive
    pub fn events_in_range(&self, start_ms: u64, end_ms: u64) -> &[HapticEvent] {
        let lo = self.events.partition_point(|e| e.timestamp < start_ms);
        let hi = self.events.partition_point(|e| e.timestamp <= end_ms);
        if hi < lo {
            return &[];
        }
        &self.events[lo..hi]
    }

    /// The event with the smallest timestamp strictly greater than `after_ms`
    pub fn next_event_after(&self, after_ms: u64) -> Option<&HapticEvent> {
        let idx = self.events.partition_point(|e| e.timestamp <= after_ms);
        self.events.get(idx)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
