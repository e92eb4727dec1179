//! Event records — the atomic unit of affinity change.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::types::{ActorId, EntityId};

/// The closed set of category prefixes callers must use for event types.
/// The core treats event types as opaque dotted strings otherwise.
pub const EVENT_CATEGORIES: &[&str] = &[
    "harm", "heal", "death", "extract", "create", "trespass", "offer", "trade", "magic", "social",
    "move",
];

/// Extract the category prefix of a dotted event type:
/// `"harm.fire"` → `"harm"`.
#[must_use]
pub fn event_category(event_type: &str) -> &str {
    event_type.split('.').next().unwrap_or(event_type)
}

/// An immutable description of a single actor action in a location.
///
/// The core does not validate event semantics; it trusts the host but
/// clamps intensity into `[0, 1]` at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffinityEvent {
    /// Dotted event type from the controlled vocabulary, e.g. `harm.fire`.
    pub event_type: String,
    /// Who initiated the action.
    pub actor_id: ActorId,
    /// The actor's categorical tags captured at event time.
    pub actor_tags: BTreeSet<String>,
    /// Where the event happened.
    pub location_id: EntityId,
    /// Magnitude of the action in `[0, 1]`.
    pub intensity: f64,
    /// When the event happened.
    pub timestamp: Timestamp,
    /// Affected entity, if any.
    pub target_id: Option<ActorId>,
    /// Additional qualifiers.
    pub context_tags: BTreeSet<String>,
}

impl AffinityEvent {
    /// Create an event, clamping intensity into `[0, 1]`.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        actor_id: ActorId,
        actor_tags: BTreeSet<String>,
        location_id: EntityId,
        intensity: f64,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            event_type: event_type.into(),
            actor_id,
            actor_tags,
            location_id,
            intensity: intensity.clamp(0.0, 1.0),
            timestamp,
            target_id: None,
            context_tags: BTreeSet::new(),
        }
    }

    /// Attach a target entity.
    #[must_use]
    pub fn with_target(mut self, target: ActorId) -> Self {
        self.target_id = Some(target);
        self
    }

    /// Attach context qualifier tags.
    #[must_use]
    pub fn with_context_tags(mut self, tags: BTreeSet<String>) -> Self {
        self.context_tags = tags;
        self
    }

    /// Category prefix of this event's type.
    #[must_use]
    pub fn category(&self) -> &str {
        event_category(&self.event_type)
    }
}
