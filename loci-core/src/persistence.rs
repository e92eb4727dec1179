//! Runtime-state documents for host storage.
//!
//! The core does not own persistence between restarts; the host does. What
//! the core provides is the document shape: an entity's mutable runtime
//! state (traces, saturation, cooldowns, bearer records, `last_tick`) as a
//! JSON-friendly value, split from the static definition (name, valuation
//! profile, affordance wiring) that the host loads from its own content
//! files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::artifact::BearerRecord;
use crate::clock::Timestamp;
use crate::cooldown::CooldownRegistry;
use crate::entity::{Entity, SaturationState, TraceChannels};
use crate::error::{AffinityError, Result};
use crate::types::{ActorId, EntityId};

/// An entity's mutable runtime state, ready for host storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityState {
    /// Which entity this state belongs to.
    pub entity_id: EntityId,
    /// Trace channels, when the entity carries them.
    pub channels: Option<TraceChannels>,
    /// Saturation cache.
    pub saturation: SaturationState,
    /// Cooldown registry.
    pub cooldowns: CooldownRegistry,
    /// Housekeeping timestamp.
    pub last_tick: Timestamp,
    /// Bearer channel (artifacts only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_traces: Option<BTreeMap<ActorId, BearerRecord>>,
    /// Current holder (artifacts only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_bearer: Option<ActorId>,
}

/// Capture an entity's runtime state.
#[must_use]
pub fn capture_state(entity: &Entity) -> EntityState {
    let (bearer_traces, current_bearer) = match entity {
        Entity::Artifact(artifact) => (
            Some(artifact.bearer_traces.clone()),
            artifact.current_bearer.clone(),
        ),
        Entity::Location(_) => (None, None),
    };
    EntityState {
        entity_id: entity.id().clone(),
        channels: entity.channels().cloned(),
        saturation: *entity.saturation(),
        cooldowns: entity.cooldowns().clone(),
        last_tick: entity.last_tick(),
        bearer_traces,
        current_bearer,
    }
}

/// Restore runtime state onto an entity loaded from static definition.
///
/// # Errors
/// Returns [`AffinityError::Validation`] when the state belongs to a
/// different entity.
pub fn restore_state(entity: &mut Entity, state: EntityState) -> Result<()> {
    if state.entity_id != *entity.id() {
        return Err(AffinityError::Validation(format!(
            "state for '{}' applied to entity '{}'",
            state.entity_id,
            entity.id()
        )));
    }

    if let (Some(channels), Some(target)) = (state.channels, entity.channels_mut()) {
        *target = channels;
    }
    *entity.saturation_mut() = state.saturation;
    *entity.cooldowns_mut() = state.cooldowns;
    entity.set_last_tick(state.last_tick);

    if let Entity::Artifact(artifact) = entity {
        if let Some(bearer_traces) = state.bearer_traces {
            artifact.bearer_traces = bearer_traces;
        }
        artifact.current_bearer = state.current_bearer;
    }
    Ok(())
}

/// Serialize runtime state to a JSON string.
///
/// # Errors
/// Returns [`AffinityError::Config`] on serialization failure.
pub fn state_to_json(state: &EntityState) -> Result<String> {
    serde_json::to_string(state).map_err(|e| AffinityError::Config(e.to_string()))
}

/// Parse runtime state from a JSON string.
///
/// # Errors
/// Returns [`AffinityError::Config`] on malformed input.
pub fn state_from_json(json: &str) -> Result<EntityState> {
    serde_json::from_str(json).map_err(|e| AffinityError::Config(e.to_string()))
}
