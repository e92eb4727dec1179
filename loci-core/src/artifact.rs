//! Artifact bearer memory and pressure rules.
//!
//! Artifacts remember who carries them. The bearer channel is keyed by
//! holder identity; influence builds with carry time and saturates after a
//! week. Pressure rules are how an artifact leans on its bearer, gated on
//! accumulated influence.

use serde::{Deserialize, Serialize};

use crate::clock::{Timestamp, SECONDS_PER_DAY};
use crate::entity::Artifact;
use crate::types::ActorId;

/// Carry time before influence saturates at full strength.
const INFLUENCE_SATURATION_SECONDS: f64 = 7.0 * SECONDS_PER_DAY;

/// Minimum influence before influence-scaled rules may fire.
const INFLUENCE_FLOOR: f64 = 0.1;

/// Memory of one holder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearerRecord {
    /// Total seconds this holder has carried the artifact.
    pub accumulated_seconds: f64,
    /// When the artifact was last in this holder's hands.
    pub last_carried: Timestamp,
    /// Influence over the holder in `[0, 1]`, grows with carry time.
    pub influence: f64,
}

impl BearerRecord {
    fn new(now: Timestamp) -> Self {
        Self {
            accumulated_seconds: 0.0,
            last_carried: now,
            influence: 0.0,
        }
    }
}

/// What state of the world a pressure rule watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureTrigger {
    /// The bearer performed an action of a given category.
    BearerAction,
    /// A bearer state condition (host-evaluated).
    BearerState,
    /// Something entered the artifact's vicinity.
    Proximity,
}

/// A rule through which an artifact leans on its bearer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureRule {
    /// Rule name for admin output.
    pub name: String,
    /// What the rule watches.
    pub trigger: PressureTrigger,
    /// Action category the rule matches (for `BearerAction` triggers).
    pub action_category: Option<String>,
    /// Whether intensity scales with accumulated influence.
    pub scales_with_influence: bool,
    /// Base intensity of the pressure in `[0, 1]`.
    pub intensity: f64,
}

/// Record carry time for the current bearer, growing influence.
pub fn update_bearer_trace(
    artifact: &mut Artifact,
    bearer_id: &ActorId,
    elapsed_seconds: f64,
    now: Timestamp,
) {
    let record = artifact
        .bearer_traces
        .entry(bearer_id.clone())
        .or_insert_with(|| BearerRecord::new(now));
    record.accumulated_seconds += elapsed_seconds.max(0.0);
    if now > record.last_carried {
        record.last_carried = now;
    }
    record.influence = (record.accumulated_seconds / INFLUENCE_SATURATION_SECONDS).min(1.0);
}

/// Hand the artifact to a new bearer (or drop it with `None`).
pub fn set_current_bearer(artifact: &mut Artifact, bearer_id: Option<ActorId>, now: Timestamp) {
    if let Some(bearer) = &bearer_id {
        artifact
            .bearer_traces
            .entry(bearer.clone())
            .or_insert_with(|| BearerRecord::new(now));
    }
    artifact.current_bearer = bearer_id;
}

/// Current influence over a holder.
#[must_use]
pub fn influence(artifact: &Artifact, bearer_id: &ActorId) -> f64 {
    artifact
        .bearer_traces
        .get(bearer_id)
        .map_or(0.0, |record| record.influence)
}

/// Find the first pressure rule that applies to a bearer action.
///
/// Influence-scaled rules stay quiet until the artifact knows its holder.
#[must_use]
pub fn evaluate_pressure<'a>(
    artifact: &'a Artifact,
    bearer_id: &ActorId,
    action_category: &str,
) -> Option<&'a PressureRule> {
    let record = artifact.bearer_traces.get(bearer_id)?;

    artifact.pressure_rules.iter().find(|rule| {
        let matches_action = match rule.trigger {
            PressureTrigger::BearerAction => rule
                .action_category
                .as_deref()
                .map_or(true, |category| category == action_category),
            // State and proximity conditions are supplied by the host; the
            // core only gates them on influence.
            PressureTrigger::BearerState | PressureTrigger::Proximity => true,
        };
        let enough_influence = !rule.scales_with_influence || record.influence >= INFLUENCE_FLOOR;
        matches_action && enough_influence
    })
}
