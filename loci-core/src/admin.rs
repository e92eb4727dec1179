//! Read-only admin operators.
//!
//! Everything here inspects; nothing mutates trace state. The engine
//! exposes these to privileged users together with `toggle` and `test`,
//! which live on the engine because they touch registry and pipeline
//! state. Players never see any of this.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::affinity::{compute_affinity, score_channels, ChannelScores};
use crate::clock::{Timestamp, SECONDS_PER_DAY};
use crate::config::AffinityConfig;
use crate::entity::Entity;
use crate::snapshot::{top_contributions, TraceContribution};
use crate::types::{ActorId, EntityId, ThresholdBand};

/// How many contributing traces the reports carry.
const TOP_TRACES: usize = 5;

/// Result of `inspect`: current affinity toward the caller plus top traces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectReport {
    /// Inspected entity.
    pub entity_id: EntityId,
    /// Who asked.
    pub actor_id: ActorId,
    /// Affinity toward the caller right now.
    pub affinity: f64,
    /// Band classification.
    pub threshold: ThresholdBand,
    /// Strongest traces behind the number.
    pub top_traces: Vec<TraceContribution>,
    /// Personal trace count.
    pub personal_traces: usize,
    /// Group trace count.
    pub group_traces: usize,
    /// Behavior trace count.
    pub behavior_traces: usize,
    /// How many traces are scars.
    pub scar_count: usize,
}

/// Result of `why`: the channel breakdown behind an affinity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhyReport {
    /// Inspected entity.
    pub entity_id: EntityId,
    /// Who was evaluated.
    pub actor_id: ActorId,
    /// Personal channel contribution (weighted).
    pub personal_contribution: f64,
    /// Group channel contribution (weighted).
    pub group_contribution: f64,
    /// Behavior channel contribution (weighted).
    pub behavior_contribution: f64,
    /// The blended, normalized affinity.
    pub affinity: f64,
    /// Band classification.
    pub threshold: ThresholdBand,
    /// Top-k contributing traces.
    pub contributions: Vec<TraceContribution>,
}

/// `inspect(entity)`: current affinity toward the caller plus top traces.
#[must_use]
pub fn inspect(
    entity: &Entity,
    actor_id: &ActorId,
    actor_tags: &BTreeSet<String>,
    config: &AffinityConfig,
    now: Timestamp,
) -> InspectReport {
    let affinity = compute_affinity(entity, Some(actor_id), actor_tags, config, now);
    let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
    let scar_half_life = config.compaction.scar_half_life_days * SECONDS_PER_DAY;

    let (top_traces, personal, group, behavior, scars) = match entity.channels() {
        Some(channels) => {
            let top = top_contributions(
                channels,
                actor_id,
                actor_tags,
                entity.valuation(),
                &half_lives,
                scar_half_life,
                &config.channel_weights,
                now,
                TOP_TRACES,
            );
            let scars = channels
                .personal
                .values()
                .chain(channels.group.values())
                .chain(channels.behavior.values())
                .filter(|trace| trace.is_scar)
                .count();
            (
                top,
                channels.personal.len(),
                channels.group.len(),
                channels.behavior.len(),
                scars,
            )
        }
        None => (Vec::new(), 0, 0, 0, 0),
    };

    InspectReport {
        entity_id: entity.id().clone(),
        actor_id: actor_id.clone(),
        affinity,
        threshold: ThresholdBand::from_affinity(affinity),
        top_traces,
        personal_traces: personal,
        group_traces: group,
        behavior_traces: behavior,
        scar_count: scars,
    }
}

/// `why(entity, actor)`: channel breakdown and top contributions.
#[must_use]
pub fn why(
    entity: &Entity,
    actor_id: &ActorId,
    actor_tags: &BTreeSet<String>,
    config: &AffinityConfig,
    now: Timestamp,
) -> WhyReport {
    let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
    let scar_half_life = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
    let weights = &config.channel_weights;

    let (scores, contributions) = match entity.channels() {
        Some(channels) => (
            score_channels(
                channels,
                Some(actor_id),
                actor_tags,
                entity.valuation(),
                &half_lives,
                scar_half_life,
                now,
            ),
            top_contributions(
                channels,
                actor_id,
                actor_tags,
                entity.valuation(),
                &half_lives,
                scar_half_life,
                weights,
                now,
                TOP_TRACES,
            ),
        ),
        None => (ChannelScores::default(), Vec::new()),
    };

    let affinity = compute_affinity(entity, Some(actor_id), actor_tags, config, now);

    WhyReport {
        entity_id: entity.id().clone(),
        actor_id: actor_id.clone(),
        personal_contribution: weights.personal * scores.personal,
        group_contribution: weights.group * scores.group,
        behavior_contribution: weights.behavior * scores.behavior,
        affinity,
        threshold: ThresholdBand::from_affinity(affinity),
        contributions,
    }
}

/// `reeval(entity, actor)`: affinity from live traces. Used for tuning,
/// never for regression testing; that is what replay is for.
#[must_use]
pub fn reeval(
    entity: &Entity,
    actor_id: &ActorId,
    actor_tags: &BTreeSet<String>,
    config: &AffinityConfig,
    now: Timestamp,
) -> f64 {
    compute_affinity(entity, Some(actor_id), actor_tags, config, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Location;
    use crate::event::AffinityEvent;
    use crate::store::log_event;
    use crate::valuation::ValuationProfile;

    fn tags(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn burned_forest() -> Entity {
        let mut entity = Entity::Location(Location::new(
            EntityId::from("whispering_woods"),
            "The Whispering Woods",
            ValuationProfile::from_pairs(&[("harm.fire", -0.8)]),
        ));
        let config = AffinityConfig::default();
        let half_lives = config.half_lives.location.in_seconds();
        let scar = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
        let saturation = *entity.saturation();
        let event = AffinityEvent::new(
            "harm.fire",
            ActorId::from("player_0042"),
            tags(&["human", "hunter"]),
            EntityId::from("whispering_woods"),
            0.6,
            0.0,
        );
        let channels = entity.channels_mut().expect("channels");
        log_event(channels, &saturation, &event, &half_lives, scar);
        entity
    }

    #[test]
    fn inspect_reports_counts_and_affinity() {
        let entity = burned_forest();
        let config = AffinityConfig::default();
        let report = inspect(
            &entity,
            &ActorId::from("player_0042"),
            &tags(&["human", "hunter"]),
            &config,
            10.0,
        );

        assert!(report.affinity < 0.0);
        assert_eq!(report.personal_traces, 1);
        assert_eq!(report.group_traces, 2);
        assert_eq!(report.behavior_traces, 1);
        assert_eq!(report.scar_count, 0);
        assert!(!report.top_traces.is_empty());
    }

    #[test]
    fn why_breaks_down_channels() {
        let entity = burned_forest();
        let config = AffinityConfig::default();
        let report = why(
            &entity,
            &ActorId::from("player_0042"),
            &tags(&["human", "hunter"]),
            &config,
            10.0,
        );

        assert!(report.personal_contribution < 0.0);
        assert!(report.group_contribution < 0.0);
        assert!(report.behavior_contribution < 0.0);

        let raw = report.personal_contribution
            + report.group_contribution
            + report.behavior_contribution;
        assert!((report.affinity - raw.tanh()).abs() < 1e-12);
    }

    #[test]
    fn admin_operators_do_not_mutate() {
        let entity = burned_forest();
        let config = AffinityConfig::default();
        let before = serde_json::to_string(&entity).expect("serialize");

        let actor = ActorId::from("player_0042");
        let actor_tags = tags(&["human", "hunter"]);
        let _ = inspect(&entity, &actor, &actor_tags, &config, 10.0);
        let _ = why(&entity, &actor, &actor_tags, &config, 10.0);
        let _ = reeval(&entity, &actor, &actor_tags, &config, 10.0);

        let after = serde_json::to_string(&entity).expect("serialize");
        assert_eq!(before, after);
    }
}
