//! Snapshots, trigger logs, and deterministic replay.
//!
//! A successful trigger freezes the full inputs (trace tables, valuation
//! profile, config slice, seed) alongside the final outputs. Replay
//! recomputes affinity from the frozen inputs and asserts bit-exact
//! equality with the stored value, then returns the stored final results;
//! it never rolls dice again. Reeval is the distinct operation that reads
//! live traces.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::affinity::{blend, score_channels};
use crate::affordance::AffordanceKind;
use crate::clock::Timestamp;
use crate::config::{ChannelHalfLives, ChannelWeights};
use crate::entity::TraceChannels;
use crate::error::{AffinityError, Result};
use crate::trace::effective_half_life;
use crate::types::{ActorId, Channel, EntityId, ThresholdBand, TriggerId};
use crate::valuation::ValuationProfile;

/// A single trace's contribution to a computed affinity. Admin-facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceContribution {
    /// Which channel the trace lives in.
    pub channel: Channel,
    /// Human-readable key, e.g. `(player_0042, harm.fire)`.
    pub trace_key: String,
    /// Decayed value at evaluation time.
    pub decayed_value: f64,
    /// Valuation applied to the trace.
    pub valuation: f64,
    /// `decayed * valuation * channel_weight`.
    pub weighted_contribution: f64,
}

/// Admin-only record of one affordance evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordanceTriggerLog {
    /// Shared id of this trigger and its snapshot.
    pub trigger_id: TriggerId,
    /// Simulation time of the evaluation.
    pub timestamp: Timestamp,
    /// Wall-clock time the record was written (save metadata).
    pub recorded_at: DateTime<Utc>,
    /// Where the evaluation ran.
    pub entity_id: EntityId,
    /// Who was evaluated.
    pub actor_id: ActorId,
    /// The affordance that fired, if any.
    pub affordance: Option<AffordanceKind>,
    /// Effect label, e.g. `slow`, `redirect`.
    pub effect_applied: Option<String>,
    /// First adjustment value, or zero when nothing fired.
    pub severity: f64,
    /// Top traces by absolute weighted contribution.
    pub contributing_traces: Vec<TraceContribution>,
    /// The computed affinity.
    pub computed_affinity: f64,
    /// Band the affinity fell into.
    pub threshold: ThresholdBand,
}

/// Complete frozen state for deterministic replay.
///
/// The `final_*` fields are the actual outputs; replay returns them
/// directly after verifying the affinity recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffordanceSnapshot {
    /// Shared id of this snapshot and its trigger log.
    pub trigger_id: TriggerId,
    /// Who was evaluated.
    pub actor_id: ActorId,
    /// The actor's tags at evaluation time.
    pub actor_tags: BTreeSet<String>,
    /// Where the evaluation ran.
    pub entity_id: EntityId,
    /// Simulation time of the evaluation.
    pub eval_time: Timestamp,
    /// Deep copy of the entity's three-channel trace tables.
    pub channels: TraceChannels,
    /// Deep copy of the valuation profile.
    pub valuation: ValuationProfile,
    /// Half-lives in seconds, frozen from config.
    pub half_lives_seconds: ChannelHalfLives,
    /// Scar half-life in seconds, frozen from config.
    pub scar_half_life_seconds: f64,
    /// Channel weights, frozen from config.
    pub weights: ChannelWeights,
    /// Tanh scale, frozen from config.
    pub affinity_scale: f64,
    /// Institutional bias that entered the blend.
    pub institutional_bias: f64,
    /// Seed for the deterministic rolls (tell choice, redirect).
    pub random_seed: u64,
    /// The computed affinity.
    pub computed_affinity: f64,
    /// Band the affinity fell into.
    pub threshold: ThresholdBand,
    /// The affordance that fired, if any.
    pub affordance_triggered: Option<AffordanceKind>,
    /// Effect label, if any.
    pub effect_applied: Option<String>,
    /// Final mechanical adjustments.
    pub final_adjustments: BTreeMap<String, f64>,
    /// Final narrative tells.
    pub final_tells: Vec<String>,
    /// Final redirect destination, if any.
    pub final_redirect_target: Option<EntityId>,
}

/// Everything replay hands back, taken from the stored snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Stored affinity (verified against recomputation).
    pub computed_affinity: f64,
    /// Stored band.
    pub threshold: ThresholdBand,
    /// Stored adjustments.
    pub adjustments: BTreeMap<String, f64>,
    /// Stored tells.
    pub tells: Vec<String>,
    /// Stored redirect target.
    pub redirect_target: Option<EntityId>,
    /// Stored triggered affordance.
    pub affordance_triggered: Option<AffordanceKind>,
    /// Stored effect label.
    pub effect_applied: Option<String>,
}

/// Recompute affinity from a snapshot's frozen inputs. Mirrors the live
/// compute path exactly.
#[must_use]
pub fn recompute_affinity(snapshot: &AffordanceSnapshot) -> f64 {
    let scores = score_channels(
        &snapshot.channels,
        Some(&snapshot.actor_id),
        &snapshot.actor_tags,
        &snapshot.valuation,
        &snapshot.half_lives_seconds,
        snapshot.scar_half_life_seconds,
        snapshot.eval_time,
    );
    blend(
        scores,
        &snapshot.weights,
        snapshot.institutional_bias,
        snapshot.affinity_scale,
    )
}

/// Replay an affordance trigger from its snapshot.
///
/// Recomputes the affinity from the frozen traces and asserts bit-exact
/// equality with the stored value, then returns the stored final results.
///
/// # Errors
/// Returns [`AffinityError::SnapshotMismatch`] when the recomputation
/// disagrees with the stored value. Fatal for tests; servers log and alert.
pub fn replay(snapshot: &AffordanceSnapshot) -> Result<ReplayResult> {
    let recomputed = recompute_affinity(snapshot);
    if recomputed.to_bits() != snapshot.computed_affinity.to_bits() {
        return Err(AffinityError::SnapshotMismatch {
            trigger: snapshot.trigger_id,
            recomputed,
            stored: snapshot.computed_affinity,
        });
    }
    Ok(ReplayResult {
        computed_affinity: snapshot.computed_affinity,
        threshold: snapshot.threshold,
        adjustments: snapshot.final_adjustments.clone(),
        tells: snapshot.final_tells.clone(),
        redirect_target: snapshot.final_redirect_target.clone(),
        affordance_triggered: snapshot.affordance_triggered,
        effect_applied: snapshot.effect_applied.clone(),
    })
}

/// Rank the traces contributing to an actor's affinity, strongest first by
/// absolute weighted contribution.
#[must_use]
pub fn top_contributions(
    channels: &TraceChannels,
    actor_id: &ActorId,
    actor_tags: &BTreeSet<String>,
    profile: &ValuationProfile,
    half_lives_seconds: &ChannelHalfLives,
    scar_half_life_seconds: f64,
    weights: &ChannelWeights,
    now: Timestamp,
    limit: usize,
) -> Vec<TraceContribution> {
    let mut contributions = Vec::new();

    for ((trace_actor, event_type), trace) in &channels.personal {
        if trace_actor != actor_id.as_str() {
            continue;
        }
        let half_life =
            effective_half_life(trace, half_lives_seconds.personal, scar_half_life_seconds);
        let decayed = trace.decayed_value(half_life, now);
        let valuation = profile.get(event_type);
        contributions.push(TraceContribution {
            channel: Channel::Personal,
            trace_key: format!("({trace_actor}, {event_type})"),
            decayed_value: decayed,
            valuation,
            weighted_contribution: decayed * valuation * weights.personal,
        });
    }

    for ((trace_tag, event_type), trace) in &channels.group {
        if trace_tag != crate::compaction::CATCH_ALL_TAG && !actor_tags.contains(trace_tag) {
            continue;
        }
        let half_life =
            effective_half_life(trace, half_lives_seconds.group, scar_half_life_seconds);
        let decayed = trace.decayed_value(half_life, now);
        let valuation = profile.get(event_type);
        contributions.push(TraceContribution {
            channel: Channel::Group,
            trace_key: format!("({trace_tag}, {event_type})"),
            decayed_value: decayed,
            valuation,
            weighted_contribution: decayed * valuation * weights.group,
        });
    }

    for (event_type, trace) in &channels.behavior {
        let half_life =
            effective_half_life(trace, half_lives_seconds.behavior, scar_half_life_seconds);
        let decayed = trace.decayed_value(half_life, now);
        let valuation = profile.get(event_type);
        contributions.push(TraceContribution {
            channel: Channel::Behavior,
            trace_key: event_type.clone(),
            decayed_value: decayed,
            valuation,
            weighted_contribution: decayed * valuation * weights.behavior,
        });
    }

    contributions.sort_by_key(|c| std::cmp::Reverse(OrderedFloat(c.weighted_contribution.abs())));
    contributions.truncate(limit);
    contributions
}
