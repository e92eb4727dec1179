//! Affinity computation: channel scoring and the blended, normalized score.
//!
//! Scores are sums of `decayed_value * valuation` over the traces matching
//! an actor (personal), their tags (group), or everything (behavior). The
//! blend passes through `tanh(raw * (affinity_scale / 10.0))`; the constant
//! 10 anchors `affinity_scale = 10.0` as the neutral baseline, and higher
//! values compress more aggressively. This convention is observable and
//! must be preserved.

use std::collections::BTreeSet;

use crate::clock::Timestamp;
use crate::config::{AffinityConfig, ChannelHalfLives, ChannelWeights};
use crate::entity::{Entity, TraceChannels};
use crate::trace::effective_half_life;
use crate::types::ActorId;
use crate::valuation::ValuationProfile;

/// Raw per-channel scores before blending.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChannelScores {
    /// Personal channel score.
    pub personal: f64,
    /// Group channel score.
    pub group: f64,
    /// Behavior channel score.
    pub behavior: f64,
}

/// Score the personal channel: traces keyed by this actor's identity.
#[must_use]
pub fn score_personal(
    channels: &TraceChannels,
    actor_id: &ActorId,
    profile: &ValuationProfile,
    half_life_seconds: f64,
    scar_half_life_seconds: f64,
    now: Timestamp,
) -> f64 {
    let mut score = 0.0;
    for ((trace_actor, event_type), trace) in &channels.personal {
        if trace_actor != actor_id.as_str() {
            continue;
        }
        let half_life = effective_half_life(trace, half_life_seconds, scar_half_life_seconds);
        score += trace.decayed_value(half_life, now) * profile.get(event_type);
    }
    score
}

/// Score the group channel: traces whose tag lies in the actor's tag set.
/// The compaction catch-all tag matches every actor; it is the entity's
/// memory of people in general.
#[must_use]
pub fn score_group(
    channels: &TraceChannels,
    actor_tags: &BTreeSet<String>,
    profile: &ValuationProfile,
    half_life_seconds: f64,
    scar_half_life_seconds: f64,
    now: Timestamp,
) -> f64 {
    let mut score = 0.0;
    for ((trace_tag, event_type), trace) in &channels.group {
        if trace_tag != crate::compaction::CATCH_ALL_TAG && !actor_tags.contains(trace_tag) {
            continue;
        }
        let half_life = effective_half_life(trace, half_life_seconds, scar_half_life_seconds);
        score += trace.decayed_value(half_life, now) * profile.get(event_type);
    }
    score
}

/// Score the behavior channel: every trace, regardless of who left it.
#[must_use]
pub fn score_behavior(
    channels: &TraceChannels,
    profile: &ValuationProfile,
    half_life_seconds: f64,
    scar_half_life_seconds: f64,
    now: Timestamp,
) -> f64 {
    let mut score = 0.0;
    for (event_type, trace) in &channels.behavior {
        let half_life = effective_half_life(trace, half_life_seconds, scar_half_life_seconds);
        score += trace.decayed_value(half_life, now) * profile.get(event_type);
    }
    score
}

/// Score all three channels at once.
///
/// `actor_id` is optional so institutional queries can read the group
/// channel alone (personal contributes nothing without an identity).
#[must_use]
pub fn score_channels(
    channels: &TraceChannels,
    actor_id: Option<&ActorId>,
    actor_tags: &BTreeSet<String>,
    profile: &ValuationProfile,
    half_lives_seconds: &ChannelHalfLives,
    scar_half_life_seconds: f64,
    now: Timestamp,
) -> ChannelScores {
    ChannelScores {
        personal: actor_id.map_or(0.0, |actor| {
            score_personal(
                channels,
                actor,
                profile,
                half_lives_seconds.personal,
                scar_half_life_seconds,
                now,
            )
        }),
        group: score_group(
            channels,
            actor_tags,
            profile,
            half_lives_seconds.group,
            scar_half_life_seconds,
            now,
        ),
        behavior: score_behavior(
            channels,
            profile,
            half_lives_seconds.behavior,
            scar_half_life_seconds,
            now,
        ),
    }
}

/// Blend channel scores and normalize into `[-1, 1]`.
///
/// `institutional_bias` is the stance offered by affiliated institutions;
/// it enters the raw blend as a fourth channel with its own small weight and
/// never replaces local memory.
#[must_use]
pub fn blend(
    scores: ChannelScores,
    weights: &ChannelWeights,
    institutional_bias: f64,
    affinity_scale: f64,
) -> f64 {
    let raw = weights.personal * scores.personal
        + weights.group * scores.group
        + weights.behavior * scores.behavior
        + weights.institutional * institutional_bias;
    (raw * (affinity_scale / 10.0)).tanh()
}

/// Compute affinity for an actor at an entity, using the entity's half-life
/// tier and ignoring institutional bias. Entities without trace channels
/// (bearer-only artifacts) are neutral.
#[must_use]
pub fn compute_affinity(
    entity: &Entity,
    actor_id: Option<&ActorId>,
    actor_tags: &BTreeSet<String>,
    config: &AffinityConfig,
    now: Timestamp,
) -> f64 {
    compute_affinity_with_bias(entity, actor_id, actor_tags, config, 0.0, now)
}

/// Compute affinity with an institutional bias term.
#[must_use]
pub fn compute_affinity_with_bias(
    entity: &Entity,
    actor_id: Option<&ActorId>,
    actor_tags: &BTreeSet<String>,
    config: &AffinityConfig,
    institutional_bias: f64,
    now: Timestamp,
) -> f64 {
    let Some(channels) = entity.channels() else {
        return 0.0;
    };
    let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
    let scar_half_life = config.compaction.scar_half_life_days * crate::clock::SECONDS_PER_DAY;
    let scores = score_channels(
        channels,
        actor_id,
        actor_tags,
        entity.valuation(),
        &half_lives,
        scar_half_life,
        now,
    );
    blend(
        scores,
        &config.channel_weights,
        institutional_bias,
        config.affinity_scale,
    )
}
