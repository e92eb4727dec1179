//! World tick: scheduled housekeeping for every entity.
//!
//! The tick prunes dead traces, re-derives saturation from decayed totals,
//! sweeps expired cooldowns, refreshes the disposable mood-band cache, and
//! stamps `last_tick`. It deliberately does **not** compact memory —
//! compaction is a distinct operator — so tick alone never moves affinity
//! beyond what lazy decay already gives. Safe to run on unvisited entities
//! and safe to run repeatedly.

use tracing::debug;

use crate::affinity::{blend, score_channels, ChannelScores};
use crate::clock::{Timestamp, SECONDS_PER_DAY};
use crate::config::AffinityConfig;
use crate::entity::{Entity, MoodBand, SaturationState};
use crate::trace::effective_half_life;
use crate::types::{EntityId, ThresholdBand};

/// Report of what one world tick cleaned up.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Which entity was ticked.
    pub entity_id: EntityId,
    /// When the tick ran.
    pub timestamp: Timestamp,
    /// Whether the tick interval had elapsed (false means no-op).
    pub ticked: bool,
    /// Traces pruned below the threshold.
    pub traces_pruned: usize,
    /// Expired cooldowns removed.
    pub cooldowns_cleared: usize,
    /// Saturation after the refresh.
    pub saturation: SaturationState,
    /// Seconds since the previous tick.
    pub time_since_last_tick: f64,
}

fn prune_channels(entity: &mut Entity, config: &AffinityConfig, now: Timestamp) -> usize {
    let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
    let scar_half_life = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
    let threshold = config.compaction.prune_threshold;

    let Some(channels) = entity.channels_mut() else {
        return 0;
    };

    let before = channels.len();
    channels.personal.retain(|_, trace| {
        trace.decayed_value(
            effective_half_life(trace, half_lives.personal, scar_half_life),
            now,
        ) >= threshold
    });
    channels.group.retain(|_, trace| {
        trace.decayed_value(
            effective_half_life(trace, half_lives.group, scar_half_life),
            now,
        ) >= threshold
    });
    channels.behavior.retain(|_, trace| {
        trace.decayed_value(
            effective_half_life(trace, half_lives.behavior, scar_half_life),
            now,
        ) >= threshold
    });
    before - channels.len()
}

fn refresh_saturation(entity: &mut Entity, config: &AffinityConfig, now: Timestamp) {
    let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
    let scar_half_life = config.compaction.scar_half_life_days * SECONDS_PER_DAY;

    let totals = match entity.channels() {
        Some(channels) => channels.decayed_totals(&half_lives, scar_half_life, now),
        None => return,
    };
    let capacity = &config.saturation_capacity;
    *entity.saturation_mut() = SaturationState {
        personal: (totals.personal / capacity.personal).clamp(0.0, 1.0),
        group: (totals.group / capacity.group).clamp(0.0, 1.0),
        behavior: (totals.behavior / capacity.behavior).clamp(0.0, 1.0),
    };
}

fn refresh_mood_bands(entity: &mut Entity, config: &AffinityConfig, now: Timestamp) {
    let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
    let scar_half_life = config.compaction.scar_half_life_days * SECONDS_PER_DAY;

    let samples: Vec<(String, f64)> = match entity.channels() {
        Some(channels) => {
            let tags: std::collections::BTreeSet<String> =
                channels.group.keys().map(|(tag, _)| tag.clone()).collect();
            tags.into_iter()
                .map(|tag| {
                    let tag_set = std::iter::once(tag.clone()).collect();
                    let scores: ChannelScores = score_channels(
                        channels,
                        None,
                        &tag_set,
                        entity.valuation(),
                        &half_lives,
                        scar_half_life,
                        now,
                    );
                    let affinity =
                        blend(scores, &config.channel_weights, 0.0, config.affinity_scale);
                    (tag, affinity)
                })
                .collect()
        }
        None => return,
    };

    if let Entity::Location(location) = entity {
        location.mood_bands.clear();
        for (tag, affinity) in samples {
            location.mood_bands.insert(
                tag.clone(),
                MoodBand {
                    actor_tag: tag,
                    affinity,
                    dominant: ThresholdBand::from_affinity(affinity),
                    last_updated: now,
                },
            );
        }
    }
}

/// Run housekeeping on one entity.
///
/// No-ops (with `ticked = false`) unless `world_tick_interval_seconds` has
/// elapsed since the entity's previous tick, so repeated calls at the same
/// timestamp leave traces bit-identical.
pub fn world_tick(entity: &mut Entity, config: &AffinityConfig, now: Timestamp) -> TickReport {
    let entity_id = entity.id().clone();
    let time_since_last_tick = now - entity.last_tick();

    if time_since_last_tick < config.world_tick_interval_seconds as f64 {
        return TickReport {
            entity_id,
            timestamp: now,
            ticked: false,
            traces_pruned: 0,
            cooldowns_cleared: 0,
            saturation: *entity.saturation(),
            time_since_last_tick,
        };
    }

    let traces_pruned = prune_channels(entity, config, now);
    refresh_saturation(entity, config, now);
    let cooldowns_cleared = entity.cooldowns_mut().sweep(now);
    refresh_mood_bands(entity, config, now);
    entity.set_last_tick(now);

    debug!(
        entity = %entity_id,
        traces_pruned,
        cooldowns_cleared,
        "world tick"
    );

    TickReport {
        entity_id,
        timestamp: now,
        ticked: true,
        traces_pruned,
        cooldowns_cleared,
        saturation: *entity.saturation(),
        time_since_last_tick,
    }
}
