//! Memory compaction: hot → warm → scar lifecycle.
//!
//! Compaction is a distinct operation from the world tick and is invoked
//! explicitly by the host (or a long-period sub-tick). Lifecycle tests rely
//! on tick alone never mutating affinity beyond what lazy decay gives.
//!
//! - **Hot → warm** (age past the hot window): personal traces are dropped
//!   outright (individual identities forgotten); group traces fold into
//!   aggregates keyed by (folded tag, event category).
//! - **Warm → scar** (age past the warm window): traces above the scar
//!   intensity threshold are promoted in place (`is_scar = true`, scar
//!   half-life); everything else is deleted.
//! - Scars are exempt from folding and are never compacted further.

use tracing::debug;

use crate::clock::{Timestamp, SECONDS_PER_DAY};
use crate::config::AffinityConfig;
use crate::entity::{Entity, TraceChannels};
use crate::trace::TraceRecord;
use crate::types::EntityId;

/// Tag that non-institutional group memory collapses into at warm
/// compaction. Matches every actor during group scoring: it is the
/// entity's memory of people in general.
pub const CATCH_ALL_TAG: &str = "*";

/// Report of what one compaction pass did.
#[derive(Debug, Clone)]
pub struct CompactionReport {
    /// Which entity was compacted.
    pub entity_id: EntityId,
    /// When the pass ran.
    pub timestamp: Timestamp,
    /// Personal traces dropped at the hot boundary.
    pub personal_dropped: usize,
    /// Group traces folded into aggregates.
    pub group_folded: usize,
    /// Traces promoted to scars.
    pub scars_created: usize,
    /// Warm traces deleted for falling under the scar threshold.
    pub deleted: usize,
}

/// Fold an actor tag: institutional tags survive verbatim, everything else
/// collapses into the catch-all.
#[must_use]
pub fn fold_actor_tag<'a>(tag: &'a str, config: &AffinityConfig) -> &'a str {
    if config.institutional_tags.contains(tag) {
        tag
    } else {
        CATCH_ALL_TAG
    }
}

/// Fold an event type to its category prefix: `harm.fire` → `harm`.
#[must_use]
pub fn fold_event_type(event_type: &str) -> &str {
    crate::event::event_category(event_type)
}

fn compact_channels(
    channels: &mut TraceChannels,
    config: &AffinityConfig,
    group_half_life_seconds: f64,
    now: Timestamp,
) -> (usize, usize, usize, usize) {
    let hot_window = config.compaction.hot_window_days * SECONDS_PER_DAY;
    let warm_window = config.compaction.warm_window_days * SECONDS_PER_DAY;
    let scar_threshold = config.compaction.scar_intensity_threshold;

    // Hot boundary: individual identities are forgotten.
    let before = channels.personal.len();
    channels
        .personal
        .retain(|_, trace| trace.is_scar || now - trace.last_updated <= hot_window);
    let personal_dropped = before - channels.personal.len();

    let mut group_folded = 0;
    let mut scars_created = 0;
    let mut deleted = 0;

    // Group channel: keep hot traces, fold warm ones, scar-or-delete the rest.
    let group = std::mem::take(&mut channels.group);
    for ((tag, event_type), mut trace) in group {
        let age = now - trace.last_updated;

        if trace.is_scar || age <= hot_window {
            channels.group.insert((tag, event_type), trace);
            continue;
        }

        if age > warm_window {
            if trace.accumulated > scar_threshold {
                trace.is_scar = true;
                scars_created += 1;
                let folded_key = (
                    fold_actor_tag(&tag, config).to_string(),
                    fold_event_type(&event_type).to_string(),
                );
                merge_into(&mut channels.group, folded_key, trace);
            } else {
                deleted += 1;
            }
            continue;
        }

        // Warm: fold the key, merge the decayed value into the aggregate.
        let folded_value = trace.decayed_value(group_half_life_seconds, now);
        let folded_key = (
            fold_actor_tag(&tag, config).to_string(),
            fold_event_type(&event_type).to_string(),
        );
        let folded = TraceRecord {
            accumulated: folded_value,
            last_updated: now,
            event_count: trace.event_count,
            is_scar: false,
        };
        merge_into(&mut channels.group, folded_key, folded);
        group_folded += 1;
    }

    // Behavior channel: scar-or-delete past the warm window.
    let behavior = std::mem::take(&mut channels.behavior);
    for (event_type, mut trace) in behavior {
        let age = now - trace.last_updated;
        if trace.is_scar || age <= warm_window {
            channels.behavior.insert(event_type, trace);
            continue;
        }
        if trace.accumulated > scar_threshold {
            trace.is_scar = true;
            scars_created += 1;
            channels.behavior.insert(event_type, trace);
        } else {
            deleted += 1;
        }
    }

    (personal_dropped, group_folded, scars_created, deleted)
}

fn merge_into(
    traces: &mut std::collections::BTreeMap<(String, String), TraceRecord>,
    key: (String, String),
    incoming: TraceRecord,
) {
    if let Some(existing) = traces.get_mut(&key) {
        existing.accumulated += incoming.accumulated;
        existing.event_count += incoming.event_count;
        if incoming.last_updated > existing.last_updated {
            existing.last_updated = incoming.last_updated;
        }
        existing.is_scar = existing.is_scar || incoming.is_scar;
    } else {
        traces.insert(key, incoming);
    }
}

/// Run full compaction on an entity. Entities without trace channels are
/// untouched.
pub fn compact_traces(entity: &mut Entity, config: &AffinityConfig, now: Timestamp) -> CompactionReport {
    let entity_id = entity.id().clone();
    let group_half_life_seconds =
        config.half_lives.for_kind(entity.kind()).group * SECONDS_PER_DAY;
    let (personal_dropped, group_folded, scars_created, deleted) =
        entity.channels_mut().map_or((0, 0, 0, 0), |channels| {
            compact_channels(channels, config, group_half_life_seconds, now)
        });

    if personal_dropped + group_folded + scars_created + deleted > 0 {
        debug!(
            entity = %entity_id,
            personal_dropped,
            group_folded,
            scars_created,
            deleted,
            "compacted traces"
        );
    }

    CompactionReport {
        entity_id,
        timestamp: now,
        personal_dropped,
        group_folded,
        scars_created,
        deleted,
    }
}
