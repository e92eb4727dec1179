//! Event logging into an entity's trace store.
//!
//! One event updates exactly one personal entry, one group entry per actor
//! tag, and one behavior entry, atomically (the caller holds the entity's
//! lock). The store treats logging as total: there are no local failure
//! modes.

use tracing::debug;

use crate::config::ChannelHalfLives;
use crate::entity::{SaturationState, TraceChannels};
use crate::event::AffinityEvent;
use crate::trace::{effective_half_life, TraceRecord};

/// Summary of a single `log_event` call.
#[derive(Debug, Clone, Copy)]
pub struct LogReport {
    /// Whether the personal entry was created (vs updated).
    pub personal_created: bool,
    /// How many group entries were touched (one per actor tag).
    pub group_touched: usize,
    /// Effective intensity written to the personal channel after
    /// saturation dampening.
    pub personal_effective_intensity: f64,
}

/// Saturation dampening: `effective = intensity * (1 - saturation^2)`.
#[must_use]
pub fn apply_saturation(intensity: f64, saturation: f64) -> f64 {
    intensity * (1.0 - saturation * saturation)
}

fn upsert(
    traces: &mut std::collections::BTreeMap<(String, String), TraceRecord>,
    key: (String, String),
    intensity: f64,
    timestamp: f64,
    channel_half_life: f64,
    scar_half_life: f64,
) -> bool {
    if let Some(trace) = traces.get_mut(&key) {
        let half_life = effective_half_life(trace, channel_half_life, scar_half_life);
        trace.absorb(intensity, timestamp, half_life);
        false
    } else {
        traces.insert(key, TraceRecord::new(intensity, timestamp));
        true
    }
}

/// Log an affinity event into a trace store.
///
/// Each update decays the stored sum to the event timestamp, dampens the
/// incoming intensity by the channel's cached saturation, adds it, and
/// advances the bookkeeping fields. Saturation itself is recomputed on
/// tick, not here.
pub fn log_event(
    channels: &mut TraceChannels,
    saturation: &SaturationState,
    event: &AffinityEvent,
    half_lives_seconds: &ChannelHalfLives,
    scar_half_life_seconds: f64,
) -> LogReport {
    let timestamp = event.timestamp;

    // Personal channel.
    let personal_intensity = apply_saturation(event.intensity, saturation.personal);
    let personal_created = upsert(
        &mut channels.personal,
        (event.actor_id.0.clone(), event.event_type.clone()),
        personal_intensity,
        timestamp,
        half_lives_seconds.personal,
        scar_half_life_seconds,
    );

    // Group channel, one entry per actor tag.
    let group_intensity = apply_saturation(event.intensity, saturation.group);
    for tag in &event.actor_tags {
        upsert(
            &mut channels.group,
            (tag.clone(), event.event_type.clone()),
            group_intensity,
            timestamp,
            half_lives_seconds.group,
            scar_half_life_seconds,
        );
    }

    // Behavior channel.
    let behavior_intensity = apply_saturation(event.intensity, saturation.behavior);
    if let Some(trace) = channels.behavior.get_mut(&event.event_type) {
        let half_life =
            effective_half_life(trace, half_lives_seconds.behavior, scar_half_life_seconds);
        trace.absorb(behavior_intensity, timestamp, half_life);
    } else {
        channels.behavior.insert(
            event.event_type.clone(),
            TraceRecord::new(behavior_intensity, timestamp),
        );
    }

    debug!(
        event_type = %event.event_type,
        actor = %event.actor_id,
        intensity = event.intensity,
        effective = personal_intensity,
        "logged affinity event"
    );

    LogReport {
        personal_created,
        group_touched: event.actor_tags.len(),
        personal_effective_intensity: personal_intensity,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::clock::SECONDS_PER_DAY;
    use crate::types::{ActorId, EntityId};

    fn half_lives() -> ChannelHalfLives {
        ChannelHalfLives {
            personal: 7.0 * SECONDS_PER_DAY,
            group: 30.0 * SECONDS_PER_DAY,
            behavior: 90.0 * SECONDS_PER_DAY,
        }
    }

    fn fire_event(timestamp: f64) -> AffinityEvent {
        let tags: BTreeSet<String> = ["human", "hunter", "outsider"]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        AffinityEvent::new(
            "harm.fire",
            ActorId::from("player_0042"),
            tags,
            EntityId::from("whispering_woods"),
            0.6,
            timestamp,
        )
    }

    #[test]
    fn one_event_touches_all_three_channels() {
        let mut channels = TraceChannels::default();
        let saturation = SaturationState::default();

        let report = log_event(
            &mut channels,
            &saturation,
            &fire_event(1_000.0),
            &half_lives(),
            365.0 * SECONDS_PER_DAY,
        );

        assert!(report.personal_created);
        assert_eq!(report.group_touched, 3);
        assert_eq!(channels.personal.len(), 1);
        assert_eq!(channels.group.len(), 3);
        assert_eq!(channels.behavior.len(), 1);

        let personal = channels
            .personal
            .get(&("player_0042".to_string(), "harm.fire".to_string()))
            .expect("personal trace");
        assert!((personal.accumulated - 0.6).abs() < 1e-12);
        assert_eq!(personal.event_count, 1);
    }

    #[test]
    fn repeated_events_accumulate_with_decay() {
        let mut channels = TraceChannels::default();
        let saturation = SaturationState::default();
        let hl = half_lives();

        log_event(&mut channels, &saturation, &fire_event(0.0), &hl, 365.0 * SECONDS_PER_DAY);
        // One personal half-life later.
        log_event(
            &mut channels,
            &saturation,
            &fire_event(7.0 * SECONDS_PER_DAY),
            &hl,
            365.0 * SECONDS_PER_DAY,
        );

        let personal = channels
            .personal
            .get(&("player_0042".to_string(), "harm.fire".to_string()))
            .expect("personal trace");
        // 0.6 decayed to 0.3, plus 0.6 fresh.
        assert!((personal.accumulated - 0.9).abs() < 1e-9);
        assert_eq!(personal.event_count, 2);
    }

    #[test]
    fn saturation_dampens_acceptance() {
        let mut channels = TraceChannels::default();
        let saturation = SaturationState {
            personal: 0.5,
            group: 0.0,
            behavior: 1.0,
        };

        log_event(
            &mut channels,
            &saturation,
            &fire_event(0.0),
            &half_lives(),
            365.0 * SECONDS_PER_DAY,
        );

        let personal = channels
            .personal
            .get(&("player_0042".to_string(), "harm.fire".to_string()))
            .expect("personal trace");
        // 0.6 * (1 - 0.25) = 0.45
        assert!((personal.accumulated - 0.45).abs() < 1e-12);

        // Fully saturated behavior channel accepts nothing new.
        let behavior = channels.behavior.get("harm.fire").expect("behavior trace");
        assert!(behavior.accumulated.abs() < 1e-12);
    }

    #[test]
    fn out_of_order_event_appends_without_decay() {
        let mut channels = TraceChannels::default();
        let saturation = SaturationState::default();
        let hl = half_lives();

        log_event(&mut channels, &saturation, &fire_event(1_000.0), &hl, 365.0 * SECONDS_PER_DAY);
        log_event(&mut channels, &saturation, &fire_event(500.0), &hl, 365.0 * SECONDS_PER_DAY);

        let personal = channels
            .personal
            .get(&("player_0042".to_string(), "harm.fire".to_string()))
            .expect("personal trace");
        assert!((personal.accumulated - 1.2).abs() < 1e-12);
        assert!((personal.last_updated - 1_000.0).abs() < f64::EPSILON);
    }
}
