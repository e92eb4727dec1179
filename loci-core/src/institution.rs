//! Institutions: virtual entities with slow-drifting cultural stances.
//!
//! An institution has no physical presence and never receives events. Its
//! `cached_stance` (actor tag → affinity) drifts toward the mean group-
//! channel affinity of its affiliated entities on each refresh, heavily
//! weighted toward the old value, and decays with a long half-life between
//! refreshes. Institutional opinions therefore persist even when their
//! constituents are destroyed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::affinity::score_group;
use crate::clock::{Timestamp, SECONDS_PER_DAY};
use crate::config::AffinityConfig;
use crate::entity::Entity;
use crate::types::EntityId;

/// A virtual cultural entity whose stance blends its constituents' memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    /// Host-supplied identity.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Entities carrying any of these tags are constituents.
    pub affiliated_tags: BTreeSet<String>,
    /// Cached stance per actor tag, each in `[-1, 1]`.
    pub cached_stance: BTreeMap<String, f64>,
    /// When the stance map was last refreshed.
    pub last_computed: Timestamp,
}

impl Institution {
    /// Create an institution with an empty stance map.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, affiliated_tags: BTreeSet<String>) -> Self {
        Self {
            id,
            name: name.into(),
            affiliated_tags,
            cached_stance: BTreeMap::new(),
            last_computed: 0.0,
        }
    }

    /// Whether an entity belongs to this institution.
    #[must_use]
    pub fn is_constituent(&self, entity: &Entity) -> bool {
        entity
            .affiliation_tags()
            .is_some_and(|tags| tags.intersection(&self.affiliated_tags).next().is_some())
    }

    /// Cached stance toward an actor tag. Unknown tags are neutral.
    #[must_use]
    pub fn stance(&self, actor_tag: &str) -> f64 {
        self.cached_stance.get(actor_tag).copied().unwrap_or(0.0)
    }

    /// Track an actor tag so future refreshes maintain a stance for it.
    pub fn observe_tag(&mut self, actor_tag: impl Into<String>) {
        self.cached_stance.entry(actor_tag.into()).or_insert(0.0);
    }

    /// Whether a refresh is due.
    #[must_use]
    pub fn refresh_due(&self, config: &AffinityConfig, now: Timestamp) -> bool {
        now - self.last_computed >= config.institutions.refresh_interval_seconds as f64
    }

    /// Decay every cached stance toward zero with the institutional
    /// half-life. Called between refreshes so opinions fade even when the
    /// constituents are gone.
    pub fn decay_stances(&mut self, config: &AffinityConfig, elapsed_seconds: f64) {
        if elapsed_seconds <= 0.0 {
            return;
        }
        let half_life = config.institutions.half_life_days * SECONDS_PER_DAY;
        let factor = 0.5_f64.powf(elapsed_seconds / half_life);
        for stance in self.cached_stance.values_mut() {
            *stance *= factor;
        }
    }

    /// Refresh the stance map from constituent entities.
    ///
    /// For each tracked actor tag, queries each constituent's group channel
    /// alone (institutions have no personal relationships) and blends:
    /// `new = inertia * old + drift_rate * mean_over_constituents`.
    pub fn refresh(&mut self, constituents: &[&Entity], config: &AffinityConfig, now: Timestamp) {
        let tags: Vec<String> = self.cached_stance.keys().cloned().collect();
        for tag in tags {
            let tag_set: BTreeSet<String> = std::iter::once(tag.clone()).collect();
            let mut total = 0.0;
            let mut count = 0usize;
            for entity in constituents {
                if !self.is_constituent(entity) {
                    continue;
                }
                total += constituent_affinity(entity, &tag_set, config, now);
                count += 1;
            }
            let fresh = if count == 0 { 0.0 } else { total / count as f64 };

            let cached = self.stance(&tag);
            let blended = config.institutions.inertia * cached
                + config.institutions.drift_rate * fresh;
            self.cached_stance.insert(tag, blended.clamp(-1.0, 1.0));
        }
        self.last_computed = now;
        debug!(institution = %self.id, stances = self.cached_stance.len(), "refreshed institution");
    }
}

/// Group-channel-only affinity of one constituent toward a tag set.
fn constituent_affinity(
    entity: &Entity,
    tag_set: &BTreeSet<String>,
    config: &AffinityConfig,
    now: Timestamp,
) -> f64 {
    let Some(channels) = entity.channels() else {
        return 0.0;
    };
    let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
    let scar_half_life = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
    let group = score_group(
        channels,
        tag_set,
        entity.valuation(),
        half_lives.group,
        scar_half_life,
        now,
    );
    let raw = config.channel_weights.group * group;
    (raw * (config.affinity_scale / 10.0)).tanh()
}

/// Sum of the stances of the given institutions toward an actor's tags.
/// This is the bias the pipeline feeds into the affinity blend; it never
/// replaces local memory.
#[must_use]
pub fn stance_bias(
    institutions: &[&Institution],
    actor_tags: &BTreeSet<String>,
) -> f64 {
    institutions
        .iter()
        .map(|institution| {
            actor_tags
                .iter()
                .map(|tag| institution.stance(tag))
                .sum::<f64>()
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Location;
    use crate::event::AffinityEvent;
    use crate::store::log_event;
    use crate::types::ActorId;
    use crate::valuation::ValuationProfile;

    fn tags(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn grove_with_fire_memory() -> Entity {
        let mut location = Location::new(
            EntityId::from("elder_grove"),
            "Elder Grove",
            ValuationProfile::from_pairs(&[("harm.fire", -0.8)]),
        );
        location.tags = tags(&["forest"]);
        let mut entity = Entity::Location(location);

        let config = AffinityConfig::default();
        let half_lives = config.half_lives.location.in_seconds();
        let scar = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
        let saturation = *entity.saturation();
        let event = AffinityEvent::new(
            "harm.fire",
            ActorId::from("player_0042"),
            tags(&["hunter"]),
            EntityId::from("elder_grove"),
            0.8,
            0.0,
        );
        let channels = entity.channels_mut().expect("channels");
        log_event(channels, &saturation, &event, &half_lives, scar);
        entity
    }

    #[test]
    fn unknown_tag_is_neutral() {
        let institution = Institution::new(
            EntityId::from("rangers_guild"),
            "Rangers' Guild",
            tags(&["forest"]),
        );
        assert!(institution.stance("hunter").abs() < f64::EPSILON);
    }

    #[test]
    fn refresh_drifts_toward_constituents() {
        let config = AffinityConfig::default();
        let entity = grove_with_fire_memory();

        let mut institution = Institution::new(
            EntityId::from("rangers_guild"),
            "Rangers' Guild",
            tags(&["forest"]),
        );
        institution.observe_tag("hunter");

        institution.refresh(&[&entity], &config, 10.0);

        // Constituent affinity toward hunters is negative, the blend moves
        // a tenth of the way there (drift_rate 0.1, inertia 0.9 from zero).
        let stance = institution.stance("hunter");
        assert!(stance < 0.0);
        assert!(stance > -0.2);
    }

    #[test]
    fn inertia_dominates_refresh() {
        let config = AffinityConfig::default();
        let entity = grove_with_fire_memory();

        let mut institution = Institution::new(
            EntityId::from("rangers_guild"),
            "Rangers' Guild",
            tags(&["forest"]),
        );
        institution.cached_stance.insert("hunter".to_string(), 0.8);

        institution.refresh(&[&entity], &config, 10.0);
        let stance = institution.stance("hunter");
        // 0.9 * 0.8 plus a small negative drift term.
        assert!(stance > 0.6);
        assert!(stance < 0.72);
    }

    #[test]
    fn non_constituents_are_ignored() {
        let config = AffinityConfig::default();
        let entity = grove_with_fire_memory();

        let mut institution = Institution::new(
            EntityId::from("miners_guild"),
            "Miners' Guild",
            tags(&["mountain"]),
        );
        institution.observe_tag("hunter");
        institution.refresh(&[&entity], &config, 10.0);

        assert!(institution.stance("hunter").abs() < f64::EPSILON);
    }

    #[test]
    fn stances_decay_between_refreshes() {
        let config = AffinityConfig::default();
        let mut institution = Institution::new(
            EntityId::from("rangers_guild"),
            "Rangers' Guild",
            tags(&["forest"]),
        );
        institution.cached_stance.insert("hunter".to_string(), -0.6);

        // One institutional half-life (90 days).
        institution.decay_stances(&config, 90.0 * SECONDS_PER_DAY);
        let stance = institution.stance("hunter");
        assert!((stance - (-0.3)).abs() < 1e-9);
    }

    #[test]
    fn stance_survives_constituent_destruction() {
        let config = AffinityConfig::default();
        let mut institution = Institution::new(
            EntityId::from("rangers_guild"),
            "Rangers' Guild",
            tags(&["forest"]),
        );
        institution.cached_stance.insert("hunter".to_string(), -0.6);

        // Refresh with no constituents left: drift pulls a tenth toward
        // zero, the rest persists.
        institution.refresh(&[], &config, 10.0);
        let stance = institution.stance("hunter");
        assert!((stance - (-0.54)).abs() < 1e-9);
    }

    #[test]
    fn bias_sums_over_tags_and_institutions() {
        let mut a = Institution::new(EntityId::from("a"), "A", tags(&["forest"]));
        a.cached_stance.insert("hunter".to_string(), -0.2);
        let mut b = Institution::new(EntityId::from("b"), "B", tags(&["river"]));
        b.cached_stance.insert("hunter".to_string(), 0.05);
        b.cached_stance.insert("human".to_string(), 0.1);

        let bias = stance_bias(&[&a, &b], &tags(&["hunter", "human"]));
        assert!((bias - (-0.05)).abs() < 1e-9);
    }
}
