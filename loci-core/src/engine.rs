//! The affinity engine: registries, locking, and the host-facing surface.
//!
//! One process-wide value owns the entity and institution registries, the
//! config handle, the clock, and the append-only trigger log. Each
//! memory-bearing entity sits behind its own `parking_lot::Mutex`; no
//! cross-entity lock is held simultaneously, and institutions query
//! entities one at a time. The world tick walks entities in turn and never
//! blocks event logging globally.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{info, warn};

use crate::admin::{inspect, reeval, why, InspectReport, WhyReport};
use crate::affordance::{
    evaluate_affordances, AffordanceKind, AffordanceOutcome, AffordanceRegistry,
    EvaluationRequest, ForcedMode,
};
use crate::clock::{Clock, SystemClock};
use crate::compaction::{compact_traces, CompactionReport};
use crate::config::{AffinityConfig, ConfigHandle};
use crate::entity::Entity;
use crate::error::{AffinityError, Result};
use crate::event::AffinityEvent;
use crate::institution::{stance_bias, Institution};
use crate::snapshot::{replay, AffordanceSnapshot, AffordanceTriggerLog, ReplayResult};
use crate::store::{log_event, LogReport};
use crate::tick::{world_tick, TickReport};
use crate::types::{ActorId, EntityId, TriggerId};

/// The process-wide affinity engine.
pub struct AffinityEngine {
    config: ConfigHandle,
    clock: Arc<dyn Clock>,
    registry: AffordanceRegistry,
    entities: RwLock<HashMap<EntityId, Arc<Mutex<Entity>>>>,
    institutions: RwLock<HashMap<EntityId, Arc<Mutex<Institution>>>>,
    trigger_log: Mutex<Vec<AffordanceTriggerLog>>,
    snapshots: Mutex<HashMap<TriggerId, AffordanceSnapshot>>,
}

impl AffinityEngine {
    /// Build an engine with the standard affordance catalog and the system
    /// clock.
    ///
    /// # Errors
    /// Returns a validation error if the configuration or the affordance
    /// catalog is invalid. Fatal at startup.
    pub fn new(config: AffinityConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Build an engine with a caller-supplied clock (tests use
    /// [`crate::ManualClock`]).
    ///
    /// # Errors
    /// Returns a validation error if the configuration or the affordance
    /// catalog is invalid.
    pub fn with_clock(config: AffinityConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        Ok(Self {
            config: ConfigHandle::new(config)?,
            clock,
            registry: AffordanceRegistry::standard()?,
            entities: RwLock::new(HashMap::new()),
            institutions: RwLock::new(HashMap::new()),
            trigger_log: Mutex::new(Vec::new()),
            snapshots: Mutex::new(HashMap::new()),
        })
    }

    /// The live configuration handle (for hot reload).
    #[must_use]
    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    /// Register an entity. Replaces any previous entity under the same id.
    pub fn insert_entity(&self, entity: Entity) {
        let id = entity.id().clone();
        info!(entity = %id, "registered entity");
        self.entities
            .write()
            .insert(id, Arc::new(Mutex::new(entity)));
    }

    /// Remove an entity (admin-only; places are otherwise never destroyed).
    pub fn remove_entity(&self, entity_id: &EntityId) -> bool {
        self.entities.write().remove(entity_id).is_some()
    }

    /// Register an institution.
    pub fn insert_institution(&self, institution: Institution) {
        let id = institution.id.clone();
        self.institutions
            .write()
            .insert(id, Arc::new(Mutex::new(institution)));
    }

    fn entity_handle(&self, entity_id: &EntityId) -> Result<Arc<Mutex<Entity>>> {
        self.entities
            .read()
            .get(entity_id)
            .cloned()
            .ok_or_else(|| AffinityError::UnknownEntity(entity_id.clone()))
    }

    /// Run a closure under one entity's lock.
    ///
    /// # Errors
    /// Returns [`AffinityError::UnknownEntity`] for unregistered ids.
    pub fn with_entity<T>(&self, entity_id: &EntityId, f: impl FnOnce(&mut Entity) -> T) -> Result<T> {
        let handle = self.entity_handle(entity_id)?;
        let mut entity = handle.lock();
        Ok(f(&mut entity))
    }

    /// Report an event to its located entity. Updates one personal entry,
    /// one group entry per actor tag, and one behavior entry atomically.
    ///
    /// # Errors
    /// Returns [`AffinityError::UnknownEntity`] for unregistered ids; no
    /// mutation occurs.
    pub fn log_event(&self, entity_id: &EntityId, event: &AffinityEvent) -> Result<LogReport> {
        let config = self.config.load();
        self.with_entity(entity_id, |entity| {
            let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
            let scar_half_life =
                config.compaction.scar_half_life_days * crate::clock::SECONDS_PER_DAY;
            let saturation = *entity.saturation();
            match entity.channels_mut() {
                Some(channels) => {
                    log_event(channels, &saturation, event, &half_lives, scar_half_life)
                }
                None => LogReport {
                    personal_created: false,
                    group_touched: 0,
                    personal_effective_intensity: 0.0,
                },
            }
        })
    }

    /// Institutional stance bias toward an actor at an entity: the summed
    /// stance of every institution the entity is affiliated with, over the
    /// actor's tags.
    fn institutional_bias_for(&self, entity: &Entity, actor_tags: &BTreeSet<String>) -> f64 {
        let institutions = self.institutions.read();
        let mut bias = 0.0;
        for handle in institutions.values() {
            let institution = handle.lock();
            if institution.is_constituent(entity) {
                bias += stance_bias(&[&*institution], actor_tags);
            }
        }
        bias
    }

    /// Evaluate affordances for an actor acting at an entity.
    ///
    /// # Errors
    /// Returns [`AffinityError::UnknownEntity`] for unregistered ids.
    pub fn evaluate(&self, entity_id: &EntityId, request: &EvaluationRequest) -> Result<AffordanceOutcome> {
        let config = self.config.load();
        let handle = self.entity_handle(entity_id)?;
        let outcome = {
            let mut entity = handle.lock();
            let mut request = request.clone();
            request.institutional_bias = self.institutional_bias_for(&entity, &request.actor_tags);
            evaluate_affordances(&mut entity, &self.registry, &config, &request)
        };

        self.trigger_log.lock().push(outcome.trace.clone());
        self.snapshots
            .lock()
            .insert(outcome.snapshot.trigger_id, outcome.snapshot.clone());
        Ok(outcome)
    }

    /// Run the world tick over every entity, acquiring each lock in turn.
    pub fn world_tick_all(&self) -> Vec<TickReport> {
        let config = self.config.load();
        let now = self.clock.now();
        let handles: Vec<Arc<Mutex<Entity>>> = self.entities.read().values().cloned().collect();

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            let mut entity = handle.lock();
            reports.push(world_tick(&mut entity, &config, now));
        }
        reports
    }

    /// Run compaction over every entity.
    pub fn compact_all(&self) -> Vec<CompactionReport> {
        let config = self.config.load();
        let now = self.clock.now();
        let handles: Vec<Arc<Mutex<Entity>>> = self.entities.read().values().cloned().collect();

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            let mut entity = handle.lock();
            reports.push(compact_traces(&mut entity, &config, now));
        }
        reports
    }

    /// Refresh every institution whose refresh interval has elapsed, and
    /// decay cached stances for the time since the last refresh.
    pub fn refresh_institutions(&self) {
        let config = self.config.load();
        let now = self.clock.now();
        let institution_handles: Vec<Arc<Mutex<Institution>>> =
            self.institutions.read().values().cloned().collect();
        let entity_handles: Vec<Arc<Mutex<Entity>>> =
            self.entities.read().values().cloned().collect();

        for handle in institution_handles {
            // Check due-ness and capture the affiliation set without
            // keeping the institution lock across entity locks.
            let affiliated = {
                let institution = handle.lock();
                if !institution.refresh_due(&config, now) {
                    continue;
                }
                institution.affiliated_tags.clone()
            };

            // Snapshot constituents one at a time; no cross-entity lock is
            // held while another entity is queried.
            let mut constituents = Vec::new();
            for entity_handle in &entity_handles {
                let entity = entity_handle.lock();
                let affiliated_entity = entity
                    .affiliation_tags()
                    .is_some_and(|tags| tags.intersection(&affiliated).next().is_some());
                if affiliated_entity {
                    constituents.push(entity.clone());
                }
            }

            let mut institution = handle.lock();
            let elapsed = now - institution.last_computed;
            institution.decay_stances(&config, elapsed);
            let refs: Vec<&Entity> = constituents.iter().collect();
            institution.refresh(&refs, &config, now);
        }
    }

    // -----------------------------------------------------------------
    // Admin surface
    // -----------------------------------------------------------------

    /// `inspect(entity)` for a privileged caller.
    ///
    /// # Errors
    /// Returns [`AffinityError::UnknownEntity`] for unregistered ids.
    pub fn admin_inspect(
        &self,
        entity_id: &EntityId,
        actor_id: &ActorId,
        actor_tags: &BTreeSet<String>,
    ) -> Result<InspectReport> {
        let config = self.config.load();
        let now = self.clock.now();
        self.with_entity(entity_id, |entity| {
            inspect(entity, actor_id, actor_tags, &config, now)
        })
    }

    /// `why(entity, actor)` for a privileged caller.
    ///
    /// # Errors
    /// Returns [`AffinityError::UnknownEntity`] for unregistered ids.
    pub fn admin_why(
        &self,
        entity_id: &EntityId,
        actor_id: &ActorId,
        actor_tags: &BTreeSet<String>,
    ) -> Result<WhyReport> {
        let config = self.config.load();
        let now = self.clock.now();
        self.with_entity(entity_id, |entity| {
            why(entity, actor_id, actor_tags, &config, now)
        })
    }

    /// `history(entity, hours)`: recent trigger logs for an entity.
    #[must_use]
    pub fn admin_history(&self, entity_id: &EntityId, hours: f64) -> Vec<AffordanceTriggerLog> {
        let cutoff = self.clock.now() - hours * 3_600.0;
        self.trigger_log
            .lock()
            .iter()
            .filter(|log| log.entity_id == *entity_id && log.timestamp >= cutoff)
            .cloned()
            .collect()
    }

    /// `replay(trigger_id)`: re-derive a trigger from its snapshot and
    /// verify bit-exact agreement.
    ///
    /// # Errors
    /// Returns [`AffinityError::UnknownTrigger`] for unknown ids and
    /// [`AffinityError::SnapshotMismatch`] on verification failure.
    pub fn admin_replay(&self, trigger_id: TriggerId) -> Result<ReplayResult> {
        let snapshot = self
            .snapshots
            .lock()
            .get(&trigger_id)
            .cloned()
            .ok_or(AffinityError::UnknownTrigger(trigger_id))?;
        let result = replay(&snapshot);
        if let Err(AffinityError::SnapshotMismatch { recomputed, stored, .. }) = &result {
            warn!(trigger = %trigger_id, recomputed, stored, "snapshot mismatch on replay");
        }
        result
    }

    /// `reeval(entity, actor)`: affinity against current live traces.
    ///
    /// # Errors
    /// Returns [`AffinityError::UnknownEntity`] for unregistered ids.
    pub fn admin_reeval(
        &self,
        entity_id: &EntityId,
        actor_id: &ActorId,
        actor_tags: &BTreeSet<String>,
    ) -> Result<f64> {
        let config = self.config.load();
        let now = self.clock.now();
        self.with_entity(entity_id, |entity| {
            reeval(entity, actor_id, actor_tags, &config, now)
        })
    }

    /// `toggle(entity, affordance, on|off)`: disable or re-enable one
    /// affordance for one entity.
    ///
    /// # Errors
    /// Returns [`AffinityError::UnknownEntity`] for unregistered ids.
    pub fn admin_toggle(
        &self,
        entity_id: &EntityId,
        kind: AffordanceKind,
        enabled: bool,
    ) -> Result<()> {
        self.with_entity(entity_id, |entity| {
            if enabled {
                entity.disabled_affordances_mut().remove(&kind);
            } else {
                entity.disabled_affordances_mut().insert(kind);
            }
        })
    }

    /// `test(entity, affordance, hostile|favorable)`: force one trigger for
    /// content testing. Does not consume real cooldowns.
    ///
    /// # Errors
    /// Returns [`AffinityError::UnknownEntity`] for unregistered ids.
    pub fn admin_test(
        &self,
        entity_id: &EntityId,
        kind: AffordanceKind,
        mode: ForcedMode,
        actor_id: &ActorId,
        actor_tags: &BTreeSet<String>,
    ) -> Result<AffordanceOutcome> {
        let action_type = match kind {
            AffordanceKind::Pathing | AffordanceKind::MisleadingNavigation => "move.pass",
            AffordanceKind::SpellSideEffects => "magic.test",
            AffordanceKind::ResourceScarcity | AffordanceKind::LootQuality => "extract.test",
            AffordanceKind::RestQuality => "heal.rest",
            _ => "social.test",
        };
        let mut request = EvaluationRequest::new(
            actor_id.clone(),
            actor_tags.clone(),
            action_type,
            self.clock.now(),
        );
        request.force = Some((kind, mode));
        if kind == AffordanceKind::MisleadingNavigation {
            // Give the redirect somewhere to go; content testers only need
            // to see the tell fire.
            request.action_type = "move.wander".to_string();
            request.adjacent_rooms = vec![entity_id.clone()];
        }
        self.evaluate(entity_id, &request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SECONDS_PER_DAY};
    use crate::entity::Location;
    use crate::valuation::ValuationProfile;

    fn tags(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn engine_with_forest() -> (AffinityEngine, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(10.0 * SECONDS_PER_DAY));
        let engine =
            AffinityEngine::with_clock(AffinityConfig::default(), clock.clone()).expect("engine");
        engine.insert_entity(Entity::Location(Location::new(
            EntityId::from("whispering_woods"),
            "The Whispering Woods",
            ValuationProfile::from_pairs(&[("harm.fire", -0.8), ("offer.gift", 0.5)]),
        )));
        (engine, clock)
    }

    fn fire_event(clock: &ManualClock) -> AffinityEvent {
        AffinityEvent::new(
            "harm.fire",
            ActorId::from("player_0042"),
            tags(&["human", "hunter", "outsider"]),
            EntityId::from("whispering_woods"),
            0.6,
            clock.now(),
        )
    }

    #[test]
    fn unknown_entity_surfaces_without_mutation() {
        let (engine, clock) = engine_with_forest();
        let result = engine.log_event(&EntityId::from("nowhere"), &fire_event(&clock));
        assert!(matches!(result, Err(AffinityError::UnknownEntity(_))));
    }

    #[test]
    fn event_then_evaluate_round_trip() {
        let (engine, clock) = engine_with_forest();
        let woods = EntityId::from("whispering_woods");

        engine.log_event(&woods, &fire_event(&clock)).expect("log");

        let request = EvaluationRequest::new(
            ActorId::from("player_0042"),
            tags(&["human", "hunter", "outsider"]),
            "move.pass",
            clock.now(),
        );
        let outcome = engine.evaluate(&woods, &request).expect("evaluate");
        assert!(outcome.triggered);
        assert!(outcome.adjustments.contains_key("room.travel_time_modifier"));

        // The trigger is retrievable through history and replay.
        let history = engine.admin_history(&woods, 1.0);
        assert_eq!(history.len(), 1);
        let replayed = engine
            .admin_replay(history[0].trigger_id)
            .expect("replay");
        assert_eq!(replayed.adjustments, outcome.adjustments);
    }

    #[test]
    fn toggle_silences_an_affordance() {
        let (engine, clock) = engine_with_forest();
        let woods = EntityId::from("whispering_woods");
        engine.log_event(&woods, &fire_event(&clock)).expect("log");

        engine
            .admin_toggle(&woods, AffordanceKind::Pathing, false)
            .expect("toggle");

        let request = EvaluationRequest::new(
            ActorId::from("player_0042"),
            tags(&["human", "hunter", "outsider"]),
            "move.pass",
            clock.now(),
        );
        let outcome = engine.evaluate(&woods, &request).expect("evaluate");
        assert!(!outcome.triggered);
    }

    #[test]
    fn forced_test_trigger_fires() {
        let (engine, _clock) = engine_with_forest();
        let woods = EntityId::from("whispering_woods");

        let outcome = engine
            .admin_test(
                &woods,
                AffordanceKind::Pathing,
                ForcedMode::Favorable,
                &ActorId::from("builder_01"),
                &tags(&["human"]),
            )
            .expect("test trigger");
        assert!(outcome.triggered);
        let modifier = outcome
            .adjustments
            .get("room.travel_time_modifier")
            .expect("adjustment");
        assert!(*modifier < 0.0);
    }

    #[test]
    fn tick_all_visits_every_entity() {
        let (engine, _clock) = engine_with_forest();
        engine.insert_entity(Entity::Location(Location::new(
            EntityId::from("dark_hollow"),
            "Dark Hollow",
            ValuationProfile::default(),
        )));

        let reports = engine.world_tick_all();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|report| report.ticked));
    }

    #[test]
    fn institutional_bias_feeds_evaluation() {
        let clock = Arc::new(ManualClock::new(10.0 * SECONDS_PER_DAY));
        let mut config = AffinityConfig::default();
        config.channel_weights.institutional = 0.15;
        let engine = AffinityEngine::with_clock(config, clock).expect("engine");

        let mut location = Location::new(
            EntityId::from("guild_hall"),
            "Guild Hall",
            ValuationProfile::default(),
        );
        location.tags = tags(&["guild"]);
        engine.insert_entity(Entity::Location(location));

        let mut institution = Institution::new(
            EntityId::from("merchants_guild"),
            "Merchants' Guild",
            tags(&["guild"]),
        );
        institution
            .cached_stance
            .insert("outsider".to_string(), -1.0);
        engine.insert_institution(institution);

        let request = EvaluationRequest::new(
            ActorId::from("player_0042"),
            tags(&["outsider"]),
            "social.chat",
            10.0 * SECONDS_PER_DAY,
        );
        let outcome = engine
            .evaluate(&EntityId::from("guild_hall"), &request)
            .expect("evaluate");

        // No local traces at all; the whole affinity is institutional.
        assert!((outcome.snapshot.computed_affinity - (-0.15_f64).tanh()).abs() < 1e-12);
    }

    #[test]
    fn replay_of_unknown_trigger_errors() {
        let (engine, _clock) = engine_with_forest();
        let result = engine.admin_replay(TriggerId::new());
        assert!(matches!(result, Err(AffinityError::UnknownTrigger(_))));
    }
}
