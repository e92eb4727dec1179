//! The affordance evaluation pipeline.
//!
//! Single public evaluator: affinity → candidate selection by action type →
//! threshold → cooldown → severity clamp → tells → snapshot → outcome.
//! Movement (`move.pass`) is single-primary-effect: only the pathing
//! affordance is evaluated, so a re-entered movement check cannot
//! double-fire.
//!
//! The pipeline is deterministic. The only roll (the misleading-navigation
//! redirect) and every tell choice derive from a seed hashed from the
//! actor, entity, and timestamp; the seed is frozen into the snapshot so
//! replay reproduces the outcome exactly.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use tracing::debug;

use crate::affinity::compute_affinity_with_bias;
use crate::affordance::registry::{
    AffordanceDef, AffordanceEffect, AffordanceKind, AffordanceRegistry, ConditionRule,
};
use crate::affordance::tells;
use crate::clock::{Timestamp, SECONDS_PER_DAY};
use crate::config::AffinityConfig;
use crate::cooldown::cooldown_token;
use crate::entity::Entity;
use crate::event::event_category;
use crate::snapshot::{top_contributions, AffordanceSnapshot, AffordanceTriggerLog};
use crate::types::{ActorId, EntityId, ThresholdBand, TriggerId};

/// How many contributing traces the trigger log keeps.
const TOP_TRACES: usize = 10;

/// Admin override: force the next evaluation of one affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedMode {
    /// Evaluate as if deeply hostile.
    Hostile,
    /// Evaluate as if deeply favorable.
    Favorable,
}

/// Input to affordance evaluation.
#[derive(Debug, Clone)]
pub struct EvaluationRequest {
    /// Who is acting.
    pub actor_id: ActorId,
    /// The actor's tags.
    pub actor_tags: BTreeSet<String>,
    /// Dotted action type, e.g. `move.pass`, `magic.fire`.
    pub action_type: String,
    /// Optional action target.
    pub action_target: Option<String>,
    /// Adjacent rooms, needed by the misleading-navigation redirect.
    pub adjacent_rooms: Vec<EntityId>,
    /// Evaluation time.
    pub timestamp: Timestamp,
    /// Institutional stance bias entering the affinity blend.
    pub institutional_bias: f64,
    /// Admin force override for one affordance.
    pub force: Option<(AffordanceKind, ForcedMode)>,
}

impl EvaluationRequest {
    /// A plain evaluation with no adjacency, bias, or override.
    #[must_use]
    pub fn new(
        actor_id: ActorId,
        actor_tags: BTreeSet<String>,
        action_type: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            actor_id,
            actor_tags,
            action_type: action_type.into(),
            action_target: None,
            adjacent_rooms: Vec::new(),
            timestamp,
            institutional_bias: 0.0,
            force: None,
        }
    }
}

/// Output of affordance evaluation.
#[derive(Debug, Clone)]
pub struct AffordanceOutcome {
    /// Mechanical adjustments keyed by handle name. At most two per
    /// triggered affordance.
    pub adjustments: BTreeMap<String, f64>,
    /// Narrative tells in evaluation order.
    pub tells: Vec<String>,
    /// Admin trigger log.
    pub trace: AffordanceTriggerLog,
    /// Frozen state for deterministic replay.
    pub snapshot: AffordanceSnapshot,
    /// Cooldown tokens consumed by this evaluation.
    pub cooldowns_consumed: Vec<String>,
    /// Whether anything fired.
    pub triggered: bool,
    /// Redirect destination from misleading navigation, if any.
    pub redirect_target: Option<EntityId>,
}

/// Scale severity by how far past the threshold the affinity sits,
/// linearly from the threshold to the relevant extreme.
#[must_use]
pub fn scale_severity(affinity: f64, clamp: f64, threshold: f64) -> f64 {
    if clamp == 0.0 {
        return 0.0;
    }
    let range = if threshold < 0.0 {
        -1.0 - threshold
    } else {
        1.0 - threshold
    };
    if range == 0.0 {
        return clamp;
    }
    let position = ((affinity - threshold) / range).clamp(0.0, 1.0);
    clamp * position
}

// FNV-1a. Stable across processes and platforms, unlike the std hasher,
// which would break replay of persisted snapshots.
fn fnv1a(bytes: impl IntoIterator<Item = u8>, seed: u64) -> u64 {
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = seed;
    for byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

fn derive_seed(actor: &ActorId, entity: &EntityId, timestamp: Timestamp) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    let hash = fnv1a(actor.as_str().bytes(), OFFSET_BASIS);
    let hash = fnv1a(entity.as_str().bytes(), hash);
    fnv1a(timestamp.to_bits().to_le_bytes(), hash)
}

fn salted(seed: u64, salt: &str) -> u64 {
    fnv1a(salt.bytes(), seed)
}

fn unit_roll(seed: u64) -> f64 {
    // 53 mantissa bits into [0, 1).
    (seed >> 11) as f64 / (1u64 << 53) as f64
}

fn effect_label(kind: AffordanceKind, hostile: bool) -> &'static str {
    match (kind, hostile) {
        (AffordanceKind::Pathing, true) => "slow",
        (AffordanceKind::Pathing, false) => "swift",
        (AffordanceKind::EncounterBias, true) => "dangerous",
        (AffordanceKind::EncounterBias, false) => "peaceful",
        (AffordanceKind::ResourceScarcity, true) => "scarce",
        (AffordanceKind::ResourceScarcity, false) => "abundant",
        (AffordanceKind::SpellSideEffects, true) => "dampened",
        (AffordanceKind::SpellSideEffects, false) => "amplified",
        (AffordanceKind::RestQuality, true) => "restless",
        (AffordanceKind::RestQuality, false) => "restorative",
        (AffordanceKind::LootQuality, true) => "poor",
        (AffordanceKind::LootQuality, false) => "rich",
        (AffordanceKind::WeatherMicroclimate, true) => "harsh",
        (AffordanceKind::WeatherMicroclimate, false) => "mild",
        (AffordanceKind::AnimalMessengers, true) => "ominous",
        (AffordanceKind::AnimalMessengers, false) => "auspicious",
        (AffordanceKind::MisleadingNavigation, _) => "redirect",
        (AffordanceKind::AmbientMessaging, _) => "ambient",
    }
}

struct CandidateResult {
    adjustments: BTreeMap<String, f64>,
    tells: Vec<String>,
    effect: Option<&'static str>,
    redirect: Option<EntityId>,
}

impl CandidateResult {
    fn empty() -> Self {
        Self {
            adjustments: BTreeMap::new(),
            tells: Vec::new(),
            effect: None,
            redirect: None,
        }
    }

    fn fired(&self) -> bool {
        !self.adjustments.is_empty() || !self.tells.is_empty() || self.redirect.is_some()
    }
}

#[allow(clippy::too_many_lines)]
fn evaluate_candidate(
    def: &AffordanceDef,
    entity: &Entity,
    request: &EvaluationRequest,
    affinity: f64,
    seed: u64,
) -> CandidateResult {
    let mut result = CandidateResult::empty();
    let forced = matches!(request.force, Some((kind, _)) if kind == def.kind);
    let effective_affinity = match request.force {
        Some((kind, ForcedMode::Hostile)) if kind == def.kind => -0.85,
        Some((kind, ForcedMode::Favorable)) if kind == def.kind => 0.85,
        _ => affinity,
    };

    let is_hostile = effective_affinity < def.hostile_threshold;
    let is_favorable = effective_affinity > def.favorable_threshold;
    let tell_seed = salted(seed, def.kind.as_str());

    match &def.effect {
        AffordanceEffect::Scaled { handle } => {
            if is_hostile {
                let severity =
                    scale_severity(effective_affinity, def.hostile_clamp, def.hostile_threshold);
                result.adjustments.insert((*handle).to_string(), severity);
                if let Some(tell) = tells::pick(tells::hostile_tells(def.kind), tell_seed) {
                    result.tells.push(tell.to_string());
                }
                result.effect = Some(effect_label(def.kind, true));
            } else if is_favorable {
                let severity = scale_severity(
                    effective_affinity,
                    def.favorable_clamp,
                    def.favorable_threshold,
                );
                result.adjustments.insert((*handle).to_string(), severity);
                if let Some(tell) = tells::pick(tells::favorable_tells(def.kind), tell_seed) {
                    result.tells.push(tell.to_string());
                }
                result.effect = Some(effect_label(def.kind, false));
            }
        }
        AffordanceEffect::ScaledPair {
            primary,
            secondary,
            secondary_hostile_ratio,
            secondary_favorable_ratio,
        } => {
            if is_hostile || is_favorable {
                let (clamp, threshold, ratio) = if is_hostile {
                    (def.hostile_clamp, def.hostile_threshold, secondary_hostile_ratio)
                } else {
                    (
                        def.favorable_clamp,
                        def.favorable_threshold,
                        secondary_favorable_ratio,
                    )
                };
                let severity = scale_severity(effective_affinity, clamp, threshold);
                result.adjustments.insert((*primary).to_string(), severity);
                result
                    .adjustments
                    .insert((*secondary).to_string(), severity * ratio);
                let table = if is_hostile {
                    tells::hostile_tells(def.kind)
                } else {
                    tells::favorable_tells(def.kind)
                };
                if let Some(tell) = tells::pick(table, tell_seed) {
                    result.tells.push(tell.to_string());
                }
                result.effect = Some(effect_label(def.kind, is_hostile));
            }
        }
        AffordanceEffect::SpellCast {
            power,
            backfire,
            hostile_backfire,
            favorable_backfire,
        } => {
            if is_hostile || is_favorable {
                // School aversion stacks on top of the base clamp in both
                // directions: the land hates fire even when it likes you.
                let (mut power_penalty, mut backfire_penalty) = (0.0, 0.0);
                if let Some(ConditionRule::SchoolAversion {
                    school,
                    valuation_event,
                    below,
                    power_penalty: extra_power,
                    backfire_penalty: extra_backfire,
                }) = &def.condition
                {
                    let action_school = request.action_type.split_once('.').map(|(_, s)| s);
                    if action_school == Some(*school)
                        && entity.valuation().get(valuation_event) < *below
                    {
                        power_penalty = *extra_power;
                        backfire_penalty = *extra_backfire;
                    }
                }

                let (clamp, threshold, base_backfire) = if is_hostile {
                    (def.hostile_clamp, def.hostile_threshold, *hostile_backfire)
                } else {
                    (
                        def.favorable_clamp,
                        def.favorable_threshold,
                        *favorable_backfire,
                    )
                };
                let severity = scale_severity(effective_affinity, clamp, threshold);
                result
                    .adjustments
                    .insert((*power).to_string(), severity + power_penalty);
                result
                    .adjustments
                    .insert((*backfire).to_string(), base_backfire + backfire_penalty);
                let table = if is_hostile {
                    tells::hostile_tells(def.kind)
                } else {
                    tells::favorable_tells(def.kind)
                };
                if let Some(tell) = tells::pick(table, tell_seed) {
                    result.tells.push(tell.to_string());
                }
                result.effect = Some(effect_label(def.kind, is_hostile));
            }
        }
        AffordanceEffect::Redirect => {
            // Only strongly hostile places mislead, and only when there is
            // somewhere to mislead to.
            if is_hostile && !request.adjacent_rooms.is_empty() {
                let chance = scale_severity(
                    effective_affinity,
                    def.hostile_clamp,
                    def.hostile_threshold,
                );
                let roll = unit_roll(salted(seed, "redirect"));
                if forced || roll < chance {
                    let pick_seed = salted(seed, "redirect_target");
                    let index = (pick_seed % request.adjacent_rooms.len() as u64) as usize;
                    result.redirect = Some(request.adjacent_rooms[index].clone());
                    if let Some(tell) = tells::pick(tells::hostile_tells(def.kind), tell_seed) {
                        result.tells.push(tell.to_string());
                    }
                    result.effect = Some(effect_label(def.kind, true));
                }
            }
        }
        AffordanceEffect::AmbientLadder => {
            if let Some(layer) = tells::ambient_layer(effective_affinity) {
                if let Some(tell) = tells::pick(layer.tells, tell_seed) {
                    result.tells.push(tell.to_string());
                }
                result.effect = Some(layer.label);
            }
        }
        AffordanceEffect::FlavorOnly => {
            if is_hostile || is_favorable {
                let table = if is_hostile {
                    tells::hostile_tells(def.kind)
                } else {
                    tells::favorable_tells(def.kind)
                };
                if let Some(tell) = tells::pick(table, tell_seed) {
                    result.tells.push(tell.to_string());
                }
                result.effect = Some(effect_label(def.kind, is_hostile));
            }
        }
    }

    result
}

/// Evaluate every applicable affordance for an actor at an entity.
///
/// The caller holds the entity's lock; this function consumes cooldowns on
/// successful triggers but never touches trace state.
pub fn evaluate_affordances(
    entity: &mut Entity,
    registry: &AffordanceRegistry,
    config: &AffinityConfig,
    request: &EvaluationRequest,
) -> AffordanceOutcome {
    let now = request.timestamp;
    let entity_id = entity.id().clone();
    let seed = derive_seed(&request.actor_id, &entity_id, now);

    let affinity = compute_affinity_with_bias(
        entity,
        Some(&request.actor_id),
        &request.actor_tags,
        config,
        request.institutional_bias,
        now,
    );
    let threshold = ThresholdBand::from_affinity(affinity);

    let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
    let scar_half_life = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
    let contributions = entity.channels().map_or_else(Vec::new, |channels| {
        top_contributions(
            channels,
            &request.actor_id,
            &request.actor_tags,
            entity.valuation(),
            &half_lives,
            scar_half_life,
            &config.channel_weights,
            now,
            TOP_TRACES,
        )
    });

    let mut all_adjustments = BTreeMap::new();
    let mut all_tells = Vec::new();
    let mut cooldowns_consumed = Vec::new();
    let mut triggered = false;
    let mut triggered_affordance = None;
    let mut triggered_effect: Option<&'static str> = None;
    let mut redirect_target = None;

    // Movement is single-primary-effect: a `move.pass` check evaluates the
    // pathing affordance and nothing else.
    let movement_primary = request.action_type == "move.pass";
    let action_category = event_category(&request.action_type);

    for def in registry.defs() {
        if movement_primary && def.kind != AffordanceKind::Pathing {
            continue;
        }
        if let Some(category) = def.action_category {
            if category != action_category {
                continue;
            }
        }
        if !registry.is_enabled(def.kind) || entity.disabled_affordances().contains(&def.kind) {
            continue;
        }

        let forced = matches!(request.force, Some((kind, _)) if kind == def.kind);
        let token = cooldown_token(def.kind.as_str(), &request.actor_id, &entity_id);
        if !forced && def.cooldown_seconds > 0 && entity.cooldowns().is_active(&token, now) {
            continue;
        }

        let result = evaluate_candidate(def, entity, request, affinity, seed);
        if !result.fired() {
            continue;
        }

        if !forced && def.cooldown_seconds > 0 {
            entity
                .cooldowns_mut()
                .engage(token.clone(), now + def.cooldown_seconds as f64);
            cooldowns_consumed.push(token);
        }

        all_adjustments.extend(result.adjustments);
        all_tells.extend(result.tells);
        triggered = true;
        if result.effect.is_some() {
            triggered_affordance = Some(def.kind);
            triggered_effect = result.effect;
        }
        if result.redirect.is_some() {
            redirect_target = result.redirect;
        }

        if movement_primary {
            break;
        }
    }

    let severity = all_adjustments.values().next().copied().unwrap_or(0.0);
    let trigger_id = TriggerId::new();

    let trace = AffordanceTriggerLog {
        trigger_id,
        timestamp: now,
        recorded_at: Utc::now(),
        entity_id: entity_id.clone(),
        actor_id: request.actor_id.clone(),
        affordance: triggered_affordance,
        effect_applied: triggered_effect.map(str::to_string),
        severity,
        contributing_traces: contributions,
        computed_affinity: affinity,
        threshold,
    };

    let snapshot = AffordanceSnapshot {
        trigger_id,
        actor_id: request.actor_id.clone(),
        actor_tags: request.actor_tags.clone(),
        entity_id,
        eval_time: now,
        channels: entity.channels().cloned().unwrap_or_default(),
        valuation: entity.valuation().clone(),
        half_lives_seconds: half_lives,
        scar_half_life_seconds: scar_half_life,
        weights: config.channel_weights,
        affinity_scale: config.affinity_scale,
        institutional_bias: request.institutional_bias,
        random_seed: seed,
        computed_affinity: affinity,
        threshold,
        affordance_triggered: triggered_affordance,
        effect_applied: triggered_effect.map(str::to_string),
        final_adjustments: all_adjustments.clone(),
        final_tells: all_tells.clone(),
        final_redirect_target: redirect_target.clone(),
    };

    debug!(
        entity = %snapshot.entity_id,
        actor = %request.actor_id,
        action = %request.action_type,
        affinity,
        triggered,
        "evaluated affordances"
    );

    AffordanceOutcome {
        adjustments: all_adjustments,
        tells: all_tells,
        trace,
        snapshot,
        cooldowns_consumed,
        triggered,
        redirect_target,
    }
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

    fn forest() -> Entity {
        Entity::Location(Location::new(
            EntityId::from("whispering_woods"),
            "The Whispering Woods",
            ValuationProfile::from_pairs(&[
                ("harm", -0.15),
                ("harm.fire", -0.8),
                ("extract.hunt", -0.4),
                ("offer.gift", 0.5),
            ]),
        ))
    }

    fn burn(entity: &mut Entity, intensity: f64, timestamp: f64) {
        let config = AffinityConfig::default();
        let half_lives = config.half_lives.for_kind(entity.kind()).in_seconds();
        let scar = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
        let saturation = *entity.saturation();
        let event = AffinityEvent::new(
            "harm.fire",
            ActorId::from("player_0042"),
            tags(&["human", "hunter", "outsider"]),
            EntityId::from("whispering_woods"),
            intensity,
            timestamp,
        );
        let channels = entity.channels_mut().expect("channels");
        log_event(channels, &saturation, &event, &half_lives, scar);
    }

    fn move_request(timestamp: f64) -> EvaluationRequest {
        EvaluationRequest::new(
            ActorId::from("player_0042"),
            tags(&["human", "hunter", "outsider"]),
            "move.pass",
            timestamp,
        )
    }

    #[test]
    fn hostile_forest_slows_travelers() {
        let mut entity = forest();
        burn(&mut entity, 0.6, 0.0);

        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();
        let outcome =
            evaluate_affordances(&mut entity, &registry, &config, &move_request(10.0));

        assert!(outcome.triggered);
        let slow = outcome
            .adjustments
            .get("room.travel_time_modifier")
            .expect("travel time adjustment");
        assert!(*slow > 0.0);
        assert!(*slow <= 0.5);
        assert_eq!(outcome.adjustments.len(), 1);
        assert!(!outcome.tells.is_empty());
    }

    #[test]
    fn neutral_forest_is_a_no_op() {
        let mut entity = forest();
        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();

        let outcome =
            evaluate_affordances(&mut entity, &registry, &config, &move_request(10.0));

        assert!(!outcome.triggered);
        assert!(outcome.adjustments.is_empty());
        assert!(outcome.tells.is_empty());
        assert_eq!(outcome.trace.threshold, ThresholdBand::Neutral);
    }

    #[test]
    fn movement_is_single_primary_effect() {
        let mut entity = forest();
        burn(&mut entity, 1.0, 0.0);
        burn(&mut entity, 1.0, 1.0);

        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();
        let mut request = move_request(10.0);
        request.adjacent_rooms = vec![EntityId::from("dark_hollow")];

        let outcome = evaluate_affordances(&mut entity, &registry, &config, &request);

        // Only pathing may fire on move.pass, however hostile the place is.
        assert!(outcome.triggered);
        assert!(outcome.adjustments.contains_key("room.travel_time_modifier"));
        assert_eq!(outcome.adjustments.len(), 1);
        assert!(outcome.redirect_target.is_none());
        assert_eq!(outcome.cooldowns_consumed.len(), 1);
    }

    #[test]
    fn cooldown_blocks_immediate_retrigger() {
        let mut entity = forest();
        burn(&mut entity, 0.6, 0.0);

        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();

        let first = evaluate_affordances(&mut entity, &registry, &config, &move_request(10.0));
        assert!(first.triggered);
        assert!(!first.cooldowns_consumed.is_empty());

        let second = evaluate_affordances(&mut entity, &registry, &config, &move_request(11.0));
        assert!(!second.triggered);
        assert!(second.adjustments.is_empty());

        // Past the one-hour pathing cooldown it may fire again.
        let third =
            evaluate_affordances(&mut entity, &registry, &config, &move_request(10.0 + 3_601.0));
        assert!(third.triggered);
    }

    #[test]
    fn outcome_never_exceeds_two_handles_per_affordance() {
        let mut entity = forest();
        burn(&mut entity, 1.0, 0.0);

        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();
        let request = EvaluationRequest::new(
            ActorId::from("player_0042"),
            tags(&["human", "hunter", "outsider"]),
            "magic.fire",
            10.0,
        );

        let outcome = evaluate_affordances(&mut entity, &registry, &config, &request);
        assert!(outcome.triggered);
        // spell (2 handles) + encounter_bias (2) + ambient/weather/animal
        // tells; each individual affordance stays within two.
        assert!(outcome.adjustments.len() <= 4);
    }

    #[test]
    fn fire_magic_in_fire_hating_forest_stacks_penalties() {
        let mut entity = forest();
        // Mild hostility: a modest burn, evaluated promptly.
        burn(&mut entity, 0.35, 0.0);

        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();
        let request = EvaluationRequest::new(
            ActorId::from("player_0042"),
            tags(&["human", "hunter", "outsider"]),
            "magic.fire",
            10.0,
        );

        let outcome = evaluate_affordances(&mut entity, &registry, &config, &request);
        assert!(outcome.triggered);

        let power = outcome
            .adjustments
            .get("spell.power_modifier")
            .expect("power modifier");
        let backfire = outcome
            .adjustments
            .get("spell.backfire_chance")
            .expect("backfire chance");
        // Base hostile clamp is -0.25; the fire aversion adds -0.15 more.
        assert!(*power < -0.15);
        assert!(*power >= -0.4);
        // Base backfire 0.1 plus the aversion increment 0.1.
        assert!((*backfire - 0.2).abs() < 1e-9);
    }

    #[test]
    fn earth_magic_takes_no_fire_penalty() {
        let mut entity = forest();
        burn(&mut entity, 0.35, 0.0);

        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();
        let request = EvaluationRequest::new(
            ActorId::from("player_0042"),
            tags(&["human", "hunter", "outsider"]),
            "magic.earth",
            10.0,
        );

        let outcome = evaluate_affordances(&mut entity, &registry, &config, &request);
        let backfire = outcome
            .adjustments
            .get("spell.backfire_chance")
            .expect("backfire chance");
        assert!((*backfire - 0.1).abs() < 1e-9);
    }

    #[test]
    fn forced_trigger_ignores_actual_affinity() {
        let mut entity = forest();
        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();

        let mut request = move_request(10.0);
        request.force = Some((AffordanceKind::Pathing, ForcedMode::Hostile));

        let outcome = evaluate_affordances(&mut entity, &registry, &config, &request);
        assert!(outcome.triggered);
        let slow = outcome
            .adjustments
            .get("room.travel_time_modifier")
            .expect("adjustment");
        assert!(*slow > 0.0);
        // Forced triggers do not burn the real cooldown.
        assert!(outcome.cooldowns_consumed.is_empty());
    }

    #[test]
    fn tells_are_deterministic_for_a_given_request() {
        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();

        let mut first_entity = forest();
        burn(&mut first_entity, 0.6, 0.0);
        let first =
            evaluate_affordances(&mut first_entity, &registry, &config, &move_request(10.0));

        let mut second_entity = forest();
        burn(&mut second_entity, 0.6, 0.0);
        let second =
            evaluate_affordances(&mut second_entity, &registry, &config, &move_request(10.0));

        assert_eq!(first.tells, second.tells);
        assert_eq!(first.snapshot.random_seed, second.snapshot.random_seed);
    }

    #[test]
    fn snapshot_replays_bit_exactly() {
        let mut entity = forest();
        burn(&mut entity, 0.6, 0.0);

        let registry = AffordanceRegistry::standard().expect("valid");
        let config = AffinityConfig::default();
        let outcome =
            evaluate_affordances(&mut entity, &registry, &config, &move_request(10.0));

        // Perturb the live traces after the snapshot is taken.
        burn(&mut entity, 1.0, 20.0);
        burn(&mut entity, 1.0, 30.0);

        let replayed = crate::snapshot::replay(&outcome.snapshot).expect("replay");
        assert_eq!(
            replayed.computed_affinity.to_bits(),
            outcome.snapshot.computed_affinity.to_bits()
        );
        assert_eq!(replayed.adjustments, outcome.adjustments);
        assert_eq!(replayed.tells, outcome.tells);
    }
}
