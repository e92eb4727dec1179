//! Property-based tests for the affinity core.
//!
//! Verifies the universal invariants under random inputs: decay bounds,
//! affinity bounds, valuation fallback, handle limits, tell hygiene,
//! cooldown monotonicity, and replay determinism.

use std::collections::BTreeSet;

use proptest::prelude::*;

use loci_core::affinity::compute_affinity;
use loci_core::affordance::{evaluate_affordances, AffordanceRegistry, EvaluationRequest};
use loci_core::clock::SECONDS_PER_DAY;
use loci_core::cooldown::CooldownRegistry;
use loci_core::snapshot::replay;
use loci_core::store::log_event;
use loci_core::tick::world_tick;
use loci_core::validation::tell_is_forbidden;
use loci_core::{
    ActorId, AffinityConfig, AffinityEvent, Entity, EntityId, Location, TraceRecord,
    ValuationProfile,
};

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
            ("create.plant", 0.6),
        ]),
    ))
}

fn apply_events(entity: &mut Entity, events: &[(usize, f64, f64)]) {
    // Index picks the event type, so random input stays inside the closed
    // category vocabulary.
    const EVENT_TYPES: [&str; 5] = [
        "harm.fire",
        "extract.hunt",
        "offer.gift",
        "create.plant",
        "social.chat",
    ];
    let config = AffinityConfig::default();
    let half_lives = config.half_lives.location.in_seconds();
    let scar = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
    for (type_index, intensity, timestamp) in events {
        let event = AffinityEvent::new(
            EVENT_TYPES[type_index % EVENT_TYPES.len()],
            ActorId::from("player_0042"),
            tags(&["human", "hunter"]),
            EntityId::from("whispering_woods"),
            *intensity,
            *timestamp,
        );
        let saturation = *entity.saturation();
        let channels = entity.channels_mut().expect("location has channels");
        log_event(channels, &saturation, &event, &half_lives, scar);
    }
}

fn arb_events() -> impl Strategy<Value = Vec<(usize, f64, f64)>> {
    prop::collection::vec(
        (0usize..5, 0.0..1.5f64, 0.0..(30.0 * SECONDS_PER_DAY)),
        0..25,
    )
}

// ---------------------------------------------------------------------------
// Property: decayed value stays within [0, accumulated] for future reads
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn decay_never_exceeds_accumulated(
        accumulated in 0.0..100.0f64,
        elapsed in 0.0..(1_000.0 * SECONDS_PER_DAY),
        half_life_days in 0.1..500.0f64,
    ) {
        let trace = TraceRecord::new(accumulated, 0.0);
        let value = trace.decayed_value(half_life_days * SECONDS_PER_DAY, elapsed);
        prop_assert!(value >= 0.0);
        prop_assert!(value <= trace.accumulated + 1e-12);
    }
}

// ---------------------------------------------------------------------------
// Property: one half-life halves, two quarter
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn half_life_curve_is_exact(
        accumulated in 0.01..100.0f64,
        half_life_days in 0.1..400.0f64,
    ) {
        let half_life = half_life_days * SECONDS_PER_DAY;
        let trace = TraceRecord::new(accumulated, 0.0);

        let one = trace.decayed_value(half_life, half_life);
        let two = trace.decayed_value(half_life, 2.0 * half_life);
        prop_assert!((one - accumulated * 0.5).abs() < accumulated * 1e-9);
        prop_assert!((two - accumulated * 0.25).abs() < accumulated * 1e-9);
    }
}

// ---------------------------------------------------------------------------
// Property: affinity is always within [-1, 1]
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn affinity_always_bounded(events in arb_events(), eval_offset in 0.0..(60.0 * SECONDS_PER_DAY)) {
        let mut entity = forest();
        apply_events(&mut entity, &events);

        let config = AffinityConfig::default();
        let affinity = compute_affinity(
            &entity,
            Some(&ActorId::from("player_0042")),
            &tags(&["human", "hunter"]),
            &config,
            eval_offset,
        );
        prop_assert!(affinity >= -1.0);
        prop_assert!(affinity <= 1.0);
    }
}

// ---------------------------------------------------------------------------
// Property: unknown event types without a category entry are neutral
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn unmatched_valuation_is_zero(suffix in "[a-z]{1,12}") {
        let profile = ValuationProfile::from_pairs(&[("harm", -0.15), ("offer.gift", 0.5)]);
        // "trade" has neither an exact nor a category entry.
        let event_type = format!("trade.{suffix}");
        prop_assert!(profile.get(&event_type).abs() < f64::EPSILON);
    }
}

// ---------------------------------------------------------------------------
// Property: outcomes never exceed two handles per affordance, and every
// tell passes the forbidden-pattern validator
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn outcomes_stay_within_contract(events in arb_events()) {
        let mut entity = forest();
        apply_events(&mut entity, &events);

        let registry = AffordanceRegistry::standard().expect("valid catalog");
        let config = AffinityConfig::default();
        let request = EvaluationRequest::new(
            ActorId::from("player_0042"),
            tags(&["human", "hunter"]),
            "move.pass",
            40.0 * SECONDS_PER_DAY,
        );
        let outcome = evaluate_affordances(&mut entity, &registry, &config, &request);

        // Movement is single-primary: at most the pathing handle.
        prop_assert!(outcome.adjustments.len() <= 2);
        for tell in &outcome.tells {
            prop_assert!(!tell_is_forbidden(tell), "forbidden tell emitted: {tell}");
        }
    }
}

// ---------------------------------------------------------------------------
// Property: replay of any outcome is bit-exact
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn replay_matches_any_outcome(events in arb_events(), action_index in 0usize..3) {
        const ACTIONS: [&str; 3] = ["move.pass", "magic.fire", "extract.harvest"];
        let mut entity = forest();
        apply_events(&mut entity, &events);

        let registry = AffordanceRegistry::standard().expect("valid catalog");
        let config = AffinityConfig::default();
        let request = EvaluationRequest::new(
            ActorId::from("player_0042"),
            tags(&["human", "hunter"]),
            ACTIONS[action_index],
            40.0 * SECONDS_PER_DAY,
        );
        let outcome = evaluate_affordances(&mut entity, &registry, &config, &request);

        // Perturb live state, then replay from the snapshot.
        apply_events(&mut entity, &[(0, 0.9, 41.0 * SECONDS_PER_DAY)]);
        let replayed = replay(&outcome.snapshot).expect("replay");
        prop_assert_eq!(
            replayed.computed_affinity.to_bits(),
            outcome.snapshot.computed_affinity.to_bits()
        );
        prop_assert_eq!(replayed.adjustments, outcome.adjustments);
        prop_assert_eq!(replayed.tells, outcome.tells);
    }
}

// ---------------------------------------------------------------------------
// Property: cooldowns are monotonically extensible only
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn cooldowns_never_shorten(expiries in prop::collection::vec(0.0..10_000.0f64, 1..20)) {
        let mut registry = CooldownRegistry::default();
        let mut max_expiry = f64::NEG_INFINITY;
        for expiry in expiries {
            registry.engage("pathing:a:b", expiry);
            max_expiry = max_expiry.max(expiry);
            // Active strictly before the furthest expiry ever written.
            prop_assert!(registry.is_active("pathing:a:b", max_expiry - 1e-6));
            prop_assert!(!registry.is_active("pathing:a:b", max_expiry));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: tick at a fixed timestamp is idempotent
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]
    #[test]
    fn tick_is_idempotent(events in arb_events(), tick_day in 1.0..90.0f64) {
        let mut entity = forest();
        apply_events(&mut entity, &events);

        let config = AffinityConfig::default();
        let now = tick_day * SECONDS_PER_DAY;
        world_tick(&mut entity, &config, now);
        let first = serde_json::to_string(&entity).expect("serialize");

        world_tick(&mut entity, &config, now);
        let second = serde_json::to_string(&entity).expect("serialize");
        prop_assert_eq!(first, second);
    }
}
