//! Affinity core benchmark suite.
//!
//! Informal targets for a busy server tick:
//!   event_logging_single ............. < 10μs
//!   affinity_compute_200_traces ...... < 100μs
//!   affordance_evaluation_movement ... < 200μs
//!   world_tick_populated_location .... < 500μs

use std::collections::BTreeSet;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use loci_core::affinity::compute_affinity;
use loci_core::affordance::{evaluate_affordances, AffordanceRegistry, EvaluationRequest};
use loci_core::clock::SECONDS_PER_DAY;
use loci_core::store::log_event;
use loci_core::tick::world_tick;
use loci_core::{
    ActorId, AffinityConfig, AffinityEvent, Entity, EntityId, Location, ValuationProfile,
};

const EVENT_TYPES: [&str; 5] = [
    "harm.fire",
    "extract.hunt",
    "offer.gift",
    "create.plant",
    "social.chat",
];

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

fn make_event(i: u32) -> AffinityEvent {
    AffinityEvent::new(
        EVENT_TYPES[i as usize % EVENT_TYPES.len()],
        ActorId(format!("player_{:04}", i % 40)),
        tags(&["human", "hunter", "outsider"]),
        EntityId::from("whispering_woods"),
        f64::from(i % 10) / 10.0,
        f64::from(i) * 600.0,
    )
}

fn populated_forest(events: u32) -> Entity {
    let mut entity = forest();
    let config = AffinityConfig::default();
    let half_lives = config.half_lives.location.in_seconds();
    let scar = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
    for i in 0..events {
        let event = make_event(i);
        let saturation = *entity.saturation();
        let channels = entity.channels_mut().expect("channels");
        log_event(channels, &saturation, &event, &half_lives, scar);
    }
    entity
}

/// Benchmark: logging one event into a populated store.
fn bench_event_logging(c: &mut Criterion) {
    let mut entity = populated_forest(200);
    let config = AffinityConfig::default();
    let half_lives = config.half_lives.location.in_seconds();
    let scar = config.compaction.scar_half_life_days * SECONDS_PER_DAY;
    let event = make_event(201);

    c.bench_function("event_logging_single", |b| {
        b.iter(|| {
            let saturation = *entity.saturation();
            let channels = entity.channels_mut().expect("channels");
            log_event(
                channels,
                &saturation,
                black_box(&event),
                &half_lives,
                scar,
            );
        });
    });
}

/// Benchmark: affinity over roughly two hundred live traces.
fn bench_affinity_compute(c: &mut Criterion) {
    let entity = populated_forest(200);
    let config = AffinityConfig::default();
    let actor = ActorId::from("player_0001");
    let actor_tags = tags(&["human", "hunter", "outsider"]);

    c.bench_function("affinity_compute_200_traces", |b| {
        b.iter(|| {
            let affinity = compute_affinity(
                black_box(&entity),
                Some(&actor),
                &actor_tags,
                &config,
                40.0 * SECONDS_PER_DAY,
            );
            black_box(affinity);
        });
    });
}

/// Benchmark: a movement affordance check, snapshot included.
fn bench_affordance_evaluation(c: &mut Criterion) {
    let mut entity = populated_forest(200);
    let config = AffinityConfig::default();
    let registry = AffordanceRegistry::standard().expect("valid catalog");

    c.bench_function("affordance_evaluation_movement", |b| {
        let mut offset = 0.0;
        b.iter(|| {
            // Move the timestamp so cooldowns never absorb the work.
            offset += 7_200.0;
            let request = EvaluationRequest::new(
                ActorId::from("player_0001"),
                tags(&["human", "hunter", "outsider"]),
                "move.pass",
                40.0 * SECONDS_PER_DAY + offset,
            );
            let outcome =
                evaluate_affordances(&mut entity, &registry, &config, black_box(&request));
            black_box(outcome);
        });
    });
}

/// Benchmark: world tick over a populated location.
fn bench_world_tick(c: &mut Criterion) {
    let config = AffinityConfig::default();

    c.bench_function("world_tick_populated_location", |b| {
        let mut entity = populated_forest(200);
        let mut day = 40.0;
        b.iter(|| {
            day += 1.0;
            let report = world_tick(&mut entity, &config, day * SECONDS_PER_DAY);
            black_box(report);
        });
    });
}

criterion_group!(
    benches,
    bench_event_logging,
    bench_affinity_compute,
    bench_affordance_evaluation,
    bench_world_tick
);
criterion_main!(benches);
