//! Affordances: named rules that translate affinity into mechanics.
//!
//! An affordance is registered as a value (threshold, cooldown, clamp pair,
//! handles, tell tables, optional condition) rather than as a trait object,
//! keeping the set closed and inspectable. Validation runs at registration;
//! evaluation happens in [`pipeline`].

pub mod pipeline;
pub mod registry;
pub mod tells;

pub use pipeline::{evaluate_affordances, AffordanceOutcome, EvaluationRequest, ForcedMode};
pub use registry::{AffordanceDef, AffordanceEffect, AffordanceKind, AffordanceRegistry, ConditionRule};
