//! The affordance registry and the standard catalog.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::affordance::tells;
use crate::error::{AffinityError, Result};
use crate::validation::{validate_handles, validate_tells};

/// The closed set of affordances the core knows how to evaluate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AffordanceKind {
    /// Path friction: travel feels longer or shorter.
    Pathing,
    /// Strongly hostile places occasionally send travelers astray.
    MisleadingNavigation,
    /// Wildlife presses closer or keeps its distance.
    EncounterBias,
    /// The land gives freely or withholds.
    ResourceScarcity,
    /// Magic flows eagerly or sputters.
    SpellSideEffects,
    /// Sleep restores more or less.
    RestQuality,
    /// Pure atmosphere, layered by severity.
    AmbientMessaging,
    /// Found goods run richer or poorer.
    LootQuality,
    /// Local weather takes sides.
    WeatherMicroclimate,
    /// Animals carry the place's opinion.
    AnimalMessengers,
}

impl AffordanceKind {
    /// Every affordance, in registration (and therefore evaluation) order.
    pub const ALL: [Self; 10] = [
        Self::Pathing,
        Self::EncounterBias,
        Self::ResourceScarcity,
        Self::SpellSideEffects,
        Self::RestQuality,
        Self::AmbientMessaging,
        Self::LootQuality,
        Self::WeatherMicroclimate,
        Self::AnimalMessengers,
        Self::MisleadingNavigation,
    ];

    /// Stable snake_case name, used in cooldown tokens and admin output.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pathing => "pathing",
            Self::MisleadingNavigation => "misleading_navigation",
            Self::EncounterBias => "encounter_bias",
            Self::ResourceScarcity => "resource_scarcity",
            Self::SpellSideEffects => "spell_side_effects",
            Self::RestQuality => "rest_quality",
            Self::AmbientMessaging => "ambient_messaging",
            Self::LootQuality => "loot_quality",
            Self::WeatherMicroclimate => "weather_microclimate",
            Self::AnimalMessengers => "animal_messengers",
        }
    }

    /// Parse a snake_case name back to a kind.
    #[must_use]
    pub fn from_str_opt(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl std::fmt::Display for AffordanceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a triggered affordance reaches into game mechanics.
#[derive(Debug, Clone, PartialEq)]
pub enum AffordanceEffect {
    /// One handle, set to the severity.
    Scaled {
        /// The modulated handle.
        handle: &'static str,
    },
    /// Two handles; the secondary gets a ratio of the severity.
    ScaledPair {
        /// The primary handle.
        primary: &'static str,
        /// The secondary handle.
        secondary: &'static str,
        /// Secondary-to-primary ratio on hostile triggers.
        secondary_hostile_ratio: f64,
        /// Secondary-to-primary ratio on favorable triggers.
        secondary_favorable_ratio: f64,
    },
    /// Spell modulation: power is severity-scaled, backfire is a fixed
    /// increment per direction.
    SpellCast {
        /// Spell power handle.
        power: &'static str,
        /// Backfire chance handle.
        backfire: &'static str,
        /// Backfire increment on hostile triggers.
        hostile_backfire: f64,
        /// Backfire increment on favorable triggers.
        favorable_backfire: f64,
    },
    /// Redirect a traveler to an adjacent room; the hostile clamp is the
    /// maximum redirect chance.
    Redirect,
    /// Tells only, chosen from the severity ladder.
    AmbientLadder,
    /// Tells only.
    FlavorOnly,
}

impl AffordanceEffect {
    /// The mechanical handles this effect touches.
    #[must_use]
    pub fn handles(&self) -> Vec<&'static str> {
        match self {
            Self::Scaled { handle } => vec![handle],
            Self::ScaledPair { primary, secondary, .. } => vec![primary, secondary],
            Self::SpellCast { power, backfire, .. } => vec![power, backfire],
            Self::Redirect => vec!["room.redirect_target"],
            Self::AmbientLadder | Self::FlavorOnly => vec![],
        }
    }
}

/// An extra modifier applied when a predicate over (entity, context) holds.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionRule {
    /// The entity despises a school of magic: when the action's subtype is
    /// `school` and the entity's valuation of `valuation_event` is below
    /// `below`, power takes `power_penalty` and backfire `backfire_penalty`
    /// on top of the base effect, in both directions.
    SchoolAversion {
        /// Action subtype that attracts the penalty, e.g. `fire`.
        school: &'static str,
        /// Valuation profile entry consulted, e.g. `harm.fire`.
        valuation_event: &'static str,
        /// Trigger when the valuation is strictly below this.
        below: f64,
        /// Additional power modifier.
        power_penalty: f64,
        /// Additional backfire increment.
        backfire_penalty: f64,
    },
}

/// A registered affordance: thresholds, clamps, cooldown, effect shape.
#[derive(Debug, Clone)]
pub struct AffordanceDef {
    /// Which affordance this is.
    pub kind: AffordanceKind,
    /// Seconds between triggers per (actor, entity). Zero means no
    /// cooldown (per-use affordances such as spell casting).
    pub cooldown_seconds: u64,
    /// Trigger when affinity is strictly below this.
    pub hostile_threshold: f64,
    /// Trigger when affinity is strictly above this.
    pub favorable_threshold: f64,
    /// Severity bound on hostile triggers.
    pub hostile_clamp: f64,
    /// Severity bound on favorable triggers.
    pub favorable_clamp: f64,
    /// How the trigger reaches into mechanics.
    pub effect: AffordanceEffect,
    /// Restrict evaluation to actions of this category. `None` matches any
    /// action.
    pub action_category: Option<&'static str>,
    /// Optional extra modifier.
    pub condition: Option<ConditionRule>,
}

/// The validated, ordered affordance registry.
///
/// Evaluation walks definitions in registration order. Admins may disable
/// kinds globally; per-entity disables live on the entity.
#[derive(Debug, Clone)]
pub struct AffordanceRegistry {
    defs: Vec<AffordanceDef>,
    globally_disabled: BTreeSet<AffordanceKind>,
}

impl AffordanceRegistry {
    /// Build an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            defs: Vec::new(),
            globally_disabled: BTreeSet::new(),
        }
    }

    /// Build the standard ten-affordance catalog.
    ///
    /// # Errors
    /// Returns [`AffinityError::Validation`] if any definition or tell
    /// table is invalid; this aborts startup.
    pub fn standard() -> Result<Self> {
        let mut registry = Self::empty();
        for def in standard_catalog() {
            registry.register(def)?;
        }
        Ok(registry)
    }

    /// Register one affordance, validating handles and tells.
    ///
    /// # Errors
    /// Returns [`AffinityError::Validation`] on more than two handles, an
    /// unknown handle, a forbidden tell, or a duplicate kind.
    pub fn register(&mut self, def: AffordanceDef) -> Result<()> {
        if self.defs.iter().any(|existing| existing.kind == def.kind) {
            return Err(AffinityError::Validation(format!(
                "affordance '{}' registered twice",
                def.kind
            )));
        }
        validate_handles(&def.effect.handles(), def.kind.as_str())?;
        validate_tells(
            tells::hostile_tells(def.kind).iter().copied(),
            def.kind.as_str(),
        )?;
        validate_tells(
            tells::favorable_tells(def.kind).iter().copied(),
            def.kind.as_str(),
        )?;
        if def.kind == AffordanceKind::AmbientMessaging {
            for table in tells::ambient_tables() {
                validate_tells(table.iter().copied(), def.kind.as_str())?;
            }
        }
        self.defs.push(def);
        Ok(())
    }

    /// Definitions in registration order.
    #[must_use]
    pub fn defs(&self) -> &[AffordanceDef] {
        &self.defs
    }

    /// Look up one definition.
    #[must_use]
    pub fn get(&self, kind: AffordanceKind) -> Option<&AffordanceDef> {
        self.defs.iter().find(|def| def.kind == kind)
    }

    /// Globally enable or disable an affordance.
    pub fn set_enabled(&mut self, kind: AffordanceKind, enabled: bool) {
        if enabled {
            self.globally_disabled.remove(&kind);
        } else {
            self.globally_disabled.insert(kind);
        }
    }

    /// Whether an affordance is globally enabled.
    #[must_use]
    pub fn is_enabled(&self, kind: AffordanceKind) -> bool {
        !self.globally_disabled.contains(&kind)
    }
}

fn standard_catalog() -> Vec<AffordanceDef> {
    vec![
        AffordanceDef {
            kind: AffordanceKind::Pathing,
            cooldown_seconds: 3_600,
            hostile_threshold: -0.3,
            favorable_threshold: 0.3,
            hostile_clamp: 0.5,
            favorable_clamp: -0.3,
            effect: AffordanceEffect::Scaled {
                handle: "room.travel_time_modifier",
            },
            action_category: Some("move"),
            condition: None,
        },
        AffordanceDef {
            kind: AffordanceKind::EncounterBias,
            cooldown_seconds: 1_800,
            hostile_threshold: -0.4,
            favorable_threshold: 0.4,
            hostile_clamp: 1.0,
            favorable_clamp: -0.5,
            effect: AffordanceEffect::ScaledPair {
                primary: "room.encounter_rate_modifier",
                secondary: "npc.aggro_radius_modifier",
                secondary_hostile_ratio: 0.5,
                secondary_favorable_ratio: 1.0,
            },
            action_category: None,
            condition: None,
        },
        AffordanceDef {
            kind: AffordanceKind::ResourceScarcity,
            cooldown_seconds: 7_200,
            hostile_threshold: -0.25,
            favorable_threshold: 0.25,
            hostile_clamp: -0.4,
            favorable_clamp: 0.4,
            effect: AffordanceEffect::Scaled {
                handle: "harvest.yield_modifier",
            },
            action_category: Some("extract"),
            condition: None,
        },
        AffordanceDef {
            kind: AffordanceKind::SpellSideEffects,
            cooldown_seconds: 0,
            hostile_threshold: -0.35,
            favorable_threshold: 0.35,
            hostile_clamp: -0.25,
            favorable_clamp: 0.25,
            effect: AffordanceEffect::SpellCast {
                power: "spell.power_modifier",
                backfire: "spell.backfire_chance",
                hostile_backfire: 0.1,
                favorable_backfire: -0.05,
            },
            action_category: Some("magic"),
            condition: Some(ConditionRule::SchoolAversion {
                school: "fire",
                valuation_event: "harm.fire",
                below: -0.5,
                power_penalty: -0.15,
                backfire_penalty: 0.1,
            }),
        },
        AffordanceDef {
            kind: AffordanceKind::RestQuality,
            cooldown_seconds: 28_800,
            hostile_threshold: -0.2,
            favorable_threshold: 0.2,
            hostile_clamp: -0.3,
            favorable_clamp: 0.3,
            effect: AffordanceEffect::Scaled {
                handle: "rest.healing_modifier",
            },
            action_category: Some("heal"),
            condition: None,
        },
        AffordanceDef {
            kind: AffordanceKind::AmbientMessaging,
            cooldown_seconds: 3_600,
            hostile_threshold: -0.25,
            favorable_threshold: 0.25,
            hostile_clamp: 0.0,
            favorable_clamp: 0.0,
            effect: AffordanceEffect::AmbientLadder,
            action_category: None,
            condition: None,
        },
        AffordanceDef {
            kind: AffordanceKind::LootQuality,
            cooldown_seconds: 3_600,
            hostile_threshold: -0.3,
            favorable_threshold: 0.3,
            hostile_clamp: -2.0,
            favorable_clamp: 2.0,
            effect: AffordanceEffect::Scaled {
                handle: "loot.quality_modifier",
            },
            action_category: Some("extract"),
            condition: None,
        },
        AffordanceDef {
            kind: AffordanceKind::WeatherMicroclimate,
            cooldown_seconds: 14_400,
            hostile_threshold: -0.4,
            favorable_threshold: 0.4,
            hostile_clamp: 0.0,
            favorable_clamp: 0.0,
            effect: AffordanceEffect::FlavorOnly,
            action_category: None,
            condition: None,
        },
        AffordanceDef {
            kind: AffordanceKind::AnimalMessengers,
            cooldown_seconds: 7_200,
            hostile_threshold: -0.25,
            favorable_threshold: 0.25,
            hostile_clamp: 0.0,
            favorable_clamp: 0.0,
            effect: AffordanceEffect::FlavorOnly,
            action_category: None,
            condition: None,
        },
        AffordanceDef {
            kind: AffordanceKind::MisleadingNavigation,
            cooldown_seconds: 14_400,
            hostile_threshold: -0.5,
            favorable_threshold: 0.7,
            hostile_clamp: 0.15,
            favorable_clamp: 0.0,
            effect: AffordanceEffect::Redirect,
            action_category: Some("move"),
            condition: None,
        },
    ]
}
