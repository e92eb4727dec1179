//! Core identity and classification types.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Host-supplied identifier for a memory-bearing entity (location, artifact,
/// institution). The core treats these as opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// View the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Host-supplied identifier for an actor (player, NPC). Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub String);

impl ActorId {
    /// View the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Unique identifier for a recorded affordance trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TriggerId(pub Uuid);

impl TriggerId {
    /// Create a new random trigger id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TriggerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// The memory channels an entity carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Channel {
    /// Keyed by (actor identity, event type). Shortest half-life.
    Personal,
    /// Keyed by (actor tag, event type). Medium half-life.
    Group,
    /// Keyed by event type alone. Longest half-life.
    Behavior,
    /// Artifact-only, keyed by holder identity.
    Bearer,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Group => write!(f, "group"),
            Self::Behavior => write!(f, "behavior"),
            Self::Bearer => write!(f, "bearer"),
        }
    }
}

// ---------------------------------------------------------------------------
// Threshold bands
// ---------------------------------------------------------------------------

/// Named affinity bands. Admin-facing only; never shown to players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdBand {
    /// Affinity in `(-inf, -0.7]`.
    Hostile,
    /// Affinity in `(-0.7, -0.3]`.
    Unwelcoming,
    /// Affinity in `(-0.3, +0.3)`.
    Neutral,
    /// Affinity in `[+0.3, +0.7)`.
    Favorable,
    /// Affinity in `[+0.7, +inf)`.
    Aligned,
}

impl ThresholdBand {
    /// Classify an affinity value into its band.
    #[must_use]
    pub fn from_affinity(affinity: f64) -> Self {
        if affinity <= -0.7 {
            Self::Hostile
        } else if affinity <= -0.3 {
            Self::Unwelcoming
        } else if affinity < 0.3 {
            Self::Neutral
        } else if affinity < 0.7 {
            Self::Favorable
        } else {
            Self::Aligned
        }
    }

    /// Lowercase label used in admin reports and trigger logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hostile => "hostile",
            Self::Unwelcoming => "unwelcoming",
            Self::Neutral => "neutral",
            Self::Favorable => "favorable",
            Self::Aligned => "aligned",
        }
    }
}

impl fmt::Display for ThresholdBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Which kind of memory-bearing entity a trace table belongs to.
/// Selects the half-life tier from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A persistent place.
    Location,
    /// A mobile object.
    Artifact,
    /// A non-player character carrying location-style memory.
    Npc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(ThresholdBand::from_affinity(-1.0), ThresholdBand::Hostile);
        assert_eq!(ThresholdBand::from_affinity(-0.7), ThresholdBand::Hostile);
        assert_eq!(ThresholdBand::from_affinity(-0.5), ThresholdBand::Unwelcoming);
        assert_eq!(ThresholdBand::from_affinity(-0.3), ThresholdBand::Unwelcoming);
        assert_eq!(ThresholdBand::from_affinity(0.0), ThresholdBand::Neutral);
        assert_eq!(ThresholdBand::from_affinity(0.3), ThresholdBand::Favorable);
        assert_eq!(ThresholdBand::from_affinity(0.69), ThresholdBand::Favorable);
        assert_eq!(ThresholdBand::from_affinity(0.7), ThresholdBand::Aligned);
        assert_eq!(ThresholdBand::from_affinity(1.0), ThresholdBand::Aligned);
    }
}
