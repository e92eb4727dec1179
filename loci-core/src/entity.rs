//! Memory-bearing entities and their channel tables.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::artifact::{BearerRecord, PressureRule};
use crate::clock::Timestamp;
use crate::cooldown::CooldownRegistry;
use crate::trace::{effective_half_life, TraceRecord};
use crate::types::{ActorId, EntityId, EntityKind, ThresholdBand};
use crate::valuation::ValuationProfile;

/// Serde codec for tuple-keyed trace tables.
///
/// JSON maps require string keys, so `(a, b)` keys are joined as `"a::b"`
/// on the wire and split back on load.
pub(crate) mod joined_keys {
    use std::collections::BTreeMap;

    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S, V>(
        map: &BTreeMap<(String, String), V>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        let joined: BTreeMap<String, &V> = map
            .iter()
            .map(|((a, b), v)| (format!("{a}::{b}"), v))
            .collect();
        joined.serialize(serializer)
    }

    pub fn deserialize<'de, D, V>(
        deserializer: D,
    ) -> Result<BTreeMap<(String, String), V>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        let joined = BTreeMap::<String, V>::deserialize(deserializer)?;
        let mut out = BTreeMap::new();
        for (key, value) in joined {
            let (a, b) = key
                .split_once("::")
                .ok_or_else(|| D::Error::custom(format!("invalid trace key: {key}")))?;
            out.insert((a.to_string(), b.to_string()), value);
        }
        Ok(out)
    }
}

/// The three-channel trace storage of a memory-bearing entity.
///
/// Keys carry identity; records carry only accumulated state:
/// personal is keyed by `(actor id, event type)`, group by
/// `(actor tag, event type)`, behavior by event type alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceChannels {
    /// Personal channel: `(actor id, event type)` → trace.
    #[serde(with = "joined_keys")]
    pub personal: BTreeMap<(String, String), TraceRecord>,
    /// Group channel: `(actor tag, event type)` → trace.
    #[serde(with = "joined_keys")]
    pub group: BTreeMap<(String, String), TraceRecord>,
    /// Behavior channel: event type → trace.
    pub behavior: BTreeMap<String, TraceRecord>,
}

impl TraceChannels {
    /// Total trace count across all channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.personal.len() + self.group.len() + self.behavior.len()
    }

    /// Whether all channels are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.personal.is_empty() && self.group.is_empty() && self.behavior.is_empty()
    }

    /// Sum of decayed values per channel at `now`. Feeds the saturation
    /// refresh on tick.
    #[must_use]
    pub fn decayed_totals(
        &self,
        half_lives_seconds: &crate::config::ChannelHalfLives,
        scar_half_life_seconds: f64,
        now: Timestamp,
    ) -> ChannelTotals {
        let sum = |traces: &BTreeMap<(String, String), TraceRecord>, half_life: f64| {
            traces
                .values()
                .map(|t| t.decayed_value(effective_half_life(t, half_life, scar_half_life_seconds), now))
                .sum()
        };
        ChannelTotals {
            personal: sum(&self.personal, half_lives_seconds.personal),
            group: sum(&self.group, half_lives_seconds.group),
            behavior: self
                .behavior
                .values()
                .map(|t| {
                    t.decayed_value(
                        effective_half_life(t, half_lives_seconds.behavior, scar_half_life_seconds),
                        now,
                    )
                })
                .sum(),
        }
    }
}

/// Sum of decayed trace values per channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChannelTotals {
    /// Personal channel total.
    pub personal: f64,
    /// Group channel total.
    pub group: f64,
    /// Behavior channel total.
    pub behavior: f64,
}

/// Per-channel saturation in `[0, 1]`.
///
/// A cache, not authoritative: recomputed from decayed totals on tick.
/// A location saturated by commerce is not deaf to violence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SaturationState {
    /// Personal channel fullness.
    pub personal: f64,
    /// Group channel fullness.
    pub group: f64,
    /// Behavior channel fullness.
    pub behavior: f64,
}

/// Cached affinity range for quick lookups, keyed by actor tag.
///
/// Derived and disposable: the compute path never consults mood bands, only
/// refreshes them. Delete and recompute from traces at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodBand {
    /// The actor tag this band summarizes.
    pub actor_tag: String,
    /// Most recent sampled affinity toward the tag.
    pub affinity: f64,
    /// Band classification of the sample.
    pub dominant: ThresholdBand,
    /// When the band was last refreshed.
    pub last_updated: Timestamp,
}

/// A persistent place that accumulates memory. Never destroyed except by
/// admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
    /// Host-supplied identity.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Host-facing description.
    pub description: String,
    /// Tags used for institution affiliation.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Three-channel trace storage.
    #[serde(default)]
    pub channels: TraceChannels,
    /// This place's values. There is no global weight table.
    #[serde(default)]
    pub valuation: ValuationProfile,
    /// Per-channel saturation cache.
    #[serde(default)]
    pub saturation: SaturationState,
    /// Cooldown tracking for affordance triggers.
    #[serde(default)]
    pub cooldowns: CooldownRegistry,
    /// Disposable mood-band cache keyed by actor tag.
    #[serde(default)]
    pub mood_bands: BTreeMap<String, MoodBand>,
    /// Affordances an admin has switched off for this entity.
    #[serde(default)]
    pub disabled_affordances: BTreeSet<crate::affordance::AffordanceKind>,
    /// Housekeeping timestamp.
    #[serde(default)]
    pub last_tick: Timestamp,
}

impl Location {
    /// Create an empty location.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, valuation: ValuationProfile) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            tags: BTreeSet::new(),
            channels: TraceChannels::default(),
            valuation,
            saturation: SaturationState::default(),
            cooldowns: CooldownRegistry::default(),
            mood_bands: BTreeMap::new(),
            disabled_affordances: BTreeSet::new(),
            last_tick: 0.0,
        }
    }
}

/// A mobile object. Always carries bearer memory; location-style channels
/// are optional, and an artifact without them has only bearer memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Host-supplied identity.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Bearer channel: holder identity → carry record.
    #[serde(default)]
    pub bearer_traces: BTreeMap<ActorId, BearerRecord>,
    /// Rules through which the artifact leans on its bearer.
    #[serde(default)]
    pub pressure_rules: Vec<PressureRule>,
    /// Who currently carries the artifact, if anyone.
    #[serde(default)]
    pub current_bearer: Option<ActorId>,
    /// Optional location-style channels.
    #[serde(default)]
    pub channels: Option<TraceChannels>,
    /// Valuation profile (used only when channels are present).
    #[serde(default)]
    pub valuation: ValuationProfile,
    /// Per-channel saturation cache.
    #[serde(default)]
    pub saturation: SaturationState,
    /// Cooldown tracking.
    #[serde(default)]
    pub cooldowns: CooldownRegistry,
    /// Affordances an admin has switched off for this entity.
    #[serde(default)]
    pub disabled_affordances: BTreeSet<crate::affordance::AffordanceKind>,
    /// Housekeeping timestamp.
    #[serde(default)]
    pub last_tick: Timestamp,
}

impl Artifact {
    /// Create an artifact with bearer memory only.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bearer_traces: BTreeMap::new(),
            pressure_rules: Vec::new(),
            current_bearer: None,
            channels: None,
            valuation: ValuationProfile::default(),
            saturation: SaturationState::default(),
            cooldowns: CooldownRegistry::default(),
            disabled_affordances: BTreeSet::new(),
            last_tick: 0.0,
        }
    }

    /// Give the artifact location-style channels and a valuation profile.
    #[must_use]
    pub fn with_channels(mut self, valuation: ValuationProfile) -> Self {
        self.channels = Some(TraceChannels::default());
        self.valuation = valuation;
        self
    }
}

/// A memory-bearing entity the engine registry owns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Entity {
    /// A persistent place.
    Location(Location),
    /// A mobile object.
    Artifact(Artifact),
}

impl Entity {
    /// The entity's identity.
    #[must_use]
    pub fn id(&self) -> &EntityId {
        match self {
            Self::Location(l) => &l.id,
            Self::Artifact(a) => &a.id,
        }
    }

    /// Which half-life tier the entity decays with.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Location(_) => EntityKind::Location,
            Self::Artifact(_) => EntityKind::Artifact,
        }
    }

    /// Trace channels, if the entity carries any.
    #[must_use]
    pub fn channels(&self) -> Option<&TraceChannels> {
        match self {
            Self::Location(l) => Some(&l.channels),
            Self::Artifact(a) => a.channels.as_ref(),
        }
    }

    /// Mutable trace channels, if the entity carries any.
    pub fn channels_mut(&mut self) -> Option<&mut TraceChannels> {
        match self {
            Self::Location(l) => Some(&mut l.channels),
            Self::Artifact(a) => a.channels.as_mut(),
        }
    }

    /// The entity's valuation profile.
    #[must_use]
    pub fn valuation(&self) -> &ValuationProfile {
        match self {
            Self::Location(l) => &l.valuation,
            Self::Artifact(a) => &a.valuation,
        }
    }

    /// Saturation cache.
    #[must_use]
    pub fn saturation(&self) -> &SaturationState {
        match self {
            Self::Location(l) => &l.saturation,
            Self::Artifact(a) => &a.saturation,
        }
    }

    /// Mutable saturation cache.
    pub fn saturation_mut(&mut self) -> &mut SaturationState {
        match self {
            Self::Location(l) => &mut l.saturation,
            Self::Artifact(a) => &mut a.saturation,
        }
    }

    /// Cooldown registry.
    #[must_use]
    pub fn cooldowns(&self) -> &CooldownRegistry {
        match self {
            Self::Location(l) => &l.cooldowns,
            Self::Artifact(a) => &a.cooldowns,
        }
    }

    /// Mutable cooldown registry.
    pub fn cooldowns_mut(&mut self) -> &mut CooldownRegistry {
        match self {
            Self::Location(l) => &mut l.cooldowns,
            Self::Artifact(a) => &mut a.cooldowns,
        }
    }

    /// Per-entity disabled affordance set.
    #[must_use]
    pub fn disabled_affordances(&self) -> &BTreeSet<crate::affordance::AffordanceKind> {
        match self {
            Self::Location(l) => &l.disabled_affordances,
            Self::Artifact(a) => &a.disabled_affordances,
        }
    }

    /// Mutable disabled affordance set.
    pub fn disabled_affordances_mut(&mut self) -> &mut BTreeSet<crate::affordance::AffordanceKind> {
        match self {
            Self::Location(l) => &mut l.disabled_affordances,
            Self::Artifact(a) => &mut a.disabled_affordances,
        }
    }

    /// Housekeeping timestamp of the last world tick.
    #[must_use]
    pub fn last_tick(&self) -> Timestamp {
        match self {
            Self::Location(l) => l.last_tick,
            Self::Artifact(a) => a.last_tick,
        }
    }

    /// Stamp the housekeeping timestamp.
    pub fn set_last_tick(&mut self, now: Timestamp) {
        match self {
            Self::Location(l) => l.last_tick = now,
            Self::Artifact(a) => a.last_tick = now,
        }
    }

    /// Affiliation tags (locations only; artifacts drift between owners and
    /// never anchor an institution).
    #[must_use]
    pub fn affiliation_tags(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Location(l) => Some(&l.tags),
            Self::Artifact(_) => None,
        }
    }
}
