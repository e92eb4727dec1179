//! Configuration for the affinity core.
//!
//! All tunables live in a single [`AffinityConfig`] snapshot, loadable from
//! TOML. The core holds the snapshot immutable; hot reload swaps the whole
//! snapshot atomically through [`ConfigHandle`], so readers see either the
//! old or the new configuration consistently for the duration of a single
//! operation.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::clock::SECONDS_PER_DAY;
use crate::error::{AffinityError, Result};
use crate::types::EntityKind;

/// Complete affinity system configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffinityConfig {
    /// Half-lives in days per entity kind and channel.
    #[serde(default)]
    pub half_lives: HalfLives,
    /// Channel blending weights.
    #[serde(default)]
    pub channel_weights: ChannelWeights,
    /// Base capacities for saturation calculation.
    #[serde(default)]
    pub saturation_capacity: SaturationCapacity,
    /// Minimum seconds between effective housekeeping passes per entity.
    #[serde(default = "default_tick_interval")]
    pub world_tick_interval_seconds: u64,
    /// Memory compaction thresholds.
    #[serde(default)]
    pub compaction: CompactionConfig,
    /// Institution behavior settings.
    #[serde(default)]
    pub institutions: InstitutionConfig,
    /// Tags that survive warm compaction verbatim; all others collapse.
    /// Configurable per world: fantasy (elf, dwarf), modern (corporate,
    /// union), and so on.
    #[serde(default = "default_institutional_tags")]
    pub institutional_tags: BTreeSet<String>,
    /// Tanh denominator multiplier. `10.0` is the neutral baseline; higher
    /// values compress more aggressively.
    #[serde(default = "default_affinity_scale")]
    pub affinity_scale: f64,
}

/// Half-lives in days for each channel of one entity kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelHalfLives {
    /// Personal channel half-life, days.
    pub personal: f64,
    /// Group channel half-life, days.
    pub group: f64,
    /// Behavior channel half-life, days.
    pub behavior: f64,
}

impl ChannelHalfLives {
    /// Half-lives converted to seconds.
    #[must_use]
    pub fn in_seconds(&self) -> ChannelHalfLives {
        ChannelHalfLives {
            personal: self.personal * SECONDS_PER_DAY,
            group: self.group * SECONDS_PER_DAY,
            behavior: self.behavior * SECONDS_PER_DAY,
        }
    }
}

/// Half-life configuration for all entity kinds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HalfLives {
    /// Persistent places remember longest.
    #[serde(default = "default_location_half_lives")]
    pub location: ChannelHalfLives,
    /// Mobile objects have shorter memories.
    #[serde(default = "default_artifact_half_lives")]
    pub artifact: ChannelHalfLives,
    /// NPC memory fades fastest.
    #[serde(default = "default_npc_half_lives")]
    pub npc: ChannelHalfLives,
}

impl HalfLives {
    /// Half-life tier for an entity kind.
    #[must_use]
    pub fn for_kind(&self, kind: EntityKind) -> &ChannelHalfLives {
        match kind {
            EntityKind::Location => &self.location,
            EntityKind::Artifact => &self.artifact,
            EntityKind::Npc => &self.npc,
        }
    }
}

impl Default for HalfLives {
    fn default() -> Self {
        Self {
            location: default_location_half_lives(),
            artifact: default_artifact_half_lives(),
            npc: default_npc_half_lives(),
        }
    }
}

/// Weights for blending affinity channels. The three trace channels sum to
/// 1.0 by convention; the institutional channel is a small additive bias and
/// must never exceed the behavior weight.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChannelWeights {
    /// Personal channel weight.
    #[serde(default = "default_weight_personal")]
    pub personal: f64,
    /// Group channel weight.
    #[serde(default = "default_weight_group")]
    pub group: f64,
    /// Behavior channel weight.
    #[serde(default = "default_weight_behavior")]
    pub behavior: f64,
    /// Institutional stance weight. Defaults to zero (bias disabled).
    #[serde(default)]
    pub institutional: f64,
}

impl Default for ChannelWeights {
    fn default() -> Self {
        Self {
            personal: default_weight_personal(),
            group: default_weight_group(),
            behavior: default_weight_behavior(),
            institutional: 0.0,
        }
    }
}

/// Base capacities for saturation calculation. Saturation is the channel's
/// total decayed weight divided by its capacity, clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SaturationCapacity {
    /// Personal channel capacity.
    #[serde(default = "default_capacity_personal")]
    pub personal: f64,
    /// Group channel capacity.
    #[serde(default = "default_capacity_group")]
    pub group: f64,
    /// Behavior channel capacity.
    #[serde(default = "default_capacity_behavior")]
    pub behavior: f64,
}

impl Default for SaturationCapacity {
    fn default() -> Self {
        Self {
            personal: default_capacity_personal(),
            group: default_capacity_group(),
            behavior: default_capacity_behavior(),
        }
    }
}

/// Memory compaction thresholds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompactionConfig {
    /// Traces younger than this stay hot (full keys).
    #[serde(default = "default_hot_window")]
    pub hot_window_days: f64,
    /// Traces older than this either scar or are deleted.
    #[serde(default = "default_warm_window")]
    pub warm_window_days: f64,
    /// Minimum accumulated value for warm traces to scar.
    #[serde(default = "default_scar_threshold")]
    pub scar_intensity_threshold: f64,
    /// Scar half-life, days.
    #[serde(default = "default_scar_half_life")]
    pub scar_half_life_days: f64,
    /// Traces whose decayed magnitude falls below this are pruned.
    #[serde(default = "default_prune_threshold")]
    pub prune_threshold: f64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            hot_window_days: default_hot_window(),
            warm_window_days: default_warm_window(),
            scar_intensity_threshold: default_scar_threshold(),
            scar_half_life_days: default_scar_half_life(),
            prune_threshold: default_prune_threshold(),
        }
    }
}

/// Institution behavior settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstitutionConfig {
    /// Weight of the fresh constituent mean in a stance refresh.
    #[serde(default = "default_drift_rate")]
    pub drift_rate: f64,
    /// Weight of the cached stance in a refresh. Institutions are slow to
    /// change; with the defaults the old value dominates 9:1.
    #[serde(default = "default_inertia")]
    pub inertia: f64,
    /// Half-life of cached stances between refreshes, days.
    #[serde(default = "default_institution_half_life")]
    pub half_life_days: f64,
    /// Seconds between stance refreshes.
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
}

impl Default for InstitutionConfig {
    fn default() -> Self {
        Self {
            drift_rate: default_drift_rate(),
            inertia: default_inertia(),
            half_life_days: default_institution_half_life(),
            refresh_interval_seconds: default_refresh_interval(),
        }
    }
}

impl Default for AffinityConfig {
    fn default() -> Self {
        Self {
            half_lives: HalfLives::default(),
            channel_weights: ChannelWeights::default(),
            saturation_capacity: SaturationCapacity::default(),
            world_tick_interval_seconds: default_tick_interval(),
            compaction: CompactionConfig::default(),
            institutions: InstitutionConfig::default(),
            institutional_tags: default_institutional_tags(),
            affinity_scale: default_affinity_scale(),
        }
    }
}

impl AffinityConfig {
    /// Load configuration from a TOML string and validate it.
    ///
    /// # Errors
    /// Returns [`AffinityError::Config`] if the TOML is invalid, or
    /// [`AffinityError::Validation`] if a field is out of range.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| AffinityError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Validate ranges. Fatal at load time.
    ///
    /// # Errors
    /// Returns [`AffinityError::Validation`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        let weights = &self.channel_weights;
        for (name, value) in [
            ("channel_weights.personal", weights.personal),
            ("channel_weights.group", weights.group),
            ("channel_weights.behavior", weights.behavior),
            ("channel_weights.institutional", weights.institutional),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(AffinityError::Validation(format!(
                    "{name} must be nonnegative, got {value}"
                )));
            }
        }
        if weights.institutional > weights.behavior {
            return Err(AffinityError::Validation(format!(
                "channel_weights.institutional ({}) must not exceed channel_weights.behavior ({})",
                weights.institutional, weights.behavior
            )));
        }
        if self.affinity_scale <= 0.0 || !self.affinity_scale.is_finite() {
            return Err(AffinityError::Validation(format!(
                "affinity_scale must be positive, got {}",
                self.affinity_scale
            )));
        }
        for (name, tier) in [
            ("location", &self.half_lives.location),
            ("artifact", &self.half_lives.artifact),
            ("npc", &self.half_lives.npc),
        ] {
            for (channel, days) in [
                ("personal", tier.personal),
                ("group", tier.group),
                ("behavior", tier.behavior),
            ] {
                if days <= 0.0 || !days.is_finite() {
                    return Err(AffinityError::Validation(format!(
                        "half_lives.{name}.{channel} must be positive, got {days}"
                    )));
                }
            }
        }
        for (name, value) in [
            ("saturation_capacity.personal", self.saturation_capacity.personal),
            ("saturation_capacity.group", self.saturation_capacity.group),
            ("saturation_capacity.behavior", self.saturation_capacity.behavior),
        ] {
            if value <= 0.0 {
                return Err(AffinityError::Validation(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        let compaction = &self.compaction;
        if compaction.hot_window_days <= 0.0
            || compaction.warm_window_days <= compaction.hot_window_days
        {
            return Err(AffinityError::Validation(format!(
                "compaction windows must satisfy 0 < hot ({}) < warm ({})",
                compaction.hot_window_days, compaction.warm_window_days
            )));
        }
        if compaction.scar_half_life_days <= 0.0 {
            return Err(AffinityError::Validation(
                "compaction.scar_half_life_days must be positive".to_string(),
            ));
        }
        if compaction.prune_threshold <= 0.0 {
            return Err(AffinityError::Validation(
                "compaction.prune_threshold must be positive".to_string(),
            ));
        }
        let institutions = &self.institutions;
        for (name, value) in [
            ("institutions.drift_rate", institutions.drift_rate),
            ("institutions.inertia", institutions.inertia),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AffinityError::Validation(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if institutions.half_life_days <= 0.0 {
            return Err(AffinityError::Validation(
                "institutions.half_life_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Atomically swappable configuration snapshot.
///
/// Readers call [`ConfigHandle::load`] once per operation and work against
/// that snapshot; a concurrent reload never tears a single operation.
#[derive(Debug, Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Arc<AffinityConfig>>>,
}

impl ConfigHandle {
    /// Wrap a validated configuration.
    ///
    /// # Errors
    /// Returns the validation error if the configuration is out of range.
    pub fn new(config: AffinityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(RwLock::new(Arc::new(config))),
        })
    }

    /// Snapshot the current configuration.
    #[must_use]
    pub fn load(&self) -> Arc<AffinityConfig> {
        Arc::clone(&self.inner.read())
    }

    /// Atomically replace the configuration.
    ///
    /// # Errors
    /// Returns the validation error if the new configuration is out of
    /// range; the old snapshot stays active.
    pub fn store(&self, config: AffinityConfig) -> Result<()> {
        config.validate()?;
        *self.inner.write() = Arc::new(config);
        Ok(())
    }
}

impl Default for ConfigHandle {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(AffinityConfig::default()))),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_location_half_lives() -> ChannelHalfLives {
    ChannelHalfLives { personal: 7.0, group: 30.0, behavior: 90.0 }
}
fn default_artifact_half_lives() -> ChannelHalfLives {
    ChannelHalfLives { personal: 3.0, group: 14.0, behavior: 30.0 }
}
fn default_npc_half_lives() -> ChannelHalfLives {
    ChannelHalfLives { personal: 1.0, group: 7.0, behavior: 14.0 }
}
fn default_institutional_tags() -> BTreeSet<String> {
    ["human", "elf", "dwarf", "orc", "imperial", "rebel"]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
}
fn default_weight_personal() -> f64 { 0.5 }
fn default_weight_group() -> f64 { 0.35 }
fn default_weight_behavior() -> f64 { 0.15 }
fn default_capacity_personal() -> f64 { 50.0 }
fn default_capacity_group() -> f64 { 100.0 }
fn default_capacity_behavior() -> f64 { 200.0 }
fn default_tick_interval() -> u64 { 3_600 }
fn default_hot_window() -> f64 { 7.0 }
fn default_warm_window() -> f64 { 90.0 }
fn default_scar_threshold() -> f64 { 0.7 }
fn default_scar_half_life() -> f64 { 365.0 }
fn default_prune_threshold() -> f64 { 0.01 }
fn default_drift_rate() -> f64 { 0.1 }
fn default_inertia() -> f64 { 0.9 }
fn default_institution_half_life() -> f64 { 90.0 }
fn default_refresh_interval() -> u64 { 86_400 }
fn default_affinity_scale() -> f64 { 10.0 }
