//! Per-entity valuation profiles.
//!
//! There is no process-wide mapping from event type to signed weight: every
//! entity supplies its own profile. Lookup falls back from the exact event
//! type to its category prefix, then to neutral zero. Missing types are
//! neutral by design; the lookup never fails.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{AffinityError, Result};
use crate::event::event_category;

/// An entity's mapping from event type (exact or category) to a signed
/// weight in `[-1, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValuationProfile(pub BTreeMap<String, f64>);

impl ValuationProfile {
    /// Build a profile from `(event_type, weight)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        Self(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
        )
    }

    /// Resolve an event type to its signed weight.
    ///
    /// 1. Exact match (`harm.fire`).
    /// 2. Category match (`harm`).
    /// 3. Default `0.0`.
    #[must_use]
    pub fn get(&self, event_type: &str) -> f64 {
        if let Some(weight) = self.0.get(event_type) {
            return *weight;
        }
        if let Some(weight) = self.0.get(event_category(event_type)) {
            return *weight;
        }
        0.0
    }

    /// Validate that every weight lies in `[-1, 1]`.
    ///
    /// # Errors
    /// Returns [`AffinityError::Validation`] naming the offending entry.
    pub fn validate(&self) -> Result<()> {
        for (event_type, weight) in &self.0 {
            if !(-1.0..=1.0).contains(weight) || !weight.is_finite() {
                return Err(AffinityError::Validation(format!(
                    "valuation weight for '{event_type}' is {weight}, outside [-1, 1]"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn forest_profile() -> ValuationProfile {
        ValuationProfile::from_pairs(&[
            ("harm", -0.15),
            ("harm.fire", -0.8),
            ("extract.hunt", -0.4),
            ("offer.gift", 0.5),
        ])
    }

    #[test]
    fn exact_match_wins() {
        let profile = forest_profile();
        assert!((profile.get("harm.fire") - (-0.8)).abs() < f64::EPSILON);
    }

    #[test]
    fn category_fallback() {
        let profile = forest_profile();
        assert!((profile.get("harm.poison") - (-0.15)).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_is_neutral() {
        let profile = forest_profile();
        assert!(profile.get("trade.fair").abs() < f64::EPSILON);
    }

    #[test]
    fn out_of_range_weight_rejected() {
        let profile = ValuationProfile::from_pairs(&[("harm", -1.5)]);
        assert!(profile.validate().is_err());
    }
}
