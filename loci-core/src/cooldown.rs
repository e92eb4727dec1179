//! Cooldown registry for affordance triggers.
//!
//! Tokens name an `(affordance, actor, entity)` triple. A token is active
//! while `now < expiry`. Writing a token with an earlier expiry never
//! shortens an active cooldown: cooldowns are monotonically extensible only.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::types::{ActorId, EntityId};

/// Build the token for an `(affordance, actor, entity)` triple.
#[must_use]
pub fn cooldown_token(affordance: &str, actor: &ActorId, entity: &EntityId) -> String {
    format!("{affordance}:{actor}:{entity}")
}

/// Mapping from cooldown token to expiry timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CooldownRegistry {
    entries: BTreeMap<String, Timestamp>,
}

impl CooldownRegistry {
    /// Whether a token is still cooling down at `now`.
    #[must_use]
    pub fn is_active(&self, token: &str, now: Timestamp) -> bool {
        self.entries.get(token).is_some_and(|expiry| now < *expiry)
    }

    /// Engage a cooldown until `expiry`. An existing later expiry wins.
    pub fn engage(&mut self, token: impl Into<String>, expiry: Timestamp) {
        let entry = self.entries.entry(token.into()).or_insert(expiry);
        if expiry > *entry {
            *entry = expiry;
        }
    }

    /// Remove entries whose expiry has passed. Returns how many were swept.
    pub fn sweep(&mut self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expiry| now < *expiry);
        before - self.entries.len()
    }

    /// Drop every cooldown (admin reset).
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of tracked tokens, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry tracks no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
