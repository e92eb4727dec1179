//! Error types for the affinity core.

use thiserror::Error;

/// Top-level error type for all affinity operations.
#[derive(Error, Debug)]
pub enum AffinityError {
    /// An affordance, handle, tell, or profile failed load-time validation.
    /// Fatal: aborts startup.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The host referenced an entity id the core has never seen.
    /// Surfaced to the caller; no mutation occurs.
    #[error("Unknown entity: {0}")]
    UnknownEntity(crate::EntityId),

    /// The host referenced a trigger id with no stored snapshot.
    #[error("Unknown trigger: {0}")]
    UnknownTrigger(crate::TriggerId),

    /// Replay produced a result differing from the stored snapshot.
    #[error("Snapshot mismatch for {trigger}: recomputed affinity {recomputed}, stored {stored}")]
    SnapshotMismatch {
        /// Which trigger's snapshot failed verification.
        trigger: crate::TriggerId,
        /// Affinity recomputed from the frozen traces.
        recomputed: f64,
        /// Affinity stored at trigger time.
        stored: f64,
    },

    /// Configuration could not be parsed or failed range validation.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error (config file loading).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, AffinityError>;
