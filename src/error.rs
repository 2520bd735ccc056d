// Copyright (c) 2024 Mike Tsao

//! The crate-wide error type.

use thiserror::Error as ThisError;

/// Everything that can go wrong inside a session. Most of these are recovered
/// where they occur and only logged; see the individual operations for which
/// ones reach the caller.
#[derive(Debug, ThisError)]
pub enum Error {
    /// An instrument or effect type name that isn't one of the known
    /// variants.
    #[error("unsupported {kind} variant '{name}'")]
    UnsupportedVariant {
        /// "instrument" or "effect".
        kind: &'static str,
        /// The name that was asked for.
        name: String,
    },

    /// The audio graph hasn't been bootstrapped yet, or bootstrapping failed.
    #[error("audio graph is not ready: {0}")]
    GraphNotReady(String),

    /// A single connect or disconnect failed while wiring a chain.
    #[error("routing failed: {0}")]
    RoutingFailure(String),

    /// A track, instrument, effect or pattern id that no longer exists.
    #[error("{0} not found")]
    ResourceNotFound(String),

    /// Propagated from the external storage collaborator.
    #[error("storage failed: {0}")]
    StorageFailure(#[from] anyhow::Error),

    /// The rendering backend refused a node operation.
    #[error("audio backend error: {0}")]
    Backend(String),

    /// A pitch name that couldn't be parsed.
    #[error("invalid pitch '{0}'")]
    InvalidPitch(String),
}

/// Shorthand for results carrying [Error].
pub type Result<T> = core::result::Result<T, Error>;
