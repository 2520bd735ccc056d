// Copyright (c) 2024 Mike Tsao

//! Configuration and the in-memory storage collaborator.

/// Commonly used imports.
pub mod prelude {
    pub use super::{InMemoryCompositionStore, SessionSettings, SessionSettingsBuilder};
}

pub use settings::{SessionSettings, SessionSettingsBuilder, SessionSettingsBuilderError, Theme};
pub use store::{InMemoryCompositionStore, StoredCompositionInfo};

mod settings;
mod store;
