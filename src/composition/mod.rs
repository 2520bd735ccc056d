// Copyright (c) 2024 Mike Tsao

//! Step patterns and the scheduler that plays them.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        Note, Pattern, PatternBuilder, PatternScheduler, PatternUid, ScheduledTrigger,
        SequenceUid,
    };
}

pub use note::Note;
pub use pattern::{Pattern, PatternBuilder, PatternBuilderError};
pub use scheduler::{
    PatternScheduler, PatternUid, ScheduledTrigger, SequenceUid, TriggerFn,
};

mod note;
mod pattern;
mod scheduler;
