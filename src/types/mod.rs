// Copyright (c) 2024 Mike Tsao

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        Decibels, FrequencyHz, IsUid, MusicalTime, NoteValue, Normal, Pitch, Seconds, Tempo,
        TimeRange, UidFactory,
    };
}

pub use {
    note::Pitch,
    numbers::{Decibels, FrequencyHz},
    ranges::{Normal, RangedF64},
    time::{MusicalTime, NoteValue, Seconds, Tempo, TimeRange},
    uid::{IsUid, UidFactory},
};
pub(crate) use uid::declare_uid;

mod note;
mod numbers;
mod ranges;
mod time;
mod uid;
