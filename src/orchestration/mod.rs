// Copyright (c) 2024 Mike Tsao

//! Tracks, their instruments and effect chains, and the session that owns
//! them all.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        CompositionRecord, CompositionSession, EffectUid, InstrumentUid, SessionState, Track,
        TrackManager, TrackTitle, TrackUid,
    };
}

pub use {
    record::{CompositionRecord, EffectRecord, PatternRecord, TrackRecord},
    repositories::{Effect, EffectRegistry, EffectUid, Instrument, InstrumentRegistry, InstrumentUid},
    router::{RoutingReport, SignalRouter},
    session::{CompositionMetadata, CompositionSession, SessionState},
    track::{Track, TrackTitle, TrackUid, TrackUidFactory},
    track_manager::TrackManager,
};

mod record;
mod repositories;
mod router;
mod session;
mod track;
mod track_manager;
