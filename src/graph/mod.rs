// Copyright (c) 2024 Mike Tsao

//! Vocabulary shared by every [AudioGraph](crate::traits::AudioGraph)
//! implementation, plus [VirtualGraph], the in-memory one.

use crate::{cores::EffectKind, cores::InstrumentKind, prelude::*, types::declare_uid};

/// The most commonly used imports.
pub mod prelude {
    pub use super::{NodeSpec, NodeUid, TriggerEvent, VirtualGraph};
}

pub use virtual_graph::{VirtualGraph, VirtualNode};

mod virtual_graph;

declare_uid!(
    /// Identifies a live node inside the rendering backend.
    NodeUid
);

/// What kind of live node to build.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NodeSpec {
    /// A sound source.
    Instrument(InstrumentKind),
    /// A signal processor.
    Effect(EffectKind),
    /// The gain stage every chain ends at, just before the hardware output.
    MasterVolume(Decibels),
}
impl NodeSpec {
    /// Whether the node needs buffers precomputed before it can be
    /// connected.
    pub fn requires_precompute(&self) -> bool {
        match self {
            NodeSpec::Effect(kind) => kind.requires_precompute(),
            NodeSpec::Instrument(_) | NodeSpec::MasterVolume(_) => false,
        }
    }
}

/// One note-on/note-off pair, fully resolved for the renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerEvent {
    /// The instrument node that plays the note.
    pub node: NodeUid,
    #[allow(missing_docs)]
    pub pitch: Pitch,
    /// Where on the transport the note starts.
    pub position: MusicalTime,
    /// When the note starts, in seconds of transport time. This comes from
    /// the clock, not from when the scheduler happened to run.
    pub time: Seconds,
    /// How long until note-off, at the tempo in force when scheduled.
    pub duration: Seconds,
    /// Amplitude, taken from the note's velocity.
    pub velocity: Normal,
}
impl TriggerEvent {
    #[allow(missing_docs)]
    pub fn frequency(&self) -> FrequencyHz {
        self.pitch.frequency()
    }
}
