// Copyright (c) 2024 Mike Tsao

//! The traits that define the seams between the session and the world around
//! it: the rendering backend, storage, and procedural note generation.

use crate::{
    composition::Note,
    error::Result,
    graph::{NodeSpec, NodeUid, TriggerEvent},
    orchestration::CompositionRecord,
    types::Decibels,
};

/// Quick import of all important traits.
pub mod prelude {
    pub use super::{AudioGraph, CompositionStore, HasSettings, NoteGenerator, Serializable};
}

/// The opaque real-time renderer. Everything the session knows about live
/// signal-processing nodes goes through this trait, and only the registries
/// and the router call the node-level methods.
///
/// Node construction is two-phase. [AudioGraph::create_node()] returns a
/// handle right away, but some nodes (reverb, which needs its impulse
/// response computed) aren't connectable until [AudioGraph::is_node_ready()]
/// says so.
pub trait AudioGraph: core::fmt::Debug {
    /// Bootstraps the audio context. Typically called once, in response to
    /// the first user gesture.
    fn start(&mut self) -> Result<()>;

    /// Whether [AudioGraph::start()] has succeeded.
    fn is_started(&self) -> bool;

    /// The hardware output.
    fn destination(&self) -> NodeUid;

    /// Allocates a live node.
    fn create_node(&mut self, spec: &NodeSpec) -> Result<NodeUid>;

    /// Whether the node has finished construction and can be connected.
    fn is_node_ready(&self, node: NodeUid) -> bool;

    /// Adds an edge from `source` to `destination`.
    fn connect(&mut self, source: NodeUid, destination: NodeUid) -> Result<()>;

    /// Removes every outgoing edge of `source`. A node with no outputs is
    /// not an error.
    fn disconnect(&mut self, source: NodeUid) -> Result<()>;

    /// Releases the node and every edge touching it.
    fn dispose_node(&mut self, node: NodeUid) -> Result<()>;

    /// Sets the output level of a node.
    fn set_volume(&mut self, node: NodeUid, volume: Decibels) -> Result<()>;

    /// Schedules a note-on and matching note-off on an instrument node.
    fn trigger_attack_release(&mut self, event: &TriggerEvent) -> Result<()>;
}

/// The external persistence collaborator. Implementations own the on-disk (or
/// in-browser, or in-memory) format; the session only hands them records.
pub trait CompositionStore {
    /// Writes the record. The store assigns an id if the record has none and
    /// stamps `created_at`/`updated_at`, writing them back into `record`.
    /// Returns the id.
    fn save(&mut self, record: &mut CompositionRecord) -> anyhow::Result<String>;

    /// Reads the record with the given id.
    fn load(&self, id: &str) -> anyhow::Result<CompositionRecord>;

    /// Overwrites the single auto-save slot.
    fn autosave(&mut self, record: &CompositionRecord) -> anyhow::Result<()>;

    /// Reads the auto-save slot. [None] if nothing has been auto-saved.
    fn load_autosave(&self) -> anyhow::Result<Option<CompositionRecord>>;

    /// Whether the auto-save slot holds anything.
    fn has_autosave(&self) -> bool {
        self.load_autosave().is_ok_and(|r| r.is_some())
    }
}

/// A procedural note generator. Given a pattern's notes and its length, it
/// returns the new notes. It must be deterministic given its inputs.
pub trait NoteGenerator {
    #[allow(missing_docs)]
    fn generate(&mut self, notes: &[Note], length: usize) -> Vec<Note>;
}
impl<F> NoteGenerator for F
where
    F: FnMut(&[Note], usize) -> Vec<Note>,
{
    fn generate(&mut self, notes: &[Note], length: usize) -> Vec<Note> {
        self(notes, length)
    }
}

/// Methods that help manage persistent settings.
pub trait HasSettings {
    /// Whether the current state has been saved.
    fn has_been_saved(&self) -> bool;
    /// Marks the state as changed since the last save.
    fn needs_save(&mut self);
    /// Marks the state as saved.
    fn mark_clean(&mut self);
}

/// Hooks that let a struct rebuild its derived state after deserialization.
pub trait Serializable {
    /// Called just after deserialization.
    fn after_deser(&mut self) {}
}
