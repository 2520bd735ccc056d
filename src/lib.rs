// Copyright (c) 2024 Mike Tsao

#![warn(missing_docs, unused_imports, unused_variables)]
#![allow(rustdoc::private_intra_doc_links)]

//! Soundscape is the audio-graph and scheduling engine of a step-sequencer
//! music studio.
//!
//! A [CompositionSession] owns everything. Give it an
//! [AudioGraph](traits::AudioGraph) to render into (or a
//! [VirtualGraph](graph::VirtualGraph) for headless use), then:
//!
//! * Create tracks. Each owns exactly one instrument, an ordered chain of
//! effects, and any number of step [Pattern](composition::Pattern)s.
//! * Call [CompositionSession::toggle_play()] to start the transport, and
//! [CompositionSession::advance()] as time passes. The session issues a
//! trigger to the graph for every note that falls within each span.
//! * Edit freely while playing. Effect chains are rewired and pattern
//! schedules replaced as part of each edit, so nothing stale ever sounds.
//! * Persist with [CompositionSession::serialize_composition()] and
//! [CompositionSession::load_composition()], or through a
//! [CompositionStore](traits::CompositionStore).

/// A collection of imports that are useful to users of this crate. `use
/// soundscape::prelude::*;` for easier onboarding.
pub mod prelude {
    pub use super::{
        composition::prelude::*, elements::prelude::*, graph::prelude::*,
        orchestration::prelude::*, traits::prelude::*, types::prelude::*, util::prelude::*,
    };
}

// Fundamental structures that are important enough to re-export at top level.
pub use {
    error::{Error, Result},
    orchestration::CompositionSession,
};

pub mod composition;
pub mod cores;
pub mod elements;
pub mod error;
pub mod graph;
pub mod orchestration;
pub mod traits;
pub mod types;
pub mod util;
