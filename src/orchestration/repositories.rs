// Copyright (c) 2024 Mike Tsao

use super::TrackUid;
use crate::{
    cores::{EffectKind, EffectType, InstrumentKind, InstrumentType},
    error::{Error, Result},
    graph::{NodeSpec, NodeUid},
    prelude::*,
    types::declare_uid,
};
use rustc_hash::FxHashMap;

declare_uid!(
    /// Identifies an [Instrument].
    InstrumentUid
);
declare_uid!(
    /// Identifies an [Effect].
    EffectUid
);

/// A synthesizer with its live node.
#[derive(Clone, Debug, PartialEq)]
pub struct Instrument {
    uid: InstrumentUid,
    kind: InstrumentKind,
    node: NodeUid,
}
#[allow(missing_docs)]
impl Instrument {
    pub fn uid(&self) -> InstrumentUid {
        self.uid
    }
    pub fn kind(&self) -> &InstrumentKind {
        &self.kind
    }
    pub fn instrument_type(&self) -> InstrumentType {
        self.kind.instrument_type()
    }
    /// The live node. Only the router and the registries should touch it.
    pub fn node(&self) -> NodeUid {
        self.node
    }
}

/// A signal processor with its live node and owning track.
#[derive(Clone, Debug, PartialEq)]
pub struct Effect {
    uid: EffectUid,
    kind: EffectKind,
    track_uid: TrackUid,
    node: NodeUid,
}
#[allow(missing_docs)]
impl Effect {
    pub fn uid(&self) -> EffectUid {
        self.uid
    }
    pub fn kind(&self) -> &EffectKind {
        &self.kind
    }
    pub fn effect_type(&self) -> EffectType {
        self.kind.effect_type()
    }
    pub fn track_uid(&self) -> TrackUid {
        self.track_uid
    }
    pub fn node(&self) -> NodeUid {
        self.node
    }
}

// Disconnects and releases a node, logging rather than failing.
fn release_node(graph: &mut dyn AudioGraph, node: NodeUid) {
    if let Err(e) = graph.disconnect(node) {
        log::warn!("while disconnecting node {node} for disposal: {e}");
    }
    if let Err(e) = graph.dispose_node(node) {
        log::warn!("while disposing node {node}: {e}");
    }
}

/// Picks the uid for a new record: the requested one if it's free, otherwise
/// a fresh one.
fn choose_uid<U: IsUid>(factory: &UidFactory<U>, requested: Option<U>) -> U {
    match requested {
        Some(uid) if factory.is_unminted(uid) => {
            factory.notify_externally_minted_uid(uid);
            uid
        }
        _ => factory.mint_next(),
    }
}

/// Creates, owns, and disposes [Instrument]s.
#[derive(Debug, Default)]
pub struct InstrumentRegistry {
    uid_factory: UidFactory<InstrumentUid>,
    instruments: FxHashMap<InstrumentUid, Instrument>,
    uids: Vec<InstrumentUid>,
}
impl InstrumentRegistry {
    /// Builds a live node for `kind` and connects it to `sink`. A failed
    /// connection is logged and the instrument is still returned, silent
    /// until the router wires it. Pass `uid` to restore a persisted id.
    pub fn create(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        kind: InstrumentKind,
        uid: Option<InstrumentUid>,
    ) -> Result<InstrumentUid> {
        let node = graph.create_node(&NodeSpec::Instrument(kind))?;
        if let Err(e) = graph.connect(node, sink) {
            log::error!("{}", Error::RoutingFailure(format!("new instrument: {e}")));
        }
        let uid = choose_uid(&self.uid_factory, uid);
        log::debug!("created instrument {uid} ({}) on node {node}", kind.instrument_type());
        self.instruments.insert(uid, Instrument { uid, kind, node });
        self.uids.push(uid);
        Ok(uid)
    }

    /// Releases the instrument's node. Returns false, without complaint, if
    /// there was nothing to release.
    pub fn dispose(&mut self, graph: &mut dyn AudioGraph, uid: InstrumentUid) -> bool {
        if let Some(instrument) = self.instruments.remove(&uid) {
            self.uids.retain(|u| *u != uid);
            release_node(graph, instrument.node);
            log::debug!("disposed instrument {uid}");
            true
        } else {
            false
        }
    }

    /// Releases every instrument.
    pub fn dispose_all(&mut self, graph: &mut dyn AudioGraph) {
        for uid in self.uids.clone() {
            self.dispose(graph, uid);
        }
    }

    #[allow(missing_docs)]
    pub fn get(&self, uid: InstrumentUid) -> Option<&Instrument> {
        self.instruments.get(&uid)
    }

    #[allow(missing_docs)]
    pub fn contains(&self, uid: InstrumentUid) -> bool {
        self.instruments.contains_key(&uid)
    }

    /// Every live instrument, in creation order.
    pub fn uids(&self) -> &[InstrumentUid] {
        &self.uids
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

/// Creates, owns, and disposes [Effect]s.
#[derive(Debug, Default)]
pub struct EffectRegistry {
    uid_factory: UidFactory<EffectUid>,
    effects: FxHashMap<EffectUid, Effect>,
    uids: Vec<EffectUid>,
}
impl EffectRegistry {
    /// Builds a live node for `kind`, owned by `track_uid`. The node isn't
    /// connected to anything; that's the router's job, and some nodes can't
    /// be connected until their construction finishes. Parameters are taken
    /// as given, never renormalized.
    pub fn create(
        &mut self,
        graph: &mut dyn AudioGraph,
        kind: EffectKind,
        track_uid: TrackUid,
        uid: Option<EffectUid>,
    ) -> Result<EffectUid> {
        let node = graph.create_node(&NodeSpec::Effect(kind))?;
        let uid = choose_uid(&self.uid_factory, uid);
        log::debug!(
            "created effect {uid} ({}) on node {node} for track {track_uid}",
            kind.effect_type()
        );
        self.effects.insert(
            uid,
            Effect {
                uid,
                kind,
                track_uid,
                node,
            },
        );
        self.uids.push(uid);
        Ok(uid)
    }

    /// Releases the effect's node. Returns false if there was nothing to
    /// release.
    pub fn dispose(&mut self, graph: &mut dyn AudioGraph, uid: EffectUid) -> bool {
        if let Some(effect) = self.effects.remove(&uid) {
            self.uids.retain(|u| *u != uid);
            release_node(graph, effect.node);
            log::debug!("disposed effect {uid}");
            true
        } else {
            false
        }
    }

    /// Releases every effect.
    pub fn dispose_all(&mut self, graph: &mut dyn AudioGraph) {
        for uid in self.uids.clone() {
            self.dispose(graph, uid);
        }
    }

    #[allow(missing_docs)]
    pub fn get(&self, uid: EffectUid) -> Option<&Effect> {
        self.effects.get(&uid)
    }

    #[allow(missing_docs)]
    pub fn contains(&self, uid: EffectUid) -> bool {
        self.effects.contains_key(&uid)
    }

    /// The effects owned by `track_uid`, in creation order.
    pub fn uids_for_track(&self, track_uid: TrackUid) -> Vec<EffectUid> {
        self.uids
            .iter()
            .filter(|uid| {
                self.effects
                    .get(uid)
                    .is_some_and(|e| e.track_uid == track_uid)
            })
            .copied()
            .collect()
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.effects.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::VirtualGraph;
    use strum::IntoEnumIterator;

    fn started_graph() -> VirtualGraph {
        let mut g = VirtualGraph::new();
        assert!(g.start().is_ok());
        g
    }

    #[test]
    fn create_then_dispose_retains_nothing() {
        let mut g = started_graph();
        let sink = g.destination();
        let mut r = InstrumentRegistry::default();
        for t in InstrumentType::iter() {
            let uid = r
                .create(&mut g, sink, InstrumentKind::new_with(t, None), None)
                .unwrap();
            let node = r.get(uid).unwrap().node();
            assert_eq!(g.outputs_of(node), &[sink]);
            assert!(r.dispose(&mut g, uid));
            assert!(!g.contains_node(node), "{t} node should be gone");
            assert!(!r.dispose(&mut g, uid), "second dispose is a no-op");
        }
        assert!(r.is_empty());
        assert_eq!(g.live_node_count(), 0);
    }

    #[test]
    fn dispose_of_unknown_id_is_a_no_op() {
        let mut g = started_graph();
        let mut r = EffectRegistry::default();
        assert!(!r.dispose(&mut g, EffectUid(12345)));
    }

    #[test]
    fn effects_are_grouped_by_track() {
        let mut g = started_graph();
        let mut r = EffectRegistry::default();
        let a = r
            .create(&mut g, EffectKind::default(), TrackUid(1), None)
            .unwrap();
        let b = r
            .create(&mut g, EffectKind::default(), TrackUid(2), None)
            .unwrap();
        let c = r
            .create(&mut g, EffectKind::default(), TrackUid(1), None)
            .unwrap();
        assert_eq!(r.uids_for_track(TrackUid(1)), vec![a, c]);
        assert_eq!(r.uids_for_track(TrackUid(2)), vec![b]);
        r.dispose_all(&mut g);
        assert!(r.is_empty());
        assert_eq!(g.live_node_count(), 0);
    }

    #[test]
    fn creation_needs_a_started_graph() {
        let mut g = VirtualGraph::new();
        let sink = g.destination();
        let mut r = InstrumentRegistry::default();
        assert!(matches!(
            r.create(&mut g, sink, InstrumentKind::default(), None),
            Err(Error::GraphNotReady(_))
        ));
        assert!(r.is_empty());
    }

    #[test]
    fn a_failed_connection_still_yields_an_instrument() {
        let mut g = started_graph();
        let mut r = InstrumentRegistry::default();
        let uid = r
            .create(&mut g, NodeUid(9999), InstrumentKind::default(), None)
            .unwrap();
        assert!(g.outputs_of(r.get(uid).unwrap().node()).is_empty());
    }
}
