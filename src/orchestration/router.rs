// Copyright (c) 2024 Mike Tsao

use super::{EffectRegistry, EffectUid, InstrumentRegistry, Track, TrackUid};
use crate::{error::Error, graph::NodeUid, prelude::*};
use rustc_hash::FxHashMap;

/// What a [SignalRouter::reconnect()] pass did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RoutingReport {
    #[allow(missing_docs)]
    pub track_uid: TrackUid,
    /// The chain that was wired, instrument first, sink last.
    pub path: Vec<NodeUid>,
    /// Effects left out because their nodes weren't ready yet.
    pub deferred: Vec<EffectUid>,
    /// Connect/disconnect operations that failed. Each was skipped and
    /// wiring carried on.
    pub failures: Vec<String>,
}
impl RoutingReport {
    /// Whether the whole chain is in place.
    pub fn is_complete(&self) -> bool {
        self.deferred.is_empty() && self.failures.is_empty()
    }
}

/// [SignalRouter] wires each track's instrument through its effects to the
/// master sink. It rebuilds a track's chain from scratch every time, which
/// makes [SignalRouter::reconnect()] idempotent.
///
/// Effects whose nodes are still under construction are linked around, and
/// the track is remembered as pending, along with the effects left out,
/// until a later pass finds them ready.
#[derive(Debug, Default)]
pub struct SignalRouter {
    pending: FxHashMap<TrackUid, Vec<EffectUid>>,
}
impl SignalRouter {
    /// Rewires `track`: instrument, then each ready effect in order, then
    /// `sink`. A failure on any single edge is logged and recorded in the
    /// report, and wiring continues with the rest of the chain.
    pub fn reconnect(
        &mut self,
        graph: &mut dyn AudioGraph,
        sink: NodeUid,
        track: &Track,
        instruments: &InstrumentRegistry,
        effects: &EffectRegistry,
    ) -> RoutingReport {
        let mut report = RoutingReport {
            track_uid: track.uid,
            ..Default::default()
        };
        let Some(instrument) = instruments.get(track.instrument_uid) else {
            log::warn!(
                "track {} has no instrument {}; nothing to route",
                track.uid,
                track.instrument_uid
            );
            report.failures.push(
                Error::ResourceNotFound(format!("instrument {}", track.instrument_uid))
                    .to_string(),
            );
            self.pending.remove(&track.uid);
            return report;
        };

        let mut chain = vec![instrument.node()];
        for effect_uid in &track.effect_uids {
            let Some(effect) = effects.get(*effect_uid) else {
                log::warn!("track {} lists missing effect {effect_uid}", track.uid);
                continue;
            };
            let node = effect.node();
            if let Err(e) = graph.disconnect(node) {
                Self::record_failure(&mut report, format!("disconnecting effect {effect_uid}: {e}"));
            }
            if graph.is_node_ready(node) {
                chain.push(node);
            } else {
                log::debug!("effect {effect_uid} isn't ready; routing around it");
                report.deferred.push(*effect_uid);
            }
        }
        chain.push(sink);

        if let Err(e) = graph.disconnect(instrument.node()) {
            Self::record_failure(
                &mut report,
                format!("disconnecting instrument {}: {e}", track.instrument_uid),
            );
        }
        for pair in chain.windows(2) {
            if let Err(e) = graph.connect(pair[0], pair[1]) {
                Self::record_failure(
                    &mut report,
                    format!("connecting {} to {}: {e}", pair[0], pair[1]),
                );
            }
        }
        log::debug!(
            "track {} routed as {}",
            track.uid,
            chain
                .iter()
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(" -> ")
        );
        report.path = chain;

        if report.deferred.is_empty() {
            self.pending.remove(&track.uid);
        } else {
            self.pending.insert(track.uid, report.deferred.clone());
        }
        report
    }

    fn record_failure(report: &mut RoutingReport, message: String) {
        let e = Error::RoutingFailure(message);
        log::error!("{e}");
        report.failures.push(e.to_string());
    }

    /// Tracks whose chains are missing effects that weren't ready, in
    /// ascending uid order.
    pub fn pending_tracks(&self) -> Vec<TrackUid> {
        let mut r: Vec<TrackUid> = self.pending.keys().copied().collect();
        r.sort_by_key(|uid| uid.0);
        r
    }

    #[allow(missing_docs)]
    pub fn is_pending(&self, track_uid: TrackUid) -> bool {
        self.pending.contains_key(&track_uid)
    }

    /// The effects the last pass over `track_uid` had to leave out.
    pub fn deferred_effects(&self, track_uid: TrackUid) -> &[EffectUid] {
        self.pending
            .get(&track_uid)
            .map(|v| v.as_slice())
            .unwrap_or_default()
    }

    /// Stops tracking a track, typically because it was removed.
    pub fn forget(&mut self, track_uid: TrackUid) {
        self.pending.remove(&track_uid);
    }

    #[allow(missing_docs)]
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cores::{EffectKind, EffectType, InstrumentKind},
        graph::VirtualGraph,
        orchestration::TrackTitle,
    };

    struct Fixture {
        graph: VirtualGraph,
        instruments: InstrumentRegistry,
        effects: EffectRegistry,
        router: SignalRouter,
        track: Track,
    }
    impl Fixture {
        fn new() -> Self {
            let mut graph = VirtualGraph::new();
            graph.set_deferred_construction(false);
            assert!(graph.start().is_ok());
            let mut instruments = InstrumentRegistry::default();
            let sink = graph.destination();
            let instrument_uid = instruments
                .create(&mut graph, sink, InstrumentKind::default(), None)
                .unwrap();
            Self {
                graph,
                instruments,
                effects: EffectRegistry::default(),
                router: SignalRouter::default(),
                track: Track::new_with(TrackUid(1), TrackTitle::default(), instrument_uid),
            }
        }

        fn add(&mut self, effect_type: EffectType) -> EffectUid {
            let uid = self
                .effects
                .create(
                    &mut self.graph,
                    EffectKind::new_with(effect_type, None),
                    self.track.uid,
                    None,
                )
                .unwrap();
            self.track.effect_uids.push(uid);
            uid
        }

        fn reconnect(&mut self) -> RoutingReport {
            let sink = self.graph.destination();
            self.router.reconnect(
                &mut self.graph,
                sink,
                &self.track,
                &self.instruments,
                &self.effects,
            )
        }

        fn instrument_node(&self) -> NodeUid {
            self.instruments
                .get(self.track.instrument_uid)
                .unwrap()
                .node()
        }

        fn node(&self, uid: EffectUid) -> NodeUid {
            self.effects.get(uid).unwrap().node()
        }
    }

    #[test]
    fn chain_follows_effect_order() {
        let mut f = Fixture::new();
        let reverb = f.add(EffectType::Reverb);
        let delay = f.add(EffectType::Delay);
        let report = f.reconnect();
        assert!(report.is_complete());

        let expected = vec![
            f.instrument_node(),
            f.node(reverb),
            f.node(delay),
            f.graph.destination(),
        ];
        assert_eq!(report.path, expected);
        assert_eq!(f.graph.path_from(f.instrument_node()), expected);
    }

    #[test]
    fn reconnect_is_idempotent() {
        let mut f = Fixture::new();
        f.add(EffectType::Chorus);
        f.add(EffectType::Distortion);
        let first = f.reconnect();
        let edges: Vec<Vec<NodeUid>> = first
            .path
            .iter()
            .map(|n| f.graph.outputs_of(*n).to_vec())
            .collect();
        let second = f.reconnect();
        assert_eq!(first, second);
        let edges_again: Vec<Vec<NodeUid>> = second
            .path
            .iter()
            .map(|n| f.graph.outputs_of(*n).to_vec())
            .collect();
        assert_eq!(edges, edges_again);
    }

    #[test]
    fn removal_relinks_around_the_gap() {
        let mut f = Fixture::new();
        let e1 = f.add(EffectType::Reverb);
        let e2 = f.add(EffectType::Delay);
        let e3 = f.add(EffectType::Chorus);
        f.reconnect();

        f.track.effect_uids.retain(|u| *u != e2);
        assert!(f.effects.dispose(&mut f.graph, e2));
        f.reconnect();
        assert_eq!(
            f.graph.path_from(f.instrument_node()),
            vec![
                f.instrument_node(),
                f.node(e1),
                f.node(e3),
                f.graph.destination()
            ]
        );

        f.track.effect_uids.clear();
        f.effects.dispose_all(&mut f.graph);
        f.reconnect();
        assert_eq!(
            f.graph.path_from(f.instrument_node()),
            vec![f.instrument_node(), f.graph.destination()]
        );
    }

    #[test]
    fn reordering_leaves_no_stale_edges() {
        let mut f = Fixture::new();
        let e1 = f.add(EffectType::Reverb);
        let e2 = f.add(EffectType::Delay);
        f.reconnect();
        f.track.effect_uids = vec![e2, e1];
        f.reconnect();
        assert_eq!(f.graph.outputs_of(f.node(e2)), &[f.node(e1)]);
        assert_eq!(f.graph.outputs_of(f.node(e1)), &[f.graph.destination()]);
        assert_eq!(f.graph.outputs_of(f.instrument_node()), &[f.node(e2)]);
    }

    #[test]
    fn one_failed_edge_does_not_abort_the_pass() {
        let mut f = Fixture::new();
        let e1 = f.add(EffectType::Reverb);
        let e2 = f.add(EffectType::Delay);
        let e1_node = f.node(e1);
        f.graph.fail_connections_from(e1_node);
        let report = f.reconnect();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(f.graph.outputs_of(f.instrument_node()), &[e1_node]);
        assert_eq!(f.graph.outputs_of(f.node(e2)), &[f.graph.destination()]);
    }

    #[test]
    fn unready_effects_are_routed_around_until_ready() {
        let mut f = Fixture::new();
        f.graph.set_deferred_construction(true);
        let reverb = f.add(EffectType::Reverb);
        let delay = f.add(EffectType::Delay);
        let report = f.reconnect();
        assert_eq!(report.deferred, vec![reverb]);
        assert!(f.router.is_pending(f.track.uid));
        assert_eq!(f.router.deferred_effects(f.track.uid), &[reverb]);
        assert_eq!(
            f.graph.path_from(f.instrument_node()),
            vec![f.instrument_node(), f.node(delay), f.graph.destination()]
        );

        f.graph.complete_pending();
        let report = f.reconnect();
        assert!(report.is_complete());
        assert!(f.router.pending_tracks().is_empty());
        assert_eq!(
            f.graph.path_from(f.instrument_node()),
            vec![
                f.instrument_node(),
                f.node(reverb),
                f.node(delay),
                f.graph.destination()
            ]
        );
    }
}
