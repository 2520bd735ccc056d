// Copyright (c) 2024 Mike Tsao

use super::{NodeSpec, NodeUid, TriggerEvent};
use crate::{error::Error, error::Result, prelude::*};
use rustc_hash::{FxHashMap, FxHashSet};

/// A node as [VirtualGraph] tracks it.
#[derive(Clone, Debug, PartialEq)]
pub struct VirtualNode {
    /// What the node was built from. [None] for the hardware output.
    pub spec: Option<NodeSpec>,
    /// Whether construction has finished.
    pub is_ready: bool,
    /// The most recent level set on the node.
    pub volume: Decibels,
}

/// An [AudioGraph] that renders nothing. It keeps the node table and edge
/// lists a real renderer would, logs every trigger it receives, and can be
/// told to misbehave, which makes it the backend for headless use and tests.
///
/// Nodes that need precomputed buffers are created not-ready and stay that way
/// until [VirtualGraph::complete_pending()] runs, unless deferral is turned
/// off with [VirtualGraph::set_deferred_construction()].
#[derive(Debug)]
pub struct VirtualGraph {
    uid_factory: UidFactory<NodeUid>,
    destination: NodeUid,
    nodes: FxHashMap<NodeUid, VirtualNode>,
    outputs: FxHashMap<NodeUid, Vec<NodeUid>>,
    triggers: Vec<TriggerEvent>,

    is_started: bool,
    defer_construction: bool,
    fail_start: bool,
    failing_sources: FxHashSet<NodeUid>,
}
impl Default for VirtualGraph {
    fn default() -> Self {
        let uid_factory = UidFactory::<NodeUid>::default();
        let destination = uid_factory.mint_next();
        let mut nodes = FxHashMap::default();
        nodes.insert(
            destination,
            VirtualNode {
                spec: None,
                is_ready: true,
                volume: Decibels::UNITY,
            },
        );
        Self {
            uid_factory,
            destination,
            nodes,
            outputs: Default::default(),
            triggers: Default::default(),
            is_started: false,
            defer_construction: true,
            fail_start: false,
            failing_sources: Default::default(),
        }
    }
}
impl VirtualGraph {
    /// Creates a graph whose hardware output already exists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next [AudioGraph::start()] fail, as if the platform refused
    /// to open an audio context.
    pub fn fail_start(&mut self, should_fail: bool) {
        self.fail_start = should_fail;
    }

    /// Makes every connection out of `node` fail until cleared.
    pub fn fail_connections_from(&mut self, node: NodeUid) {
        self.failing_sources.insert(node);
    }

    /// Undoes [VirtualGraph::fail_connections_from()].
    pub fn clear_connection_failures(&mut self) {
        self.failing_sources.clear();
    }

    /// Whether nodes needing precomputed buffers start out not ready.
    pub fn set_deferred_construction(&mut self, defer: bool) {
        self.defer_construction = defer;
    }

    /// Finishes construction of every node still being built. Returns how
    /// many nodes became ready.
    pub fn complete_pending(&mut self) -> usize {
        let mut count = 0;
        self.nodes.values_mut().filter(|n| !n.is_ready).for_each(|n| {
            n.is_ready = true;
            count += 1;
        });
        count
    }

    #[allow(missing_docs)]
    pub fn node(&self, node: NodeUid) -> Option<&VirtualNode> {
        self.nodes.get(&node)
    }

    #[allow(missing_docs)]
    pub fn contains_node(&self, node: NodeUid) -> bool {
        self.nodes.contains_key(&node)
    }

    /// The number of live nodes, not counting the hardware output.
    pub fn live_node_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    /// The nodes `node` feeds, in the order they were connected.
    pub fn outputs_of(&self, node: NodeUid) -> &[NodeUid] {
        self.outputs.get(&node).map(|v| v.as_slice()).unwrap_or_default()
    }

    /// Follows first outputs from `node` until reaching a node with none.
    /// The result starts with `node` itself.
    pub fn path_from(&self, node: NodeUid) -> Vec<NodeUid> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(next) = self.outputs_of(current).first() {
            if path.contains(next) {
                break;
            }
            path.push(*next);
            current = *next;
        }
        path
    }

    /// Every trigger received so far, in order.
    pub fn triggers(&self) -> &[TriggerEvent] {
        &self.triggers
    }

    /// Returns and forgets the triggers received so far.
    pub fn take_triggers(&mut self) -> Vec<TriggerEvent> {
        core::mem::take(&mut self.triggers)
    }

    fn check_exists(&self, node: NodeUid) -> Result<&VirtualNode> {
        self.nodes
            .get(&node)
            .ok_or_else(|| Error::Backend(format!("node {node} does not exist")))
    }
}
impl AudioGraph for VirtualGraph {
    fn start(&mut self) -> Result<()> {
        if self.fail_start {
            return Err(Error::GraphNotReady(
                "audio context could not be started".to_string(),
            ));
        }
        self.is_started = true;
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.is_started
    }

    fn destination(&self) -> NodeUid {
        self.destination
    }

    fn create_node(&mut self, spec: &NodeSpec) -> Result<NodeUid> {
        if !self.is_started {
            return Err(Error::GraphNotReady(
                "nodes can't be created before start()".to_string(),
            ));
        }
        let uid = self.uid_factory.mint_next();
        let volume = match spec {
            NodeSpec::MasterVolume(volume) => *volume,
            _ => Decibels::UNITY,
        };
        self.nodes.insert(
            uid,
            VirtualNode {
                spec: Some(*spec),
                is_ready: !(self.defer_construction && spec.requires_precompute()),
                volume,
            },
        );
        Ok(uid)
    }

    fn is_node_ready(&self, node: NodeUid) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.is_ready)
    }

    fn connect(&mut self, source: NodeUid, destination: NodeUid) -> Result<()> {
        if self.failing_sources.contains(&source) {
            return Err(Error::Backend(format!(
                "connection from {source} was refused"
            )));
        }
        for node in [source, destination] {
            if !self.check_exists(node)?.is_ready {
                return Err(Error::Backend(format!("node {node} is still under construction")));
            }
        }
        let outputs = self.outputs.entry(source).or_default();
        if !outputs.contains(&destination) {
            outputs.push(destination);
        }
        Ok(())
    }

    fn disconnect(&mut self, source: NodeUid) -> Result<()> {
        self.check_exists(source)?;
        self.outputs.remove(&source);
        Ok(())
    }

    fn dispose_node(&mut self, node: NodeUid) -> Result<()> {
        if node == self.destination {
            return Err(Error::Backend("the hardware output can't be disposed".to_string()));
        }
        self.check_exists(node)?;
        self.nodes.remove(&node);
        self.outputs.remove(&node);
        self.outputs.values_mut().for_each(|v| v.retain(|n| *n != node));
        self.failing_sources.remove(&node);
        Ok(())
    }

    fn set_volume(&mut self, node: NodeUid, volume: Decibels) -> Result<()> {
        match self.nodes.get_mut(&node) {
            Some(n) => {
                n.volume = volume;
                Ok(())
            }
            None => Err(Error::Backend(format!("node {node} does not exist"))),
        }
    }

    fn trigger_attack_release(&mut self, event: &TriggerEvent) -> Result<()> {
        let spec = self.check_exists(event.node)?.spec;
        match spec {
            Some(NodeSpec::Instrument(_)) => {
                self.triggers.push(*event);
                Ok(())
            }
            _ => Err(Error::Backend(format!(
                "node {} can't play notes",
                event.node
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cores::{EffectKind, EffectType, InstrumentKind};

    fn started() -> VirtualGraph {
        let mut g = VirtualGraph::new();
        assert!(g.start().is_ok());
        g
    }

    #[test]
    fn nodes_need_a_started_graph() {
        let mut g = VirtualGraph::new();
        assert!(matches!(
            g.create_node(&NodeSpec::Instrument(InstrumentKind::default())),
            Err(Error::GraphNotReady(_))
        ));
        g.fail_start(true);
        assert!(g.start().is_err());
        assert!(!g.is_started());
        g.fail_start(false);
        assert!(g.start().is_ok());
        assert!(g
            .create_node(&NodeSpec::Instrument(InstrumentKind::default()))
            .is_ok());
    }

    #[test]
    fn reverb_is_deferred_until_completed() {
        let mut g = started();
        let reverb = g
            .create_node(&NodeSpec::Effect(EffectKind::new_with(EffectType::Reverb, None)))
            .unwrap();
        let delay = g
            .create_node(&NodeSpec::Effect(EffectKind::new_with(EffectType::Delay, None)))
            .unwrap();
        assert!(!g.is_node_ready(reverb));
        assert!(g.is_node_ready(delay));
        assert!(g.connect(delay, reverb).is_err(), "unready nodes can't be connected");

        assert_eq!(g.complete_pending(), 1);
        assert!(g.is_node_ready(reverb));
        assert!(g.connect(delay, reverb).is_ok());
    }

    #[test]
    fn dispose_removes_edges_in_both_directions() {
        let mut g = started();
        let a = g
            .create_node(&NodeSpec::Instrument(InstrumentKind::default()))
            .unwrap();
        let b = g
            .create_node(&NodeSpec::Effect(EffectKind::new_with(EffectType::Chorus, None)))
            .unwrap();
        let dest = g.destination();
        assert!(g.connect(a, b).is_ok());
        assert!(g.connect(b, dest).is_ok());
        assert_eq!(g.path_from(a), vec![a, b, dest]);

        assert!(g.dispose_node(b).is_ok());
        assert!(g.outputs_of(a).is_empty());
        assert_eq!(g.live_node_count(), 1);
        assert!(g.dispose_node(b).is_err(), "the backend itself isn't idempotent");
        assert!(g.dispose_node(dest).is_err());
    }

    #[test]
    fn default_graph_has_a_hardware_output() {
        let g = VirtualGraph::default();
        assert!(g.contains_node(g.destination()));
        assert_eq!(g.live_node_count(), 0);

        let mut g = VirtualGraph::default();
        assert!(g.start().is_ok());
        let a = g
            .create_node(&NodeSpec::Instrument(InstrumentKind::default()))
            .unwrap();
        assert_ne!(a, g.destination());
        let dest = g.destination();
        assert!(g.connect(a, dest).is_ok());
        assert_eq!(g.path_from(a), vec![a, dest]);
    }

    #[test]
    fn connecting_twice_adds_one_edge() {
        let mut g = started();
        let a = g
            .create_node(&NodeSpec::Instrument(InstrumentKind::default()))
            .unwrap();
        let dest = g.destination();
        assert!(g.connect(a, dest).is_ok());
        assert!(g.connect(a, dest).is_ok());
        assert_eq!(g.outputs_of(a), &[dest]);
        assert!(g.disconnect(a).is_ok());
        assert!(g.disconnect(a).is_ok(), "disconnecting a bare node is fine");
    }
}
