//! Builds a [`ReconstructionTree`] from a possibly cyclic [`RotationGraph`].

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use super::graph::{PlateId, RotationGraph};
use super::tree::{ReconstructionTree, ReconstructionTreeEdge, TreeEdgeId};
use crate::time::GeoTimeInstant;

#[derive(Debug, Clone, Copy)]
enum Phase {
    Incoming,
    Outgoing(usize),
}

/// One pending plate of the depth-first traversal.
#[derive(Debug)]
struct Frame {
    plate_id: PlateId,
    edge: Option<TreeEdgeId>,
    phase: Phase,
}

struct TreeBuilder<'a> {
    graph: &'a RotationGraph,
    anchor_plate_id: PlateId,
    time: GeoTimeInstant,
    edges: Vec<ReconstructionTreeEdge>,
    root_edges: Vec<TreeEdgeId>,
    edges_by_moving_plate: HashMap<PlateId, TreeEdgeId>,
}

impl<'a> TreeBuilder<'a> {
    fn new(graph: &'a RotationGraph, anchor_plate_id: PlateId, time: GeoTimeInstant) -> Self {
        Self {
            graph,
            anchor_plate_id,
            time,
            edges: Vec::new(),
            root_edges: Vec::new(),
            edges_by_moving_plate: HashMap::new(),
        }
    }

    /// Depth-first traversal from the anchor.
    ///
    /// Each frame first considers one reversed (incoming) edge, then every
    /// forward (outgoing) edge, descending into each accepted edge before
    /// moving on to the next candidate.
    fn traverse(&mut self) {
        let mut stack = vec![Frame {
            plate_id: self.anchor_plate_id,
            edge: None,
            phase: Phase::Incoming,
        }];

        while let Some(frame) = stack.last_mut() {
            let plate_id = frame.plate_id;
            let parent = frame.edge;

            match frame.phase {
                Phase::Incoming => {
                    frame.phase = Phase::Outgoing(0);

                    // Reversed edges only continue an unbroken reversed chain
                    // from the anchor.
                    let may_reverse = parent.map_or(true, |id| self.edges[id.0].reversed);
                    if !may_reverse {
                        continue;
                    }
                    let candidate = self
                        .graph
                        .incoming_edges(plate_id)
                        .iter()
                        .copied()
                        .find(|&e| self.graph.edge(e).is_valid_at(self.time));
                    if let Some(graph_edge) = candidate {
                        let moving = self.graph.edge(graph_edge).fixed_plate_id();
                        if let Some(child) = self.try_add_edge(plate_id, moving, graph_edge, true, parent) {
                            stack.push(Frame {
                                plate_id: moving,
                                edge: Some(child),
                                phase: Phase::Incoming,
                            });
                        }
                    }
                }
                Phase::Outgoing(position) => {
                    let outgoing = self.graph.outgoing_edges(plate_id);
                    let Some(&graph_edge) = outgoing.get(position) else {
                        stack.pop();
                        continue;
                    };
                    frame.phase = Phase::Outgoing(position + 1);

                    let edge = self.graph.edge(graph_edge);
                    if !edge.is_valid_at(self.time) {
                        continue;
                    }
                    let moving = edge.moving_plate_id();
                    if let Some(child) = self.try_add_edge(plate_id, moving, graph_edge, false, parent) {
                        stack.push(Frame {
                            plate_id: moving,
                            edge: Some(child),
                            phase: Phase::Incoming,
                        });
                    }
                }
            }
        }
    }

    /// Adds a tree edge unless `moving` is the anchor or already moved by
    /// another edge of this tree.
    fn try_add_edge(
        &mut self,
        fixed: PlateId,
        moving: PlateId,
        graph_edge: usize,
        reversed: bool,
        parent: Option<TreeEdgeId>,
    ) -> Option<TreeEdgeId> {
        if moving == self.anchor_plate_id {
            return None;
        }
        let id = TreeEdgeId(self.edges.len());
        match self.edges_by_moving_plate.entry(moving) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(slot) => {
                slot.insert(id);
            }
        }

        self.edges
            .push(ReconstructionTreeEdge::new(fixed, moving, graph_edge, reversed, parent));
        match parent {
            Some(parent) => self.edges[parent.0].children.push(id),
            None => self.root_edges.push(id),
        }
        Some(id)
    }
}

impl ReconstructionTree {
    /// Builds the tree of plates reachable from `anchor_plate_id` at `time`.
    ///
    /// Graph edges are considered in data order, so when several sequences
    /// could move the same plate the first one reached wins.
    pub fn build(graph: Arc<RotationGraph>, anchor_plate_id: PlateId, time: impl Into<GeoTimeInstant>) -> Self {
        let time = time.into();
        let mut builder = TreeBuilder::new(&graph, anchor_plate_id, time);
        builder.traverse();

        let TreeBuilder {
            edges,
            root_edges,
            edges_by_moving_plate,
            ..
        } = builder;

        log::debug!(
            "Built reconstruction tree for anchor {} at {} Ma: {} edges, {} roots",
            anchor_plate_id,
            time.value(),
            edges.len(),
            root_edges.len()
        );

        Self {
            graph,
            anchor_plate_id,
            reconstruction_time: time,
            edges,
            root_edges,
            edges_by_moving_plate,
        }
    }
}
