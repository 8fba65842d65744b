//! Reconstruction trees: the acyclic rotation hierarchy for one anchor plate
//! at one reconstruction time.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use super::graph::{PlateId, RotationGraph};
use crate::maths::FiniteRotation;
use crate::time::GeoTimeInstant;

/// Index of an edge within its [`ReconstructionTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeEdgeId(pub(super) usize);

impl TreeEdgeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// An edge of a reconstruction tree.
///
/// Rotations are computed on first use and cached.
#[derive(Debug)]
pub struct ReconstructionTreeEdge {
    pub(super) fixed_plate_id: PlateId,
    pub(super) moving_plate_id: PlateId,
    pub(super) graph_edge: usize,
    pub(super) reversed: bool,
    pub(super) parent: Option<TreeEdgeId>,
    pub(super) children: Vec<TreeEdgeId>,
    pub(super) relative_rotation: OnceLock<FiniteRotation>,
    pub(super) composed_absolute_rotation: OnceLock<FiniteRotation>,
}

impl ReconstructionTreeEdge {
    pub(super) fn new(
        fixed_plate_id: PlateId,
        moving_plate_id: PlateId,
        graph_edge: usize,
        reversed: bool,
        parent: Option<TreeEdgeId>,
    ) -> Self {
        Self {
            fixed_plate_id,
            moving_plate_id,
            graph_edge,
            reversed,
            parent,
            children: Vec::new(),
            relative_rotation: OnceLock::new(),
            composed_absolute_rotation: OnceLock::new(),
        }
    }

    pub fn fixed_plate_id(&self) -> PlateId {
        self.fixed_plate_id
    }

    pub fn moving_plate_id(&self) -> PlateId {
        self.moving_plate_id
    }

    /// Index of the rotation graph edge this tree edge was created from.
    pub fn graph_edge_index(&self) -> usize {
        self.graph_edge
    }

    /// True if the graph edge was traversed moving → fixed.
    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn parent(&self) -> Option<TreeEdgeId> {
        self.parent
    }

    pub fn children(&self) -> &[TreeEdgeId] {
        &self.children
    }
}

/// Rotation hierarchy rooted at an anchor plate for one reconstruction time.
///
/// Each plate appears as the moving plate of at most one edge. Plates the
/// tree does not reach have no motion relative to the anchor.
#[derive(Debug)]
pub struct ReconstructionTree {
    pub(super) graph: Arc<RotationGraph>,
    pub(super) anchor_plate_id: PlateId,
    pub(super) reconstruction_time: GeoTimeInstant,
    pub(super) edges: Vec<ReconstructionTreeEdge>,
    pub(super) root_edges: Vec<TreeEdgeId>,
    pub(super) edges_by_moving_plate: HashMap<PlateId, TreeEdgeId>,
}

impl ReconstructionTree {
    pub fn anchor_plate_id(&self) -> PlateId {
        self.anchor_plate_id
    }

    pub fn reconstruction_time(&self) -> GeoTimeInstant {
        self.reconstruction_time
    }

    pub fn graph(&self) -> &Arc<RotationGraph> {
        &self.graph
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Edges whose fixed plate is the anchor (or reached by reversing an
    /// edge into the anchor).
    pub fn root_edges(&self) -> &[TreeEdgeId] {
        &self.root_edges
    }

    pub fn edge(&self, id: TreeEdgeId) -> &ReconstructionTreeEdge {
        &self.edges[id.0]
    }

    /// All edges, parents before their children.
    pub fn edges(&self) -> impl Iterator<Item = (TreeEdgeId, &ReconstructionTreeEdge)> {
        self.edges.iter().enumerate().map(|(i, e)| (TreeEdgeId(i), e))
    }

    /// The edge moving `plate_id`, if the plate is reachable from the anchor.
    pub fn edge_for_plate(&self, plate_id: PlateId) -> Option<TreeEdgeId> {
        self.edges_by_moving_plate.get(&plate_id).copied()
    }

    /// Rotation of the edge's moving plate relative to its fixed plate.
    pub fn relative_rotation(&self, id: TreeEdgeId) -> FiniteRotation {
        let edge = &self.edges[id.0];
        *edge.relative_rotation.get_or_init(|| {
            let rotation = self
                .graph
                .edge(edge.graph_edge)
                .rotation_at(self.reconstruction_time);
            if edge.reversed {
                rotation.inverse()
            } else {
                rotation
            }
        })
    }

    /// Rotation of the edge's moving plate relative to the anchor plate.
    pub fn composed_absolute_rotation(&self, id: TreeEdgeId) -> FiniteRotation {
        if let Some(rotation) = self.edges[id.0].composed_absolute_rotation.get() {
            return *rotation;
        }

        // Walk up to the nearest cached ancestor, then compose downwards so
        // deep plate circuits never recurse.
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.edges[current.0].parent {
            if self.edges[parent.0].composed_absolute_rotation.get().is_some() {
                break;
            }
            chain.push(parent);
            current = parent;
        }

        let mut composed = FiniteRotation::IDENTITY;
        for &edge_id in chain.iter().rev() {
            let edge = &self.edges[edge_id.0];
            let relative = self.relative_rotation(edge_id);
            composed = *edge.composed_absolute_rotation.get_or_init(|| match edge.parent {
                Some(parent) => self.edges[parent.0]
                    .composed_absolute_rotation
                    .get()
                    .copied()
                    .unwrap_or(composed)
                    .compose(&relative),
                None => relative,
            });
        }
        composed
    }

    /// Rotation of `plate_id` relative to the anchor, and the plate it is
    /// relative to.
    ///
    /// Plates without an edge in this tree (unreachable at this time, or the
    /// anchor itself) get the identity rotation fixed at the anchor.
    pub fn get_composed_absolute_rotation(&self, plate_id: PlateId) -> (FiniteRotation, PlateId) {
        match self.edge_for_plate(plate_id) {
            Some(id) => (self.composed_absolute_rotation(id), self.anchor_plate_id),
            None => (FiniteRotation::IDENTITY, self.anchor_plate_id),
        }
    }
}
