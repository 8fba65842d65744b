//! Resolved topologies per time slot.

use std::sync::Arc;

use glam::DVec3;
use thiserror::Error;

use super::boundary::ResolvedBoundary;
use super::location::TopologyPointLocation;
use super::network::ResolvedNetwork;
use crate::maths::{BoundingSmallCircle, PolygonOnSphere};
use crate::rotation::{plate_velocity, ReconstructionTreeCreator, VelocityDeltaTimeType};
use crate::time::TimeRange;

/// Errors raised while assembling resolved topologies.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Network has {vertices} vertices but {plate_ids} vertex plate ids")]
    VertexPlateCountMismatch { vertices: usize, plate_ids: usize },
    #[error("Face {face} references vertex {index} which does not exist")]
    InvalidFaceIndex { face: usize, index: usize },
    #[error("Expected resolved topologies for {expected} time slots, got {found}")]
    SlotCountMismatch { expected: usize, found: usize },
}

/// Indices of the boundaries and networks that may contain a set of points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyCandidates {
    pub boundaries: Vec<usize>,
    pub networks: Vec<usize>,
}

/// The resolved boundaries and networks of one reconstruction time.
#[derive(Clone, Default)]
pub struct ResolvedTopologies {
    boundaries: Vec<Arc<dyn ResolvedBoundary>>,
    networks: Vec<Arc<dyn ResolvedNetwork>>,
}

impl ResolvedTopologies {
    pub fn new(boundaries: Vec<Arc<dyn ResolvedBoundary>>, networks: Vec<Arc<dyn ResolvedNetwork>>) -> Self {
        Self { boundaries, networks }
    }

    pub fn boundaries(&self) -> &[Arc<dyn ResolvedBoundary>] {
        &self.boundaries
    }

    pub fn networks(&self) -> &[Arc<dyn ResolvedNetwork>] {
        &self.networks
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty() && self.networks.is_empty()
    }

    /// Boundaries and networks whose bounds intersect `bounds`.
    ///
    /// With no bounds every topology is a candidate.
    pub fn cull(&self, bounds: Option<&BoundingSmallCircle>) -> TopologyCandidates {
        let keep = |circle: BoundingSmallCircle| bounds.map_or(true, |b| b.intersects(&circle));
        TopologyCandidates {
            boundaries: (0..self.boundaries.len())
                .filter(|&i| keep(self.boundaries[i].bounding_small_circle()))
                .collect(),
            networks: (0..self.networks.len())
                .filter(|&i| keep(self.networks[i].bounding_small_circle()))
                .collect(),
        }
    }

    /// Classifies a point against the candidate topologies.
    ///
    /// Networks are searched before boundaries since they may overlap them.
    pub fn locate_point(&self, point: DVec3, candidates: &TopologyCandidates) -> TopologyPointLocation {
        for &network in &candidates.networks {
            let resolved = &self.networks[network];
            if let Some(location) = resolved.locate_point(point, None) {
                return TopologyPointLocation::InNetwork {
                    network,
                    network_id: resolved.network_id(),
                    location,
                };
            }
        }
        for &boundary in &candidates.boundaries {
            let resolved = &self.boundaries[boundary];
            if resolved.contains_point(point) {
                return TopologyPointLocation::InBoundary {
                    boundary,
                    plate_id: resolved.plate_id(),
                };
            }
        }
        TopologyPointLocation::NotFound
    }

    /// Classifies a point against every topology.
    pub fn locate_point_in_all(&self, point: DVec3) -> TopologyPointLocation {
        self.locate_point(point, &self.cull(None))
    }

    /// Polygon of the surface a location refers to.
    pub fn location_polygon(&self, location: &TopologyPointLocation) -> Option<&PolygonOnSphere> {
        match *location {
            TopologyPointLocation::NotFound => None,
            TopologyPointLocation::InBoundary { boundary, .. } => {
                self.boundaries.get(boundary).map(|b| b.boundary_polygon())
            }
            TopologyPointLocation::InNetwork { network, .. } => {
                self.networks.get(network).map(|n| n.boundary_polygon())
            }
        }
    }

    /// Velocity (cm/yr) of a point under the surface a location refers to.
    ///
    /// Boundary velocities are those of the boundary's plate at `time`;
    /// network velocities are evaluated at the network's own time. Returns
    /// `None` for unlocated points, boundaries without a plate and points
    /// outside the referenced network.
    pub fn velocity_at(
        &self,
        point: DVec3,
        location: &TopologyPointLocation,
        time: f64,
        delta_time: f64,
        delta_time_type: VelocityDeltaTimeType,
    ) -> Option<DVec3> {
        match location {
            TopologyPointLocation::NotFound => None,
            TopologyPointLocation::InBoundary { boundary, plate_id } => {
                let resolved = self.boundaries.get(*boundary)?;
                Some(plate_velocity(
                    resolved.get_reconstruction_tree_creator().as_ref(),
                    (*plate_id)?,
                    point,
                    time,
                    delta_time,
                    delta_time_type,
                ))
            }
            TopologyPointLocation::InNetwork { network, location, .. } => self
                .networks
                .get(*network)?
                .calculate_velocity_at(point, time, delta_time, delta_time_type, Some(location))
                .map(|(velocity, _)| velocity),
        }
    }
}

/// Resolved topologies for every slot of a time range.
pub struct TopologyTimeSpan {
    time_range: TimeRange,
    creator: Arc<dyn ReconstructionTreeCreator>,
    slots: Vec<ResolvedTopologies>,
}

impl TopologyTimeSpan {
    /// Resolves the topologies of each slot with `resolve(time)`.
    pub fn new<F>(time_range: TimeRange, creator: Arc<dyn ReconstructionTreeCreator>, mut resolve: F) -> Self
    where
        F: FnMut(f64) -> ResolvedTopologies,
    {
        let slots: Vec<_> = (0..time_range.num_time_slots())
            .map(|slot| resolve(time_range.get_time(slot)))
            .collect();

        log::debug!(
            "Resolved topologies for {} time slots ({} to {} Ma)",
            slots.len(),
            time_range.begin_time(),
            time_range.end_time()
        );

        Self {
            time_range,
            creator,
            slots,
        }
    }

    /// Uses already resolved topologies, one per slot, oldest first.
    pub fn from_slots(
        time_range: TimeRange,
        creator: Arc<dyn ReconstructionTreeCreator>,
        slots: Vec<ResolvedTopologies>,
    ) -> Result<Self, TopologyError> {
        if slots.len() != time_range.num_time_slots() {
            return Err(TopologyError::SlotCountMismatch {
                expected: time_range.num_time_slots(),
                found: slots.len(),
            });
        }
        Ok(Self {
            time_range,
            creator,
            slots,
        })
    }

    pub fn time_range(&self) -> &TimeRange {
        &self.time_range
    }

    /// Creator for rigid rotations outside any topology.
    pub fn creator(&self) -> &Arc<dyn ReconstructionTreeCreator> {
        &self.creator
    }

    pub fn topologies(&self, time_slot: usize) -> Option<&ResolvedTopologies> {
        self.slots.get(time_slot)
    }
}
