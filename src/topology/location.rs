//! Where a point lies among the resolved topologies of one time slot.

use glam::DVec3;

use crate::rotation::PlateId;

/// Identifier of a resolved network that stays the same across time slots.
pub type NetworkId = u32;

/// Reference to a rigid block inside a deforming network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RigidBlockRef {
    /// Index of the block within its network.
    pub index: usize,
    /// Plate the block moves with.
    pub plate_id: PlateId,
}

/// Location of a point inside a resolved network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NetworkPointLocation {
    /// Inside a triangle of the deforming mesh.
    DeformingFace {
        face: usize,
        /// Barycentric coordinates within the face (summing to one).
        barycentric: DVec3,
    },
    /// Inside a rigid interior block.
    RigidBlock(RigidBlockRef),
}

impl NetworkPointLocation {
    pub fn is_deforming(&self) -> bool {
        matches!(self, Self::DeformingFace { .. })
    }
}

/// Classification of a point against the resolved topologies of a time slot.
///
/// The `boundary` and `network` indices refer to the slot's
/// [`ResolvedTopologies`](super::ResolvedTopologies) and are only meaningful
/// for that slot.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TopologyPointLocation {
    /// Outside every boundary and network.
    #[default]
    NotFound,
    /// Inside a rigid plate boundary.
    InBoundary {
        boundary: usize,
        plate_id: Option<PlateId>,
    },
    /// Inside a deforming network (networks take priority over boundaries).
    InNetwork {
        network: usize,
        network_id: NetworkId,
        location: NetworkPointLocation,
    },
}

impl TopologyPointLocation {
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    pub fn is_in_network(&self) -> bool {
        matches!(self, Self::InNetwork { .. })
    }

    /// True if both locations belong to the same surface.
    ///
    /// Boundaries are compared by plate id and networks by network id, so a
    /// point that stays on the same plate (or in the same network) across
    /// time slots keeps its classification even though the slot-local
    /// indices differ.
    pub fn same_classification(&self, other: &TopologyPointLocation) -> bool {
        match (self, other) {
            (Self::NotFound, Self::NotFound) => true,
            (Self::InBoundary { plate_id: a, .. }, Self::InBoundary { plate_id: b, .. }) => a == b,
            (Self::InNetwork { network_id: a, .. }, Self::InNetwork { network_id: b, .. }) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_compared_by_plate() {
        let a = TopologyPointLocation::InBoundary { boundary: 0, plate_id: Some(101) };
        let b = TopologyPointLocation::InBoundary { boundary: 3, plate_id: Some(101) };
        let c = TopologyPointLocation::InBoundary { boundary: 0, plate_id: Some(201) };
        assert!(a.same_classification(&b));
        assert!(!a.same_classification(&c));
    }

    #[test]
    fn test_networks_compared_by_id() {
        let face = NetworkPointLocation::DeformingFace { face: 0, barycentric: DVec3::splat(1.0 / 3.0) };
        let block = NetworkPointLocation::RigidBlock(RigidBlockRef { index: 0, plate_id: 5 });
        let a = TopologyPointLocation::InNetwork { network: 0, network_id: 7, location: face };
        let b = TopologyPointLocation::InNetwork { network: 2, network_id: 7, location: block };
        let c = TopologyPointLocation::InNetwork { network: 0, network_id: 8, location: face };
        assert!(a.same_classification(&b));
        assert!(!a.same_classification(&c));
        assert!(!a.same_classification(&TopologyPointLocation::NotFound));
    }
}
