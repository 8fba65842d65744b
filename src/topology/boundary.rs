//! Resolved rigid plate boundaries.

use std::sync::Arc;

use glam::DVec3;

use crate::maths::{BoundingSmallCircle, PolygonOnSphere};
use crate::rotation::{PlateId, ReconstructionTreeCreator};

/// A rigid plate polygon resolved at one reconstruction time.
pub trait ResolvedBoundary: Send + Sync {
    /// Plate the enclosed region moves with, if it has one.
    fn plate_id(&self) -> Option<PlateId>;

    fn reconstruction_time(&self) -> f64;

    fn boundary_polygon(&self) -> &PolygonOnSphere;

    /// Creator used to reconstruct and move points inside this boundary.
    fn get_reconstruction_tree_creator(&self) -> &Arc<dyn ReconstructionTreeCreator>;

    fn contains_point(&self, point: DVec3) -> bool {
        self.boundary_polygon().contains_point(point)
    }

    fn bounding_small_circle(&self) -> BoundingSmallCircle {
        *self.boundary_polygon().bounding_small_circle()
    }
}

/// A boundary given directly as a polygon at its reconstruction time.
pub struct ResolvedTopologicalBoundary {
    plate_id: Option<PlateId>,
    reconstruction_time: f64,
    polygon: PolygonOnSphere,
    creator: Arc<dyn ReconstructionTreeCreator>,
}

impl ResolvedTopologicalBoundary {
    pub fn new(
        plate_id: Option<PlateId>,
        reconstruction_time: f64,
        polygon: PolygonOnSphere,
        creator: Arc<dyn ReconstructionTreeCreator>,
    ) -> Self {
        Self {
            plate_id,
            reconstruction_time,
            polygon,
            creator,
        }
    }
}

impl std::fmt::Debug for ResolvedTopologicalBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTopologicalBoundary")
            .field("plate_id", &self.plate_id)
            .field("reconstruction_time", &self.reconstruction_time)
            .field("num_vertices", &self.polygon.vertices().len())
            .finish()
    }
}

impl ResolvedBoundary for ResolvedTopologicalBoundary {
    fn plate_id(&self) -> Option<PlateId> {
        self.plate_id
    }

    fn reconstruction_time(&self) -> f64 {
        self.reconstruction_time
    }

    fn boundary_polygon(&self) -> &PolygonOnSphere {
        &self.polygon
    }

    fn get_reconstruction_tree_creator(&self) -> &Arc<dyn ReconstructionTreeCreator> {
        &self.creator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maths::lat_lon_to_unit;
    use crate::rotation::{CachedReconstructionTreeCreator, RotationGraph};

    #[test]
    fn test_boundary_contains_point() {
        let creator: Arc<dyn ReconstructionTreeCreator> =
            Arc::new(CachedReconstructionTreeCreator::new(Arc::new(RotationGraph::new()), 0));
        let polygon = PolygonOnSphere::new(vec![
            lat_lon_to_unit(-10.0, -10.0),
            lat_lon_to_unit(-10.0, 10.0),
            lat_lon_to_unit(10.0, 10.0),
            lat_lon_to_unit(10.0, -10.0),
        ])
        .unwrap();
        let boundary = ResolvedTopologicalBoundary::new(Some(3), 20.0, polygon, creator);

        assert_eq!(boundary.plate_id(), Some(3));
        assert!(boundary.contains_point(lat_lon_to_unit(0.0, 0.0)));
        assert!(!boundary.contains_point(lat_lon_to_unit(0.0, 40.0)));
        assert!(boundary.bounding_small_circle().contains(lat_lon_to_unit(5.0, 5.0)));
    }
}
