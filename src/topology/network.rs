//! Resolved deforming networks.
//!
//! A network is a triangulated region whose vertices move with plates. Points
//! inside a triangle deform with the barycentric blend of the vertex motions;
//! points inside an interior rigid block move with the block's plate.

use std::sync::{Arc, Once};

use glam::{DMat2, DVec2, DVec3};

use super::location::{NetworkId, NetworkPointLocation, RigidBlockRef};
use super::resolved::TopologyError;
use crate::maths::{
    local_east_north, BoundingSmallCircle, PolygonOnSphere, StrainRate, EARTH_RADIUS_KMS,
    SECONDS_PER_MY,
};
use crate::rotation::{
    plate_velocity, stage_rotation, PlateId, ReconstructionTreeCreator, VelocityDeltaTimeType,
};

/// Interval (My) over which vertex velocities are sampled for strain rates.
const STRAIN_RATE_DELTA_TIME: f64 = 1.0;

/// Converts cm/yr to m/s.
const CM_PER_YR_TO_M_PER_S: f64 = 0.01 * 1.0e6 / SECONDS_PER_MY;

/// Slack on barycentric coordinates so points on shared edges are found.
const BARYCENTRIC_EPSILON: f64 = 1e-12;

static NATURAL_NEIGHBOUR_FALLBACK: Once = Once::new();

/// A deforming region resolved at one reconstruction time.
pub trait ResolvedNetwork: Send + Sync {
    /// Identifier shared by the resolutions of this network at every time.
    fn network_id(&self) -> NetworkId;

    fn reconstruction_time(&self) -> f64;

    /// Outline of the whole network, rigid blocks included.
    fn boundary_polygon(&self) -> &PolygonOnSphere;

    fn bounding_small_circle(&self) -> BoundingSmallCircle {
        *self.boundary_polygon().bounding_small_circle()
    }

    /// Locates a point in a deforming face or rigid block.
    ///
    /// `hint` is a previous location of a nearby point and is tried first.
    fn locate_point(&self, point: DVec3, hint: Option<&NetworkPointLocation>) -> Option<NetworkPointLocation>;

    fn is_point_in_network(&self, point: DVec3) -> bool {
        self.locate_point(point, None).is_some()
    }

    fn is_point_in_deforming_region(&self, point: DVec3) -> bool {
        self.locate_point(point, None)
            .is_some_and(|location| location.is_deforming())
    }

    /// Velocity (cm/yr) at `time` of a point in the network, and the rigid
    /// block it lies in, if any.
    ///
    /// The point is located in the network as resolved at its own
    /// reconstruction time; only the plate motions are sampled at `time`.
    fn calculate_velocity_at(
        &self,
        point: DVec3,
        time: f64,
        delta_time: f64,
        delta_time_type: VelocityDeltaTimeType,
        hint: Option<&NetworkPointLocation>,
    ) -> Option<(DVec3, Option<RigidBlockRef>)>;

    /// Velocity (cm/yr) at the network's reconstruction time.
    fn calculate_velocity(
        &self,
        point: DVec3,
        delta_time: f64,
        delta_time_type: VelocityDeltaTimeType,
        hint: Option<&NetworkPointLocation>,
    ) -> Option<(DVec3, Option<RigidBlockRef>)> {
        self.calculate_velocity_at(point, self.reconstruction_time(), delta_time, delta_time_type, hint)
    }

    /// Moves a point `delta_time` My forward (or backward, when `reverse`)
    /// from the reconstruction time.
    ///
    /// Returns the moved point and where the original point lies in the
    /// network.
    fn calculate_deformed_point(
        &self,
        point: DVec3,
        delta_time: f64,
        reverse: bool,
        use_natural_neighbour: bool,
        hint: Option<&NetworkPointLocation>,
    ) -> Option<(DVec3, NetworkPointLocation)>;

    /// Instantaneous strain rate at a located point. Rigid blocks have none.
    fn calculate_deformation(&self, point: DVec3, location: &NetworkPointLocation) -> Option<StrainRate>;
}

/// Triangulation of a network at its reconstruction time.
#[derive(Debug, Clone, Default)]
pub struct NetworkMesh {
    /// Vertex positions (unit vectors).
    pub vertices: Vec<DVec3>,
    /// Plate each vertex moves with.
    pub vertex_plate_ids: Vec<PlateId>,
    /// Vertex index triples.
    pub faces: Vec<[usize; 3]>,
}

/// A non-deforming block inside a network.
#[derive(Debug, Clone)]
pub struct RigidBlock {
    pub polygon: PolygonOnSphere,
    pub plate_id: PlateId,
}

/// Network resolved from a given triangle mesh.
///
/// Velocities inside a face are linear in the vertex velocities, so each
/// face has a constant strain rate that is computed on construction.
pub struct ResolvedTopologicalNetwork {
    network_id: NetworkId,
    reconstruction_time: f64,
    polygon: PolygonOnSphere,
    mesh: NetworkMesh,
    face_bounds: Vec<BoundingSmallCircle>,
    face_strain_rates: Vec<StrainRate>,
    rigid_blocks: Vec<RigidBlock>,
    creator: Arc<dyn ReconstructionTreeCreator>,
}

impl ResolvedTopologicalNetwork {
    pub fn new(
        network_id: NetworkId,
        reconstruction_time: f64,
        polygon: PolygonOnSphere,
        mesh: NetworkMesh,
        rigid_blocks: Vec<RigidBlock>,
        creator: Arc<dyn ReconstructionTreeCreator>,
    ) -> Result<Self, TopologyError> {
        if mesh.vertices.len() != mesh.vertex_plate_ids.len() {
            return Err(TopologyError::VertexPlateCountMismatch {
                vertices: mesh.vertices.len(),
                plate_ids: mesh.vertex_plate_ids.len(),
            });
        }
        for (face, indices) in mesh.faces.iter().enumerate() {
            if let Some(&index) = indices.iter().find(|&&i| i >= mesh.vertices.len()) {
                return Err(TopologyError::InvalidFaceIndex { face, index });
            }
        }

        let mut mesh = mesh;
        for v in &mut mesh.vertices {
            *v = v.normalize();
        }

        let face_bounds = mesh
            .faces
            .iter()
            .map(|f| {
                BoundingSmallCircle::from_points(f.iter().map(|&i| mesh.vertices[i]))
                    .unwrap_or_else(|| BoundingSmallCircle::new(mesh.vertices[f[0]], 0.0))
            })
            .collect();

        let mut network = Self {
            network_id,
            reconstruction_time,
            polygon,
            mesh,
            face_bounds,
            face_strain_rates: Vec::new(),
            rigid_blocks,
            creator,
        };
        network.face_strain_rates = network.compute_face_strain_rates();

        log::debug!(
            "Resolved network {} at {} Ma: {} vertices, {} faces, {} rigid blocks",
            network_id,
            reconstruction_time,
            network.mesh.vertices.len(),
            network.mesh.faces.len(),
            network.rigid_blocks.len()
        );

        Ok(network)
    }

    pub fn mesh(&self) -> &NetworkMesh {
        &self.mesh
    }

    pub fn rigid_blocks(&self) -> &[RigidBlock] {
        &self.rigid_blocks
    }

    fn vertex_velocity(
        &self,
        vertex: usize,
        time: f64,
        delta_time: f64,
        delta_time_type: VelocityDeltaTimeType,
    ) -> DVec3 {
        plate_velocity(
            self.creator.as_ref(),
            self.mesh.vertex_plate_ids[vertex],
            self.mesh.vertices[vertex],
            time,
            delta_time,
            delta_time_type,
        )
    }

    fn compute_face_strain_rates(&self) -> Vec<StrainRate> {
        let velocities: Vec<DVec3> = (0..self.mesh.vertices.len())
            .map(|v| {
                self.vertex_velocity(
                    v,
                    self.reconstruction_time,
                    STRAIN_RATE_DELTA_TIME,
                    VelocityDeltaTimeType::default(),
                )
            })
            .collect();

        self.mesh
            .faces
            .iter()
            .map(|face| {
                let positions = face.map(|i| self.mesh.vertices[i]);
                let face_velocities = face.map(|i| velocities[i]);
                face_strain_rate(positions, face_velocities).unwrap_or_else(|| {
                    log::debug!("Degenerate face in network {}, using zero strain rate", self.network_id);
                    StrainRate::ZERO
                })
            })
            .collect()
    }

    fn face_barycentric(&self, face: usize, point: DVec3) -> Option<DVec3> {
        let indices = self.mesh.faces.get(face)?;
        barycentric(point, indices.map(|i| self.mesh.vertices[i]))
    }
}

/// Constant velocity gradient (1/s) of a triangle in its local east/north
/// frame.
///
/// Returns `None` for a zero-area triangle.
fn face_strain_rate(positions: [DVec3; 3], velocities: [DVec3; 3]) -> Option<StrainRate> {
    let centre = (positions[0] + positions[1] + positions[2]).try_normalize()?;
    let (east, north) = local_east_north(centre);
    let metres = EARTH_RADIUS_KMS * 1000.0;

    let x = positions.map(|p| DVec2::new(p.dot(east), p.dot(north)) * metres);
    let u = velocities.map(|v| DVec2::new(v.dot(east), v.dot(north)) * CM_PER_YR_TO_M_PER_S);

    let dx = DMat2::from_cols(x[1] - x[0], x[2] - x[0]);
    let du = DMat2::from_cols(u[1] - u[0], u[2] - u[0]);
    let scale = (x[1] - x[0]).length() * (x[2] - x[0]).length();
    if !(scale > 0.0) || dx.determinant().abs() < 1e-12 * scale {
        return None;
    }

    Some(StrainRate::new(du * dx.inverse()))
}

/// Barycentric coordinates of `point` in a spherical triangle, if inside.
fn barycentric(point: DVec3, [a, b, c]: [DVec3; 3]) -> Option<DVec3> {
    let total = a.dot(b.cross(c));
    if total.abs() < 1e-15 {
        return None;
    }
    let weights = DVec3::new(
        point.dot(b.cross(c)),
        a.dot(point.cross(c)),
        a.dot(b.cross(point)),
    ) / total;

    let sum = weights.x + weights.y + weights.z;
    if !(sum > 0.0) {
        return None;
    }
    let weights = weights / sum;
    (weights.min_element() >= -BARYCENTRIC_EPSILON).then_some(weights)
}

impl std::fmt::Debug for ResolvedTopologicalNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedTopologicalNetwork")
            .field("network_id", &self.network_id)
            .field("reconstruction_time", &self.reconstruction_time)
            .field("num_faces", &self.mesh.faces.len())
            .field("num_rigid_blocks", &self.rigid_blocks.len())
            .finish()
    }
}

impl ResolvedNetwork for ResolvedTopologicalNetwork {
    fn network_id(&self) -> NetworkId {
        self.network_id
    }

    fn reconstruction_time(&self) -> f64 {
        self.reconstruction_time
    }

    fn boundary_polygon(&self) -> &PolygonOnSphere {
        &self.polygon
    }

    fn locate_point(&self, point: DVec3, hint: Option<&NetworkPointLocation>) -> Option<NetworkPointLocation> {
        if !self.polygon.contains_point(point) {
            return None;
        }

        if let Some((index, block)) = self
            .rigid_blocks
            .iter()
            .enumerate()
            .find(|(_, block)| block.polygon.contains_point(point))
        {
            return Some(NetworkPointLocation::RigidBlock(RigidBlockRef {
                index,
                plate_id: block.plate_id,
            }));
        }

        if let Some(&NetworkPointLocation::DeformingFace { face, .. }) = hint {
            if let Some(barycentric) = self.face_barycentric(face, point) {
                return Some(NetworkPointLocation::DeformingFace { face, barycentric });
            }
        }

        (0..self.mesh.faces.len())
            .filter(|&face| self.face_bounds[face].contains(point))
            .find_map(|face| {
                self.face_barycentric(face, point)
                    .map(|barycentric| NetworkPointLocation::DeformingFace { face, barycentric })
            })
    }

    fn calculate_velocity_at(
        &self,
        point: DVec3,
        time: f64,
        delta_time: f64,
        delta_time_type: VelocityDeltaTimeType,
        hint: Option<&NetworkPointLocation>,
    ) -> Option<(DVec3, Option<RigidBlockRef>)> {
        match self.locate_point(point, hint)? {
            NetworkPointLocation::RigidBlock(block) => {
                let velocity = plate_velocity(
                    self.creator.as_ref(),
                    block.plate_id,
                    point,
                    time,
                    delta_time,
                    delta_time_type,
                );
                Some((velocity, Some(block)))
            }
            NetworkPointLocation::DeformingFace { face, barycentric } => {
                let indices = self.mesh.faces[face];
                let velocity = barycentric.x * self.vertex_velocity(indices[0], time, delta_time, delta_time_type)
                    + barycentric.y * self.vertex_velocity(indices[1], time, delta_time, delta_time_type)
                    + barycentric.z * self.vertex_velocity(indices[2], time, delta_time, delta_time_type);
                // Project onto the tangent plane at the point.
                Some((velocity - point * velocity.dot(point), None))
            }
        }
    }

    fn calculate_deformed_point(
        &self,
        point: DVec3,
        delta_time: f64,
        reverse: bool,
        use_natural_neighbour: bool,
        hint: Option<&NetworkPointLocation>,
    ) -> Option<(DVec3, NetworkPointLocation)> {
        if use_natural_neighbour {
            NATURAL_NEIGHBOUR_FALLBACK.call_once(|| {
                log::warn!("Natural neighbour interpolation unavailable, using barycentric coordinates");
            });
        }

        let location = self.locate_point(point, hint)?;
        let target_time = if reverse {
            self.reconstruction_time + delta_time
        } else {
            self.reconstruction_time - delta_time
        };
        let creator = self.creator.as_ref();

        let deformed = match location {
            NetworkPointLocation::RigidBlock(block) => {
                stage_rotation(creator, block.plate_id, self.reconstruction_time, target_time).rotate(point)
            }
            NetworkPointLocation::DeformingFace { face, barycentric } => {
                let moved = self.mesh.faces[face].map(|i| {
                    stage_rotation(creator, self.mesh.vertex_plate_ids[i], self.reconstruction_time, target_time)
                        .rotate(self.mesh.vertices[i])
                });
                (barycentric.x * moved[0] + barycentric.y * moved[1] + barycentric.z * moved[2])
                    .try_normalize()?
            }
        };

        Some((deformed, location))
    }

    fn calculate_deformation(&self, _point: DVec3, location: &NetworkPointLocation) -> Option<StrainRate> {
        match location {
            NetworkPointLocation::DeformingFace { face, .. } => self.face_strain_rates.get(*face).copied(),
            NetworkPointLocation::RigidBlock(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maths::{angular_distance, lat_lon_to_unit, FiniteRotation};
    use crate::rotation::{CachedReconstructionTreeCreator, PoleSample, RotationGraph};

    /// Plate 2 rotates about Z at 1 degree per My; plate 1 is fixed.
    fn creator() -> Arc<dyn ReconstructionTreeCreator> {
        let graph = RotationGraph::from_sequences(vec![(
            0,
            2,
            vec![
                PoleSample::new(0.0, FiniteRotation::IDENTITY),
                PoleSample::new(100.0, FiniteRotation::from_axis_angle(DVec3::Z, 100f64.to_radians())),
            ],
        )])
        .unwrap();
        Arc::new(CachedReconstructionTreeCreator::new(Arc::new(graph), 0))
    }

    fn network(vertex_plate_ids: Vec<PlateId>, rigid_blocks: Vec<RigidBlock>) -> ResolvedTopologicalNetwork {
        let vertices = vec![
            lat_lon_to_unit(-5.0, -5.0),
            lat_lon_to_unit(-5.0, 5.0),
            lat_lon_to_unit(5.0, 0.0),
        ];
        let polygon = PolygonOnSphere::new(vertices.clone()).unwrap();
        let mesh = NetworkMesh {
            vertices,
            vertex_plate_ids,
            faces: vec![[0, 1, 2]],
        };
        ResolvedTopologicalNetwork::new(9, 10.0, polygon, mesh, rigid_blocks, creator()).unwrap()
    }

    #[test]
    fn test_rejects_bad_face_index() {
        let mesh = NetworkMesh {
            vertices: vec![DVec3::X, DVec3::Y, DVec3::Z],
            vertex_plate_ids: vec![0, 0, 0],
            faces: vec![[0, 1, 3]],
        };
        let polygon = PolygonOnSphere::new(mesh.vertices.clone()).unwrap();
        let err = ResolvedTopologicalNetwork::new(1, 0.0, polygon, mesh, vec![], creator()).err();
        assert_eq!(err, Some(TopologyError::InvalidFaceIndex { face: 0, index: 3 }));
    }

    #[test]
    fn test_locate_point_barycentric() {
        let network = network(vec![1, 1, 1], vec![]);
        let location = network.locate_point(lat_lon_to_unit(-1.0, 0.0), None).unwrap();
        match location {
            NetworkPointLocation::DeformingFace { face, barycentric } => {
                assert_eq!(face, 0);
                assert!((barycentric.x + barycentric.y + barycentric.z - 1.0).abs() < 1e-12);
                assert!(barycentric.min_element() > 0.0);
            }
            other => panic!("unexpected location {:?}", other),
        }
        assert!(network.locate_point(lat_lon_to_unit(30.0, 0.0), None).is_none());
        assert!(network.is_point_in_deforming_region(lat_lon_to_unit(-1.0, 0.0)));
    }

    #[test]
    fn test_rigid_network_has_zero_strain_rate() {
        let network = network(vec![1, 1, 1], vec![]);
        let point = lat_lon_to_unit(-1.0, 0.0);
        let location = network.locate_point(point, None).unwrap();
        let rate = network.calculate_deformation(point, &location).unwrap();
        assert!(rate.is_zero());
    }

    #[test]
    fn test_converging_vertices_shorten_face() {
        // Vertices on plate 2 sit east of the fixed vertex and move west
        // towards it as time runs forward.
        let network = network(vec![1, 2, 2], vec![]);
        let point = lat_lon_to_unit(-1.0, 0.0);
        let location = network.locate_point(point, None).unwrap();
        let rate = network.calculate_deformation(point, &location).unwrap();
        assert!(rate.dilatation_rate() < 0.0);
    }

    #[test]
    fn test_deformed_vertex_follows_its_plate() {
        let network = network(vec![1, 2, 2], vec![]);
        let vertex = lat_lon_to_unit(-5.0, 5.0);
        let (moved, _) = network.calculate_deformed_point(vertex, 2.0, true, false, None).unwrap();
        let expected = FiniteRotation::from_axis_angle(DVec3::Z, 2f64.to_radians()).rotate(vertex);
        assert!(angular_distance(moved, expected) < 1e-9);
    }

    #[test]
    fn test_rigid_block_location_and_velocity() {
        let block = RigidBlock {
            polygon: PolygonOnSphere::new(vec![
                lat_lon_to_unit(-2.0, -1.0),
                lat_lon_to_unit(-2.0, 1.0),
                lat_lon_to_unit(0.0, 0.0),
            ])
            .unwrap(),
            plate_id: 2,
        };
        let network = network(vec![1, 1, 1], vec![block]);
        let point = lat_lon_to_unit(-1.0, 0.0);
        let location = network.locate_point(point, None).unwrap();
        assert_eq!(location, NetworkPointLocation::RigidBlock(RigidBlockRef { index: 0, plate_id: 2 }));
        assert!(network.calculate_deformation(point, &location).is_none());

        let (velocity, block) = network
            .calculate_velocity(point, 1.0, VelocityDeltaTimeType::default(), None)
            .unwrap();
        assert_eq!(block.map(|b| b.plate_id), Some(2));
        assert!(velocity.length() > 0.0);
    }

    #[test]
    fn test_velocity_sampled_at_requested_time() {
        let network = network(vec![2, 2, 2], vec![]);
        let point = lat_lon_to_unit(-1.0, 0.0);
        let dt_type = VelocityDeltaTimeType::default();

        let (at_network_time, _) = network.calculate_velocity(point, 1.0, dt_type, None).unwrap();
        let (at_10, _) = network.calculate_velocity_at(point, 10.0, 1.0, dt_type, None).unwrap();
        assert!((at_network_time - at_10).length() < 1e-12);

        // Plate 2 has no rotation sequence before 100 Ma.
        let (at_150, _) = network.calculate_velocity_at(point, 150.0, 1.0, dt_type, None).unwrap();
        assert!(at_150.length() < 1e-12);
        assert!(at_10.length() > 1.0);
    }
}
