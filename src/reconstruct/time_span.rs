//! Geometry time spans: a geometry's points reconstructed at every slot of a
//! time range by following the resolved topologies.
//!
//! Points start at the slot nearest the import time and are stepped one slot
//! at a time towards both ends of the range. Each step moves a point with
//! the deforming network it lies in, else with the plate of the boundary it
//! lies in, else rigidly with the geometry's reconstruction plate.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use glam::DVec3;
use rayon::prelude::*;
use thiserror::Error;

use super::config::TimeSpanConfig;
use super::deactivate::{DeactivatePoint, DeactivationContext, DefaultDeactivatePoint};
use super::point::{GeometryPoint, GeometrySample, PointArena, PointHandle};
use crate::maths::{
    tessellate, BoundingSmallCircle, DeformationStrain, FiniteRotation, GeometryOnSphere, StrainRate,
    TessellatedGeometry, SECONDS_PER_MY,
};
use crate::rotation::{stage_rotation, PlateId, ReconstructionTreeCreator};
use crate::time::TimeRange;
use crate::topology::{ResolvedTopologies, TopologyCandidates, TopologyPointLocation, TopologyTimeSpan};

/// Internal consistency failures while building a time span.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeSpanError {
    #[error("Sample at time slot {time_slot} has {found} points, expected {expected}")]
    SampleSizeMismatch {
        time_slot: usize,
        expected: usize,
        found: usize,
    },
    #[error("Point {index} is active at time slot {time_slot} but was never stored")]
    MissingPreviousPoint { index: usize, time_slot: usize },
}

/// A geometry to build a time span for.
#[derive(Debug, Clone)]
pub struct GeometryImport {
    /// Geometry positioned at its import time.
    pub geometry: GeometryOnSphere,
    /// Plate moving the geometry where no topology covers it.
    pub reconstruction_plate_id: PlateId,
    /// Time (Ma) the geometry's coordinates refer to.
    pub import_time: f64,
}

/// Accumulated strains, index-aligned with the samples they belong to.
#[derive(Debug, Clone, Default)]
pub(super) struct StrainTable {
    pub(super) time_slots: Vec<Option<Vec<Option<DeformationStrain>>>>,
    pub(super) present_day: Vec<Option<DeformationStrain>>,
}

/// A geometry's points reconstructed over a time range.
pub struct GeometryTimeSpan {
    pub(super) topology_time_span: Arc<TopologyTimeSpan>,
    pub(super) config: TimeSpanConfig,
    pub(super) reconstruction_plate_id: PlateId,
    pub(super) import_time: f64,
    pub(super) geometry: GeometryOnSphere,
    pub(super) tessellated: TessellatedGeometry,
    pub(super) arena: PointArena,
    /// One entry per time slot, oldest first. `None` outside the slots the
    /// geometry exists at.
    pub(super) time_slot_samples: Vec<Option<GeometrySample>>,
    pub(super) present_day_sample: Option<GeometrySample>,
    pub(super) import_time_slot: usize,
    /// Oldest slot (searching back from the import slot) with no active
    /// points.
    pub(super) appearance_time_slot: Option<usize>,
    /// Youngest slot (searching forward from the import slot) with no active
    /// points.
    pub(super) disappearance_time_slot: Option<usize>,
    pub(super) strains: OnceLock<StrainTable>,
}

impl GeometryTimeSpan {
    /// Builds a time span, deactivating points according to
    /// `config.deactivate_points`.
    pub fn new(
        topology_time_span: Arc<TopologyTimeSpan>,
        geometry: GeometryOnSphere,
        reconstruction_plate_id: PlateId,
        import_time: f64,
        config: TimeSpanConfig,
    ) -> Result<Self, TimeSpanError> {
        let deactivate_point = config
            .deactivate_points
            .map(|c| Arc::new(DefaultDeactivatePoint::new(c)) as Arc<dyn DeactivatePoint>);
        Self::with_deactivate_point(
            topology_time_span,
            geometry,
            reconstruction_plate_id,
            import_time,
            config,
            deactivate_point,
        )
    }

    /// Builds a time span with a custom deactivation policy (or none).
    pub fn with_deactivate_point(
        topology_time_span: Arc<TopologyTimeSpan>,
        geometry: GeometryOnSphere,
        reconstruction_plate_id: PlateId,
        import_time: f64,
        config: TimeSpanConfig,
        deactivate_point: Option<Arc<dyn DeactivatePoint>>,
    ) -> Result<Self, TimeSpanError> {
        let tessellated = tessellate(&geometry, config.max_tessellation_angle());
        let time_range = *topology_time_span.time_range();
        let import_time_slot = time_range.get_nearest_time_slot_clamped(import_time);

        let mut span = Self {
            topology_time_span,
            config,
            reconstruction_plate_id,
            import_time,
            geometry,
            tessellated,
            arena: PointArena::new(),
            time_slot_samples: vec![None; time_range.num_time_slots()],
            present_day_sample: None,
            import_time_slot,
            appearance_time_slot: None,
            disappearance_time_slot: None,
            strains: OnceLock::new(),
        };

        if span.tessellated.is_empty() {
            log::debug!("Geometry has no points, time span is empty");
            return Ok(span);
        }

        span.build_samples(deactivate_point.as_deref())?;
        Ok(span)
    }

    fn build_samples(&mut self, deactivate_point: Option<&dyn DeactivatePoint>) -> Result<(), TimeSpanError> {
        let topology_time_span = Arc::clone(&self.topology_time_span);
        let time_range = *topology_time_span.time_range();
        let creator = topology_time_span.creator().as_ref();
        let empty = ResolvedTopologies::default();
        let import_slot = self.import_time_slot;

        // Import sample: rigidly rotate from the import time to the slot.
        let import_rotation = stage_rotation(
            creator,
            self.reconstruction_plate_id,
            self.import_time,
            time_range.get_time(import_slot),
        );
        let positions: Vec<Option<DVec3>> = self
            .tessellated
            .points
            .iter()
            .map(|p| Some(import_rotation.rotate(*p)))
            .collect();
        let topologies = topology_time_span.topologies(import_slot).unwrap_or(&empty);
        let candidates = cull_for_points(topologies, &positions);
        let import_sample = GeometrySample::new(
            positions
                .iter()
                .map(|p| p.map(|p| self.alloc_located(topologies, &candidates, p)))
                .collect(),
        );
        self.time_slot_samples[import_slot] = Some(import_sample);

        let mut deactivated = 0;

        // Towards older times.
        let mut from = import_slot;
        for to in (0..import_slot).rev() {
            let (sample, count) = self.step(from, to, deactivate_point)?;
            deactivated += count;
            if !sample.has_active_points() {
                self.appearance_time_slot = Some(to);
                break;
            }
            self.time_slot_samples[to] = Some(sample);
            from = to;
        }

        // Towards younger times.
        let mut from = import_slot;
        for to in import_slot + 1..time_range.num_time_slots() {
            let (sample, count) = self.step(from, to, deactivate_point)?;
            deactivated += count;
            if !sample.has_active_points() {
                self.disappearance_time_slot = Some(to);
                break;
            }
            self.time_slot_samples[to] = Some(sample);
            from = to;
        }

        self.present_day_sample = Some(self.build_present_day_sample(&time_range));

        log::debug!(
            "Built time span for plate {}: {} points, import slot {}, {} deactivated, appearance {:?}, disappearance {:?}",
            self.reconstruction_plate_id,
            self.tessellated.len(),
            import_slot,
            deactivated,
            self.appearance_time_slot.map(|s| time_range.get_time(s)),
            self.disappearance_time_slot.map(|s| time_range.get_time(s))
        );

        Ok(())
    }

    /// Steps the sample at slot `from` to the adjacent slot `to`.
    ///
    /// Returns the new sample and the number of points deactivated.
    fn step(
        &mut self,
        from: usize,
        to: usize,
        deactivate_point: Option<&dyn DeactivatePoint>,
    ) -> Result<(GeometrySample, usize), TimeSpanError> {
        let topology_time_span = Arc::clone(&self.topology_time_span);
        let time_range = *topology_time_span.time_range();
        let empty = ResolvedTopologies::default();
        let from_topologies = topology_time_span.topologies(from).unwrap_or(&empty);
        let to_topologies = topology_time_span.topologies(to).unwrap_or(&empty);
        let from_time = time_range.get_time(from);
        let to_time = time_range.get_time(to);

        let previous: Vec<Option<PointHandle>> = self.time_slot_samples[from]
            .as_ref()
            .map(|s| s.points().to_vec())
            .unwrap_or_default();
        let expected = self.tessellated.len();
        if previous.len() != expected {
            return Err(TimeSpanError::SampleSizeMismatch {
                time_slot: from,
                expected,
                found: previous.len(),
            });
        }

        // Slot visited before `from` in this walk; none at the import slot.
        let prior_slot = if from == self.import_time_slot {
            None
        } else if to < from {
            Some(from + 1)
        } else {
            Some(from - 1)
        };
        let prior: Vec<Option<PointHandle>> = prior_slot
            .and_then(|slot| self.time_slot_samples[slot].as_ref())
            .map(|s| s.points().to_vec())
            .unwrap_or_default();
        let prior_topologies = prior_slot
            .and_then(|slot| topology_time_span.topologies(slot))
            .unwrap_or(&empty);

        let mut propagator = Propagator::new(
            from_topologies,
            topology_time_span.creator().as_ref(),
            self.reconstruction_plate_id,
            from_time,
            to_time,
            Some(self.config.use_natural_neighbour_interpolation),
        );
        let mut deactivated = 0;
        let mut positions = Vec::with_capacity(previous.len());
        for (index, handle) in previous.iter().enumerate() {
            let Some(handle) = handle else {
                positions.push(None);
                continue;
            };
            let point = *self
                .arena
                .get(*handle)
                .ok_or(TimeSpanError::MissingPreviousPoint { index, time_slot: from })?;

            // A point whose classification changed on arrival at `from` may
            // have been consumed; it then stays at `from` and goes no further.
            let prior_point = prior
                .get(index)
                .copied()
                .flatten()
                .and_then(|h| self.arena.get(h));
            if let (Some(policy), Some(prior_point)) = (deactivate_point, prior_point) {
                if !prior_point.location.same_classification(&point.location) {
                    let context = DeactivationContext {
                        previous_point: prior_point.position,
                        previous_location: &prior_point.location,
                        previous_topologies: prior_topologies,
                        current_point: point.position,
                        current_location: &point.location,
                        current_topologies: from_topologies,
                        current_time: from_time,
                        time_increment: time_range.time_increment(),
                    };
                    if policy.deactivate(&context) {
                        deactivated += 1;
                        positions.push(None);
                        continue;
                    }
                }
            }

            positions.push(Some(propagator.propagate(&point)));
        }

        let candidates = cull_for_points(to_topologies, &positions);
        let points: Vec<Option<PointHandle>> = positions
            .iter()
            .map(|p| p.map(|p| self.alloc_located(to_topologies, &candidates, p)))
            .collect();

        if points.len() != expected {
            return Err(TimeSpanError::SampleSizeMismatch {
                time_slot: to,
                expected,
                found: points.len(),
            });
        }
        Ok((GeometrySample::new(points), deactivated))
    }

    /// Points at present day.
    ///
    /// When the import time lies inside the range this is the geometry
    /// rotated from its import time. Otherwise the youngest computed sample
    /// is rotated to present day so that deactivated points stay inactive.
    fn build_present_day_sample(&mut self, time_range: &TimeRange) -> GeometrySample {
        let creator = Arc::clone(self.topology_time_span.creator());

        if time_range.contains(self.import_time) {
            let rotation = stage_rotation(creator.as_ref(), self.reconstruction_plate_id, self.import_time, 0.0);
            let points: Vec<DVec3> = self.tessellated.points.iter().map(|p| rotation.rotate(*p)).collect();
            return GeometrySample::new(
                points
                    .into_iter()
                    .map(|p| {
                        Some(self.arena.alloc(GeometryPoint::new(p, TopologyPointLocation::NotFound, None)))
                    })
                    .collect(),
            );
        }

        let youngest = time_range.num_time_slots() - 1;
        let Some(sample) = self.time_slot_samples[youngest].clone() else {
            return GeometrySample::new(vec![None; self.tessellated.len()]);
        };

        let topology_time_span = Arc::clone(&self.topology_time_span);
        let empty = ResolvedTopologies::default();
        let topologies = topology_time_span.topologies(youngest).unwrap_or(&empty);
        let mut propagator = Propagator::new(
            topologies,
            creator.as_ref(),
            self.reconstruction_plate_id,
            time_range.get_time(youngest),
            0.0,
            None,
        );
        let points = sample
            .points()
            .iter()
            .map(|handle| {
                let point = handle.and_then(|h| self.arena.get(h)).copied()?;
                let position = propagator.propagate(&point);
                Some(
                    self.arena
                        .alloc(GeometryPoint::new(position, TopologyPointLocation::NotFound, None)),
                )
            })
            .collect();
        GeometrySample::new(points)
    }

    fn alloc_located(
        &mut self,
        topologies: &ResolvedTopologies,
        candidates: &TopologyCandidates,
        position: DVec3,
    ) -> PointHandle {
        let (location, strain_rate) = locate(topologies, candidates, position);
        self.arena.alloc(GeometryPoint::new(position, location, strain_rate))
    }

    /// Accumulated strains, computed on first use.
    pub(super) fn strain_table(&self) -> &StrainTable {
        self.strains.get_or_init(|| self.compute_strains())
    }

    /// Integrates strain forward in time from the oldest sample.
    ///
    /// Each step uses the strain rate at the older slot. Points that are
    /// inactive (or newly active) restart from zero strain.
    fn compute_strains(&self) -> StrainTable {
        let num_points = self.tessellated.len();
        let dt_seconds = self.time_range().time_increment() * SECONDS_PER_MY;
        let mut accumulated = vec![DeformationStrain::IDENTITY; num_points];
        let mut previous: Option<&GeometrySample> = None;
        let mut time_slots = Vec::with_capacity(self.time_slot_samples.len());

        for slot_sample in &self.time_slot_samples {
            let Some(sample) = slot_sample else {
                time_slots.push(None);
                previous = None;
                continue;
            };

            let mut strains = Vec::with_capacity(num_points);
            for (index, handle) in sample.points().iter().enumerate() {
                if handle.is_none() {
                    accumulated[index] = DeformationStrain::IDENTITY;
                    strains.push(None);
                    continue;
                }
                let previous_point = previous
                    .and_then(|p| p.points().get(index).copied().flatten())
                    .and_then(|h| self.arena.get(h));
                accumulated[index] = match previous_point {
                    Some(point) => accumulated[index]
                        .accumulate(&point.strain_rate.unwrap_or(StrainRate::ZERO), dt_seconds),
                    None => DeformationStrain::IDENTITY,
                };
                strains.push(Some(accumulated[index]));
            }
            time_slots.push(Some(strains));
            previous = Some(sample);
        }

        let youngest = time_slots.iter().rev().find_map(|s| s.as_ref());
        let present_day = match &self.present_day_sample {
            Some(sample) => sample
                .points()
                .iter()
                .enumerate()
                .map(|(index, handle)| {
                    handle.map(|_| {
                        youngest
                            .and_then(|s| s.get(index).copied().flatten())
                            .unwrap_or(DeformationStrain::IDENTITY)
                    })
                })
                .collect(),
            None => vec![None; num_points],
        };

        StrainTable {
            time_slots,
            present_day,
        }
    }

    pub fn time_range(&self) -> &TimeRange {
        self.topology_time_span.time_range()
    }

    pub fn topology_time_span(&self) -> &Arc<TopologyTimeSpan> {
        &self.topology_time_span
    }

    pub fn config(&self) -> &TimeSpanConfig {
        &self.config
    }

    pub fn reconstruction_plate_id(&self) -> PlateId {
        self.reconstruction_plate_id
    }

    pub fn import_time(&self) -> f64 {
        self.import_time
    }

    pub fn import_time_slot(&self) -> usize {
        self.import_time_slot
    }

    /// The geometry as imported.
    pub fn geometry(&self) -> &GeometryOnSphere {
        &self.geometry
    }

    /// The imported geometry's points and the vertices they derive from.
    pub fn tessellated_geometry(&self) -> &TessellatedGeometry {
        &self.tessellated
    }

    pub fn num_points(&self) -> usize {
        self.tessellated.len()
    }

    /// Time (Ma) at and before which the geometry does not exist.
    pub fn appearance_time(&self) -> Option<f64> {
        self.appearance_time_slot.map(|s| self.time_range().get_time(s))
    }

    /// Time (Ma) at and after which the geometry no longer exists.
    pub fn disappearance_time(&self) -> Option<f64> {
        self.disappearance_time_slot.map(|s| self.time_range().get_time(s))
    }

    pub fn time_slot_sample(&self, time_slot: usize) -> Option<&GeometrySample> {
        self.time_slot_samples.get(time_slot)?.as_ref()
    }

    pub fn present_day_sample(&self) -> Option<&GeometrySample> {
        self.present_day_sample.as_ref()
    }

    pub fn point(&self, handle: PointHandle) -> Option<&GeometryPoint> {
        self.arena.get(handle)
    }
}

/// Moves points from one time to another by their classification.
pub(super) struct Propagator<'a> {
    topologies: &'a ResolvedTopologies,
    creator: &'a dyn ReconstructionTreeCreator,
    reconstruction_plate_id: PlateId,
    from_time: f64,
    to_time: f64,
    /// `Some(use_natural_neighbour)` to deform points inside networks;
    /// `None` moves every point rigidly.
    deformation: Option<bool>,
    stage_rotations: HashMap<StageRotationKey, FiniteRotation>,
}

/// Boundary index (`None` for the span's own creator) and plate.
type StageRotationKey = (Option<usize>, PlateId);

impl<'a> Propagator<'a> {
    pub(super) fn new(
        topologies: &'a ResolvedTopologies,
        creator: &'a dyn ReconstructionTreeCreator,
        reconstruction_plate_id: PlateId,
        from_time: f64,
        to_time: f64,
        deformation: Option<bool>,
    ) -> Self {
        Self {
            topologies,
            creator,
            reconstruction_plate_id,
            from_time,
            to_time,
            deformation,
            stage_rotations: HashMap::new(),
        }
    }

    /// Network deformation first, then the plate of the containing boundary
    /// (rotated by that boundary's creator), then the reconstruction plate.
    pub(super) fn propagate(&mut self, point: &GeometryPoint) -> DVec3 {
        let topologies = self.topologies;
        let boundary_plate = match point.location {
            TopologyPointLocation::InNetwork { network, location, .. } => {
                if let (Some(use_natural_neighbour), Some(resolved)) =
                    (self.deformation, topologies.networks().get(network))
                {
                    let deformed = resolved.calculate_deformed_point(
                        point.position,
                        (self.to_time - self.from_time).abs(),
                        self.to_time > self.from_time,
                        use_natural_neighbour,
                        Some(&location),
                    );
                    if let Some((position, _)) = deformed {
                        return position;
                    }
                }
                // Networks may overlay boundaries.
                topologies
                    .boundaries()
                    .iter()
                    .position(|b| b.contains_point(point.position))
                    .and_then(|i| topologies.boundaries()[i].plate_id().map(|plate_id| (i, plate_id)))
            }
            TopologyPointLocation::InBoundary { boundary, plate_id } => plate_id.map(|plate_id| (boundary, plate_id)),
            TopologyPointLocation::NotFound => None,
        };

        // Boundaries carry their own tree creator.
        let (key, creator): (StageRotationKey, &dyn ReconstructionTreeCreator) =
            match boundary_plate.and_then(|(i, plate_id)| Some((i, plate_id, topologies.boundaries().get(i)?))) {
                Some((i, plate_id, boundary)) => {
                    ((Some(i), plate_id), boundary.get_reconstruction_tree_creator().as_ref())
                }
                None => ((None, self.reconstruction_plate_id), self.creator),
            };
        let (from_time, to_time) = (self.from_time, self.to_time);
        self.stage_rotations
            .entry(key)
            .or_insert_with(|| stage_rotation(creator, key.1, from_time, to_time))
            .rotate(point.position)
    }
}

/// Candidates among `topologies` near the active points.
pub(super) fn cull_for_points(topologies: &ResolvedTopologies, positions: &[Option<DVec3>]) -> TopologyCandidates {
    let bounds = BoundingSmallCircle::from_points(positions.iter().flatten().copied());
    topologies.cull(bounds.as_ref())
}

/// Classifies a point and picks up its strain rate if it lies in a
/// deforming face.
pub(super) fn locate(
    topologies: &ResolvedTopologies,
    candidates: &TopologyCandidates,
    position: DVec3,
) -> (TopologyPointLocation, Option<StrainRate>) {
    let location = topologies.locate_point(position, candidates);
    let strain_rate = match &location {
        TopologyPointLocation::InNetwork { network, location, .. } if location.is_deforming() => topologies
            .networks()
            .get(*network)
            .and_then(|n| n.calculate_deformation(position, location)),
        _ => None,
    };
    (location, strain_rate)
}

/// Builds time spans for many geometries in parallel.
///
/// The spans share the topology time span (and its tree creator) read-only.
pub fn create_time_spans(
    topology_time_span: &Arc<TopologyTimeSpan>,
    imports: Vec<GeometryImport>,
    config: &TimeSpanConfig,
) -> Result<Vec<GeometryTimeSpan>, TimeSpanError> {
    imports
        .into_par_iter()
        .map(|import| {
            GeometryTimeSpan::new(
                Arc::clone(topology_time_span),
                import.geometry,
                import.reconstruction_plate_id,
                import.import_time,
                config.clone(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maths::{angular_distance, lat_lon_to_unit, PolygonOnSphere};
    use crate::reconstruct::VelocitySurface;
    use crate::rotation::{CachedReconstructionTreeCreator, PoleSample, RotationGraph, VelocityDeltaTimeType};
    use crate::topology::{
        NetworkId, NetworkPointLocation, ResolvedNetwork, ResolvedTopologicalBoundary, RigidBlockRef,
    };

    /// Plate 1 rotates about Z at 1 degree per My; no topologies.
    ///
    /// Poles are sampled every 100 My so no stage exceeds a half turn.
    fn topology_span(begin: f64, end: f64, increment: f64) -> Arc<TopologyTimeSpan> {
        let graph = RotationGraph::from_sequences(vec![(
            0,
            1,
            vec![
                PoleSample::new(0.0, FiniteRotation::IDENTITY),
                PoleSample::new(100.0, FiniteRotation::from_axis_angle(DVec3::Z, 100f64.to_radians())),
                PoleSample::new(200.0, FiniteRotation::from_axis_angle(DVec3::Z, 200f64.to_radians())),
            ],
        )])
        .unwrap();
        let creator: Arc<dyn ReconstructionTreeCreator> =
            Arc::new(CachedReconstructionTreeCreator::new(Arc::new(graph), 0));
        let range = TimeRange::new(begin, end, increment).unwrap();
        Arc::new(TopologyTimeSpan::new(range, creator, |_| ResolvedTopologies::default()))
    }

    #[test]
    fn test_rigid_samples_follow_reconstruction_plate() {
        let span = GeometryTimeSpan::new(
            topology_span(50.0, 0.0, 10.0),
            GeometryOnSphere::Point(lat_lon_to_unit(0.0, 0.0)),
            1,
            0.0,
            TimeSpanConfig::default(),
        )
        .unwrap();

        assert_eq!(span.import_time_slot(), 5);
        for slot in 0..6 {
            let sample = span.time_slot_sample(slot).unwrap();
            let point = span.point(sample.points()[0].unwrap()).unwrap();
            let time = span.time_range().get_time(slot);
            let expected = lat_lon_to_unit(0.0, time);
            assert!(angular_distance(point.position, expected) < 1e-9);
        }
        assert!(span.appearance_time().is_none());
        assert!(span.disappearance_time().is_none());
    }

    #[test]
    fn test_import_outside_range_uses_nearest_slot() {
        let span = GeometryTimeSpan::new(
            topology_span(50.0, 20.0, 10.0),
            GeometryOnSphere::Point(lat_lon_to_unit(0.0, 0.0)),
            1,
            100.0,
            TimeSpanConfig::default(),
        )
        .unwrap();
        assert_eq!(span.import_time_slot(), 0);

        // Imported at 100 Ma at longitude 0, so at 50 Ma it is at -50.
        let sample = span.time_slot_sample(0).unwrap();
        let point = span.point(sample.points()[0].unwrap()).unwrap();
        assert!(angular_distance(point.position, lat_lon_to_unit(0.0, -50.0)) < 1e-9);

        // Present day is rotated from the youngest slot.
        let present = span.present_day_sample().unwrap();
        let point = span.point(present.points()[0].unwrap()).unwrap();
        assert!(angular_distance(point.position, lat_lon_to_unit(0.0, -100.0)) < 1e-9);
    }

    #[test]
    fn test_empty_geometry() {
        let span = GeometryTimeSpan::new(
            topology_span(20.0, 0.0, 10.0),
            GeometryOnSphere::MultiPoint(vec![]),
            1,
            0.0,
            TimeSpanConfig::with_deactivation(),
        )
        .unwrap();
        assert_eq!(span.num_points(), 0);
        assert!(span.time_slot_sample(0).is_none());
        assert!(span.present_day_sample().is_none());
    }

    #[test]
    fn test_strains_stay_identity_without_networks() {
        let span = GeometryTimeSpan::new(
            topology_span(20.0, 0.0, 10.0),
            GeometryOnSphere::MultiPoint(vec![DVec3::X, DVec3::Y]),
            1,
            0.0,
            TimeSpanConfig::default(),
        )
        .unwrap();
        let table = span.strain_table();
        for strains in table.time_slots.iter().flatten() {
            for strain in strains.iter().flatten() {
                assert_eq!(*strain, DeformationStrain::IDENTITY);
            }
        }
        assert_eq!(table.present_day.len(), 2);
    }

    #[test]
    fn test_create_time_spans_in_parallel() {
        let topology_span = topology_span(30.0, 0.0, 10.0);
        let imports = (0..8)
            .map(|i| GeometryImport {
                geometry: GeometryOnSphere::Point(lat_lon_to_unit(i as f64, 0.0)),
                reconstruction_plate_id: 1,
                import_time: 0.0,
            })
            .collect();
        let spans = create_time_spans(&topology_span, imports, &TimeSpanConfig::default()).unwrap();
        assert_eq!(spans.len(), 8);
        assert!(spans.iter().all(|s| s.time_slot_sample(0).is_some()));
    }

    fn square(lat0: f64, lat1: f64, lon0: f64, lon1: f64) -> PolygonOnSphere {
        PolygonOnSphere::new(vec![
            lat_lon_to_unit(lat0, lon0),
            lat_lon_to_unit(lat0, lon1),
            lat_lon_to_unit(lat1, lon1),
            lat_lon_to_unit(lat1, lon0),
        ])
        .unwrap()
    }

    /// West (plate 1) and east (plate 2) boundaries meeting at longitude 0,
    /// over 50..0 Ma in 1 My steps. Each plate rotates about Z at the given
    /// rate in degrees per My.
    fn boundary_span(west_rate: f64, east_rate: f64) -> Arc<TopologyTimeSpan> {
        let sequence = |moving: PlateId, rate: f64| {
            (
                0,
                moving,
                vec![
                    PoleSample::new(0.0, FiniteRotation::IDENTITY),
                    PoleSample::new(100.0, FiniteRotation::from_axis_angle(DVec3::Z, (100.0 * rate).to_radians())),
                    PoleSample::new(200.0, FiniteRotation::from_axis_angle(DVec3::Z, (200.0 * rate).to_radians())),
                ],
            )
        };
        let graph = RotationGraph::from_sequences(vec![sequence(1, west_rate), sequence(2, east_rate)]).unwrap();
        let creator: Arc<dyn ReconstructionTreeCreator> =
            Arc::new(CachedReconstructionTreeCreator::new(Arc::new(graph), 0));
        let range = TimeRange::new(50.0, 0.0, 1.0).unwrap();
        let boundary_creator = Arc::clone(&creator);
        Arc::new(TopologyTimeSpan::new(range, creator, move |time| {
            let west =
                ResolvedTopologicalBoundary::new(Some(1), time, square(-10.0, 10.0, -30.0, 0.0), boundary_creator.clone());
            let east =
                ResolvedTopologicalBoundary::new(Some(2), time, square(-10.0, 10.0, 0.0, 30.0), boundary_creator.clone());
            ResolvedTopologies::new(vec![Arc::new(west), Arc::new(east)], vec![])
        }))
    }

    #[test]
    fn test_points_consumed_at_boundary_are_deactivated() {
        // The east plate moves west at 1 degree per My into the static west plate.
        let span = GeometryTimeSpan::new(
            boundary_span(0.0, 1.0),
            GeometryOnSphere::MultiPoint(vec![lat_lon_to_unit(0.0, 0.5), lat_lon_to_unit(0.0, 10.5)]),
            2,
            50.0,
            TimeSpanConfig::with_deactivation(),
        )
        .unwrap();

        assert_eq!(span.import_time_slot(), 0);
        assert!(span.appearance_time().is_none());
        assert_eq!(span.disappearance_time(), Some(38.0));

        let mut was_active = [true, true];
        for slot in 0..span.time_range().num_time_slots() {
            let Some(sample) = span.time_slot_sample(slot) else {
                assert!(slot >= 12);
                continue;
            };
            assert_eq!(sample.len(), 2);
            for (index, handle) in sample.points().iter().enumerate() {
                // Once deactivated a point never comes back.
                assert!(was_active[index] || handle.is_none());
                was_active[index] = handle.is_some();
            }
        }

        // The first point reaches the west plate at 49 Ma and is kept there;
        // it is consumed on the following step.
        let handle = span.time_slot_sample(1).unwrap().points()[0].unwrap();
        let point = span.point(handle).unwrap();
        assert!(matches!(point.location, TopologyPointLocation::InBoundary { plate_id: Some(1), .. }));
        assert!(angular_distance(point.position, lat_lon_to_unit(0.0, -0.5)) < 1e-9);
        assert!(span.time_slot_sample(2).unwrap().points()[0].is_none());

        assert!(span.time_slot_sample(11).unwrap().points()[1].is_some());

        assert!(span.is_valid(45.0));
        assert!(span.is_valid(39.0));
        assert!(!span.is_valid(38.0));
        assert!(!span.is_valid(20.0));
        assert_eq!(span.get_geometry_data(45.0).unwrap().points.len(), 1);
    }

    #[test]
    fn test_points_deactivated_walking_back_set_appearance() {
        // Walking back from present day the west plate moves east into the
        // static east plate.
        let span = GeometryTimeSpan::new(
            boundary_span(1.0, 0.0),
            GeometryOnSphere::Point(lat_lon_to_unit(0.0, -0.5)),
            1,
            0.0,
            TimeSpanConfig::with_deactivation(),
        )
        .unwrap();

        assert_eq!(span.import_time_slot(), 50);
        assert!(span.disappearance_time().is_none());
        assert_eq!(span.appearance_time(), Some(2.0));

        // Kept at 1 Ma in the east plate, gone from 2 Ma on.
        let handle = span.time_slot_sample(49).unwrap().points()[0].unwrap();
        let point = span.point(handle).unwrap();
        assert!(matches!(point.location, TopologyPointLocation::InBoundary { plate_id: Some(2), .. }));
        for slot in 0..49 {
            assert!(span.time_slot_sample(slot).is_none());
        }

        assert!(span.is_valid(1.5));
        assert!(!span.is_valid(2.0));
        assert!(!span.is_valid(30.0));
        assert!(span.get_geometry(10.0).is_none());
    }

    #[test]
    fn test_between_slot_query_matches_nearer_slot_active_set() {
        let span = GeometryTimeSpan::new(
            boundary_span(0.0, 1.0),
            GeometryOnSphere::MultiPoint(vec![lat_lon_to_unit(0.0, 0.5), lat_lon_to_unit(0.0, 10.5)]),
            2,
            50.0,
            TimeSpanConfig::with_deactivation(),
        )
        .unwrap();

        // 49 Ma has both points, 48 Ma only the second.
        assert_eq!(span.time_slot_sample(1).unwrap().num_active(), 2);
        assert_eq!(span.time_slot_sample(2).unwrap().num_active(), 1);

        // Between them the slot nearer the import time (49 Ma) decides.
        let data = span.get_all_geometry_data(48.5).unwrap();
        assert!(data.points.iter().all(Option::is_some));
        // The first point sits on the static west plate.
        let first = data.points[0].unwrap();
        assert!(angular_distance(first, lat_lon_to_unit(0.0, -0.5)) < 1e-9);

        // Between 48 and 47 Ma only the second point remains.
        let data = span.get_all_geometry_data(47.5).unwrap();
        assert!(data.points[0].is_none());
        assert!(data.points[1].is_some());
    }

    #[test]
    fn test_boundary_points_rotate_with_boundary_creator() {
        let static_graph = RotationGraph::from_sequences(vec![(
            0,
            5,
            vec![
                PoleSample::new(0.0, FiniteRotation::IDENTITY),
                PoleSample::new(100.0, FiniteRotation::IDENTITY),
            ],
        )])
        .unwrap();
        let moving_graph = RotationGraph::from_sequences(vec![(
            0,
            5,
            vec![
                PoleSample::new(0.0, FiniteRotation::IDENTITY),
                PoleSample::new(100.0, FiniteRotation::from_axis_angle(DVec3::Z, 100f64.to_radians())),
            ],
        )])
        .unwrap();
        let span_creator: Arc<dyn ReconstructionTreeCreator> =
            Arc::new(CachedReconstructionTreeCreator::new(Arc::new(static_graph), 0));
        let boundary_creator: Arc<dyn ReconstructionTreeCreator> =
            Arc::new(CachedReconstructionTreeCreator::new(Arc::new(moving_graph), 0));

        let range = TimeRange::new(20.0, 0.0, 5.0).unwrap();
        let topologies = Arc::new(TopologyTimeSpan::new(range, span_creator, move |time| {
            let boundary = ResolvedTopologicalBoundary::new(
                Some(5),
                time,
                square(-10.0, 10.0, -30.0, 30.0),
                boundary_creator.clone(),
            );
            ResolvedTopologies::new(vec![Arc::new(boundary)], vec![])
        }));
        let span = GeometryTimeSpan::new(
            topologies,
            GeometryOnSphere::Point(lat_lon_to_unit(0.0, 0.0)),
            5,
            0.0,
            TimeSpanConfig::default(),
        )
        .unwrap();

        let Some(GeometryOnSphere::Point(at_10)) = span.get_geometry(10.0) else {
            panic!("expected a point at 10 Ma");
        };
        assert!(angular_distance(at_10, lat_lon_to_unit(0.0, 10.0)) < 1e-9);

        let velocities = span.get_velocities(10.0, 1.0, VelocityDeltaTimeType::TPlusDeltaTToT);
        assert_eq!(velocities.surfaces[0], VelocitySurface::Boundary { plate_id: 5 });
        assert!(velocities.velocities[0].length() > 10.0);
    }

    #[test]
    fn test_crossing_without_relative_motion_keeps_points() {
        // Both plates move together, so crossing between them is not consumption.
        let span = GeometryTimeSpan::new(
            boundary_span(1.0, 1.0),
            GeometryOnSphere::MultiPoint(vec![lat_lon_to_unit(0.0, 0.5), lat_lon_to_unit(0.0, 10.5)]),
            2,
            50.0,
            TimeSpanConfig::with_deactivation(),
        )
        .unwrap();

        assert!(span.disappearance_time().is_none());
        for slot in 0..span.time_range().num_time_slots() {
            assert_eq!(span.time_slot_sample(slot).unwrap().num_active(), 2);
        }
        let velocities = span.get_velocities(20.0, 1.0, VelocityDeltaTimeType::TPlusDeltaTToT);
        assert_eq!(velocities.len(), 2);
    }

    #[test]
    fn test_slot_query_matches_stored_points() {
        let span = GeometryTimeSpan::new(
            boundary_span(0.0, 1.0),
            GeometryOnSphere::MultiPoint(vec![lat_lon_to_unit(0.0, 10.5), lat_lon_to_unit(5.0, 20.0)]),
            2,
            50.0,
            TimeSpanConfig::with_deactivation(),
        )
        .unwrap();

        for slot in [0, 3, 7] {
            let time = span.time_range().get_time(slot);
            let data = span.get_all_geometry_data(time).unwrap();
            let sample = span.time_slot_sample(slot).unwrap();
            for (index, handle) in sample.points().iter().enumerate() {
                let stored = handle.and_then(|h| span.point(h)).map(|p| p.position);
                assert_eq!(data.points[index], stored);
            }
        }
    }

    /// A network covering the equator around longitude 0 with a single
    /// deforming face of constant strain rate. Points do not move.
    struct ConstantStrainNetwork {
        polygon: PolygonOnSphere,
        time: f64,
        strain_rate: StrainRate,
    }

    impl ResolvedNetwork for ConstantStrainNetwork {
        fn network_id(&self) -> NetworkId {
            7
        }

        fn reconstruction_time(&self) -> f64 {
            self.time
        }

        fn boundary_polygon(&self) -> &PolygonOnSphere {
            &self.polygon
        }

        fn locate_point(&self, point: DVec3, _hint: Option<&NetworkPointLocation>) -> Option<NetworkPointLocation> {
            self.polygon.contains_point(point).then_some(NetworkPointLocation::DeformingFace {
                face: 0,
                barycentric: DVec3::splat(1.0 / 3.0),
            })
        }

        fn calculate_velocity_at(
            &self,
            point: DVec3,
            _time: f64,
            _delta_time: f64,
            _delta_time_type: VelocityDeltaTimeType,
            hint: Option<&NetworkPointLocation>,
        ) -> Option<(DVec3, Option<RigidBlockRef>)> {
            self.locate_point(point, hint).map(|_| (DVec3::ZERO, None))
        }

        fn calculate_deformed_point(
            &self,
            point: DVec3,
            _delta_time: f64,
            _reverse: bool,
            _use_natural_neighbour: bool,
            hint: Option<&NetworkPointLocation>,
        ) -> Option<(DVec3, NetworkPointLocation)> {
            self.locate_point(point, hint).map(|location| (point, location))
        }

        fn calculate_deformation(&self, _point: DVec3, location: &NetworkPointLocation) -> Option<StrainRate> {
            location.is_deforming().then_some(self.strain_rate)
        }
    }

    #[test]
    fn test_strain_accumulates_after_network_slot() {
        let graph = RotationGraph::from_sequences(vec![(
            0,
            1,
            vec![
                PoleSample::new(0.0, FiniteRotation::IDENTITY),
                PoleSample::new(100.0, FiniteRotation::IDENTITY),
            ],
        )])
        .unwrap();
        let creator: Arc<dyn ReconstructionTreeCreator> =
            Arc::new(CachedReconstructionTreeCreator::new(Arc::new(graph), 0));
        let strain_rate = StrainRate::from_components(1.0e-15, -1.0e-15, 0.0);
        let range = TimeRange::new(15.0, 0.0, 5.0).unwrap();
        // Only the 10 Ma slot has the network.
        let topologies = Arc::new(TopologyTimeSpan::new(range, creator, |time| {
            if (time - 10.0).abs() > 1e-9 {
                return ResolvedTopologies::default();
            }
            let network = ConstantStrainNetwork {
                polygon: square(-5.0, 5.0, -5.0, 5.0),
                time,
                strain_rate,
            };
            ResolvedTopologies::new(vec![], vec![Arc::new(network)])
        }));

        let span = GeometryTimeSpan::new(
            topologies,
            GeometryOnSphere::Point(lat_lon_to_unit(0.0, 0.0)),
            1,
            0.0,
            TimeSpanConfig::default(),
        )
        .unwrap();

        let expected = DeformationStrain::IDENTITY.accumulate(&strain_rate, 5.0 * SECONDS_PER_MY);
        let close = |a: DeformationStrain, b: DeformationStrain| {
            a.deformation_gradient().abs_diff_eq(b.deformation_gradient(), 1e-12)
        };

        let at_10 = span.get_geometry_data(10.0).unwrap();
        assert!(close(at_10.strains[0], DeformationStrain::IDENTITY));
        assert_eq!(at_10.strain_rates[0], strain_rate);

        let at_5 = span.get_geometry_data(5.0).unwrap();
        assert!(close(at_5.strains[0], expected));
        assert!(at_5.strain_rates[0].is_zero());

        // No further strain rate after 5 Ma.
        let at_0 = span.get_geometry_data(0.0).unwrap();
        assert!(close(at_0.strains[0], expected));

        let halfway = span.get_geometry_data(7.5).unwrap();
        assert!(close(halfway.strains[0], DeformationStrain::IDENTITY.lerp(&expected, 0.5)));
    }
}
