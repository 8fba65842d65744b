//! Read-only queries on a built [`GeometryTimeSpan`] at arbitrary times.

use glam::DVec3;

use super::point::GeometrySample;
use super::time_span::{cull_for_points, locate, GeometryTimeSpan, Propagator};
use crate::maths::{DeformationStrain, GeometryOnSphere, StrainRate};
use crate::rotation::{plate_velocity, PlateId, VelocityDeltaTimeType};
use crate::time::TIME_SLOT_EPSILON;
use crate::topology::{NetworkId, ResolvedTopologies, RigidBlockRef, TopologyPointLocation};

/// Active points of a geometry at one time, compacted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryData {
    pub points: Vec<DVec3>,
    /// Zero for points outside deforming networks.
    pub strain_rates: Vec<StrainRate>,
    pub strains: Vec<DeformationStrain>,
}

/// All points of a geometry at one time, index-aligned with the
/// tessellated geometry; inactive points are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllGeometryData {
    pub points: Vec<Option<DVec3>>,
    pub strain_rates: Vec<Option<StrainRate>>,
    pub strains: Vec<Option<DeformationStrain>>,
}

/// The surface a velocity was calculated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VelocitySurface {
    Network {
        network_id: NetworkId,
        rigid_block: Option<RigidBlockRef>,
    },
    Boundary {
        plate_id: PlateId,
    },
    /// No topology covers the point; it moves with the geometry's plate.
    ReconstructionPlate {
        plate_id: PlateId,
    },
}

/// Velocities (cm/yr) of the active points at one time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Velocities {
    pub domain_points: Vec<DVec3>,
    pub velocities: Vec<DVec3>,
    pub surfaces: Vec<VelocitySurface>,
}

impl Velocities {
    pub fn len(&self) -> usize {
        self.domain_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.domain_points.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct ResolvedPoint {
    position: DVec3,
    strain_rate: Option<StrainRate>,
    strain: DeformationStrain,
}

impl GeometryTimeSpan {
    /// True if the geometry exists at `time`.
    ///
    /// A geometry exists strictly between its appearance and disappearance
    /// times, and never if it has no points.
    pub fn is_valid(&self, time: f64) -> bool {
        if self.tessellated.is_empty() {
            return false;
        }
        if let Some(appearance) = self.appearance_time() {
            if time >= appearance - TIME_SLOT_EPSILON {
                return false;
            }
        }
        if let Some(disappearance) = self.disappearance_time() {
            if time <= disappearance + TIME_SLOT_EPSILON {
                return false;
            }
        }
        true
    }

    /// The active points as a point (for a point geometry) or multipoint.
    pub fn get_geometry(&self, time: f64) -> Option<GeometryOnSphere> {
        let mut points: Vec<DVec3> = self.resolve(time)?.into_iter().flatten().map(|p| p.position).collect();
        match points.len() {
            0 => None,
            1 if self.geometry.is_point() => points.pop().map(GeometryOnSphere::Point),
            _ => Some(GeometryOnSphere::MultiPoint(points)),
        }
    }

    /// Positions, strain rates and strains of the active points.
    pub fn get_geometry_data(&self, time: f64) -> Option<GeometryData> {
        let resolved = self.resolve(time)?;
        let mut data = GeometryData::default();
        for point in resolved.into_iter().flatten() {
            data.points.push(point.position);
            data.strain_rates.push(point.strain_rate.unwrap_or(StrainRate::ZERO));
            data.strains.push(point.strain);
        }
        (!data.points.is_empty()).then_some(data)
    }

    /// Positions, strain rates and strains of every point, `None` where
    /// inactive.
    pub fn get_all_geometry_data(&self, time: f64) -> Option<AllGeometryData> {
        let resolved = self.resolve(time)?;
        let mut data = AllGeometryData::default();
        for point in resolved {
            data.points.push(point.map(|p| p.position));
            data.strain_rates.push(point.map(|p| p.strain_rate.unwrap_or(StrainRate::ZERO)));
            data.strains.push(point.map(|p| p.strain));
        }
        Some(data)
    }

    /// Velocities of the active points at `time`.
    ///
    /// Points are located in the topologies of the nearest time slot. Times
    /// outside the range (or points outside every topology) use the
    /// geometry's reconstruction plate.
    pub fn get_velocities(
        &self,
        time: f64,
        velocity_delta_time: f64,
        velocity_delta_time_type: VelocityDeltaTimeType,
    ) -> Velocities {
        let Some(resolved) = self.resolve(time) else {
            return Velocities::default();
        };
        let domain_points: Vec<Option<DVec3>> = resolved.iter().map(|p| p.map(|p| p.position)).collect();

        let empty = ResolvedTopologies::default();
        let topologies = self
            .time_range()
            .get_nearest_time_slot(time)
            .and_then(|slot| self.topology_time_span.topologies(slot))
            .unwrap_or(&empty);
        let candidates = cull_for_points(topologies, &domain_points);
        let creator = self.topology_time_span.creator().as_ref();

        let mut velocities = Velocities::default();
        for point in domain_points.into_iter().flatten() {
            let location = locate(topologies, &candidates, point).0;
            let found = match location {
                TopologyPointLocation::InNetwork {
                    network,
                    network_id,
                    location,
                } => topologies.networks()[network]
                    .calculate_velocity_at(
                        point,
                        time,
                        velocity_delta_time,
                        velocity_delta_time_type,
                        Some(&location),
                    )
                    .map(|(velocity, rigid_block)| {
                        (velocity, VelocitySurface::Network { network_id, rigid_block })
                    }),
                TopologyPointLocation::InBoundary {
                    boundary,
                    plate_id: Some(plate_id),
                } => Some((
                    plate_velocity(
                        topologies.boundaries()[boundary].get_reconstruction_tree_creator().as_ref(),
                        plate_id,
                        point,
                        time,
                        velocity_delta_time,
                        velocity_delta_time_type,
                    ),
                    VelocitySurface::Boundary { plate_id },
                )),
                _ => None,
            };
            let (velocity, surface) = found.unwrap_or_else(|| {
                let plate_id = self.reconstruction_plate_id;
                (
                    plate_velocity(creator, plate_id, point, time, velocity_delta_time, velocity_delta_time_type),
                    VelocitySurface::ReconstructionPlate { plate_id },
                )
            });
            velocities.domain_points.push(point);
            velocities.velocities.push(velocity);
            velocities.surfaces.push(surface);
        }
        velocities
    }

    /// Every point at `time`, `None` where inactive.
    ///
    /// Slot times return the stored sample. Times between slots move the
    /// points of the bracketing slot nearer the import time, so the active
    /// points are exactly that slot's. Times outside the range move the
    /// nearest end slot (or the present-day sample) rigidly.
    fn resolve(&self, time: f64) -> Option<Vec<Option<ResolvedPoint>>> {
        if !self.is_valid(time) {
            return None;
        }
        let time_range = *self.time_range();

        if time_range.contains(time) {
            if let Some(slot) = time_range.get_time_slot(time) {
                return self.slot_points(slot);
            }
            let (older, younger, fraction) = time_range.get_bounding_time_slots(time)?;
            let source = if younger <= self.import_time_slot { younger } else { older };
            let mut points = self.propagate_slot(source, time, true)?;

            // Blend the strains of both bracketing slots where available.
            let strains = &self.strain_table().time_slots;
            let older_strains = strains[older].as_ref();
            let younger_strains = strains[younger].as_ref();
            for (index, point) in points.iter_mut().enumerate() {
                let Some(point) = point else { continue };
                let older_strain = older_strains.and_then(|s| s[index]);
                let younger_strain = younger_strains.and_then(|s| s[index]);
                if let (Some(a), Some(b)) = (older_strain, younger_strain) {
                    point.strain = a.lerp(&b, fraction);
                }
            }
            log::trace!("Interpolated {} Ma from time slot {}", time, source);
            return Some(points);
        }

        if time.abs() <= TIME_SLOT_EPSILON {
            let sample = self.present_day_sample.as_ref()?;
            let strains = &self.strain_table().present_day;
            return Some(self.sample_points(sample, strains));
        }

        let end_slot = if time > time_range.begin_time() {
            0
        } else {
            time_range.num_time_slots() - 1
        };
        self.propagate_slot(end_slot, time, false)
    }

    fn slot_points(&self, slot: usize) -> Option<Vec<Option<ResolvedPoint>>> {
        let sample = self.time_slot_samples.get(slot)?.as_ref()?;
        let strains = self.strain_table().time_slots[slot].as_deref().unwrap_or(&[]);
        Some(self.sample_points(sample, strains))
    }

    fn sample_points(&self, sample: &GeometrySample, strains: &[Option<DeformationStrain>]) -> Vec<Option<ResolvedPoint>> {
        sample
            .points()
            .iter()
            .enumerate()
            .map(|(index, handle)| {
                let point = self.arena.get((*handle)?)?;
                Some(ResolvedPoint {
                    position: point.position,
                    strain_rate: point.strain_rate,
                    strain: strains.get(index).copied().flatten().unwrap_or(DeformationStrain::IDENTITY),
                })
            })
            .collect()
    }

    /// Moves the points of `slot` to `time`, deforming inside networks when
    /// `deform` is set.
    fn propagate_slot(&self, slot: usize, time: f64, deform: bool) -> Option<Vec<Option<ResolvedPoint>>> {
        let sample = self.time_slot_samples.get(slot)?.as_ref()?;
        let strains = self.strain_table().time_slots[slot].as_deref().unwrap_or(&[]);

        let empty = ResolvedTopologies::default();
        let topologies = self.topology_time_span.topologies(slot).unwrap_or(&empty);
        let mut propagator = Propagator::new(
            topologies,
            self.topology_time_span.creator().as_ref(),
            self.reconstruction_plate_id,
            self.time_range().get_time(slot),
            time,
            deform.then_some(self.config.use_natural_neighbour_interpolation),
        );

        let points: Vec<Option<ResolvedPoint>> = self
            .sample_points(sample, strains)
            .into_iter()
            .zip(sample.points())
            .map(|(resolved, handle)| {
                let resolved = resolved?;
                let point = self.arena.get((*handle)?)?;
                Some(ResolvedPoint {
                    position: propagator.propagate(point),
                    ..resolved
                })
            })
            .collect();
        Some(points)
    }
}
