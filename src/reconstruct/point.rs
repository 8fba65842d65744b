//! Per-slot point samples and the arena that owns them.

use glam::DVec3;

use crate::maths::StrainRate;
use crate::topology::TopologyPointLocation;

/// Handle of a [`GeometryPoint`] in a [`PointArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointHandle(u32);

impl PointHandle {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// One reconstructed point at one time slot.
///
/// Points are never modified once allocated; each time step allocates new
/// points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeometryPoint {
    /// Position on the unit sphere.
    pub position: DVec3,
    /// Classification against the topologies of the point's own slot.
    pub location: TopologyPointLocation,
    /// Strain rate when inside a deforming network face.
    pub strain_rate: Option<StrainRate>,
}

impl GeometryPoint {
    pub fn new(position: DVec3, location: TopologyPointLocation, strain_rate: Option<StrainRate>) -> Self {
        Self {
            position,
            location,
            strain_rate,
        }
    }
}

/// Append-only storage for all points of one time span.
#[derive(Debug, Clone, Default)]
pub struct PointArena {
    points: Vec<GeometryPoint>,
}

impl PointArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, point: GeometryPoint) -> PointHandle {
        let handle = PointHandle(self.points.len() as u32);
        self.points.push(point);
        handle
    }

    pub fn get(&self, handle: PointHandle) -> Option<&GeometryPoint> {
        self.points.get(handle.index())
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The points of a geometry at one time slot.
///
/// Entries are index-aligned with the tessellated geometry; `None` marks a
/// deactivated point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometrySample {
    points: Vec<Option<PointHandle>>,
}

impl GeometrySample {
    pub fn new(points: Vec<Option<PointHandle>>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Option<PointHandle>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn num_active(&self) -> usize {
        self.points.iter().filter(|p| p.is_some()).count()
    }

    pub fn has_active_points(&self) -> bool {
        self.points.iter().any(Option::is_some)
    }
}
