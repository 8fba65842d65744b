//! Time-stamped finite rotations of a rotation sequence.

use glam::DVec3;

use crate::maths::FiniteRotation;
use crate::time::GeoTimeInstant;

/// A single (time, finite rotation) sample of a plate-pair rotation sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoleSample {
    time: GeoTimeInstant,
    rotation: FiniteRotation,
    axis_hint: Option<DVec3>,
}

impl PoleSample {
    pub fn new(time: impl Into<GeoTimeInstant>, rotation: FiniteRotation) -> Self {
        Self {
            time: time.into(),
            rotation,
            axis_hint: rotation.axis_hint(),
        }
    }

    /// Adds a preferred rotation-axis direction used when interpolating.
    pub fn with_axis_hint(mut self, axis_hint: DVec3) -> Self {
        self.rotation = self.rotation.with_axis_hint(Some(axis_hint));
        self.axis_hint = self.rotation.axis_hint();
        self
    }

    pub fn time(&self) -> GeoTimeInstant {
        self.time
    }

    pub fn rotation(&self) -> &FiniteRotation {
        &self.rotation
    }

    pub fn axis_hint(&self) -> Option<DVec3> {
        self.axis_hint
    }
}
