//! Configuration for geometry time spans.

use serde::{Deserialize, Serialize};

/// Thresholds deciding when a point crossing between topologies is consumed
/// (for example subducted) rather than simply changing plate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeactivatePointsConfig {
    /// Velocity difference (cm/yr) between the old and new surface below
    /// which a point is never deactivated.
    pub threshold_velocity_delta: f64,
    /// Base distance (km per My of time step) from the old surface's
    /// boundary within which a point may be deactivated. Grows with the
    /// velocity difference.
    pub threshold_distance_to_boundary: f64,
    /// Deactivate points that leave a deforming network regardless of the
    /// velocity and distance thresholds.
    pub deactivate_points_that_fall_outside_a_network: bool,
}

impl Default for DeactivatePointsConfig {
    fn default() -> Self {
        Self {
            threshold_velocity_delta: 0.7,
            threshold_distance_to_boundary: 10.0,
            deactivate_points_that_fall_outside_a_network: false,
        }
    }
}

/// Configuration for building a [`GeometryTimeSpan`](super::GeometryTimeSpan).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSpanConfig {
    /// Maximum arc (degrees) between tessellated points of polylines and
    /// polygons. `None` keeps only the original vertices.
    pub max_tessellation_angle_degrees: Option<f64>,
    /// Request natural neighbour rather than barycentric interpolation in
    /// deforming networks.
    pub use_natural_neighbour_interpolation: bool,
    /// Deactivation thresholds, or `None` to keep every point active.
    pub deactivate_points: Option<DeactivatePointsConfig>,
}

impl Default for TimeSpanConfig {
    fn default() -> Self {
        Self {
            max_tessellation_angle_degrees: None,
            use_natural_neighbour_interpolation: false,
            deactivate_points: None,
        }
    }
}

impl TimeSpanConfig {
    /// Points follow the topologies but are never deactivated.
    pub fn rigid_only() -> Self {
        Self::default()
    }

    /// Points crossing into a surface with a significantly different
    /// velocity near the old surface's boundary are deactivated.
    pub fn with_deactivation() -> Self {
        Self {
            deactivate_points: Some(DeactivatePointsConfig::default()),
            ..Default::default()
        }
    }

    /// Tessellation threshold in radians.
    pub fn max_tessellation_angle(&self) -> Option<f64> {
        self.max_tessellation_angle_degrees.map(f64::to_radians)
    }
}
