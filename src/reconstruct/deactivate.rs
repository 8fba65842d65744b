//! Deciding when a point stops being reconstructed.
//!
//! A point that moves from one surface into another with a very different
//! velocity, close to the old surface's edge, is treated as consumed (for
//! example subducted) and deactivated for the rest of the walk.

use glam::DVec3;

use super::config::DeactivatePointsConfig;
use crate::maths::{CM_PER_YR_TO_KMS_PER_MY, EARTH_RADIUS_KMS};
use crate::rotation::VelocityDeltaTimeType;
use crate::topology::{ResolvedTopologies, TopologyPointLocation};

/// A point's state at the previous and the current time slot of a walk.
///
/// Both velocities are evaluated at `current_time` at `current_point`.
#[derive(Clone, Copy)]
pub struct DeactivationContext<'a> {
    /// Position at the previous time slot.
    pub previous_point: DVec3,
    /// Classification at the previous time slot.
    pub previous_location: &'a TopologyPointLocation,
    pub previous_topologies: &'a ResolvedTopologies,
    /// Position at the current time slot.
    pub current_point: DVec3,
    /// Classification at the current time slot.
    pub current_location: &'a TopologyPointLocation,
    pub current_topologies: &'a ResolvedTopologies,
    /// Time (Ma) of the current slot.
    pub current_time: f64,
    /// Length (My) of the step.
    pub time_increment: f64,
}

/// Policy deciding whether a point is deactivated at a time step.
///
/// Only consulted when the point's classification changed over the step.
pub trait DeactivatePoint: Send + Sync {
    fn deactivate(&self, context: &DeactivationContext<'_>) -> bool;
}

/// Velocity and distance threshold policy.
#[derive(Debug, Clone, Default)]
pub struct DefaultDeactivatePoint {
    config: DeactivatePointsConfig,
    velocity_delta_time_type: VelocityDeltaTimeType,
}

impl DefaultDeactivatePoint {
    pub fn new(config: DeactivatePointsConfig) -> Self {
        Self {
            config,
            velocity_delta_time_type: VelocityDeltaTimeType::default(),
        }
    }

    pub fn config(&self) -> &DeactivatePointsConfig {
        &self.config
    }
}

impl DeactivatePoint for DefaultDeactivatePoint {
    fn deactivate(&self, context: &DeactivationContext<'_>) -> bool {
        let previous = context.previous_location;
        let current = context.current_location;
        if previous.same_classification(current) {
            return false;
        }

        if self.config.deactivate_points_that_fall_outside_a_network
            && previous.is_in_network()
            && !current.is_in_network()
        {
            return true;
        }

        // Leaving or entering the unresolved gaps between topologies says
        // nothing about consumption.
        if !previous.is_found() || !current.is_found() {
            return false;
        }

        let dt = context.time_increment;
        let dt_type = self.velocity_delta_time_type;
        let time = context.current_time;

        // The old surface may no longer contain the moved point (networks
        // only give velocities inside themselves), so fall back to the
        // previous position.
        let previous_velocity = context
            .previous_topologies
            .velocity_at(context.current_point, previous, time, dt, dt_type)
            .or_else(|| {
                context
                    .previous_topologies
                    .velocity_at(context.previous_point, previous, time, dt, dt_type)
            });
        let current_velocity = context
            .current_topologies
            .velocity_at(context.current_point, current, time, dt, dt_type);
        let (Some(previous_velocity), Some(current_velocity)) = (previous_velocity, current_velocity) else {
            return false;
        };

        let delta_velocity_squared = (current_velocity - previous_velocity).length_squared();
        let threshold_velocity = self.config.threshold_velocity_delta;
        if delta_velocity_squared <= threshold_velocity * threshold_velocity {
            return false;
        }

        let delta_velocity = delta_velocity_squared.sqrt();
        let threshold_distance_kms =
            (self.config.threshold_distance_to_boundary + delta_velocity * CM_PER_YR_TO_KMS_PER_MY) * dt;
        let threshold_angle = threshold_distance_kms / EARTH_RADIUS_KMS;

        let Some(polygon) = context.previous_topologies.location_polygon(previous) else {
            return false;
        };
        let deactivate = polygon.minimum_distance(context.previous_point) <= threshold_angle;
        if deactivate {
            log::trace!(
                "Deactivating point at {} Ma: velocity delta {:.3} cm/yr",
                context.current_time,
                delta_velocity
            );
        }
        deactivate
    }
}
