//! Stage rotations and plate velocities.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use super::creator::ReconstructionTreeCreator;
use super::graph::PlateId;
use crate::maths::{FiniteRotation, EARTH_RADIUS_KMS};

const CM_PER_KM: f64 = 1.0e5;
const YEARS_PER_MY: f64 = 1.0e6;

/// Which time interval around `t` a velocity is measured over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VelocityDeltaTimeType {
    /// From `t + dt` to `t`.
    #[default]
    TPlusDeltaTToT,
    /// From `t` to `t - dt`.
    TToTMinusDeltaT,
    /// From `t + dt/2` to `t - dt/2`.
    TPlusMinusHalfDeltaT,
}

impl VelocityDeltaTimeType {
    /// The (older, younger) times of the interval.
    ///
    /// An interval reaching into the future is shifted to end at present day.
    pub fn time_bounds(&self, time: f64, delta_time: f64) -> (f64, f64) {
        let (older, younger) = match self {
            Self::TPlusDeltaTToT => (time + delta_time, time),
            Self::TToTMinusDeltaT => (time, time - delta_time),
            Self::TPlusMinusHalfDeltaT => (time + 0.5 * delta_time, time - 0.5 * delta_time),
        };
        if younger < 0.0 {
            (older - younger, 0.0)
        } else {
            (older, younger)
        }
    }
}

/// Rotation moving a point on `plate_id` from its position at `from_time`
/// to its position at `to_time`.
pub fn stage_rotation(
    creator: &dyn ReconstructionTreeCreator,
    plate_id: PlateId,
    from_time: f64,
    to_time: f64,
) -> FiniteRotation {
    let from = creator.get_reconstruction_tree(from_time);
    let to = creator.get_reconstruction_tree(to_time);
    let (from_rotation, _) = from.get_composed_absolute_rotation(plate_id);
    let (to_rotation, _) = to.get_composed_absolute_rotation(plate_id);
    to_rotation.compose(&from_rotation.inverse())
}

/// Velocity (cm/yr) of a point that moved from `older` to `younger` over
/// `delta_time` My.
///
/// A non-positive interval gives a zero velocity.
pub fn velocity_from_displacement(older: DVec3, younger: DVec3, delta_time: f64) -> DVec3 {
    if !(delta_time > 0.0) {
        return DVec3::ZERO;
    }
    (younger - older) * (EARTH_RADIUS_KMS * CM_PER_KM / (delta_time * YEARS_PER_MY))
}

/// Velocity (cm/yr) at `time` of `point` (its position at `time`) carried by
/// `plate_id`.
pub fn plate_velocity(
    creator: &dyn ReconstructionTreeCreator,
    plate_id: PlateId,
    point: DVec3,
    time: f64,
    delta_time: f64,
    delta_time_type: VelocityDeltaTimeType,
) -> DVec3 {
    let (older_time, younger_time) = delta_time_type.time_bounds(time, delta_time);
    let older = stage_rotation(creator, plate_id, time, older_time).rotate(point);
    let younger = stage_rotation(creator, plate_id, time, younger_time).rotate(point);
    velocity_from_displacement(older, younger, older_time - younger_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::{CachedReconstructionTreeCreator, PoleSample, RotationGraph};
    use std::sync::Arc;

    /// Plate 1 rotates about Z at 1 degree per My relative to plate 0.
    fn creator() -> CachedReconstructionTreeCreator {
        let graph = RotationGraph::from_sequences(vec![(
            0,
            1,
            vec![
                PoleSample::new(0.0, FiniteRotation::IDENTITY),
                PoleSample::new(100.0, FiniteRotation::from_axis_angle(DVec3::Z, 100f64.to_radians())),
            ],
        )])
        .unwrap();
        CachedReconstructionTreeCreator::new(Arc::new(graph), 0)
    }

    #[test]
    fn test_time_bounds() {
        assert_eq!(VelocityDeltaTimeType::TPlusDeltaTToT.time_bounds(10.0, 1.0), (11.0, 10.0));
        assert_eq!(VelocityDeltaTimeType::TToTMinusDeltaT.time_bounds(10.0, 1.0), (10.0, 9.0));
        assert_eq!(VelocityDeltaTimeType::TPlusMinusHalfDeltaT.time_bounds(10.0, 1.0), (10.5, 9.5));
        assert_eq!(VelocityDeltaTimeType::TToTMinusDeltaT.time_bounds(0.5, 1.0), (1.0, 0.0));
    }

    #[test]
    fn test_stage_rotation() {
        let creator = creator();
        let stage = stage_rotation(&creator, 1, 20.0, 30.0);
        let expected = FiniteRotation::from_axis_angle(DVec3::Z, 10f64.to_radians());
        assert!(stage.approx_eq(&expected, 1e-12));

        // Plates not in the tree never move.
        assert!(stage_rotation(&creator, 7, 20.0, 30.0).is_identity());
    }

    #[test]
    fn test_equatorial_plate_speed() {
        let creator = creator();
        let velocity = plate_velocity(&creator, 1, DVec3::X, 10.0, 1.0, VelocityDeltaTimeType::TPlusDeltaTToT);
        // 1 degree of arc per My on the equator.
        let expected = EARTH_RADIUS_KMS * 1f64.to_radians() * CM_PER_KM / YEARS_PER_MY;
        assert!((velocity.length() - expected).abs() < 1e-3 * expected);
        assert!(velocity.dot(DVec3::X).abs() < 1e-2 * expected);
    }

    #[test]
    fn test_zero_interval_velocity() {
        assert_eq!(velocity_from_displacement(DVec3::X, DVec3::Y, 0.0), DVec3::ZERO);
    }
}
