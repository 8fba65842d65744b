//! Finite rotations on the unit sphere.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use super::sphere::lat_lon_to_unit;

/// Below this `|q1 · q2|` the shortest slerp path is ambiguous and the axis
/// hint (if any) decides the direction.
const AMBIGUOUS_DOT_EPSILON: f64 = 1e-6;

/// A rotation of a moving plate relative to a fixed plate.
///
/// Stored as a unit quaternion. The optional axis hint is the preferred
/// direction of the rotation axis; it is used when the axis would otherwise
/// be ambiguous (interpolating across a 180° stage rotation, or reporting
/// the axis/angle of a rotation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiniteRotation {
    quat: DQuat,
    axis_hint: Option<DVec3>,
}

impl Default for FiniteRotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FiniteRotation {
    /// The identity rotation.
    pub const IDENTITY: Self = Self {
        quat: DQuat::IDENTITY,
        axis_hint: None,
    };

    /// Creates a rotation from a quaternion (normalized on the way in).
    pub fn from_quat(quat: DQuat) -> Self {
        let len = quat.length();
        if len < 1e-15 || !len.is_finite() {
            log::warn!("Degenerate rotation quaternion {:?}, using identity", quat);
            return Self::IDENTITY;
        }
        Self {
            quat: quat / len,
            axis_hint: None,
        }
    }

    /// Creates a rotation of `angle` radians about `axis` (right-handed).
    ///
    /// A zero-length axis yields the identity rotation.
    pub fn from_axis_angle(axis: DVec3, angle: f64) -> Self {
        let len = axis.length();
        if len < 1e-15 {
            return Self::IDENTITY;
        }
        Self {
            quat: DQuat::from_axis_angle(axis / len, angle),
            axis_hint: None,
        }
    }

    /// Creates a rotation from an Euler pole given in degrees.
    pub fn from_euler_pole(pole_lat: f64, pole_lon: f64, angle_degrees: f64) -> Self {
        Self::from_axis_angle(lat_lon_to_unit(pole_lat, pole_lon), angle_degrees.to_radians())
    }

    /// Returns this rotation carrying the given axis hint.
    pub fn with_axis_hint(mut self, axis_hint: Option<DVec3>) -> Self {
        self.axis_hint = axis_hint.and_then(|h| {
            let len = h.length();
            (len > 1e-15).then(|| h / len)
        });
        self
    }

    pub fn quat(&self) -> DQuat {
        self.quat
    }

    pub fn axis_hint(&self) -> Option<DVec3> {
        self.axis_hint
    }

    /// True if this rotation is (numerically) the identity.
    pub fn is_identity(&self) -> bool {
        self.quat.w.abs() > 1.0 - 1e-12
    }

    /// Rotates a vector.
    pub fn rotate(&self, v: DVec3) -> DVec3 {
        self.quat * v
    }

    /// Returns the inverse rotation. The axis hint is kept: the inverse
    /// rotates about the same axis.
    pub fn inverse(&self) -> Self {
        Self {
            quat: self.quat.conjugate(),
            axis_hint: self.axis_hint,
        }
    }

    /// Returns `self ∘ other`: `other` is applied first, then `self`.
    pub fn compose(&self, other: &FiniteRotation) -> Self {
        Self {
            quat: (self.quat * other.quat).normalize(),
            axis_hint: None,
        }
    }

    /// Returns the rotation as (unit axis, angle in radians).
    ///
    /// The identity rotation has no axis and returns `None`. The axis is
    /// flipped (with the angle negated) to lie in the hemisphere of the axis
    /// hint, when one is present.
    pub fn axis_angle(&self) -> Option<(DVec3, f64)> {
        let q = if self.quat.w < 0.0 { -self.quat } else { self.quat };
        let xyz = DVec3::new(q.x, q.y, q.z);
        let sin_half = xyz.length();
        if sin_half < 1e-15 {
            return None;
        }
        let axis = xyz / sin_half;
        let angle = 2.0 * sin_half.atan2(q.w);
        match self.axis_hint {
            Some(hint) if axis.dot(hint) < 0.0 => Some((-axis, -angle)),
            _ => Some((axis, angle)),
        }
    }

    /// True if both rotations rotate every vector to within `epsilon`.
    pub fn approx_eq(&self, other: &FiniteRotation, epsilon: f64) -> bool {
        (self.quat.dot(other.quat).abs() - 1.0).abs() < epsilon
    }

    /// Interpolates between the rotations at an older and a younger time.
    ///
    /// `target_time` is mapped linearly onto `[older_time, younger_time]`.
    /// If the two times coincide the older rotation is returned.
    pub fn interpolate(
        older: &FiniteRotation,
        younger: &FiniteRotation,
        older_time: f64,
        younger_time: f64,
        target_time: f64,
        axis_hint: Option<DVec3>,
    ) -> FiniteRotation {
        let span = older_time - younger_time;
        if span.abs() < 1e-12 {
            return older.with_axis_hint(axis_hint.or(older.axis_hint));
        }
        let t = (older_time - target_time) / span;
        Self::slerp(older, younger, t, axis_hint)
    }

    /// Spherical linear interpolation from `from` (t = 0) to `to` (t = 1).
    ///
    /// Takes the shortest path. When the stage rotation between the two is
    /// close to 180° both paths are equally short and the axis hint picks
    /// the one rotating about the hinted axis direction.
    pub fn slerp(
        from: &FiniteRotation,
        to: &FiniteRotation,
        t: f64,
        axis_hint: Option<DVec3>,
    ) -> FiniteRotation {
        let q1 = from.quat;
        let mut q2 = to.quat;

        let dot = q1.dot(q2);
        let flip = match axis_hint {
            Some(hint) if dot.abs() < AMBIGUOUS_DOT_EPSILON => {
                let stage = q2 * q1.conjugate();
                DVec3::new(stage.x, stage.y, stage.z).dot(hint) < 0.0
            }
            _ => dot < 0.0,
        };
        if flip {
            q2 = -q2;
        }

        let dot = q1.dot(q2).clamp(-1.0, 1.0);
        let quat = if dot > 1.0 - 1e-12 {
            (q1 + (q2 - q1) * t).normalize()
        } else {
            let theta = dot.acos();
            let sin_theta = theta.sin();
            let a = ((1.0 - t) * theta).sin() / sin_theta;
            let b = (t * theta).sin() / sin_theta;
            (q1 * a + q2 * b).normalize()
        };

        FiniteRotation {
            quat,
            axis_hint: None,
        }
        .with_axis_hint(axis_hint)
    }
}
