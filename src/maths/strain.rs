//! Strain rate and accumulated strain tensors.
//!
//! Both tensors live in a local 2D (east, north) tangent frame. The strain
//! rate is the spatial velocity gradient `L` in 1/s; the accumulated strain
//! is the deformation gradient `F`, integrated forward in time.

use glam::{DMat2, DVec2};
use serde::{Deserialize, Serialize};

/// Instantaneous deformation rate at a point (velocity gradient, 1/s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrainRate {
    velocity_gradient: DMat2,
}

impl Default for StrainRate {
    fn default() -> Self {
        Self::ZERO
    }
}

impl StrainRate {
    pub const ZERO: Self = Self {
        velocity_gradient: DMat2::ZERO,
    };

    pub fn new(velocity_gradient: DMat2) -> Self {
        Self { velocity_gradient }
    }

    /// A pure (irrotational) strain rate with the given components.
    pub fn from_components(e_xx: f64, e_yy: f64, e_xy: f64) -> Self {
        Self::new(DMat2::from_cols(
            DVec2::new(e_xx, e_xy),
            DVec2::new(e_xy, e_yy),
        ))
    }

    pub fn velocity_gradient(&self) -> DMat2 {
        self.velocity_gradient
    }

    /// Symmetric part of the velocity gradient.
    pub fn rate_of_deformation(&self) -> DMat2 {
        (self.velocity_gradient + self.velocity_gradient.transpose()) * 0.5
    }

    /// Rotation rate (antisymmetric part), radians per second.
    pub fn spin(&self) -> f64 {
        0.5 * (self.velocity_gradient.x_axis.y - self.velocity_gradient.y_axis.x)
    }

    /// Trace of the rate of deformation (areal dilatation rate).
    pub fn dilatation_rate(&self) -> f64 {
        self.velocity_gradient.x_axis.x + self.velocity_gradient.y_axis.y
    }

    /// Magnitude of the rate of deformation: `sqrt(D11² + D22² + 2·D12²)`.
    pub fn second_invariant(&self) -> f64 {
        let d = self.rate_of_deformation();
        let d11 = d.x_axis.x;
        let d22 = d.y_axis.y;
        let d12 = d.y_axis.x;
        (d11 * d11 + d22 * d22 + 2.0 * d12 * d12).sqrt()
    }

    pub fn is_zero(&self) -> bool {
        self.velocity_gradient == DMat2::ZERO
    }
}

/// Accumulated strain at a point, stored as a deformation gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeformationStrain {
    deformation_gradient: DMat2,
}

impl Default for DeformationStrain {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl DeformationStrain {
    /// No strain.
    pub const IDENTITY: Self = Self {
        deformation_gradient: DMat2::IDENTITY,
    };

    pub fn new(deformation_gradient: DMat2) -> Self {
        Self {
            deformation_gradient,
        }
    }

    pub fn deformation_gradient(&self) -> DMat2 {
        self.deformation_gradient
    }

    /// Advances the strain over `dt_seconds` under a constant strain rate.
    ///
    /// Forward Euler step `F' = (I + L·dt)·F`.
    pub fn accumulate(&self, strain_rate: &StrainRate, dt_seconds: f64) -> Self {
        if strain_rate.is_zero() {
            return *self;
        }
        let step = DMat2::IDENTITY + strain_rate.velocity_gradient() * dt_seconds;
        Self {
            deformation_gradient: step * self.deformation_gradient,
        }
    }

    /// Areal dilatation `det(F) - 1`.
    pub fn dilatation(&self) -> f64 {
        self.deformation_gradient.determinant() - 1.0
    }

    /// Principal strains (major, minor) as stretch minus one.
    pub fn principal_strains(&self) -> (f64, f64) {
        let f = self.deformation_gradient;
        let c = f.transpose() * f;
        let a = c.x_axis.x;
        let d = c.y_axis.y;
        let b = c.y_axis.x;
        let mean = 0.5 * (a + d);
        let radius = (0.25 * (a - d) * (a - d) + b * b).sqrt();
        let major = (mean + radius).max(0.0).sqrt() - 1.0;
        let minor = (mean - radius).max(0.0).sqrt() - 1.0;
        (major, minor)
    }

    /// Component-wise linear interpolation of the deformation gradients.
    pub fn lerp(&self, other: &DeformationStrain, t: f64) -> Self {
        Self {
            deformation_gradient: self.deformation_gradient * (1.0 - t)
                + other.deformation_gradient * t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_rate_leaves_strain_unchanged() {
        let s = DeformationStrain::IDENTITY.accumulate(&StrainRate::ZERO, 1e14);
        assert_eq!(s, DeformationStrain::IDENTITY);
        assert_eq!(s.principal_strains(), (0.0, 0.0));
    }

    #[test]
    fn test_uniaxial_extension() {
        let rate = StrainRate::from_components(1e-15, 0.0, 0.0);
        let dt = 1e14;
        let s = DeformationStrain::IDENTITY.accumulate(&rate, dt);
        let (major, minor) = s.principal_strains();
        assert!((major - 0.1).abs() < 1e-12);
        assert!(minor.abs() < 1e-12);
        assert!((s.dilatation() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_strain_rate_invariants() {
        let rate = StrainRate::from_components(2.0, -1.0, 0.5);
        assert!((rate.dilatation_rate() - 1.0).abs() < 1e-15);
        assert!(rate.spin().abs() < 1e-15);
        let expected = (4.0_f64 + 1.0 + 2.0 * 0.25).sqrt();
        assert!((rate.second_invariant() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_lerp_midpoint() {
        let a = DeformationStrain::IDENTITY;
        let b = DeformationStrain::new(DMat2::from_diagonal(DVec2::new(1.2, 1.0)));
        let mid = a.lerp(&b, 0.5);
        assert!((mid.deformation_gradient().x_axis.x - 1.1).abs() < 1e-12);
    }
}
