//! Spherical geometry and rotation maths.
//!
//! Everything here works on the unit sphere with `glam` double-precision
//! types: positions are unit `DVec3`s, rotations are unit `DQuat`s.

mod finite_rotation;
mod geometry;
mod polygon;
mod small_circle;
mod sphere;
mod strain;

pub use finite_rotation::FiniteRotation;
pub use geometry::{tessellate, GeometryOnSphere, PointInterpolation, TessellatedGeometry};
pub use polygon::{distance_to_arc, PolygonOnSphere};
pub use small_circle::BoundingSmallCircle;
pub use sphere::{
    angular_distance, lat_lon_to_unit, local_east_north, slerp_unit, unit_to_lat_lon,
    CM_PER_YR_TO_KMS_PER_MY, EARTH_RADIUS_KMS, SECONDS_PER_MY,
};
pub use strain::{DeformationStrain, StrainRate};
