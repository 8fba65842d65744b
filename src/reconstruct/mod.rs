//! Reconstructing geometries through time.
//!
//! A [`GeometryTimeSpan`] steps a geometry's points through the slots of a
//! [`TopologyTimeSpan`](crate::topology::TopologyTimeSpan), deactivating
//! points that are consumed at plate boundaries and accumulating strain in
//! deforming networks.

mod config;
mod deactivate;
mod point;
mod query;
mod time_span;

pub use config::{DeactivatePointsConfig, TimeSpanConfig};
pub use deactivate::{DeactivatePoint, DeactivationContext, DefaultDeactivatePoint};
pub use point::{GeometryPoint, GeometrySample, PointArena, PointHandle};
pub use query::{AllGeometryData, GeometryData, Velocities, VelocitySurface};
pub use time_span::{create_time_spans, GeometryImport, GeometryTimeSpan, TimeSpanError};
