//! Plate tectonic reconstruction.
//!
//! This crate builds reconstruction trees from a graph of total rotation
//! sequences and uses them, together with resolved plate boundaries and
//! deforming networks, to reconstruct geometries through geological time.

pub mod maths;
pub mod time;
pub mod rotation;
pub mod topology;
pub mod reconstruct;

pub use maths::{FiniteRotation, GeometryOnSphere, PolygonOnSphere};
pub use time::{GeoTimeInstant, TimeRange};
pub use rotation::{
    CachedReconstructionTreeCreator, PlateId, ReconstructionTree, ReconstructionTreeCreator, RotationGraph,
};
pub use topology::{ResolvedTopologies, TopologyPointLocation, TopologyTimeSpan};
pub use reconstruct::{create_time_spans, GeometryTimeSpan, TimeSpanConfig};
