//! Plate rotations: the rotation graph, reconstruction trees built from it
//! and the stage rotations / velocities derived from those trees.

mod builder;
mod creator;
mod graph;
mod pole_sample;
mod tree;
mod velocity;

pub use creator::{CachedReconstructionTreeCreator, ReconstructionTreeCreator, DEFAULT_TREE_CACHE_CAPACITY};
pub use graph::{PlateId, RotationGraph, RotationGraphEdge, RotationGraphError};
pub use pole_sample::PoleSample;
pub use tree::{ReconstructionTree, ReconstructionTreeEdge, TreeEdgeId};
pub use velocity::{plate_velocity, stage_rotation, velocity_from_displacement, VelocityDeltaTimeType};
