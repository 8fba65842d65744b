//! Resolved topological surfaces: rigid plate boundaries and deforming
//! networks, and their per-slot collections over a time range.

mod boundary;
mod location;
mod network;
mod resolved;

pub use boundary::{ResolvedBoundary, ResolvedTopologicalBoundary};
pub use location::{NetworkId, NetworkPointLocation, RigidBlockRef, TopologyPointLocation};
pub use network::{NetworkMesh, ResolvedNetwork, ResolvedTopologicalNetwork, RigidBlock};
pub use resolved::{ResolvedTopologies, TopologyCandidates, TopologyError, TopologyTimeSpan};
