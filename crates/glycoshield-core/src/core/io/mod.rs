//! Provides input/output functionality for molecular file formats.
//!
//! Structures and trajectories are exchanged as fixed-column PDB files. A
//! trajectory is a multi-model file whose first model defines the topology.

pub mod pdb;
pub mod traits;
