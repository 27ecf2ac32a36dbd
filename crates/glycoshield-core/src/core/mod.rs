//! # Core Module
//!
//! Stateless building blocks of the shielding pipeline: structure and
//! trajectory models, PDB input/output, glycan attachment requests and the
//! surface-area kernels.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, residues, structures and frames
//! - **Trajectories** ([`trajectory`]) - The [`FrameSource`](trajectory::FrameSource) abstraction and in-memory trajectories
//! - **File I/O** ([`io`]) - Fixed-column PDB reading and writing, single and multi-model
//! - **Glycan Sites** ([`glycan`]) - Attachment lines, occupancy and library listing
//! - **Surface Area** ([`sasa`]) - The [`SurfaceAreaComputer`](sasa::SurfaceAreaComputer) trait and the Shrake-Rupley kernel
//! - **Utilities** ([`utils`]) - Superposition geometry and residue/element tables

pub mod glycan;
pub mod io;
pub mod models;
pub mod sasa;
pub mod trajectory;
pub mod utils;
