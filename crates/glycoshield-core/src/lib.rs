//! # GlycoSHIELD Core Library
//!
//! Glycan shield modelling for glycoproteins: attach ensembles of glycan
//! conformers at protein sites, merge them into one trajectory, and measure how
//! much solvent-accessible surface each protein residue loses to the shield.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same strict three-layer split throughout.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Structure`, `Frame`,
//!   `Trajectory`), PDB I/O, attachment-line parsing and the surface-area
//!   kernel behind the `SurfaceAreaComputer` trait.
//!
//! - **[`engine`]: The Logic Core.** Stage configuration, the pipeline state
//!   machine, the `ConformerGenerator` seam and the stage tasks (shield
//!   generation, trajectory merge, differential SASA), parallelised with rayon
//!   when the `parallel` feature is enabled.
//!
//! - **[`workflows`]: The Public API.** `Session` and `Pipeline` tie the engine
//!   and core together and gate stages so that each only runs on the fresh
//!   output of the one before it.

pub mod core;
pub mod engine;
pub mod workflows;
