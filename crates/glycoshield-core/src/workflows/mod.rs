//! # Workflows Module
//!
//! The public entry points of the library. A [`session::Session`] holds one
//! user's protein, attachment lines, stage flags and artifacts; a
//! [`pipeline::Pipeline`] runs the stages over it in dependency order:
//!
//! 1. **Shield Generation** - glycan conformers per attachment site, with occupancy
//! 2. **Trajectory Merge** - one trajectory bounded by the smallest occupancy
//! 3. **Differential SASA** - per-residue shielding deltas over probes and frames
//!
//! Re-running a stage invalidates every stage downstream of it. Once all three
//! are done the session can package its output directory into one archive.

pub mod pipeline;
pub mod session;
