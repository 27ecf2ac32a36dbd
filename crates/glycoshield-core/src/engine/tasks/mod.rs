//! Stage tasks of the shielding pipeline.
//!
//! Each task is a pure function over explicit inputs: it reads the files it is
//! given, writes the files its configuration names and returns a summary of
//! what it produced. Pipeline state lives in the workflow layer, never here.
//!
//! - [`shield`] generates glycan conformers per attachment site.
//! - [`merge`] combines per-site trajectories into one.
//! - [`sasa`] computes per-residue shielding deltas over probe radii and frames.

pub mod aggregate;
pub mod merge;
pub mod plot;
pub mod sasa;
pub mod shield;
