//! # Core Models Module
//!
//! Data structures describing glycoprotein structures and their trajectories.
//!
//! ## Key Components
//!
//! - [`atom`] - Atom topology records and the protein/environment/glycan classification
//! - [`residue`] - Residue blocks and the [`ResidueKey`](residue::ResidueKey) identifier
//! - [`structure`] - A complete topology with residue lookup and atom selections
//! - [`frame`] - Per-frame atomic coordinates, stored separately from topology
//!
//! ## Usage
//!
//! ```ignore
//! use glycoshield::core::models::{atom::Atom, structure::Structure, frame::Frame};
//!
//! let structure = Structure::from_atoms(vec![
//!     Atom::new("CA", "ASN", 463, 'A'),
//!     Atom::new("C1", "NAG", 1, 'A').with_segment("463"),
//! ]);
//! assert_eq!(structure.glycan_atom_indices(), vec![1]);
//! ```

pub mod atom;
pub mod frame;
pub mod residue;
pub mod structure;
