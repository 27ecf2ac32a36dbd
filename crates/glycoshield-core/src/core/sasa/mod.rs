//! Solvent-accessible surface area kernels.
//!
//! The differential SASA engine treats the kernel as a black box behind
//! [`SurfaceAreaComputer`]: given a structure, one frame of coordinates and the
//! subset of atoms that are present, it returns one area per selected atom.
//! [`ShrakeRupley`](shrake_rupley::ShrakeRupley) is the in-process default.

pub mod shrake_rupley;

use crate::core::models::frame::Frame;
use crate::core::models::structure::Structure;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelError {
    #[error("Probe radius must be a finite, non-negative value (got {0} nm)")]
    InvalidProbeRadius(f64),
    #[error("Number of dots per atom must be positive")]
    InvalidDotCount,
    #[error("Atom index {index} is out of range (structure has {count} atoms)")]
    AtomIndexOutOfRange { index: usize, count: usize },
    #[error("Atom {index} has non-finite coordinates")]
    NonFiniteCoordinates { index: usize },
    #[error("Frame has {found} coordinates but the structure has {expected} atoms")]
    FrameMismatch { expected: usize, found: usize },
    #[error("Surface area computation failed: {0}")]
    Failed(String),
}

/// Computes per-atom solvent-accessible surface areas.
///
/// Atoms outside `atom_indices` are treated as absent: they neither receive an
/// area nor occlude the selected atoms. Areas are in nm², the probe radius in nm.
pub trait SurfaceAreaComputer: Send + Sync {
    /// Returns one area per entry of `atom_indices`, in the same order.
    fn atom_areas(
        &self,
        structure: &Structure,
        frame: &Frame,
        atom_indices: &[usize],
        probe_radius: f64,
        n_dots: usize,
    ) -> Result<Vec<f64>, KernelError>;
}

/// Folds per-atom areas into per-residue areas keyed by residue index.
pub fn residue_areas(
    structure: &Structure,
    atom_indices: &[usize],
    areas: &[f64],
) -> BTreeMap<usize, f64> {
    let mut totals = BTreeMap::new();
    for (&atom_index, &area) in atom_indices.iter().zip(areas) {
        if let Some(residue_index) = structure.residue_index_of_atom(atom_index) {
            *totals.entry(residue_index).or_insert(0.0) += area;
        }
    }
    totals
}

/// Checks the arguments shared by every kernel implementation.
pub fn validate_request(
    structure: &Structure,
    frame: &Frame,
    atom_indices: &[usize],
    probe_radius: f64,
    n_dots: usize,
) -> Result<(), KernelError> {
    if !probe_radius.is_finite() || probe_radius < 0.0 {
        return Err(KernelError::InvalidProbeRadius(probe_radius));
    }
    if n_dots == 0 {
        return Err(KernelError::InvalidDotCount);
    }
    if frame.len() != structure.atom_count() {
        return Err(KernelError::FrameMismatch {
            expected: structure.atom_count(),
            found: frame.len(),
        });
    }
    for &index in atom_indices {
        let position = frame.position(index).ok_or(KernelError::AtomIndexOutOfRange {
            index,
            count: structure.atom_count(),
        })?;
        if !(position.x.is_finite() && position.y.is_finite() && position.z.is_finite()) {
            return Err(KernelError::NonFiniteCoordinates { index });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use nalgebra::Point3;

    fn structure_and_frame() -> (Structure, Frame) {
        let structure = Structure::from_atoms(vec![
            Atom::new("N", "ALA", 1, 'A'),
            Atom::new("CA", "ALA", 1, 'A'),
            Atom::new("N", "GLY", 2, 'A'),
        ]);
        let frame = Frame::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.5, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ]);
        (structure, frame)
    }

    #[test]
    fn residue_areas_sums_atoms_per_residue() {
        let (structure, _) = structure_and_frame();
        let totals = residue_areas(&structure, &[0, 1, 2], &[1.0, 2.0, 4.0]);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[&0], 3.0);
        assert_eq!(totals[&1], 4.0);
    }

    #[test]
    fn validate_request_rejects_bad_arguments() {
        let (structure, frame) = structure_and_frame();
        assert_eq!(
            validate_request(&structure, &frame, &[0], -0.1, 15),
            Err(KernelError::InvalidProbeRadius(-0.1))
        );
        assert_eq!(
            validate_request(&structure, &frame, &[0], 0.14, 0),
            Err(KernelError::InvalidDotCount)
        );
        assert_eq!(
            validate_request(&structure, &frame, &[7], 0.14, 15),
            Err(KernelError::AtomIndexOutOfRange { index: 7, count: 3 })
        );
        assert!(validate_request(&structure, &frame, &[0, 2], 0.14, 15).is_ok());
    }

    #[test]
    fn validate_request_rejects_non_finite_coordinates() {
        let (structure, _) = structure_and_frame();
        let frame = Frame::new(vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(f64::NAN, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
        ]);
        assert_eq!(
            validate_request(&structure, &frame, &[0, 1], 0.14, 15),
            Err(KernelError::NonFiniteCoordinates { index: 1 })
        );
    }
}
