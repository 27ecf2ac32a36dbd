//! Small synthetic glycoproteins shared by engine and workflow tests.
//!
//! The protein is a five-residue alanine strand on chain A (residues 1-5,
//! backbone atoms only). The glycan library holds a copy of residues 2-4
//! shifted by 100 Å along x, plus a two-atom NAG residue placed relative to the
//! middle CA. Structures stay below 32 atoms so k-d tree buckets never split.

use crate::core::glycan::{AttachmentSpec, Occupancy};
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::Atom;
use crate::core::models::frame::Frame;
use crate::core::models::structure::Structure;
use crate::core::trajectory::{FrameSource, Trajectory};
use crate::engine::error::EngineError;
use crate::engine::generator::{ConformerGenerator, GeneratedSite, site_structure};
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const RESIDUE_COUNT: usize = 5;
const RISE: f64 = 3.8;
const LIBRARY_SHIFT: f64 = 100.0;

fn backbone(k: usize, shift: f64) -> [Point3<f64>; 4] {
    let x0 = RISE * k as f64 + shift;
    [
        Point3::new(x0, 0.0, 0.0),
        Point3::new(x0 + 1.2, 0.9, 0.0),
        Point3::new(x0 + 2.4, 0.0, 0.0),
        Point3::new(x0 + 2.4, -1.2, 0.0),
    ]
}

fn backbone_atoms(residue_number: isize) -> Vec<Atom> {
    ["N", "CA", "C", "O"]
        .iter()
        .map(|name| Atom::new(name, "ALA", residue_number, 'A'))
        .collect()
}

pub fn protein() -> Trajectory {
    let atoms = (1..=RESIDUE_COUNT as isize).flat_map(backbone_atoms).collect();
    let positions = (0..RESIDUE_COUNT).flat_map(|k| backbone(k, 0.0)).collect();
    let mut structure = Structure::from_atoms(atoms);
    structure.renumber_serials();
    Trajectory::new(structure, vec![Frame::new(positions)])
}

/// The protein followed by one crystal water, HOH 6 on chain A.
pub fn protein_with_water() -> Trajectory {
    let protein = protein();
    let mut atoms = protein.structure().atoms().to_vec();
    atoms.push(Atom::new("O", "HOH", RESIDUE_COUNT as isize + 1, 'A'));
    let mut structure = Structure::from_atoms(atoms);
    structure.renumber_serials();
    let water = Frame::new(vec![Point3::new(8.0, 12.0, 0.0)]);
    let frame = protein.frames()[0].concat(&water);
    Trajectory::new(structure, vec![frame])
}

/// CA of protein residue `residue_number` (1-based).
pub fn protein_ca(residue_number: isize) -> Point3<f64> {
    backbone(residue_number as usize - 1, 0.0)[1]
}

/// A library whose conformer `i` places the glycan at `middle CA + offsets[i]`.
pub fn library(offsets: &[Vector3<f64>]) -> Trajectory {
    let mut atoms: Vec<Atom> = (1..=3).flat_map(backbone_atoms).collect();
    atoms.push(Atom::new("C1", "NAG", 4, 'A'));
    atoms.push(Atom::new("O5", "NAG", 4, 'A'));
    let mut structure = Structure::from_atoms(atoms);
    structure.renumber_serials();

    let frames = offsets
        .iter()
        .map(|offset| {
            let mut positions: Vec<Point3<f64>> =
                (1..=3).flat_map(|k| backbone(k, LIBRARY_SHIFT)).collect();
            let c1 = backbone(2, LIBRARY_SHIFT)[1] + offset;
            positions.push(c1);
            positions.push(c1 + Vector3::new(0.0, 0.0, 1.4));
            Frame::new(positions)
        })
        .collect();
    Trajectory::new(structure, frames)
}

pub fn write_protein(dir: &Path) -> PathBuf {
    let path = dir.join("protein.pdb");
    let protein = protein();
    PdbFile::write_structure_to_path(protein.structure(), &protein.frames()[0], None, &path)
        .unwrap();
    path
}

pub fn write_protein_with_water(dir: &Path) -> PathBuf {
    let path = dir.join("protein_water.pdb");
    let protein = protein_with_water();
    PdbFile::write_structure_to_path(protein.structure(), &protein.frames()[0], None, &path)
        .unwrap();
    path
}

/// Writes a library with `accepted` clash-free and `rejected` clashing conformers.
pub fn write_library(dir: &Path, accepted: usize, rejected: usize) -> (PathBuf, PathBuf) {
    let mut offsets: Vec<Vector3<f64>> = (0..accepted)
        .map(|i| Vector3::new(0.0, 0.0, 6.0 + 0.25 * i as f64))
        .collect();
    offsets.extend((0..rejected).map(|_| Vector3::new(-7.0, 0.0, 0.0)));
    let library = library(&offsets);

    std::fs::create_dir_all(dir).unwrap();
    let structure_path = dir.join("production_merged_noW.pdb");
    let trajectory_path = dir.join("production_merged_noW.xtc");
    PdbFile::write_structure_to_path(library.structure(), &library.frames()[0], None, &structure_path)
        .unwrap();
    PdbFile::write_frames_to_path(library.structure(), library.frames(), &trajectory_path).unwrap();
    (structure_path, trajectory_path)
}

pub fn spec(chain_id: char, anchor: isize, library: &(PathBuf, PathBuf), output_dir: &Path) -> AttachmentSpec {
    AttachmentSpec {
        chain_id,
        anchor_residues: [anchor - 1, anchor, anchor + 1],
        library_residues: [1, 2, 3],
        glycan_structure: library.0.clone(),
        glycan_trajectory: library.1.clone(),
        output_structure: output_dir.join(format!("{chain_id}_{anchor}.pdb")),
        output_trajectory: output_dir.join(format!("{chain_id}_{anchor}.xtc")),
    }
}

/// Generator that accepts a fixed number of conformers per anchor, stacking
/// the glycan above the anchor CA.
pub struct FixedGenerator {
    pub accepted: HashMap<isize, usize>,
    pub attempted: usize,
}

impl FixedGenerator {
    pub fn new(accepted: &[(isize, usize)]) -> Self {
        Self {
            accepted: accepted.iter().copied().collect(),
            attempted: 20,
        }
    }
}

impl ConformerGenerator for FixedGenerator {
    fn generate(
        &self,
        protein: &Structure,
        protein_frame: &Frame,
        spec: &AttachmentSpec,
        library: &Trajectory,
    ) -> Result<GeneratedSite, EngineError> {
        let glycan_indices = library.structure().non_protein_atom_indices();
        let structure = site_structure(protein, library.structure(), &glycan_indices, spec);
        let count = self.accepted.get(&spec.anchor()).copied().unwrap_or(0);
        let base = protein_ca(spec.anchor());

        let accepted: Vec<Frame> = (0..count)
            .map(|i| {
                let c1 = base + Vector3::new(0.0, 0.3 * i as f64, 4.0);
                let glycan = Frame::new(vec![c1, c1 + Vector3::new(0.0, 0.0, 1.4)]);
                protein_frame.concat(&glycan)
            })
            .collect();
        let reference = accepted.first().cloned().unwrap_or_else(|| {
            protein_frame.concat(&Frame::new(vec![base, base + Vector3::new(0.0, 0.0, 1.4)]))
        });

        Ok(GeneratedSite {
            structure,
            reference,
            occupancy: Occupancy {
                accepted: count,
                attempted: self.attempted.max(count),
            },
            accepted,
        })
    }
}

/// A per-site trajectory (protein + glycan at `anchor`) with `frames` frames.
pub fn site_trajectory(anchor: isize, frames: usize) -> Trajectory {
    site_trajectory_on(&protein(), anchor, frames)
}

/// Like [`site_trajectory`], attached to the given host system.
pub fn site_trajectory_on(protein: &Trajectory, anchor: isize, frames: usize) -> Trajectory {
    let library = library(&[Vector3::new(0.0, 0.0, 6.0)]);
    let generator = FixedGenerator::new(&[(anchor, frames)]);
    let spec = AttachmentSpec {
        chain_id: 'A',
        anchor_residues: [anchor - 1, anchor, anchor + 1],
        library_residues: [1, 2, 3],
        glycan_structure: PathBuf::new(),
        glycan_trajectory: PathBuf::new(),
        output_structure: PathBuf::new(),
        output_trajectory: PathBuf::new(),
    };
    let site = generator
        .generate(protein.structure(), &protein.frames()[0], &spec, &library)
        .unwrap();
    assert_eq!(site.structure.atom_count(), protein.frame(0).unwrap().len() + 2);
    Trajectory::new(site.structure, site.accepted)
}
