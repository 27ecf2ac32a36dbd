use super::config::{ConfigError, DEFAULT_CLASH_CUTOFF_ANGSTROM};
use super::error::EngineError;
use crate::core::glycan::{AttachmentSpec, Occupancy};
use crate::core::models::atom::{Atom, AtomKind};
use crate::core::models::frame::Frame;
use crate::core::models::structure::Structure;
use crate::core::trajectory::{FrameSource, Trajectory};
use crate::core::utils::geometry::superposition;
use crate::core::utils::identifiers::is_heavy_atom;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use tracing::debug;

/// Backbone atoms used to superimpose library conformers onto the anchor window.
const FIT_ATOMS: [&str; 3] = ["N", "CA", "C"];

/// Conformers generated for one attachment site.
#[derive(Debug, Clone)]
pub struct GeneratedSite {
    /// Protein followed by the glycan atoms of the site.
    pub structure: Structure,
    /// Coordinates written to the per-site structure file.
    pub reference: Frame,
    /// One frame per accepted conformer, in library order.
    pub accepted: Vec<Frame>,
    pub occupancy: Occupancy,
}

/// Produces glycan conformers attached to a protein site.
///
/// The shielding pipeline only consumes the accepted frames and the occupancy;
/// the physics of conformer generation is up to the implementation.
pub trait ConformerGenerator: Send + Sync {
    fn generate(
        &self,
        protein: &Structure,
        protein_frame: &Frame,
        spec: &AttachmentSpec,
        library: &Trajectory,
    ) -> Result<GeneratedSite, EngineError>;
}

/// Builds the per-site topology: the protein followed by the library's glycan
/// atoms, moved to the site's chain and tagged with the anchor number as
/// segment so residues of different sites never share a key.
pub fn site_structure(
    protein: &Structure,
    library: &Structure,
    glycan_indices: &[usize],
    spec: &AttachmentSpec,
) -> Structure {
    let segment = spec.anchor().to_string();
    let glycan_atoms: Vec<Atom> = glycan_indices
        .iter()
        .filter_map(|&i| library.atom(i))
        .map(|atom| {
            let mut atom = atom.clone();
            atom.chain_id = spec.chain_id;
            atom.segment = segment.clone();
            atom.kind = AtomKind::Glycan;
            atom
        })
        .collect();
    let mut structure = protein.concat(&Structure::from_atoms(glycan_atoms));
    structure.renumber_serials();
    structure
}

/// Residue indices of the three-residue anchor window in the protein.
pub fn anchor_window(protein: &Structure, spec: &AttachmentSpec) -> Result<Vec<usize>, EngineError> {
    spec.anchor_residues
        .iter()
        .map(|&number| {
            protein.find_residue(spec.chain_id, number).ok_or_else(|| {
                EngineError::Input(format!(
                    "Residue {}:{} of the anchor window {:?} is not in the protein",
                    spec.chain_id, number, spec.anchor_residues
                ))
            })
        })
        .collect()
}

fn fit_atom_indices(
    structure: &Structure,
    residue_indices: &[usize],
    what: &str,
) -> Result<Vec<usize>, EngineError> {
    let mut indices = Vec::with_capacity(residue_indices.len() * FIT_ATOMS.len());
    for &residue_index in residue_indices {
        for name in FIT_ATOMS {
            let atom = structure
                .find_atom_in_residue(residue_index, name)
                .ok_or_else(|| {
                    let key = structure
                        .residue(residue_index)
                        .map(|r| r.key.to_string())
                        .unwrap_or_default();
                    EngineError::Input(format!("{what} residue {key} lacks backbone atom {name}"))
                })?;
            indices.push(atom);
        }
    }
    Ok(indices)
}

fn library_window(library: &Structure, spec: &AttachmentSpec) -> Result<Vec<usize>, EngineError> {
    spec.library_residues
        .iter()
        .map(|&number| {
            library
                .residues()
                .iter()
                .position(|r| r.kind == AtomKind::Protein && r.key.number == number)
                .ok_or_else(|| {
                    EngineError::Input(format!(
                        "Glycan library {:?} has no peptide residue {}",
                        spec.glycan_structure, number
                    ))
                })
        })
        .collect()
}

/// Rigid-fit generator: superimposes every library conformer onto the anchor
/// window backbone and accepts it when no glycan heavy atom comes closer than
/// the clash cutoff to a protein heavy atom outside the window.
#[derive(Debug, Clone, Copy)]
pub struct GraftingGenerator {
    clash_cutoff: f64,
}

impl Default for GraftingGenerator {
    fn default() -> Self {
        Self {
            clash_cutoff: DEFAULT_CLASH_CUTOFF_ANGSTROM,
        }
    }
}

impl GraftingGenerator {
    pub fn new(clash_cutoff: f64) -> Result<Self, ConfigError> {
        if !clash_cutoff.is_finite() || clash_cutoff <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "clash_cutoff",
                reason: format!("must be a positive distance in Angstroms, got {clash_cutoff}"),
            });
        }
        Ok(Self { clash_cutoff })
    }

    pub fn clash_cutoff(&self) -> f64 {
        self.clash_cutoff
    }
}

impl ConformerGenerator for GraftingGenerator {
    fn generate(
        &self,
        protein: &Structure,
        protein_frame: &Frame,
        spec: &AttachmentSpec,
        library: &Trajectory,
    ) -> Result<GeneratedSite, EngineError> {
        let window = anchor_window(protein, spec)?;
        let target: Vec<Point3<f64>> = fit_atom_indices(protein, &window, "Protein")?
            .iter()
            .map(|&i| protein_frame.positions()[i])
            .collect();

        let lib_structure = library.structure();
        let mobile_indices =
            fit_atom_indices(lib_structure, &library_window(lib_structure, spec)?, "Library")?;
        let glycan_indices = lib_structure.non_protein_atom_indices();
        if glycan_indices.is_empty() {
            return Err(EngineError::Input(format!(
                "Glycan library {:?} contains no glycan atoms",
                spec.glycan_structure
            )));
        }
        let glycan_heavy: Vec<bool> = glycan_indices
            .iter()
            .map(|&i| is_heavy_atom(&lib_structure.atoms()[i].name))
            .collect();

        let environment: Vec<[f64; 3]> = protein
            .atoms()
            .iter()
            .enumerate()
            .filter(|(i, atom)| {
                atom.is_protein()
                    && is_heavy_atom(&atom.name)
                    && protein
                        .residue_index_of_atom(*i)
                        .is_some_and(|r| !window.contains(&r))
            })
            .map(|(i, _)| {
                let p = protein_frame.positions()[i];
                [p.x, p.y, p.z]
            })
            .collect();
        let kdtree: Option<KdTree<f64, 3>> =
            (!environment.is_empty()).then(|| (&environment).into());
        let cutoff_sq = self.clash_cutoff * self.clash_cutoff;

        let mut accepted = Vec::new();
        let mut reference: Option<Frame> = None;
        let attempted = library.frame_count();

        for index in 0..attempted {
            let frame = library
                .frame(index)
                .map_err(|e| EngineError::Data(format!("Glycan library frame {index}: {e}")))?;
            let mobile: Vec<Point3<f64>> = mobile_indices
                .iter()
                .map(|&i| frame.positions()[i])
                .collect();
            let Some(transform) = superposition(&mobile, &target) else {
                debug!(frame = index, "Superposition failed; conformer rejected.");
                continue;
            };

            let glycan: Vec<Point3<f64>> = glycan_indices
                .iter()
                .map(|&i| transform * frame.positions()[i])
                .collect();
            let clashes = kdtree.as_ref().is_some_and(|tree| {
                glycan.iter().zip(&glycan_heavy).any(|(p, &heavy)| {
                    heavy && tree.nearest_one::<SquaredEuclidean>(&[p.x, p.y, p.z]).distance < cutoff_sq
                })
            });

            let full = protein_frame.concat(&Frame::new(glycan));
            if reference.is_none() {
                reference = Some(full.clone());
            }
            if clashes {
                continue;
            }
            if accepted.is_empty() {
                reference = Some(full.clone());
            }
            accepted.push(full);
        }

        let reference = match reference {
            Some(frame) => frame,
            None => {
                let raw = library
                    .frames()
                    .first()
                    .map(|f| f.select(&glycan_indices))
                    .unwrap_or_default();
                protein_frame.concat(&raw)
            }
        };

        let occupancy = Occupancy {
            accepted: accepted.len(),
            attempted,
        };
        debug!(
            chain = %spec.chain_id,
            anchor = spec.anchor(),
            accepted = occupancy.accepted,
            attempted = occupancy.attempted,
            "Conformer generation finished."
        );

        Ok(GeneratedSite {
            structure: site_structure(protein, lib_structure, &glycan_indices, spec),
            reference,
            accepted,
            occupancy,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures;
    use nalgebra::Vector3;
    use std::path::PathBuf;

    fn spec_at(anchor: isize) -> AttachmentSpec {
        AttachmentSpec {
            chain_id: 'A',
            anchor_residues: [anchor - 1, anchor, anchor + 1],
            library_residues: [1, 2, 3],
            glycan_structure: PathBuf::from("lib.pdb"),
            glycan_trajectory: PathBuf::from("lib.xtc"),
            output_structure: PathBuf::from("out.pdb"),
            output_trajectory: PathBuf::from("out.xtc"),
        }
    }

    #[test]
    fn grafting_accepts_clash_free_conformers_only() {
        let protein = fixtures::protein();
        let library = fixtures::library(&[
            Vector3::new(0.0, 0.0, 6.0),
            Vector3::new(-7.0, 0.0, 0.0),
            Vector3::new(0.0, 0.0, 7.0),
        ]);

        let site = GraftingGenerator::default()
            .generate(protein.structure(), &protein.frames()[0], &spec_at(3), &library)
            .unwrap();

        assert_eq!(
            site.occupancy,
            Occupancy {
                accepted: 2,
                attempted: 3
            }
        );
        assert_eq!(site.accepted.len(), 2);
        assert_eq!(site.structure.atom_count(), 22);

        let c1 = site.accepted[0].position(20).unwrap();
        let expected = fixtures::protein_ca(3) + Vector3::new(0.0, 0.0, 6.0);
        assert!((c1 - expected).norm() < 1e-6);
    }

    #[test]
    fn site_structure_tags_glycan_with_anchor_segment() {
        let protein = fixtures::protein();
        let library = fixtures::library(&[Vector3::new(0.0, 0.0, 6.0)]);
        let glycans = library.structure().non_protein_atom_indices();
        let structure = site_structure(protein.structure(), library.structure(), &glycans, &spec_at(3));

        let glycan_atom = structure.atom(21).unwrap();
        assert_eq!(glycan_atom.segment, "3");
        assert_eq!(glycan_atom.chain_id, 'A');
        assert!(glycan_atom.is_glycan());
        assert_eq!(structure.residues().len(), fixtures::RESIDUE_COUNT + 1);
    }

    #[test]
    fn anchor_window_outside_protein_is_an_input_error() {
        let protein = fixtures::protein();
        let library = fixtures::library(&[Vector3::new(0.0, 0.0, 6.0)]);

        let result = GraftingGenerator::default().generate(
            protein.structure(),
            &protein.frames()[0],
            &spec_at(5),
            &library,
        );
        assert!(matches!(result, Err(EngineError::Input(_))));
    }

    #[test]
    fn library_without_mapped_residues_is_an_input_error() {
        let protein = fixtures::protein();
        let library = fixtures::library(&[Vector3::new(0.0, 0.0, 6.0)]);
        let mut spec = spec_at(3);
        spec.library_residues = [7, 8, 9];

        let result =
            GraftingGenerator::default().generate(protein.structure(), &protein.frames()[0], &spec, &library);
        assert!(matches!(result, Err(EngineError::Input(_))));
    }

    #[test]
    fn clash_cutoff_must_be_positive() {
        assert!(GraftingGenerator::new(0.0).is_err());
        assert!(GraftingGenerator::new(f64::INFINITY).is_err());
        assert_eq!(GraftingGenerator::new(2.5).unwrap().clash_cutoff(), 2.5);
    }
}
