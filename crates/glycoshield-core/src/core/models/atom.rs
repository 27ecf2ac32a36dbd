use crate::core::utils::identifiers;
use std::fmt;

/// Classifies an atom by the molecule type of its residue.
///
/// Amino acid residues form the protein. Glycans attached by shield generation
/// are recognised by their segment tag (the anchor residue number); every other
/// residue, such as water, ions, ligands, caps or untagged sugars, is part of
/// the environment and stays with the protein.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum AtomKind {
    /// Atom of a standard (or common variant) amino acid residue.
    #[default]
    Protein,
    /// Atom of any non-amino-acid residue that is not an attached glycan.
    Other,
    /// Atom of a glycan attached at an anchor residue.
    Glycan,
}

impl AtomKind {
    pub fn classify(residue_name: &str, segment: &str) -> Self {
        if identifiers::is_amino_acid(residue_name) {
            AtomKind::Protein
        } else if is_glycan_tag(segment) {
            AtomKind::Glycan
        } else {
            AtomKind::Other
        }
    }
}

/// Whether a segment id is the anchor tag written on attached glycans.
pub fn is_glycan_tag(segment: &str) -> bool {
    !segment.is_empty() && segment.parse::<isize>().is_ok()
}

impl fmt::Display for AtomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomKind::Protein => write!(f, "Protein"),
            AtomKind::Other => write!(f, "Other"),
            AtomKind::Glycan => write!(f, "Glycan"),
        }
    }
}

/// Topology record of a single atom.
///
/// Coordinates are not stored here; they live in [`Frame`](super::frame::Frame)s
/// so that one topology can be shared by every frame of a trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// The serial number from the source file.
    pub serial: usize,
    /// The atom name (e.g., "CA", "C1").
    pub name: String,
    /// The name of the parent residue (e.g., "ASN", "NAG").
    pub residue_name: String,
    /// The residue sequence number from the source file.
    pub residue_number: isize,
    /// The single-character chain identifier.
    pub chain_id: char,
    /// The segment identifier; glycans attached by shield generation carry
    /// the anchor residue number here so that sites never share residue keys.
    pub segment: String,
    /// The element symbol, guessed from the atom name if the file omits it.
    pub element: String,
    /// Classification derived from the residue name and segment tag.
    pub kind: AtomKind,
}

impl Atom {
    pub fn new(name: &str, residue_name: &str, residue_number: isize, chain_id: char) -> Self {
        Self {
            serial: 0,
            name: name.to_string(),
            residue_name: residue_name.to_string(),
            residue_number,
            chain_id,
            segment: String::new(),
            element: identifiers::element_from_atom_name(name),
            kind: AtomKind::classify(residue_name, ""),
        }
    }

    pub fn with_segment(mut self, segment: &str) -> Self {
        self.segment = segment.to_string();
        self.kind = AtomKind::classify(&self.residue_name, segment);
        self
    }

    pub fn is_protein(&self) -> bool {
        self.kind == AtomKind::Protein
    }

    pub fn is_glycan(&self) -> bool {
        self.kind == AtomKind::Glycan
    }

    pub fn vdw_radius(&self) -> f64 {
        identifiers::vdw_radius(&self.element)
    }
}
