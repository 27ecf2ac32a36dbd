use super::atom::{Atom, AtomKind};
use super::residue::{Residue, ResidueKey};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// The topology of a molecular structure: ordered atoms grouped into residues.
///
/// Residues are formed from runs of consecutive atoms that share chain,
/// segment, residue number and residue name, which matches how PDB files lay
/// out their records. The atom order is the coordinate order of every
/// [`Frame`](super::frame::Frame) that belongs to this structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Structure {
    atoms: Vec<Atom>,
    residues: Vec<Residue>,
    /// Index into `residues` for every atom.
    atom_residue: Vec<usize>,
}

impl Structure {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a structure from atoms in file order, deriving residues.
    pub fn from_atoms(atoms: Vec<Atom>) -> Self {
        let mut residues: Vec<Residue> = Vec::new();
        let mut atom_residue = Vec::with_capacity(atoms.len());

        for (index, atom) in atoms.iter().enumerate() {
            let continues_current = residues.last().is_some_and(|res: &Residue| {
                res.key.chain_id == atom.chain_id
                    && res.key.segment == atom.segment
                    && res.key.number == atom.residue_number
                    && res.name == atom.residue_name
            });

            if continues_current {
                if let Some(res) = residues.last_mut() {
                    res.atoms.end = index + 1;
                }
            } else {
                residues.push(Residue {
                    key: ResidueKey::new(atom.chain_id, &atom.segment, atom.residue_number),
                    name: atom.residue_name.clone(),
                    kind: atom.kind,
                    atoms: index..index + 1,
                });
            }
            atom_residue.push(residues.len() - 1);
        }

        Self {
            atoms,
            residues,
            atom_residue,
        }
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn residue(&self, index: usize) -> Option<&Residue> {
        self.residues.get(index)
    }

    pub fn residue_index_of_atom(&self, atom_index: usize) -> Option<usize> {
        self.atom_residue.get(atom_index).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atom_indices_of_kind(&self, kind: AtomKind) -> Vec<usize> {
        self.indices_where(|atom| atom.kind == kind)
    }

    pub fn protein_atom_indices(&self) -> Vec<usize> {
        self.atom_indices_of_kind(AtomKind::Protein)
    }

    pub fn glycan_atom_indices(&self) -> Vec<usize> {
        self.atom_indices_of_kind(AtomKind::Glycan)
    }

    /// Atoms of the input system: the protein plus its environment.
    pub fn host_atom_indices(&self) -> Vec<usize> {
        self.indices_where(|atom| !atom.is_glycan())
    }

    pub fn non_protein_atom_indices(&self) -> Vec<usize> {
        self.indices_where(|atom| !atom.is_protein())
    }

    fn indices_where(&self, keep: impl Fn(&Atom) -> bool) -> Vec<usize> {
        self.atoms
            .iter()
            .enumerate()
            .filter(|(_, atom)| keep(atom))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn protein_residue_indices(&self) -> Vec<usize> {
        self.residues
            .iter()
            .enumerate()
            .filter(|(_, res)| res.kind == AtomKind::Protein)
            .map(|(index, _)| index)
            .collect()
    }

    pub fn has_glycans(&self) -> bool {
        self.atoms.iter().any(Atom::is_glycan)
    }

    /// Finds a residue by chain and number among residues without a segment id.
    pub fn find_residue(&self, chain_id: char, number: isize) -> Option<usize> {
        self.find_residue_by_key(&ResidueKey::new(chain_id, "", number))
    }

    pub fn find_residue_by_key(&self, key: &ResidueKey) -> Option<usize> {
        self.residues.iter().position(|res| &res.key == key)
    }

    /// Returns the index of the named atom inside a residue.
    pub fn find_atom_in_residue(&self, residue_index: usize, atom_name: &str) -> Option<usize> {
        let residue = self.residues.get(residue_index)?;
        residue
            .atoms()
            .find(|&i| self.atoms[i].name.trim() == atom_name)
    }

    /// Maps each protein chain to its sorted, de-duplicated residue numbers.
    pub fn protein_chains(&self) -> BTreeMap<char, Vec<isize>> {
        let mut chains: BTreeMap<char, BTreeSet<isize>> = BTreeMap::new();
        for residue in self.residues.iter().filter(|r| r.kind == AtomKind::Protein) {
            chains
                .entry(residue.key.chain_id)
                .or_default()
                .insert(residue.key.number);
        }
        chains
            .into_iter()
            .map(|(chain, numbers)| (chain, numbers.into_iter().collect()))
            .collect()
    }

    /// Residue keys that occur in more than one residue block.
    pub fn duplicate_residue_keys(&self) -> Vec<ResidueKey> {
        self.residues
            .iter()
            .map(|r| &r.key)
            .duplicates()
            .cloned()
            .sorted()
            .collect()
    }

    /// Builds a new structure from a subset of atoms, in the given order.
    pub fn select(&self, atom_indices: &[usize]) -> Structure {
        Structure::from_atoms(
            atom_indices
                .iter()
                .filter_map(|&i| self.atoms.get(i).cloned())
                .collect(),
        )
    }

    /// Appends the atoms of another structure, re-deriving residues.
    pub fn concat(&self, other: &Structure) -> Structure {
        let mut atoms = self.atoms.clone();
        atoms.extend(other.atoms.iter().cloned());
        Structure::from_atoms(atoms)
    }

    /// Renumbers atom serials sequentially from 1.
    pub fn renumber_serials(&mut self) {
        for (i, atom) in self.atoms.iter_mut().enumerate() {
            atom.serial = i + 1;
        }
    }
}
