use phf::{Map, Set, phf_map, phf_set};

static AMINO_ACID_NAMES: Set<&'static str> = phf_set! {
    "ALA", "ARG", "ASN", "ASP", "CYS", "GLN", "GLU", "GLY", "HIS", "ILE",
    "LEU", "LYS", "MET", "PHE", "PRO", "SER", "THR", "TRP", "TYR", "VAL",
    "HSD", "HSE", "HSP", "HID", "HIE", "HIP", "CYX", "CYM", "ASH", "GLH",
    "LYN", "ARN", "NMA", "ACE", "SEC", "PYL", "MSE",
};

static BACKBONE_ATOM_NAMES: Set<&'static str> = phf_set! {
    "N", "H", "HN", "CA", "HA", "C", "O", "OXT", "H1", "H2", "H3",
    "HT1", "HT2", "HT3", "OT1", "OT2", "HA1", "HA2",
};

/// Bondi van der Waals radii in Angstroms, keyed by element symbol.
static VDW_RADII: Map<&'static str, f64> = phf_map! {
    "H" => 1.10, "C" => 1.70, "N" => 1.55, "O" => 1.52, "S" => 1.80,
    "P" => 1.80, "F" => 1.47, "CL" => 1.75, "BR" => 1.85, "I" => 1.98,
    "SE" => 1.90, "NA" => 2.27, "MG" => 1.73, "K" => 2.75, "CA" => 2.31,
    "ZN" => 1.39, "FE" => 1.94,
};

pub const DEFAULT_VDW_RADIUS: f64 = 1.80;

pub fn is_amino_acid(residue_name: &str) -> bool {
    AMINO_ACID_NAMES.contains(residue_name.trim().to_ascii_uppercase().as_str())
}

pub fn is_backbone_atom(atom_name: &str) -> bool {
    BACKBONE_ATOM_NAMES.contains(atom_name.trim())
}

pub fn is_heavy_atom(atom_name: &str) -> bool {
    let first_char = atom_name
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase());
    !matches!(first_char, Some('H') | Some('D'))
}

/// Guesses the element symbol from a PDB atom name when the element column is blank.
pub fn element_from_atom_name(atom_name: &str) -> String {
    atom_name
        .trim()
        .trim_start_matches(|c: char| c.is_ascii_digit())
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_default()
}

pub fn vdw_radius(element: &str) -> f64 {
    VDW_RADII
        .get(element.trim().to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_VDW_RADIUS)
}
