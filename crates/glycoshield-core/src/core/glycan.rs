//! Glycan attachment requests and glycan library helpers.
//!
//! An attachment is described by one whitespace-separated input line:
//!
//! ```text
//! A 462,463,464 1,2,3 LIB/Man5/production_merged_noW.pdb LIB/Man5/production_merged_noW.xtc out/A_463.pdb out/A_463.xtc
//! ```
//!
//! The fields are the chain, the three protein residues around the anchor, the
//! three library residues fitted onto them, the library structure and
//! trajectory, and the per-site output structure and trajectory.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// File names of a glycan conformer library inside its directory.
pub const LIBRARY_STRUCTURE_FILE: &str = "production_merged_noW.pdb";
pub const LIBRARY_TRAJECTORY_FILE: &str = "production_merged_noW.xtc";

const FIELD_COUNT: usize = 7;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AttachmentParseError {
    #[error("Expected 7 fields but found {0}")]
    FieldCount(usize),
    #[error("Chain identifier must be a single character (got '{0}')")]
    InvalidChain(String),
    #[error("Field '{field}' must hold three comma-separated residue numbers (got '{value}')")]
    InvalidResidueTriplet { field: &'static str, value: String },
    #[error("Anchor window {0:?} is not three consecutive residues")]
    NonConsecutiveWindow([isize; 3]),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Input line {line}: {source}")]
pub struct InputLineError {
    pub line: usize,
    #[source]
    pub source: AttachmentParseError,
}

/// One glycan attachment site, immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentSpec {
    pub chain_id: char,
    /// Protein residues `anchor - 1, anchor, anchor + 1`.
    pub anchor_residues: [isize; 3],
    /// Library residues superimposed onto the anchor window.
    pub library_residues: [isize; 3],
    pub glycan_structure: PathBuf,
    pub glycan_trajectory: PathBuf,
    pub output_structure: PathBuf,
    pub output_trajectory: PathBuf,
}

impl AttachmentSpec {
    /// The residue the glycan is attached to.
    pub fn anchor(&self) -> isize {
        self.anchor_residues[1]
    }

    /// Builds the attachment line for a library glycan at `chain:resid`.
    pub fn for_library_glycan(
        chain_id: char,
        resid: isize,
        library_dir: &Path,
        glycan: &str,
        output_dir: &Path,
    ) -> Self {
        let glycan_dir = library_dir.join(glycan);
        Self {
            chain_id,
            anchor_residues: [resid - 1, resid, resid + 1],
            library_residues: [1, 2, 3],
            glycan_structure: glycan_dir.join(LIBRARY_STRUCTURE_FILE),
            glycan_trajectory: glycan_dir.join(LIBRARY_TRAJECTORY_FILE),
            output_structure: output_dir.join(format!("{chain_id}_{resid}.pdb")),
            output_trajectory: output_dir.join(format!("{chain_id}_{resid}.xtc")),
        }
    }
}

fn parse_triplet(field: &'static str, value: &str) -> Result<[isize; 3], AttachmentParseError> {
    let invalid = || AttachmentParseError::InvalidResidueTriplet {
        field,
        value: value.to_string(),
    };
    let numbers = value
        .split(',')
        .map(|part| part.trim().parse::<isize>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>, _>>()?;
    <[isize; 3]>::try_from(numbers).map_err(|_| invalid())
}

impl FromStr for AttachmentSpec {
    type Err = AttachmentParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != FIELD_COUNT {
            return Err(AttachmentParseError::FieldCount(fields.len()));
        }

        let mut chain_chars = fields[0].chars();
        let chain_id = match (chain_chars.next(), chain_chars.next()) {
            (Some(c), None) => c,
            _ => return Err(AttachmentParseError::InvalidChain(fields[0].to_string())),
        };
        let anchor_residues = parse_triplet("anchor residues", fields[1])?;
        if anchor_residues[1] != anchor_residues[0] + 1 || anchor_residues[2] != anchor_residues[1] + 1
        {
            return Err(AttachmentParseError::NonConsecutiveWindow(anchor_residues));
        }
        let library_residues = parse_triplet("library residues", fields[2])?;

        Ok(Self {
            chain_id,
            anchor_residues,
            library_residues,
            glycan_structure: PathBuf::from(fields[3]),
            glycan_trajectory: PathBuf::from(fields[4]),
            output_structure: PathBuf::from(fields[5]),
            output_trajectory: PathBuf::from(fields[6]),
        })
    }
}

impl fmt::Display for AttachmentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.anchor_residues;
        let [x, y, z] = self.library_residues;
        write!(
            f,
            "{} {a},{b},{c} {x},{y},{z} {} {} {} {}",
            self.chain_id,
            self.glycan_structure.display(),
            self.glycan_trajectory.display(),
            self.output_structure.display(),
            self.output_trajectory.display()
        )
    }
}

/// Returns true for lines that carry no attachment (comments and blanks).
pub fn is_ignored_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Parses every attachment line of an input text, skipping comments and blanks.
pub fn parse_attachments(text: &str) -> Result<Vec<AttachmentSpec>, InputLineError> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !is_ignored_line(line))
        .map(|(index, line)| {
            line.parse().map_err(|source| InputLineError {
                line: index + 1,
                source,
            })
        })
        .collect()
}

/// Conformer acceptance counts of one attachment site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct Occupancy {
    pub accepted: usize,
    pub attempted: usize,
}

impl Occupancy {
    pub fn fraction(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.accepted as f64 / self.attempted as f64
        }
    }
}

/// The number of frames every site can supply: the minimum accepted count.
/// An empty set of sites supplies none.
pub fn min_frame_count(occupancies: &[Occupancy]) -> usize {
    occupancies.iter().map(|o| o.accepted).min().unwrap_or(0)
}

/// Lists the glycan names (sub-directories) of a library directory, sorted.
pub fn list_library(library_dir: &Path) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(library_dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}
