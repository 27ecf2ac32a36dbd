use crate::core::io::traits::MolecularFile;
use crate::core::models::atom::{Atom, AtomKind};
use crate::core::models::frame::Frame;
use crate::core::models::structure::Structure;
use crate::core::trajectory::Trajectory;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: PdbParseErrorKind },
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum PdbParseErrorKind {
    #[error("Invalid integer format in columns {columns} (value: '{value}')")]
    InvalidInt { columns: String, value: String },
    #[error("Invalid float format in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: String, value: String },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: String },
    #[error("Line is too short for ATOM/HETATM record (must reach column 54)")]
    LineTooShort,
}

const MIN_ATOM_LINE_LEN: usize = 54;

fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("").trim()
}

fn parse_coordinate(line: &str, line_num: usize, start: usize) -> Result<f64, PdbError> {
    let value = slice_and_trim(line, start, start + 8);
    value.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidFloat {
            columns: format!("{}-{}", start + 1, start + 8),
            value: value.into(),
        },
    })
}

fn parse_position(line: &str, line_num: usize) -> Result<Point3<f64>, PdbError> {
    if line.len() < MIN_ATOM_LINE_LEN {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::LineTooShort,
        });
    }
    Ok(Point3::new(
        parse_coordinate(line, line_num, 30)?,
        parse_coordinate(line, line_num, 38)?,
        parse_coordinate(line, line_num, 46)?,
    ))
}

fn parse_atom(line: &str, line_num: usize) -> Result<Atom, PdbError> {
    let serial_str = slice_and_trim(line, 6, 11);
    let name_str = slice_and_trim(line, 12, 16);
    let res_name_str = slice_and_trim(line, 17, 21);
    let chain_id_str = slice_and_trim(line, 21, 22);
    let res_id_str = slice_and_trim(line, 22, 26);
    let segment_str = slice_and_trim(line, 72, 76);
    let element_str = slice_and_trim(line, 76, 78);

    if name_str.is_empty() {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::MissingRequiredField {
                columns: "13-16".into(),
            },
        });
    }
    if res_name_str.is_empty() {
        return Err(PdbError::Parse {
            line: line_num,
            kind: PdbParseErrorKind::MissingRequiredField {
                columns: "18-21".into(),
            },
        });
    }
    // Serials above 99999 are commonly written as '*****' or hex; the field is informational.
    let serial: usize = serial_str.parse().unwrap_or(0);
    let res_id: isize = res_id_str.parse().map_err(|_| PdbError::Parse {
        line: line_num,
        kind: PdbParseErrorKind::InvalidInt {
            columns: "23-26".into(),
            value: res_id_str.into(),
        },
    })?;

    let chain_id = chain_id_str
        .chars()
        .next()
        .or_else(|| segment_str.chars().next().filter(char::is_ascii_alphabetic))
        .unwrap_or('A');

    let mut atom = Atom::new(name_str, res_name_str, res_id, chain_id).with_segment(segment_str);
    atom.serial = serial;
    if !element_str.is_empty() {
        atom.element = element_str.to_string();
    }
    Ok(atom)
}

fn format_atom_name(name: &str, element: &str) -> String {
    if name.len() >= 4 {
        name.chars().take(4).collect()
    } else if element.len() == 1 {
        format!(" {:<3}", name)
    } else {
        format!("{:<4}", name)
    }
}

fn write_atom_line(
    writer: &mut impl Write,
    atom: &Atom,
    serial: usize,
    position: &Point3<f64>,
    b_factor: f64,
) -> io::Result<()> {
    let record_type = match atom.kind {
        AtomKind::Protein => "ATOM",
        AtomKind::Other | AtomKind::Glycan => "HETATM",
    };
    writeln!(
        writer,
        "{:<6}{:>5} {:<4} {:<4}{:1}{:>4}    {:>8.3}{:>8.3}{:>8.3}{:>6.2}{:>6.2}      {:<4}{:>2}",
        record_type,
        serial % 100_000,
        format_atom_name(&atom.name, &atom.element),
        atom.residue_name,
        atom.chain_id,
        atom.residue_number,
        position.x,
        position.y,
        position.z,
        1.0,
        b_factor,
        atom.segment,
        atom.element,
    )
}

fn write_model(
    writer: &mut impl Write,
    structure: &Structure,
    frame: &Frame,
    b_factors: Option<&[f64]>,
) -> Result<(), PdbError> {
    if frame.len() != structure.atom_count() {
        return Err(PdbError::Inconsistency(format!(
            "Frame has {} coordinates but the structure has {} atoms",
            frame.len(),
            structure.atom_count()
        )));
    }
    if let Some(values) = b_factors {
        if values.len() != structure.atom_count() {
            return Err(PdbError::Inconsistency(format!(
                "{} B-factor values supplied for {} atoms",
                values.len(),
                structure.atom_count()
            )));
        }
    }

    let mut previous_chain: Option<char> = None;
    for (index, (atom, position)) in structure.atoms().iter().zip(frame.positions()).enumerate() {
        if previous_chain.is_some_and(|c| c != atom.chain_id) {
            writeln!(writer, "TER")?;
        }
        previous_chain = Some(atom.chain_id);
        let b_factor = b_factors.map_or(0.0, |values| values[index]);
        write_atom_line(writer, atom, index + 1, position, b_factor)?;
    }
    if previous_chain.is_some() {
        writeln!(writer, "TER")?;
    }
    Ok(())
}

/// Fixed-column PDB reader and writer.
///
/// Multi-model files are read as trajectories: the first model supplies the
/// topology and every model contributes one frame.
pub struct PdbFile;

impl PdbFile {
    fn read_models(
        reader: &mut impl BufRead,
        keep_topology: bool,
    ) -> Result<(Vec<Atom>, Vec<Frame>), PdbError> {
        let mut atoms: Vec<Atom> = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut current: Vec<Point3<f64>> = Vec::new();
        let mut in_first_model = true;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;

            match slice_and_trim(&line, 0, 6) {
                "ATOM" | "HETATM" => {
                    current.push(parse_position(&line, line_num)?);
                    if keep_topology && in_first_model {
                        atoms.push(parse_atom(&line, line_num)?);
                    }
                }
                "MODEL" => {
                    if !current.is_empty() {
                        frames.push(Frame::new(std::mem::take(&mut current)));
                        in_first_model = false;
                    }
                }
                "ENDMDL" => {
                    if !current.is_empty() {
                        frames.push(Frame::new(std::mem::take(&mut current)));
                    }
                    in_first_model = false;
                }
                "END" => break,
                _ => {}
            }
        }
        if !current.is_empty() {
            frames.push(Frame::new(current));
        }

        if let Some(first) = frames.first() {
            if let Some((index, frame)) = frames
                .iter()
                .enumerate()
                .find(|(_, f)| f.len() != first.len())
            {
                return Err(PdbError::Inconsistency(format!(
                    "Model {} has {} atoms but the first model has {}",
                    index + 1,
                    frame.len(),
                    first.len()
                )));
            }
        }
        Ok((atoms, frames))
    }
}

impl MolecularFile for PdbFile {
    type Error = PdbError;

    fn read_from(reader: &mut impl BufRead) -> Result<Trajectory, Self::Error> {
        let (atoms, frames) = Self::read_models(reader, true)?;
        if atoms.is_empty() {
            return Err(PdbError::MissingRecord("ATOM/HETATM records".into()));
        }
        Ok(Trajectory::new(Structure::from_atoms(atoms), frames))
    }

    fn read_frames_from(reader: &mut impl BufRead) -> Result<Vec<Frame>, Self::Error> {
        Ok(Self::read_models(reader, false)?.1)
    }

    fn write_structure_to(
        structure: &Structure,
        frame: &Frame,
        b_factors: Option<&[f64]>,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "REMARK    GENERATED BY GLYCOSHIELD")?;
        write_model(writer, structure, frame, b_factors)?;
        writeln!(writer, "END")?;
        Ok(())
    }

    fn write_frames_to<'a>(
        structure: &Structure,
        frames: impl IntoIterator<Item = &'a Frame>,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        writeln!(writer, "REMARK    GENERATED BY GLYCOSHIELD")?;
        for (index, frame) in frames.into_iter().enumerate() {
            writeln!(writer, "MODEL     {:>4}", index + 1)?;
            write_model(writer, structure, frame, None)?;
            writeln!(writer, "ENDMDL")?;
        }
        writeln!(writer, "END")?;
        Ok(())
    }
}
