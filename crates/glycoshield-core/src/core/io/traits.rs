use crate::core::models::frame::Frame;
use crate::core::models::structure::Structure;
use crate::core::trajectory::Trajectory;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading and writing structure/trajectory files.
///
/// A file holds one or more models. The first model defines the topology and
/// every model contributes one frame of coordinates.
pub trait MolecularFile {
    /// The error type for I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads a topology and all frames from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the input holds no atom records.
    fn read_from(reader: &mut impl BufRead) -> Result<Trajectory, Self::Error>;

    /// Reads only the coordinates of every model. An input without atom
    /// records yields an empty list.
    fn read_frames_from(reader: &mut impl BufRead) -> Result<Vec<Frame>, Self::Error>;

    /// Writes a single frame as a structure file.
    ///
    /// # Arguments
    ///
    /// * `structure` - The topology to write.
    /// * `frame` - The coordinates to write.
    /// * `b_factors` - Optional per-atom values for the temperature-factor column.
    /// * `writer` - The writer to output to.
    fn write_structure_to(
        structure: &Structure,
        frame: &Frame,
        b_factors: Option<&[f64]>,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Writes every frame as one model of a trajectory file.
    fn write_frames_to<'a>(
        structure: &Structure,
        frames: impl IntoIterator<Item = &'a Frame>,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error>;

    /// Reads a topology and all frames from a file path.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Trajectory, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Reads the frames of a trajectory file.
    fn read_frames_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Frame>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_frames_from(&mut reader)
    }

    /// Reads the topology from a structure file and the frames from a
    /// separate trajectory file.
    fn read_pair<P: AsRef<Path>, Q: AsRef<Path>>(
        structure_path: P,
        trajectory_path: Q,
    ) -> Result<Trajectory, Self::Error> {
        let (structure, _) = Self::read_from_path(structure_path)?.into_parts();
        let frames = Self::read_frames_from_path(trajectory_path)?;
        Ok(Trajectory::new(structure, frames))
    }

    fn write_structure_to_path<P: AsRef<Path>>(
        structure: &Structure,
        frame: &Frame,
        b_factors: Option<&[f64]>,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_structure_to(structure, frame, b_factors, &mut writer)?;
        writer.flush()?;
        Ok(())
    }

    fn write_frames_to_path<'a, P: AsRef<Path>>(
        structure: &Structure,
        frames: impl IntoIterator<Item = &'a Frame>,
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_frames_to(structure, frames, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
