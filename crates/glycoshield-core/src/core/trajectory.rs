use crate::core::models::frame::Frame;
use crate::core::models::structure::Structure;
use std::borrow::Cow;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrajectoryError {
    #[error("Frame {index} is out of range (trajectory has {count} frames)")]
    FrameOutOfRange { index: usize, count: usize },
    #[error("Frame {index} has {found} coordinates but the topology has {expected} atoms")]
    AtomCountMismatch {
        index: usize,
        expected: usize,
        found: usize,
    },
}

/// Read-only access to a structure and the frames of its trajectory.
///
/// Implementations must be shareable across worker threads: the SASA engine
/// reads frames of the same source concurrently.
pub trait FrameSource: Send + Sync {
    /// The topology shared by every frame.
    fn structure(&self) -> &Structure;

    /// Number of frames available.
    fn frame_count(&self) -> usize;

    /// Coordinates of one frame, validated against the topology.
    fn frame(&self, index: usize) -> Result<Cow<'_, Frame>, TrajectoryError>;
}

/// An in-memory trajectory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    structure: Structure,
    frames: Vec<Frame>,
}

impl Trajectory {
    pub fn new(structure: Structure, frames: Vec<Frame>) -> Self {
        Self { structure, frames }
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn into_parts(self) -> (Structure, Vec<Frame>) {
        (self.structure, self.frames)
    }

    /// Keeps at most the first `count` frames.
    pub fn truncate(&mut self, count: usize) {
        self.frames.truncate(count);
    }
}

impl FrameSource for Trajectory {
    fn structure(&self) -> &Structure {
        &self.structure
    }

    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn frame(&self, index: usize) -> Result<Cow<'_, Frame>, TrajectoryError> {
        let frame = self
            .frames
            .get(index)
            .ok_or(TrajectoryError::FrameOutOfRange {
                index,
                count: self.frames.len(),
            })?;
        if frame.len() != self.structure.atom_count() {
            return Err(TrajectoryError::AtomCountMismatch {
                index,
                expected: self.structure.atom_count(),
                found: frame.len(),
            });
        }
        Ok(Cow::Borrowed(frame))
    }
}
