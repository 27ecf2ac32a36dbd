use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// The three stages of the shielding pipeline, in dependency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PipelineStage {
    Shield,
    Merge,
    Sasa,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 3] = [
        PipelineStage::Shield,
        PipelineStage::Merge,
        PipelineStage::Sasa,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PipelineStage::Shield => "Shield Generation",
            PipelineStage::Merge => "Trajectory Merge",
            PipelineStage::Sasa => "Differential SASA",
        }
    }

    /// The stage that must be complete before this one may run.
    pub fn prerequisite(self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Shield => None,
            PipelineStage::Merge => Some(PipelineStage::Shield),
            PipelineStage::Sasa => Some(PipelineStage::Merge),
        }
    }

    fn bit(self) -> u8 {
        match self {
            PipelineStage::Shield => 0b001,
            PipelineStage::Merge => 0b010,
            PipelineStage::Sasa => 0b100,
        }
    }

    /// Bits of this stage and every stage depending on it.
    fn with_downstream_bits(self) -> u8 {
        PipelineStage::ALL
            .iter()
            .filter(|&&s| s >= self)
            .fold(0, |acc, s| acc | s.bit())
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named position in the linear state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelinePhase {
    Init,
    Shielded,
    Merged,
    SasaDone,
}

/// Completion flags of the three stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PipelineState {
    pub shield_done: bool,
    pub merge_done: bool,
    pub sasa_done: bool,
}

impl PipelineState {
    fn from_bits(bits: u8) -> Self {
        Self {
            shield_done: bits & PipelineStage::Shield.bit() != 0,
            merge_done: bits & PipelineStage::Merge.bit() != 0,
            sasa_done: bits & PipelineStage::Sasa.bit() != 0,
        }
    }

    pub fn is_done(&self, stage: PipelineStage) -> bool {
        match stage {
            PipelineStage::Shield => self.shield_done,
            PipelineStage::Merge => self.merge_done,
            PipelineStage::Sasa => self.sasa_done,
        }
    }

    /// True when the prerequisite of `stage` (if any) is complete.
    pub fn can_run(&self, stage: PipelineStage) -> bool {
        stage.prerequisite().is_none_or(|p| self.is_done(p))
    }

    pub fn phase(&self) -> PipelinePhase {
        if self.sasa_done {
            PipelinePhase::SasaDone
        } else if self.merge_done {
            PipelinePhase::Merged
        } else if self.shield_done {
            PipelinePhase::Shielded
        } else {
            PipelinePhase::Init
        }
    }

    pub fn output_ready(&self) -> bool {
        self.shield_done && self.merge_done && self.sasa_done
    }
}

/// Shared, lock-free view of a session's [`PipelineState`].
///
/// Clones observe the same state, so a progress display on another thread can
/// poll while a stage runs. Only the owning session mutates it.
#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    bits: Arc<AtomicU8>,
}

impl StatusHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> PipelineState {
        PipelineState::from_bits(self.bits.load(Ordering::Acquire))
    }

    /// Clears the flag of `stage` and of every downstream stage.
    pub(crate) fn invalidate_from(&self, stage: PipelineStage) {
        self.bits
            .fetch_and(!stage.with_downstream_bits(), Ordering::AcqRel);
    }

    pub(crate) fn complete(&self, stage: PipelineStage) {
        self.bits.fetch_or(stage.bit(), Ordering::AcqRel);
    }

    pub(crate) fn reset(&self) {
        self.bits.store(0, Ordering::Release);
    }
}
