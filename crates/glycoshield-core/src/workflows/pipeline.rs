use super::session::Session;
use crate::core::glycan::AttachmentSpec;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::sasa::SurfaceAreaComputer;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::{FrameLimit, MergeConfig, SasaConfig, ShieldConfig};
use crate::engine::error::EngineError;
use crate::engine::generator::ConformerGenerator;
use crate::engine::progress::ProgressReporter;
use crate::engine::state::PipelineStage;
use crate::engine::tasks::merge::{self, MergeOutput};
use crate::engine::tasks::sasa::{self, SasaTarget, ShieldingReport};
use crate::engine::tasks::shield::{self, ShieldOutput};
use tracing::{info, instrument, warn};

/// Drives the three stages over a [`Session`].
///
/// The pipeline owns no state of its own: it borrows the injected generator
/// and kernel, and every stage reads its inputs from and records its outputs in
/// the session it is given.
pub struct Pipeline<'a> {
    generator: &'a dyn ConformerGenerator,
    kernel: &'a dyn SurfaceAreaComputer,
    reporter: &'a ProgressReporter<'a>,
    cancel: CancellationToken,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        generator: &'a dyn ConformerGenerator,
        kernel: &'a dyn SurfaceAreaComputer,
        reporter: &'a ProgressReporter<'a>,
    ) -> Self {
        Self {
            generator,
            kernel,
            reporter,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels the stage currently running.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn require(session: &Session, stage: PipelineStage) -> Result<(), EngineError> {
        let state = session.status();
        if state.can_run(stage) {
            return Ok(());
        }
        let missing = stage
            .prerequisite()
            .map(|s| s.name())
            .unwrap_or("an earlier stage");
        Err(EngineError::State(format!(
            "{} requested before {}",
            stage.name(),
            missing
        )))
    }

    #[instrument(skip_all, name = "shield_stage")]
    pub fn run_shield(
        &self,
        session: &mut Session,
        specs: &[AttachmentSpec],
        config: &ShieldConfig,
    ) -> Result<ShieldOutput, EngineError> {
        let protein_path = session
            .protein()
            .ok_or_else(|| EngineError::Input("No protein structure selected".into()))?
            .to_path_buf();
        let protein = PdbFile::read_from_path(&protein_path)
            .map_err(|e| EngineError::format(&protein_path, e))?;

        shield::validate(&protein, specs)?;
        session.begin_stage(PipelineStage::Shield);
        let output = shield::run(
            &protein,
            specs,
            self.generator,
            config,
            self.reporter,
            &self.cancel,
        )?;

        let max_frame = output.min_frame_count();
        if max_frame == 0 {
            warn!("At least one site has no accepted conformer; merging will fail.");
        }
        info!(max_frame, "Frame bound fixed from site occupancy.");
        session.complete_shield(output.clone());
        Ok(output)
    }

    #[instrument(skip_all, name = "merge_stage")]
    pub fn run_merge(
        &self,
        session: &mut Session,
        config: &MergeConfig,
    ) -> Result<MergeOutput, EngineError> {
        Self::require(session, PipelineStage::Merge)?;
        let artifacts = session.artifacts();
        let (Some(shield), Some(max_frame)) = (artifacts.shield.as_ref(), artifacts.max_frame) else {
            return Err(EngineError::State("shield generation left no artifacts".into()));
        };
        if max_frame == 0 {
            return Err(EngineError::Data(
                "Frame bound is zero: at least one site has no accepted conformer".into(),
            ));
        }
        let site_files: Vec<_> = shield
            .structure_paths()
            .into_iter()
            .zip(shield.trajectory_paths())
            .collect();

        session.begin_stage(PipelineStage::Merge);
        let output = merge::run(&site_files, max_frame, config, self.reporter, &self.cancel)?;
        session.complete_merge(output.clone());
        Ok(output)
    }

    #[instrument(skip_all, name = "sasa_stage")]
    pub fn run_sasa(
        &self,
        session: &mut Session,
        config: &SasaConfig,
    ) -> Result<ShieldingReport, EngineError> {
        Self::require(session, PipelineStage::Sasa)?;
        let artifacts = session.artifacts();
        let (Some(merged), Some(max_frame)) = (artifacts.merge.as_ref(), artifacts.max_frame) else {
            return Err(EngineError::State("trajectory merge left no artifacts".into()));
        };

        let frame_limit = match config.frame_limit {
            FrameLimit::All => FrameLimit::First(max_frame),
            FrameLimit::First(n) if n > max_frame => {
                return Err(EngineError::Data(format!(
                    "Frame limit {n} exceeds the {max_frame} frames every site can supply"
                )));
            }
            limit => limit,
        };
        let config = SasaConfig {
            frame_limit,
            ..config.clone()
        };

        let trajectory = PdbFile::read_pair(&merged.structure_path, &merged.trajectory_path)
            .map_err(|e| EngineError::format(&merged.trajectory_path, e))?;
        let label = SasaTarget::label_from_path(&merged.structure_path);

        session.begin_stage(PipelineStage::Sasa);
        let report = sasa::run(
            &[SasaTarget::new(label, &trajectory)],
            &config,
            self.kernel,
            self.reporter,
            &self.cancel,
        )?;
        session.complete_sasa(report.clone());
        Ok(report)
    }

    /// Runs every stage in order, stopping at the first failure.
    pub fn run_all(
        &self,
        session: &mut Session,
        specs: &[AttachmentSpec],
        shield_config: &ShieldConfig,
        merge_config: &MergeConfig,
        sasa_config: &SasaConfig,
    ) -> Result<ShieldingReport, EngineError> {
        self.run_shield(session, specs, shield_config)?;
        self.run_merge(session, merge_config)?;
        self.run_sasa(session, sasa_config)
    }
}
