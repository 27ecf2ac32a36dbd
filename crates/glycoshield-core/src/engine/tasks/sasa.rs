use super::aggregate::Aggregator;
use super::plot;
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::frame::Frame;
use crate::core::models::residue::ResidueKey;
use crate::core::models::structure::Structure;
use crate::core::sasa::{KernelError, SurfaceAreaComputer, residue_areas};
use crate::core::trajectory::FrameSource;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::{AggregationMode, FrameLimit, SasaConfig};
use crate::engine::error::EngineError;
use crate::engine::pool::map_tasks;
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

/// One structure/trajectory pair to analyse, labelled for reports and file names.
pub struct SasaTarget<'a> {
    pub label: String,
    pub source: &'a dyn FrameSource,
}

impl<'a> SasaTarget<'a> {
    pub fn new(label: impl Into<String>, source: &'a dyn FrameSource) -> Self {
        Self {
            label: label.into(),
            source,
        }
    }

    /// Label derived from a structure path: its file stem.
    pub fn label_from_path(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "structure".to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SeriesStatus {
    /// Every requested frame contributed.
    Complete,
    /// Some frames failed and were skipped.
    Partial,
    /// No frame could be computed; the series carries no deltas.
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidueDelta {
    pub key: ResidueKey,
    pub name: String,
    /// Surface lost to the glycans, in nm².
    pub delta: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesOutputs {
    pub table: Option<PathBuf>,
    pub structure: Option<PathBuf>,
    pub plot: Option<PathBuf>,
    /// Present only when intermediate files were kept.
    pub frames_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SasaSeries {
    pub structure: String,
    pub probe_radius: f64,
    pub mode: AggregationMode,
    /// Protein residues in structure order.
    pub residues: Vec<ResidueDelta>,
    pub frames_used: Vec<usize>,
    pub frames_skipped: Vec<usize>,
    pub status: SeriesStatus,
    pub outputs: SeriesOutputs,
}

impl SasaSeries {
    pub fn delta(&self, key: &ResidueKey) -> Option<f64> {
        self.residues.iter().find(|r| &r.key == key).map(|r| r.delta)
    }

    pub fn deltas(&self) -> Vec<f64> {
        self.residues.iter().map(|r| r.delta).collect()
    }
}

/// Every series of one run, in (structure, probe) input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShieldingReport {
    pub series: Vec<SasaSeries>,
}

impl ShieldingReport {
    pub fn is_complete(&self) -> bool {
        self.series.iter().all(|s| s.status == SeriesStatus::Complete)
    }

    pub fn invalid(&self) -> impl Iterator<Item = &SasaSeries> {
        self.series.iter().filter(|s| s.status == SeriesStatus::Invalid)
    }

    pub fn find(&self, structure: &str, probe_radius: f64) -> Option<&SasaSeries> {
        self.series
            .iter()
            .find(|s| s.structure == structure && s.probe_radius == probe_radius)
    }
}

/// Common stem of every output file of one series.
pub fn series_stem(label: &str, probe_radius: f64, mode: AggregationMode) -> String {
    format!("{label}_probe{probe_radius:.3}_{mode}")
}

/// Number of leading frames to analyse for a source.
pub fn effective_frame_count(
    source: &dyn FrameSource,
    limit: FrameLimit,
) -> Result<usize, EngineError> {
    let available = source.frame_count();
    let count = match limit {
        FrameLimit::All => available,
        FrameLimit::First(n) if n > available => {
            return Err(EngineError::Data(format!(
                "Frame limit {n} exceeds the {available} frames available"
            )));
        }
        FrameLimit::First(n) => n,
    };
    if count == 0 {
        return Err(EngineError::Data("Trajectory has no frames".into()));
    }
    Ok(count)
}

struct SeriesPlan<'a> {
    target: &'a SasaTarget<'a>,
    probe_radius: f64,
    frame_count: usize,
    table: PathBuf,
    structure: PathBuf,
    plot: PathBuf,
    frames_dir: PathBuf,
}

fn plan_series<'a>(
    targets: &'a [SasaTarget<'a>],
    config: &SasaConfig,
) -> Result<Vec<SeriesPlan<'a>>, EngineError> {
    let mut plans = Vec::with_capacity(targets.len() * config.probe_radii.len());
    let mut claimed: HashMap<PathBuf, String> = HashMap::new();

    for target in targets {
        let frame_count = effective_frame_count(target.source, config.frame_limit)
            .map_err(|e| match e {
                EngineError::Data(reason) => EngineError::Data(format!("{}: {reason}", target.label)),
                other => other,
            })?;
        if target.source.structure().protein_atom_indices().is_empty() {
            return Err(EngineError::Input(format!(
                "Structure '{}' contains no protein atoms",
                target.label
            )));
        }

        for &probe_radius in &config.probe_radii {
            let stem = series_stem(&target.label, probe_radius, config.mode);
            let plan = SeriesPlan {
                target,
                probe_radius,
                frame_count,
                table: config.output_dir.join(format!("{stem}.csv")),
                structure: config.output_dir.join(format!("{stem}.pdb")),
                plot: config.output_dir.join(format!("{stem}.svg")),
                frames_dir: config.output_dir.join(format!("{stem}_frames")),
            };
            let owner = format!("'{}' at probe {probe_radius} nm", target.label);
            if let Some(first) = claimed.insert(plan.table.clone(), owner.clone()) {
                return Err(EngineError::PathCollision {
                    path: plan.table,
                    first,
                    second: owner,
                });
            }
            plans.push(plan);
        }
    }
    Ok(plans)
}

/// Computes the shielding series of every (target, probe radius) pair.
///
/// Frames whose kernel call fails are logged and skipped; the affected series
/// becomes [`SeriesStatus::Partial`], or [`SeriesStatus::Invalid`] when no
/// frame succeeded. Other pairs are unaffected.
#[instrument(skip_all, name = "sasa_task")]
pub fn run(
    targets: &[SasaTarget<'_>],
    config: &SasaConfig,
    kernel: &dyn SurfaceAreaComputer,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<ShieldingReport, EngineError> {
    if targets.is_empty() {
        return Err(EngineError::Input("No structures were given for SASA analysis".into()));
    }
    let plans = plan_series(targets, config)?;
    fs::create_dir_all(&config.output_dir).map_err(|e| EngineError::io(&config.output_dir, e))?;
    for plan in &plans {
        remove_stale_outputs(plan);
    }

    info!(
        series = plans.len(),
        mode = %config.mode,
        n_dots = config.n_dots,
        "Starting differential SASA."
    );
    reporter.report(Progress::PhaseStart {
        name: "Differential SASA",
    });
    reporter.report(Progress::TaskStart {
        total_steps: plans.iter().map(|p| p.frame_count as u64).sum(),
    });

    let results: Vec<Result<SasaSeries, EngineError>> =
        map_tasks(&plans, config.parallel, |_, plan| {
            cancel.check()?;
            run_series(plan, config, kernel, reporter, cancel)
        });
    reporter.report(Progress::TaskFinish);

    if !config.keep_intermediate {
        for plan in &plans {
            remove_intermediate(&plan.frames_dir);
        }
    }

    let series = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    let report = ShieldingReport { series };

    info!(
        complete = report.is_complete(),
        invalid = report.invalid().count(),
        "Differential SASA finished."
    );
    reporter.report(Progress::PhaseFinish);
    Ok(report)
}

/// Clears the files of an earlier run so an invalid series leaves none behind.
fn remove_stale_outputs(plan: &SeriesPlan<'_>) {
    for path in [&plan.table, &plan.structure, &plan.plot] {
        match fs::remove_file(path) {
            Ok(()) => debug!(path = ?path, "Removed output of an earlier run."),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?path, error = %e, "Could not remove stale output."),
        }
    }
}

fn remove_intermediate(dir: &Path) {
    if !dir.exists() {
        return;
    }
    if let Err(e) = fs::remove_dir_all(dir) {
        warn!(path = ?dir, error = %e, "Could not remove intermediate files.");
    }
}

struct FrameAreas {
    shielded: Vec<f64>,
    unshielded: Vec<f64>,
}

impl FrameAreas {
    fn deltas(&self) -> Vec<f64> {
        self.unshielded
            .iter()
            .zip(&self.shielded)
            .map(|(u, s)| u - s)
            .collect()
    }
}

enum FrameOutcome {
    Done(FrameAreas),
    Failed,
    Cancelled,
}

/// Atom and residue selections shared by every frame of one target.
struct Selection {
    all_atoms: Vec<usize>,
    /// Atoms left once the glycans are stripped.
    unshielded_atoms: Vec<usize>,
    protein_residues: Vec<usize>,
}

impl Selection {
    /// Structures written by shield generation tag their glycans, so only
    /// those are stripped. Untagged inputs fall back to keeping the protein.
    fn of(structure: &Structure) -> Self {
        let unshielded_atoms = if structure.has_glycans() {
            structure.host_atom_indices()
        } else {
            debug!("No tagged glycans; stripping every non-protein atom.");
            structure.protein_atom_indices()
        };
        Self {
            all_atoms: (0..structure.atom_count()).collect(),
            unshielded_atoms,
            protein_residues: structure.protein_residue_indices(),
        }
    }
}

fn compute_frame(
    source: &dyn FrameSource,
    selection: &Selection,
    index: usize,
    kernel: &dyn SurfaceAreaComputer,
    probe_radius: f64,
    n_dots: usize,
) -> Result<FrameAreas, KernelError> {
    let structure = source.structure();
    let frame = source
        .frame(index)
        .map_err(|e| KernelError::Failed(e.to_string()))?;

    let per_residue = |atoms: &[usize]| -> Result<Vec<f64>, KernelError> {
        let areas = kernel.atom_areas(structure, &frame, atoms, probe_radius, n_dots)?;
        if areas.len() != atoms.len() {
            return Err(KernelError::Failed(format!(
                "kernel returned {} areas for {} atoms",
                areas.len(),
                atoms.len()
            )));
        }
        let totals = residue_areas(structure, atoms, &areas);
        let values: Vec<f64> = selection
            .protein_residues
            .iter()
            .map(|r| totals.get(r).copied().unwrap_or(0.0))
            .collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(KernelError::Failed("kernel returned a non-finite area".into()));
        }
        Ok(values)
    };

    Ok(FrameAreas {
        shielded: per_residue(&selection.all_atoms)?,
        unshielded: per_residue(&selection.unshielded_atoms)?,
    })
}

#[derive(Serialize)]
struct DeltaRow<'a> {
    chain: char,
    segment: &'a str,
    residue_number: isize,
    residue_name: &'a str,
    delta_sasa_nm2: f64,
}

#[derive(Serialize)]
struct FrameRow<'a> {
    chain: char,
    segment: &'a str,
    residue_number: isize,
    residue_name: &'a str,
    shielded_nm2: f64,
    unshielded_nm2: f64,
}

fn write_rows<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), EngineError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| EngineError::io(path, e.into()))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| EngineError::io(path, e.into()))?;
    }
    writer.flush().map_err(|e| EngineError::io(path, e))
}

fn write_frame_table(
    path: &Path,
    structure: &Structure,
    selection: &Selection,
    areas: &FrameAreas,
) -> Result<(), EngineError> {
    let rows = selection
        .protein_residues
        .iter()
        .zip(areas.shielded.iter().zip(&areas.unshielded))
        .filter_map(|(&r, (&shielded, &unshielded))| {
            structure.residue(r).map(|residue| FrameRow {
                chain: residue.key.chain_id,
                segment: &residue.key.segment,
                residue_number: residue.key.number,
                residue_name: &residue.name,
                shielded_nm2: shielded,
                unshielded_nm2: unshielded,
            })
        });
    write_rows(path, rows)
}

fn run_series(
    plan: &SeriesPlan<'_>,
    config: &SasaConfig,
    kernel: &dyn SurfaceAreaComputer,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<SasaSeries, EngineError> {
    let source = plan.target.source;
    let label = plan.target.label.as_str();
    let structure = source.structure();
    let selection = Selection::of(structure);

    remove_intermediate(&plan.frames_dir);
    fs::create_dir_all(&plan.frames_dir).map_err(|e| EngineError::io(&plan.frames_dir, e))?;
    debug!(structure = label, probe = plan.probe_radius, frames = plan.frame_count, "Series started.");

    let frame_indices: Vec<usize> = (0..plan.frame_count).collect();
    let outcomes = map_tasks(&frame_indices, config.parallel, |_, &index| {
        if cancel.is_cancelled() {
            return FrameOutcome::Cancelled;
        }
        let result = compute_frame(
            source,
            &selection,
            index,
            kernel,
            plan.probe_radius,
            config.n_dots,
        );
        reporter.report(Progress::TaskIncrement);
        match result {
            Ok(areas) => {
                let table = plan.frames_dir.join(format!("frame_{index:05}.csv"));
                if let Err(e) = write_frame_table(&table, structure, &selection, &areas) {
                    warn!(error = %e, "Could not write intermediate frame table.");
                }
                FrameOutcome::Done(areas)
            }
            Err(kernel_error) => {
                let error = EngineError::Computation {
                    structure: label.to_string(),
                    probe_radius: plan.probe_radius,
                    frame: index,
                    source: kernel_error,
                };
                warn!(
                    structure = label,
                    probe = plan.probe_radius,
                    frame = index,
                    error = %error,
                    "Frame skipped."
                );
                reporter.report(Progress::Warning(error.to_string()));
                FrameOutcome::Failed
            }
        }
    });

    let mut aggregator = Aggregator::new(config.mode, selection.protein_residues.len());
    let mut frames_used = Vec::new();
    let mut frames_skipped = Vec::new();
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            FrameOutcome::Done(areas) => {
                aggregator.push(&areas.deltas());
                frames_used.push(index);
            }
            FrameOutcome::Failed => frames_skipped.push(index),
            FrameOutcome::Cancelled => return Err(EngineError::Cancelled),
        }
    }

    let status = match (frames_used.is_empty(), frames_skipped.is_empty()) {
        (true, _) => SeriesStatus::Invalid,
        (false, true) => SeriesStatus::Complete,
        (false, false) => SeriesStatus::Partial,
    };

    let mut series = SasaSeries {
        structure: label.to_string(),
        probe_radius: plan.probe_radius,
        mode: config.mode,
        residues: Vec::new(),
        frames_used,
        frames_skipped,
        status,
        outputs: SeriesOutputs::default(),
    };

    let Some(values) = aggregator.finish() else {
        warn!(structure = label, probe = plan.probe_radius, "Every frame failed; series is invalid.");
        return Ok(series);
    };

    series.residues = selection
        .protein_residues
        .iter()
        .zip(&values)
        .filter_map(|(&r, &delta)| {
            structure.residue(r).map(|residue| ResidueDelta {
                key: residue.key.clone(),
                name: residue.name.clone(),
                delta,
            })
        })
        .collect();

    write_rows(
        &plan.table,
        series.residues.iter().map(|r| DeltaRow {
            chain: r.key.chain_id,
            segment: &r.key.segment,
            residue_number: r.key.number,
            residue_name: &r.name,
            delta_sasa_nm2: r.delta,
        }),
    )?;
    series.outputs.table = Some(plan.table.clone());

    let first_used = series.frames_used[0];
    let frame = source
        .frame(first_used)
        .map_err(|e| EngineError::Data(format!("{label}: {e}")))?;
    write_shielding_structure(plan, structure, &selection, &frame, &values)?;
    series.outputs.structure = Some(plan.structure.clone());

    if config.plot_trace {
        let title = format!("{label}, probe {} nm ({})", plan.probe_radius, config.mode);
        match plot::plot_trace(&plan.plot, &title, &series.deltas()) {
            Ok(()) => series.outputs.plot = Some(plan.plot.clone()),
            Err(e) => warn!(error = %e, "Trace plot could not be drawn; continuing."),
        }
    }
    if config.keep_intermediate {
        series.outputs.frames_dir = Some(plan.frames_dir.clone());
    }

    info!(
        structure = label,
        probe = plan.probe_radius,
        frames = series.frames_used.len(),
        skipped = series.frames_skipped.len(),
        "Series finished."
    );
    Ok(series)
}

/// Writes the stripped system of the first usable frame with each residue's delta in
/// the B-factor column, plus the stripped snapshot among the intermediates.
fn write_shielding_structure(
    plan: &SeriesPlan<'_>,
    structure: &Structure,
    selection: &Selection,
    frame: &Frame,
    values: &[f64],
) -> Result<(), EngineError> {
    let delta_by_residue: HashMap<usize, f64> = selection
        .protein_residues
        .iter()
        .copied()
        .zip(values.iter().copied())
        .collect();
    let b_factors: Vec<f64> = selection
        .unshielded_atoms
        .iter()
        .map(|&atom| {
            structure
                .residue_index_of_atom(atom)
                .and_then(|r| delta_by_residue.get(&r))
                .copied()
                .unwrap_or(0.0)
        })
        .collect();

    let protein = structure.select(&selection.unshielded_atoms);
    let protein_frame = frame.select(&selection.unshielded_atoms);
    PdbFile::write_structure_to_path(&protein, &protein_frame, Some(&b_factors), &plan.structure)
        .map_err(|e| EngineError::format(&plan.structure, e))?;

    let snapshot = plan.frames_dir.join("protein.pdb");
    if let Err(e) = PdbFile::write_structure_to_path(&protein, &protein_frame, None, &snapshot) {
        warn!(path = ?snapshot, error = %e, "Could not write stripped protein snapshot.");
    }
    Ok(())
}
