use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::trajectory::{FrameSource, Trajectory};
use crate::engine::cancel::CancellationToken;
use crate::engine::config::MergeConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeOutput {
    pub structure_path: PathBuf,
    pub trajectory_path: PathBuf,
    /// Present only when a preview was requested and written successfully.
    pub preview_path: Option<PathBuf>,
    pub frame_count: usize,
    pub site_count: usize,
}

/// Loads the per-site structure/trajectory pairs, merges them and writes the
/// merged structure, trajectory and optional preview.
#[instrument(skip_all, name = "merge_task")]
pub fn run(
    site_files: &[(PathBuf, PathBuf)],
    max_frame: usize,
    config: &MergeConfig,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<MergeOutput, EngineError> {
    info!(sites = site_files.len(), max_frame, "Starting trajectory merge.");
    reporter.report(Progress::PhaseStart {
        name: "Trajectory Merge",
    });

    let mut sites = Vec::with_capacity(site_files.len());
    for (structure_path, trajectory_path) in site_files {
        cancel.check()?;
        let (structure, _) = PdbFile::read_from_path(structure_path)
            .map_err(|e| EngineError::format(structure_path, e))?
            .into_parts();
        let frames = PdbFile::read_frames_from_path(trajectory_path)
            .map_err(|e| EngineError::format(trajectory_path, e))?;
        sites.push(Trajectory::new(structure, frames));
    }

    cancel.check()?;
    let merged = merge_trajectories(&sites, max_frame)?;

    for path in [&config.output_structure, &config.output_trajectory] {
        ensure_parent(path)?;
    }
    PdbFile::write_structure_to_path(
        merged.structure(),
        &merged.frames()[0],
        None,
        &config.output_structure,
    )
    .map_err(|e| EngineError::format(&config.output_structure, e))?;
    PdbFile::write_frames_to_path(merged.structure(), merged.frames(), &config.output_trajectory)
        .map_err(|e| EngineError::format(&config.output_trajectory, e))?;

    let preview_path = config
        .preview
        .as_ref()
        .and_then(|path| match write_preview(&merged, path, config.preview_frames) {
            Ok(()) => Some(path.clone()),
            Err(e) => {
                warn!(path = ?path, error = %e, "Preview could not be written; continuing.");
                None
            }
        });

    info!(frames = merged.frame_count(), "Trajectory merge finished.");
    reporter.report(Progress::PhaseFinish);
    Ok(MergeOutput {
        structure_path: config.output_structure.clone(),
        trajectory_path: config.output_trajectory.clone(),
        preview_path,
        frame_count: merged.frame_count(),
        site_count: sites.len(),
    })
}

/// Combines per-site trajectories into one trajectory of exactly `max_frame`
/// frames. Frame `i` holds the host system of the first site (protein plus any
/// waters, ions or ligands it came with) followed by the glycan atoms of every
/// site at frame `i`, in site order.
pub fn merge_trajectories(sites: &[Trajectory], max_frame: usize) -> Result<Trajectory, EngineError> {
    let Some(first) = sites.first() else {
        return Err(EngineError::Input("No site trajectories to merge".into()));
    };
    if max_frame == 0 {
        return Err(EngineError::Data(
            "Frame bound is zero: at least one site has no accepted conformer".into(),
        ));
    }

    let host_indices = first.structure().host_atom_indices();
    let glycan_indices: Vec<Vec<usize>> = sites
        .iter()
        .map(|site| site.structure().glycan_atom_indices())
        .collect();

    for (index, site) in sites.iter().enumerate() {
        if site.frame_count() < max_frame {
            return Err(EngineError::Data(format!(
                "Site {index} has {} frames but {max_frame} are required",
                site.frame_count()
            )));
        }
        let host_atoms = site.structure().host_atom_indices().len();
        if host_atoms != host_indices.len() {
            return Err(EngineError::Data(format!(
                "Site {index} has {host_atoms} non-glycan atoms but site 0 has {}",
                host_indices.len()
            )));
        }
    }

    let mut structure = first.structure().select(&host_indices);
    let mut keys: HashSet<_> = structure.residues().iter().map(|r| r.key.clone()).collect();
    for (index, (site, indices)) in sites.iter().zip(&glycan_indices).enumerate() {
        let glycan = site.structure().select(indices);
        for residue in glycan.residues() {
            if !keys.insert(residue.key.clone()) {
                return Err(EngineError::Conflict {
                    key: residue.key.clone(),
                    site: index,
                });
            }
        }
        structure = structure.concat(&glycan);
    }
    structure.renumber_serials();

    let mut frames = Vec::with_capacity(max_frame);
    for frame_index in 0..max_frame {
        let mut frame = first
            .frame(frame_index)
            .map_err(|e| EngineError::Data(format!("Site 0: {e}")))?
            .select(&host_indices);
        for (site_index, (site, indices)) in sites.iter().zip(&glycan_indices).enumerate() {
            let site_frame = site
                .frame(frame_index)
                .map_err(|e| EngineError::Data(format!("Site {site_index}: {e}")))?;
            frame = frame.concat(&site_frame.select(indices));
        }
        frames.push(frame);
    }

    Ok(Trajectory::new(structure, frames))
}

fn ensure_parent(path: &Path) -> Result<(), EngineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    Ok(())
}

fn write_preview(merged: &Trajectory, path: &Path, frames: usize) -> Result<(), EngineError> {
    ensure_parent(path)?;
    let count = frames.min(merged.frame_count());
    PdbFile::write_frames_to_path(merged.structure(), &merged.frames()[..count], path)
        .map_err(|e| EngineError::format(path, e))
}
