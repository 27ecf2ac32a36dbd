use crate::core::glycan::{AttachmentSpec, Occupancy, min_frame_count};
use crate::core::io::pdb::PdbFile;
use crate::core::io::traits::MolecularFile;
use crate::core::models::frame::Frame;
use crate::core::trajectory::{FrameSource, Trajectory};
use crate::engine::cancel::CancellationToken;
use crate::engine::config::ShieldConfig;
use crate::engine::error::EngineError;
use crate::engine::generator::{ConformerGenerator, anchor_window};
use crate::engine::pool::map_tasks;
use crate::engine::progress::{Progress, ProgressReporter};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Files and occupancy produced for one attachment site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteOutput {
    pub chain_id: char,
    pub anchor: isize,
    pub structure_path: PathBuf,
    pub trajectory_path: PathBuf,
    pub occupancy: Occupancy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShieldOutput {
    /// Sites in input order.
    pub sites: Vec<SiteOutput>,
}

impl ShieldOutput {
    pub fn structure_paths(&self) -> Vec<PathBuf> {
        self.sites.iter().map(|s| s.structure_path.clone()).collect()
    }

    pub fn trajectory_paths(&self) -> Vec<PathBuf> {
        self.sites.iter().map(|s| s.trajectory_path.clone()).collect()
    }

    pub fn chains(&self) -> Vec<char> {
        self.sites.iter().map(|s| s.chain_id).collect()
    }

    pub fn anchors(&self) -> Vec<isize> {
        self.sites.iter().map(|s| s.anchor).collect()
    }

    pub fn occupancies(&self) -> Vec<Occupancy> {
        self.sites.iter().map(|s| s.occupancy).collect()
    }

    /// Frames available at every site.
    pub fn min_frame_count(&self) -> usize {
        min_frame_count(&self.occupancies())
    }
}

#[instrument(skip_all, name = "shield_task")]
pub fn run(
    protein: &Trajectory,
    specs: &[AttachmentSpec],
    generator: &dyn ConformerGenerator,
    config: &ShieldConfig,
    reporter: &ProgressReporter,
    cancel: &CancellationToken,
) -> Result<ShieldOutput, EngineError> {
    validate(protein, specs)?;
    let protein_frame = protein
        .frame(0)
        .map_err(|e| EngineError::Input(format!("Protein structure has no usable coordinates: {e}")))?;

    info!(sites = specs.len(), "Starting shield generation.");
    reporter.report(Progress::PhaseStart {
        name: "Shield Generation",
    });
    reporter.report(Progress::TaskStart {
        total_steps: specs.len() as u64,
    });

    let results: Vec<Result<SiteOutput, EngineError>> =
        map_tasks(specs, config.parallel, |_, spec| {
            cancel.check()?;
            let site = generate_site(protein, &protein_frame, spec, generator)?;
            reporter.report(Progress::TaskIncrement);
            Ok(site)
        });

    reporter.report(Progress::TaskFinish);
    let sites = results.into_iter().collect::<Result<Vec<_>, _>>()?;
    let output = ShieldOutput { sites };

    info!(
        min_frame_count = output.min_frame_count(),
        "Shield generation finished."
    );
    reporter.report(Progress::PhaseFinish);
    Ok(output)
}

/// Checks the site list against the protein without touching the filesystem
/// beyond existence checks of the library files.
pub fn validate(protein: &Trajectory, specs: &[AttachmentSpec]) -> Result<(), EngineError> {
    if specs.is_empty() {
        return Err(EngineError::Input("No attachment sites were given".into()));
    }
    if let Some(atom) = protein.structure().atoms().iter().find(|a| a.is_glycan()) {
        return Err(EngineError::Input(format!(
            "Protein already carries an attached glycan ({} {} in segment {:?})",
            atom.residue_name, atom.residue_number, atom.segment
        )));
    }

    let mut sites = HashSet::new();
    let mut outputs: HashMap<&Path, String> = HashMap::new();
    for spec in specs {
        anchor_window(protein.structure(), spec)?;
        for library_file in [&spec.glycan_structure, &spec.glycan_trajectory] {
            if !library_file.is_file() {
                return Err(EngineError::Input(format!(
                    "Glycan library file {library_file:?} of site {}:{} not found",
                    spec.chain_id,
                    spec.anchor()
                )));
            }
        }
        if !sites.insert((spec.chain_id, spec.anchor())) {
            return Err(EngineError::Input(format!(
                "Site {}:{} is listed more than once",
                spec.chain_id,
                spec.anchor()
            )));
        }

        let label = format!("site {}:{}", spec.chain_id, spec.anchor());
        for path in [&spec.output_structure, &spec.output_trajectory] {
            if let Some(first) = outputs.insert(path.as_path(), label.clone()) {
                return Err(EngineError::PathCollision {
                    path: path.clone(),
                    first,
                    second: label,
                });
            }
        }
    }
    Ok(())
}

fn generate_site(
    protein: &Trajectory,
    protein_frame: &Frame,
    spec: &AttachmentSpec,
    generator: &dyn ConformerGenerator,
) -> Result<SiteOutput, EngineError> {
    let (library_structure, _) = PdbFile::read_from_path(&spec.glycan_structure)
        .map_err(|e| EngineError::format(&spec.glycan_structure, e))?
        .into_parts();
    let library_frames = PdbFile::read_frames_from_path(&spec.glycan_trajectory)
        .map_err(|e| EngineError::format(&spec.glycan_trajectory, e))?;
    let library = Trajectory::new(library_structure, library_frames);

    let site = generator.generate(protein.structure(), protein_frame, spec, &library)?;

    for path in [&spec.output_structure, &spec.output_trajectory] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
        }
    }
    PdbFile::write_structure_to_path(&site.structure, &site.reference, None, &spec.output_structure)
        .map_err(|e| EngineError::format(&spec.output_structure, e))?;
    PdbFile::write_frames_to_path(&site.structure, &site.accepted, &spec.output_trajectory)
        .map_err(|e| EngineError::format(&spec.output_trajectory, e))?;

    info!(
        chain = %spec.chain_id,
        anchor = spec.anchor(),
        accepted = site.occupancy.accepted,
        attempted = site.occupancy.attempted,
        "Site generated."
    );
    Ok(SiteOutput {
        chain_id: spec.chain_id,
        anchor: spec.anchor(),
        structure_path: spec.output_structure.clone(),
        trajectory_path: spec.output_trajectory.clone(),
        occupancy: site.occupancy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{self, FixedGenerator};
    use crate::engine::generator::GraftingGenerator;

    fn run_default(
        specs: &[AttachmentSpec],
        generator: &dyn ConformerGenerator,
    ) -> Result<ShieldOutput, EngineError> {
        run(
            &fixtures::protein(),
            specs,
            generator,
            &ShieldConfig::default(),
            &ProgressReporter::new(),
            &CancellationToken::new(),
        )
    }

    #[test]
    fn writes_per_site_outputs_and_reports_occupancy() {
        let dir = tempfile::tempdir().unwrap();
        let library = fixtures::write_library(&dir.path().join("lib"), 3, 2);
        let out = dir.path().join("out");
        let specs = vec![fixtures::spec('A', 3, &library, &out)];

        let output = run_default(&specs, &GraftingGenerator::default()).unwrap();

        assert_eq!(output.sites.len(), 1);
        assert_eq!(
            output.sites[0].occupancy,
            Occupancy {
                accepted: 3,
                attempted: 5
            }
        );
        assert_eq!(output.min_frame_count(), 3);
        assert_eq!(output.chains(), vec!['A']);
        assert_eq!(output.anchors(), vec![3]);

        let trajectory =
            PdbFile::read_pair(&output.sites[0].structure_path, &output.sites[0].trajectory_path)
                .unwrap();
        assert_eq!(trajectory.frame_count(), 3);
        assert!(trajectory.structure().has_glycans());
    }

    #[test]
    fn rerun_produces_identical_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let library = fixtures::write_library(&dir.path().join("lib"), 2, 1);
        let out = dir.path().join("out");
        let specs = vec![
            fixtures::spec('A', 2, &library, &out),
            fixtures::spec('A', 4, &library, &out),
        ];
        let generator = GraftingGenerator::default();

        let first = run_default(&specs, &generator).unwrap();
        let first_bytes = fs::read(&first.sites[1].trajectory_path).unwrap();
        let second = run_default(&specs, &generator).unwrap();
        let second_bytes = fs::read(&second.sites[1].trajectory_path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn missing_library_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let library = (dir.path().join("nope.pdb"), dir.path().join("nope.xtc"));
        let specs = vec![fixtures::spec('A', 3, &library, dir.path())];

        let result = run_default(&specs, &FixedGenerator::new(&[(3, 4)]));
        assert!(matches!(result, Err(EngineError::Input(_))));
    }

    #[test]
    fn out_of_bounds_window_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let library = fixtures::write_library(&dir.path().join("lib"), 1, 0);
        let specs = vec![fixtures::spec('B', 3, &library, dir.path())];

        let result = run_default(&specs, &FixedGenerator::new(&[(3, 4)]));
        assert!(matches!(result, Err(EngineError::Input(_))));
    }

    #[test]
    fn already_glycosylated_protein_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let library = fixtures::write_library(&dir.path().join("lib"), 1, 0);
        let specs = vec![fixtures::spec('A', 3, &library, dir.path())];
        let site = fixtures::site_trajectory(2, 1);

        let result = validate(&site, &specs);
        assert!(matches!(result, Err(EngineError::Input(_))));
    }

    #[test]
    fn waters_in_the_protein_pass_validation() {
        let dir = tempfile::tempdir().unwrap();
        let library = fixtures::write_library(&dir.path().join("lib"), 1, 0);
        let specs = vec![fixtures::spec('A', 3, &library, dir.path())];

        assert!(validate(&fixtures::protein_with_water(), &specs).is_ok());
    }

    #[test]
    fn shared_output_paths_are_rejected_before_generation() {
        let dir = tempfile::tempdir().unwrap();
        let library = fixtures::write_library(&dir.path().join("lib"), 1, 0);
        let mut second = fixtures::spec('A', 4, &library, dir.path());
        let first = fixtures::spec('A', 3, &library, dir.path());
        second.output_trajectory = first.output_trajectory.clone();

        let result = run_default(&[first, second], &FixedGenerator::new(&[(3, 1), (4, 1)]));
        assert!(matches!(result, Err(EngineError::PathCollision { .. })));
        assert!(!dir.path().join("A_3.pdb").exists());
    }

    #[test]
    fn cancelled_run_generates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let library = fixtures::write_library(&dir.path().join("lib"), 1, 0);
        let specs = vec![fixtures::spec('A', 3, &library, dir.path())];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = run(
            &fixtures::protein(),
            &specs,
            &FixedGenerator::new(&[(3, 2)]),
            &ShieldConfig::default(),
            &ProgressReporter::new(),
            &cancel,
        );
        assert!(matches!(result, Err(EngineError::Cancelled)));
        assert!(!dir.path().join("A_3.pdb").exists());
    }
}
