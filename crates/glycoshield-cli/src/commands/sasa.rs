use super::report_series;
use crate::cli::SasaArgs;
use crate::config::builder::ResolvedSettings;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use glycoshield::core::io::pdb::PdbFile;
use glycoshield::core::io::traits::MolecularFile;
use glycoshield::core::sasa::shrake_rupley::ShrakeRupley;
use glycoshield::engine::cancel::CancellationToken;
use glycoshield::engine::progress::ProgressReporter;
use glycoshield::engine::tasks::sasa::{self, SasaTarget};
use tracing::info;

pub fn run(args: SasaArgs, settings: &ResolvedSettings) -> Result<()> {
    if args.structures.len() != args.trajectories.len() {
        return Err(CliError::Argument(format!(
            "--pdblist names {} structure(s) but --xtclist names {} trajectory file(s)",
            args.structures.len(),
            args.trajectories.len()
        )));
    }
    let config = settings.sasa_config(&args.sasa, &args.output_dir)?;

    let mut trajectories = Vec::with_capacity(args.structures.len());
    for (structure, trajectory) in args.structures.iter().zip(&args.trajectories) {
        info!("Loading {:?} with frames from {:?}", structure, trajectory);
        let loaded =
            PdbFile::read_pair(structure, trajectory).map_err(|e| CliError::FileParsing {
                path: trajectory.clone(),
                source: e.into(),
            })?;
        trajectories.push(loaded);
    }
    let targets: Vec<SasaTarget<'_>> = args
        .structures
        .iter()
        .zip(&trajectories)
        .map(|(path, trajectory)| SasaTarget::new(SasaTarget::label_from_path(path), trajectory))
        .collect();

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let kernel = ShrakeRupley::new();

    println!(
        "Computing shielding for {} structure(s) and {} probe radius/radii...",
        targets.len(),
        config.probe_radii.len()
    );
    let report = sasa::run(
        &targets,
        &config,
        &kernel,
        &reporter,
        &CancellationToken::new(),
    )?;

    report_series(&report)?;
    println!("OK");
    Ok(())
}
