use super::report_sites;
use crate::cli::ShieldArgs;
use crate::config::builder::ResolvedSettings;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use glycoshield::core::glycan;
use glycoshield::core::io::pdb::PdbFile;
use glycoshield::core::io::traits::MolecularFile;
use glycoshield::engine::cancel::CancellationToken;
use glycoshield::engine::progress::ProgressReporter;
use glycoshield::engine::tasks::shield;
use tracing::{info, warn};

pub fn run(args: ShieldArgs, settings: &ResolvedSettings) -> Result<()> {
    let generator = settings.generator(args.clash_cutoff)?;
    let config = settings.shield_config();

    info!("Reading attachment sites from {:?}", &args.input);
    let text = std::fs::read_to_string(&args.input)?;
    let specs = glycan::parse_attachments(&text)?;
    if specs.is_empty() {
        return Err(CliError::Argument(format!(
            "{} lists no attachment sites",
            args.input.display()
        )));
    }

    info!("Loading protein structure from {:?}", &args.protein);
    let protein = PdbFile::read_from_path(&args.protein).map_err(|e| CliError::FileParsing {
        path: args.protein.clone(),
        source: e.into(),
    })?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Generating glycan shields at {} site(s) (clash cutoff {:.2} A)...",
        specs.len(),
        generator.clash_cutoff()
    );
    let output = shield::run(
        &protein,
        &specs,
        &generator,
        &config,
        &reporter,
        &CancellationToken::new(),
    )?;

    if output.min_frame_count() == 0 {
        warn!("At least one site accepted no conformer; the sites cannot be merged.");
    }
    report_sites(&output);
    Ok(())
}
