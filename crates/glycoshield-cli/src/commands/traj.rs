use crate::cli::TrajArgs;
use crate::config::builder::ResolvedSettings;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use glycoshield::engine::cancel::CancellationToken;
use glycoshield::engine::progress::ProgressReporter;
use glycoshield::engine::tasks::merge;

pub fn run(args: TrajArgs, settings: &ResolvedSettings) -> Result<()> {
    if args.structures.len() != args.trajectories.len() {
        return Err(CliError::Argument(format!(
            "--pdblist names {} structure(s) but --xtclist names {} trajectory file(s)",
            args.structures.len(),
            args.trajectories.len()
        )));
    }
    if args.max_frame == 0 {
        return Err(CliError::Argument("--maxframe must be positive".into()));
    }
    let config = settings.traj_merge_config(&args)?;
    let site_files: Vec<_> = args
        .structures
        .iter()
        .cloned()
        .zip(args.trajectories.iter().cloned())
        .collect();

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Merging {} site trajectory/trajectories over {} frame(s)...",
        site_files.len(),
        args.max_frame
    );
    let output = merge::run(
        &site_files,
        args.max_frame,
        &config,
        &reporter,
        &CancellationToken::new(),
    )?;

    println!(
        "Merged structure written to: {}",
        output.structure_path.display()
    );
    println!(
        "Merged trajectory ({} frames) written to: {}",
        output.frame_count,
        output.trajectory_path.display()
    );
    if let Some(preview) = &output.preview_path {
        println!("Preview written to: {}", preview.display());
    }
    Ok(())
}
