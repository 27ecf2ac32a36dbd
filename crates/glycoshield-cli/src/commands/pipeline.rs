use super::{report_series, report_sites};
use crate::cli::PipelineArgs;
use crate::config::builder::ResolvedSettings;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use glycoshield::core::sasa::shrake_rupley::ShrakeRupley;
use glycoshield::engine::progress::ProgressReporter;
use glycoshield::workflows::pipeline::Pipeline;
use glycoshield::workflows::session::Session;
use tracing::info;

pub fn run(args: PipelineArgs, settings: &ResolvedSettings) -> Result<()> {
    let config = settings.pipeline_config(args.clash_cutoff, &args.sasa, &args.output_dir)?;

    let mut session = Session::new(args.output_dir.clone());
    session.set_protein(args.protein.clone())?;

    info!("Reading attachment sites from {:?}", &args.input);
    let text = std::fs::read_to_string(&args.input)?;
    for line in text.lines() {
        session.inputs_mut().add(line);
    }
    let specs = session.inputs().attachments()?;
    if specs.is_empty() {
        return Err(CliError::Argument(format!(
            "{} lists no attachment sites",
            args.input.display()
        )));
    }

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let kernel = ShrakeRupley::new();
    let pipeline = Pipeline::new(&config.generator, &kernel, &reporter);

    println!("Stage 1/3: generating glycan shields at {} site(s)...", specs.len());
    let shield = pipeline.run_shield(&mut session, &specs, &config.shield)?;
    report_sites(&shield);

    println!("Stage 2/3: merging site trajectories...");
    let merged = pipeline.run_merge(&mut session, &config.merge)?;
    println!(
        "  {} frame(s) of {} site(s) -> {}",
        merged.frame_count,
        merged.site_count,
        merged.trajectory_path.display()
    );

    println!("Stage 3/3: computing differential SASA...");
    let report = pipeline.run_sasa(&mut session, &config.sasa)?;
    report_series(&report)?;

    if let Some(archive) = &args.archive {
        let path = session.package_output(archive)?;
        println!("Output packaged into: {}", path.display());
    }

    info!("Pipeline finished in state {:?}", session.status());
    println!("OK");
    Ok(())
}
