mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod utils;

use crate::cli::{Cli, Commands};
use crate::config::builder::ResolvedSettings;
use crate::error::{CliError, Result};
use clap::Parser;
use glycoshield::engine::tools;
use tracing::{debug, error, info};

fn main() {
    if let Err(e) = run_app() {
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn run_app() -> Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    info!(
        "🚀 GlycoSHIELD CLI v{} starting up.",
        env!("CARGO_PKG_VERSION")
    );
    debug!("Full CLI arguments parsed: {:?}", &cli);

    if let Some(num_threads) = cli.threads {
        info!(
            "Setting Rayon global thread pool to {} threads.",
            num_threads
        );
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .map_err(|e| {
                CliError::Other(anyhow::anyhow!("Failed to build global thread pool: {}", e))
            })?;
    }

    let settings = ResolvedSettings::load(&cli)?;

    if !matches!(cli.command, Commands::Line(_)) {
        let binary = settings.engine_binary(cli.engine_binary.as_deref());
        let version = tools::ensure_invocable(&binary)?;
        info!("Using MD engine '{}' ({}).", binary, version);
    }

    let command_result = match cli.command {
        Commands::Sasa(args) => {
            info!("Dispatching to 'sasa' command.");
            commands::sasa::run(args, &settings)
        }
        Commands::Shield(args) => {
            info!("Dispatching to 'shield' command.");
            commands::shield::run(args, &settings)
        }
        Commands::Traj(args) => {
            info!("Dispatching to 'traj' command.");
            commands::traj::run(args, &settings)
        }
        Commands::Pipeline(args) => {
            info!("Dispatching to 'pipeline' command.");
            commands::pipeline::run(args, &settings)
        }
        Commands::Line(args) => {
            debug!("Dispatching to 'line' command.");
            commands::line::run(args)
        }
    };

    match &command_result {
        Ok(()) => info!("✅ Command completed successfully."),
        Err(e) => error!("❌ Command failed: {}", e),
    }
    command_result
}
