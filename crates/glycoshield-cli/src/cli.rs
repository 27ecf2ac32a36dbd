use clap::{Args, Parser, Subcommand};
use glycoshield::engine::config::AggregationMode;
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "GlycoSHIELD developers",
    version,
    about = "GlycoSHIELD CLI - Glycan shield generation, trajectory merging and differential SASA analysis for glycoproteins.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel computation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S sasa.n-dots=30
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", global = true)]
    pub set_values: Vec<String>,

    /// Molecular dynamics engine binary that must be invocable before any stage runs.
    #[arg(long, global = true, value_name = "BINARY")]
    pub engine_binary: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute per-residue SASA shielding of glycoproteins over their trajectories.
    Sasa(SasaArgs),
    /// Generate glycan conformers at the sites listed in an input file.
    Shield(ShieldArgs),
    /// Merge per-site glycan trajectories into one trajectory.
    Traj(TrajArgs),
    /// Run shield generation, trajectory merge and SASA analysis in sequence.
    Pipeline(PipelineArgs),
    /// Print the input line attaching a library glycan at a protein residue.
    Line(LineArgs),
}

/// Options of the differential SASA stage shared by `sasa` and `pipeline`.
#[derive(Args, Debug, Clone, Default)]
pub struct SasaOptions {
    /// Probe radii in nm, comma separated (e.g., 0.14,0.7).
    #[arg(long = "probelist", value_delimiter = ',', value_name = "NM,...")]
    pub probe_radii: Option<Vec<f64>>,

    /// Number of surface dots per atom.
    #[arg(long = "ndots", value_name = "INT")]
    pub n_dots: Option<usize>,

    /// How per-frame deltas are reduced: 'max' or 'avg'.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<AggregationMode>,

    /// Number of leading frames to analyse; -1 analyses every frame.
    #[arg(long = "endframe", value_name = "INT", allow_negative_numbers = true)]
    pub end_frame: Option<i64>,

    /// Override `sasa.plot-trace` from the config file.
    #[command(flatten)]
    pub plot_trace: PlotTrace,

    /// Override `sasa.keep-intermediate` from the config file.
    #[command(flatten)]
    pub keep_output: KeepOutput,
}

/// Mutually exclusive flags for drawing the per-residue trace.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct PlotTrace {
    /// Draw an SVG trace of the shielding per residue.
    #[arg(long = "plottrace")]
    pub plottrace: bool,
    /// Do not draw the trace.
    #[arg(long = "no-plottrace")]
    pub no_plottrace: bool,
}

impl PlotTrace {
    pub fn value(self) -> Option<bool> {
        match (self.plottrace, self.no_plottrace) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Mutually exclusive flags for keeping the per-frame intermediate files.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct KeepOutput {
    /// Keep the per-frame tables and stripped snapshots.
    #[arg(long = "keepoutput")]
    pub keepoutput: bool,
    /// Delete the intermediate files after the run.
    #[arg(long = "no-keepoutput")]
    pub no_keepoutput: bool,
}

impl KeepOutput {
    pub fn value(self) -> Option<bool> {
        match (self.keepoutput, self.no_keepoutput) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

/// Arguments for the `sasa` subcommand.
#[derive(Args, Debug)]
pub struct SasaArgs {
    /// Structure files, comma separated; one per trajectory.
    #[arg(long = "pdblist", required = true, value_delimiter = ',', value_name = "PATH,...")]
    pub structures: Vec<PathBuf>,

    /// Trajectory files, comma separated, in the order of the structures.
    #[arg(long = "xtclist", required = true, value_delimiter = ',', value_name = "PATH,...")]
    pub trajectories: Vec<PathBuf>,

    /// Directory receiving the tables, structures and plots.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    #[command(flatten)]
    pub sasa: SasaOptions,
}

/// Arguments for the `shield` subcommand.
#[derive(Args, Debug)]
pub struct ShieldArgs {
    /// Protein structure the glycans are attached to.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub protein: PathBuf,

    /// Input file with one attachment line per site.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Minimum distance in Angstroms between glycan and protein heavy atoms.
    #[arg(long, value_name = "FLOAT")]
    pub clash_cutoff: Option<f64>,
}

/// Arguments for the `traj` subcommand.
#[derive(Args, Debug)]
pub struct TrajArgs {
    /// Per-site structure files, comma separated.
    #[arg(long = "pdblist", required = true, value_delimiter = ',', value_name = "PATH,...")]
    pub structures: Vec<PathBuf>,

    /// Per-site trajectory files, comma separated, in the order of the structures.
    #[arg(long = "xtclist", required = true, value_delimiter = ',', value_name = "PATH,...")]
    pub trajectories: Vec<PathBuf>,

    /// Number of frames to merge; every site must supply at least this many.
    #[arg(long = "maxframe", required = true, value_name = "INT")]
    pub max_frame: usize,

    /// Merged structure file.
    #[arg(short, long, default_value = "merged_traj.pdb", value_name = "PATH")]
    pub output: PathBuf,

    /// Merged trajectory file.
    #[arg(long, default_value = "merged_traj.xtc", value_name = "PATH")]
    pub output_traj: PathBuf,

    /// Multi-model preview of the first merged frames.
    #[arg(long, value_name = "PATH")]
    pub preview: Option<PathBuf>,

    /// Number of frames in the preview.
    #[arg(long, value_name = "INT")]
    pub preview_frames: Option<usize>,
}

/// Arguments for the `pipeline` subcommand.
#[derive(Args, Debug)]
pub struct PipelineArgs {
    /// Protein structure the glycans are attached to.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub protein: PathBuf,

    /// Input file with one attachment line per site.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Directory receiving every stage's output.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Minimum distance in Angstroms between glycan and protein heavy atoms.
    #[arg(long, value_name = "FLOAT")]
    pub clash_cutoff: Option<f64>,

    /// Package the output directory into this zip archive when done.
    #[arg(long, value_name = "PATH")]
    pub archive: Option<PathBuf>,

    #[command(flatten)]
    pub sasa: SasaOptions,
}

/// Arguments for the `line` subcommand.
#[derive(Args, Debug)]
pub struct LineArgs {
    /// Glycan library directory (one sub-directory per glycan).
    #[arg(short, long, required = true, value_name = "DIR")]
    pub library: PathBuf,

    /// Chain of the anchor residue.
    #[arg(long, required_unless_present = "list", value_name = "CHAR")]
    pub chain: Option<char>,

    /// Number of the anchor residue.
    #[arg(long, required_unless_present = "list", value_name = "INT", allow_negative_numbers = true)]
    pub resid: Option<isize>,

    /// Glycan name, as listed in the library.
    #[arg(long, required_unless_present = "list", value_name = "NAME")]
    pub glycan: Option<String>,

    /// Directory the per-site outputs will be written to.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    pub output_dir: PathBuf,

    /// List the glycans available in the library instead.
    #[arg(long)]
    pub list: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sasa_lists_are_comma_separated() {
        let cli = Cli::parse_from([
            "glycoshield",
            "sasa",
            "--pdblist",
            "a.pdb,b.pdb",
            "--xtclist",
            "a.xtc,b.xtc",
            "--probelist",
            "0.14,0.7",
            "--endframe",
            "-1",
            "--mode",
            "avg",
            "--plottrace",
        ]);
        let Commands::Sasa(args) = cli.command else {
            panic!("expected the sasa subcommand");
        };
        assert_eq!(args.structures.len(), 2);
        assert_eq!(args.trajectories[1], PathBuf::from("b.xtc"));
        assert_eq!(args.sasa.probe_radii, Some(vec![0.14, 0.7]));
        assert_eq!(args.sasa.end_frame, Some(-1));
        assert_eq!(args.sasa.mode, Some(AggregationMode::Avg));
        assert_eq!(args.sasa.plot_trace.value(), Some(true));
        assert_eq!(args.sasa.keep_output.value(), None);
    }

    #[test]
    fn exclusive_flags_conflict() {
        let result = Cli::try_parse_from([
            "glycoshield",
            "sasa",
            "--pdblist",
            "a.pdb",
            "--xtclist",
            "a.xtc",
            "--keepoutput",
            "--no-keepoutput",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from([
            "glycoshield",
            "traj",
            "--pdblist",
            "A_3.pdb",
            "--xtclist",
            "A_3.xtc",
            "--maxframe",
            "8",
            "-vv",
            "-S",
            "merge.preview-frames=5",
            "--engine-binary",
            "true",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.set_values, vec!["merge.preview-frames=5".to_string()]);
        assert_eq!(cli.engine_binary.as_deref(), Some("true"));
        let Commands::Traj(args) = cli.command else {
            panic!("expected the traj subcommand");
        };
        assert_eq!(args.max_frame, 8);
        assert_eq!(args.output, PathBuf::from("merged_traj.pdb"));
    }

    #[test]
    fn line_requires_site_unless_listing() {
        assert!(Cli::try_parse_from(["glycoshield", "line", "--library", "lib"]).is_err());
        assert!(Cli::try_parse_from(["glycoshield", "line", "--library", "lib", "--list"]).is_ok());
    }
}
