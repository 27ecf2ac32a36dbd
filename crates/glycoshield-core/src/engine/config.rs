use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub const DEFAULT_PROBE_RADIUS_NM: f64 = 0.14;
pub const DEFAULT_DOTS_PER_ATOM: usize = 15;
pub const DEFAULT_PREVIEW_FRAMES: usize = 30;
pub const DEFAULT_CLASH_CUTOFF_ANGSTROM: f64 = 3.25;

/// How per-frame shielding deltas are reduced to one value per residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    #[default]
    Max,
    Avg,
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationMode::Max => write!(f, "max"),
            AggregationMode::Avg => write!(f, "avg"),
        }
    }
}

impl FromStr for AggregationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" => Ok(AggregationMode::Max),
            "avg" | "mean" => Ok(AggregationMode::Avg),
            other => Err(ConfigError::InvalidParameter {
                name: "mode",
                reason: format!("expected 'max' or 'avg', got '{other}'"),
            }),
        }
    }
}

/// Number of leading frames to analyse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameLimit {
    #[default]
    All,
    First(usize),
}

impl FrameLimit {
    /// Interprets the command-line convention: `-1` selects every frame, a
    /// positive value the number of leading frames.
    pub fn from_end_frame(value: i64) -> Result<Self, ConfigError> {
        match value {
            -1 => Ok(FrameLimit::All),
            n if n > 0 => Ok(FrameLimit::First(n as usize)),
            n => Err(ConfigError::InvalidParameter {
                name: "endframe",
                reason: format!("expected -1 or a positive frame count, got {n}"),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SasaConfig {
    /// Probe radii in nm, in report order.
    pub probe_radii: Vec<f64>,
    pub n_dots: usize,
    pub mode: AggregationMode,
    pub frame_limit: FrameLimit,
    pub keep_intermediate: bool,
    pub plot_trace: bool,
    pub parallel: bool,
    pub output_dir: PathBuf,
}

#[derive(Default)]
pub struct SasaConfigBuilder {
    probe_radii: Option<Vec<f64>>,
    n_dots: Option<usize>,
    mode: Option<AggregationMode>,
    frame_limit: Option<FrameLimit>,
    keep_intermediate: Option<bool>,
    plot_trace: Option<bool>,
    parallel: Option<bool>,
    output_dir: Option<PathBuf>,
}

impl SasaConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe_radii(mut self, radii: Vec<f64>) -> Self {
        self.probe_radii = Some(radii);
        self
    }
    pub fn n_dots(mut self, n: usize) -> Self {
        self.n_dots = Some(n);
        self
    }
    pub fn mode(mut self, mode: AggregationMode) -> Self {
        self.mode = Some(mode);
        self
    }
    pub fn frame_limit(mut self, limit: FrameLimit) -> Self {
        self.frame_limit = Some(limit);
        self
    }
    pub fn keep_intermediate(mut self, keep: bool) -> Self {
        self.keep_intermediate = Some(keep);
        self
    }
    pub fn plot_trace(mut self, plot: bool) -> Self {
        self.plot_trace = Some(plot);
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }
    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = Some(dir);
        self
    }

    pub fn build(self) -> Result<SasaConfig, ConfigError> {
        let probe_radii = self
            .probe_radii
            .ok_or(ConfigError::MissingParameter("probe_radii"))?;
        if probe_radii.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "probe_radii",
                reason: "at least one probe radius is required".into(),
            });
        }
        if let Some(bad) = probe_radii.iter().find(|r| !r.is_finite() || **r < 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "probe_radii",
                reason: format!("probe radius must be finite and non-negative, got {bad}"),
            });
        }
        let n_dots = self.n_dots.unwrap_or(DEFAULT_DOTS_PER_ATOM);
        if n_dots == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "n_dots",
                reason: "must be positive".into(),
            });
        }
        if self.frame_limit == Some(FrameLimit::First(0)) {
            return Err(ConfigError::InvalidParameter {
                name: "frame_limit",
                reason: "must select at least one frame".into(),
            });
        }

        Ok(SasaConfig {
            probe_radii,
            n_dots,
            mode: self.mode.unwrap_or_default(),
            frame_limit: self.frame_limit.unwrap_or_default(),
            keep_intermediate: self.keep_intermediate.unwrap_or(false),
            plot_trace: self.plot_trace.unwrap_or(false),
            parallel: self.parallel.unwrap_or(true),
            output_dir: self
                .output_dir
                .ok_or(ConfigError::MissingParameter("output_dir"))?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    pub output_structure: PathBuf,
    pub output_trajectory: PathBuf,
    /// Multi-model preview of the first `preview_frames` merged frames.
    pub preview: Option<PathBuf>,
    pub preview_frames: usize,
}

impl MergeConfig {
    /// The standard file layout inside an output directory.
    pub fn for_output_dir(dir: &Path) -> Self {
        Self {
            output_structure: dir.join("merged_traj.pdb"),
            output_trajectory: dir.join("merged_traj.xtc"),
            preview: Some(dir.join("test_merged_pdb.pdb")),
            preview_frames: DEFAULT_PREVIEW_FRAMES,
        }
    }
}

#[derive(Default)]
pub struct MergeConfigBuilder {
    output_structure: Option<PathBuf>,
    output_trajectory: Option<PathBuf>,
    preview: Option<PathBuf>,
    preview_frames: Option<usize>,
}

impl MergeConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_structure(mut self, path: PathBuf) -> Self {
        self.output_structure = Some(path);
        self
    }
    pub fn output_trajectory(mut self, path: PathBuf) -> Self {
        self.output_trajectory = Some(path);
        self
    }
    pub fn preview(mut self, path: Option<PathBuf>) -> Self {
        self.preview = path;
        self
    }
    pub fn preview_frames(mut self, n: usize) -> Self {
        self.preview_frames = Some(n);
        self
    }

    pub fn build(self) -> Result<MergeConfig, ConfigError> {
        let output_structure = self
            .output_structure
            .ok_or(ConfigError::MissingParameter("output_structure"))?;
        let output_trajectory = self
            .output_trajectory
            .ok_or(ConfigError::MissingParameter("output_trajectory"))?;
        if output_structure == output_trajectory {
            return Err(ConfigError::InvalidParameter {
                name: "output_trajectory",
                reason: "must differ from the output structure path".into(),
            });
        }
        Ok(MergeConfig {
            output_structure,
            output_trajectory,
            preview: self.preview,
            preview_frames: self.preview_frames.unwrap_or(DEFAULT_PREVIEW_FRAMES),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShieldConfig {
    /// Generate sites concurrently.
    pub parallel: bool,
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sasa_builder_applies_defaults() {
        let config = SasaConfigBuilder::new()
            .probe_radii(vec![0.14])
            .output_dir(PathBuf::from("out"))
            .build()
            .unwrap();
        assert_eq!(config.n_dots, DEFAULT_DOTS_PER_ATOM);
        assert_eq!(config.mode, AggregationMode::Max);
        assert_eq!(config.frame_limit, FrameLimit::All);
        assert!(!config.keep_intermediate);
        assert!(!config.plot_trace);
        assert!(config.parallel);
    }

    #[test]
    fn sasa_builder_requires_probes_and_output_dir() {
        assert_eq!(
            SasaConfigBuilder::new()
                .output_dir(PathBuf::from("out"))
                .build(),
            Err(ConfigError::MissingParameter("probe_radii"))
        );
        assert_eq!(
            SasaConfigBuilder::new().probe_radii(vec![0.14]).build(),
            Err(ConfigError::MissingParameter("output_dir"))
        );
    }

    #[test]
    fn sasa_builder_rejects_invalid_values() {
        let base = || {
            SasaConfigBuilder::new()
                .probe_radii(vec![0.14])
                .output_dir(PathBuf::from("out"))
        };
        assert!(matches!(
            base().probe_radii(vec![]).build(),
            Err(ConfigError::InvalidParameter { name: "probe_radii", .. })
        ));
        assert!(matches!(
            base().probe_radii(vec![f64::NAN]).build(),
            Err(ConfigError::InvalidParameter { name: "probe_radii", .. })
        ));
        assert!(matches!(
            base().n_dots(0).build(),
            Err(ConfigError::InvalidParameter { name: "n_dots", .. })
        ));
        assert!(matches!(
            base().frame_limit(FrameLimit::First(0)).build(),
            Err(ConfigError::InvalidParameter { name: "frame_limit", .. })
        ));
    }

    #[test]
    fn frame_limit_follows_end_frame_convention() {
        assert_eq!(FrameLimit::from_end_frame(-1), Ok(FrameLimit::All));
        assert_eq!(FrameLimit::from_end_frame(10), Ok(FrameLimit::First(10)));
        assert!(FrameLimit::from_end_frame(0).is_err());
        assert!(FrameLimit::from_end_frame(-5).is_err());
    }

    #[test]
    fn aggregation_mode_parses_and_displays() {
        assert_eq!("max".parse::<AggregationMode>(), Ok(AggregationMode::Max));
        assert_eq!("AVG".parse::<AggregationMode>(), Ok(AggregationMode::Avg));
        assert!("median".parse::<AggregationMode>().is_err());
        assert_eq!(AggregationMode::Avg.to_string(), "avg");
    }

    #[test]
    fn merge_builder_requires_distinct_outputs() {
        let result = MergeConfigBuilder::new()
            .output_structure(PathBuf::from("m.pdb"))
            .output_trajectory(PathBuf::from("m.pdb"))
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));

        let config = MergeConfigBuilder::new()
            .output_structure(PathBuf::from("m.pdb"))
            .output_trajectory(PathBuf::from("m.xtc"))
            .build()
            .unwrap();
        assert_eq!(config.preview_frames, DEFAULT_PREVIEW_FRAMES);
        assert!(config.preview.is_none());
    }

    #[test]
    fn merge_config_for_output_dir_uses_standard_names() {
        let config = MergeConfig::for_output_dir(Path::new("out"));
        assert_eq!(config.output_structure, Path::new("out").join("merged_traj.pdb"));
        assert_eq!(
            config.preview,
            Some(Path::new("out").join("test_merged_pdb.pdb"))
        );
    }
}
