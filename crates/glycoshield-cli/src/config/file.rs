use crate::error::{CliError, Result};
use glycoshield::engine::config::AggregationMode;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileEngineConfig {
    pub binary: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileShieldConfig {
    pub clash_cutoff: Option<f64>,
    pub parallel: Option<bool>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileMergeConfig {
    pub preview: Option<bool>,
    pub preview_frames: Option<usize>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileSasaConfig {
    pub probe_radii: Option<Vec<f64>>,
    pub n_dots: Option<usize>,
    pub mode: Option<AggregationMode>,
    pub end_frame: Option<i64>,
    pub plot_trace: Option<bool>,
    pub keep_intermediate: Option<bool>,
    pub parallel: Option<bool>,
}

/// Settings read from a TOML file; every field is optional.
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileConfig {
    pub engine: Option<FileEngineConfig>,
    pub shield: Option<FileShieldConfig>,
    pub merge: Option<FileMergeConfig>,
    pub sasa: Option<FileSasaConfig>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kebab_case_sections() {
        let config = FileConfig::from_toml(
            r#"
            [engine]
            binary = "gmx_mpi"

            [sasa]
            probe-radii = [0.14, 0.7]
            n-dots = 30
            mode = "avg"
            end-frame = -1

            [merge]
            preview-frames = 10
            "#,
        )
        .unwrap();

        let sasa = config.sasa.unwrap();
        assert_eq!(sasa.probe_radii, Some(vec![0.14, 0.7]));
        assert_eq!(sasa.mode, Some(AggregationMode::Avg));
        assert_eq!(sasa.end_frame, Some(-1));
        assert_eq!(config.engine.unwrap().binary.as_deref(), Some("gmx_mpi"));
        assert_eq!(config.merge.unwrap().preview_frames, Some(10));
        assert!(config.shield.is_none());
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(FileConfig::from_toml("[sasa]\nprobe = 0.14\n").is_err());
        assert!(FileConfig::from_toml("[optimization]\n").is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileConfig::from_file(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
