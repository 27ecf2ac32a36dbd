use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::PipelineConfig;
use crate::cli::{Cli, SasaOptions, TrajArgs};
use crate::error::{CliError, Result};
use crate::utils::parser;
use glycoshield::engine::config::{
    ConfigError, FrameLimit, MergeConfig, MergeConfigBuilder, SasaConfig, SasaConfigBuilder,
    ShieldConfig,
};
use glycoshield::engine::generator::GraftingGenerator;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings shared by every subcommand: the config file merged with `--set` overrides.
pub struct ResolvedSettings {
    file: FileConfig,
    defaults: DefaultsConfig,
}

impl ResolvedSettings {
    pub fn load(cli: &Cli) -> Result<Self> {
        let file_config = match &cli.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        let file = apply_set_values(file_config, &cli.set_values)?;
        debug!("Resolved file configuration: {:?}", file);
        Ok(Self {
            file,
            defaults: DefaultsConfig::default(),
        })
    }

    #[cfg(test)]
    fn from_file_config(file: FileConfig) -> Self {
        Self {
            file,
            defaults: DefaultsConfig::default(),
        }
    }

    pub fn engine_binary(&self, flag: Option<&str>) -> String {
        flag.map(str::to_string)
            .or_else(|| self.file.engine.as_ref().and_then(|e| e.binary.clone()))
            .unwrap_or_else(|| self.defaults.engine_binary.clone())
    }

    pub fn shield_config(&self) -> ShieldConfig {
        let parallel = self
            .file
            .shield
            .as_ref()
            .and_then(|s| s.parallel)
            .unwrap_or(self.defaults.parallel);
        ShieldConfig { parallel }
    }

    pub fn generator(&self, clash_cutoff: Option<f64>) -> Result<GraftingGenerator> {
        let cutoff = clash_cutoff
            .or_else(|| self.file.shield.as_ref().and_then(|s| s.clash_cutoff))
            .unwrap_or(self.defaults.clash_cutoff);
        GraftingGenerator::new(cutoff).map_err(config_error)
    }

    pub fn sasa_config(&self, options: &SasaOptions, output_dir: &Path) -> Result<SasaConfig> {
        let file = self.file.sasa.clone().unwrap_or_default();
        let defaults = &self.defaults;

        let end_frame = options
            .end_frame
            .or(file.end_frame)
            .unwrap_or(defaults.end_frame);
        let frame_limit = FrameLimit::from_end_frame(end_frame).map_err(config_error)?;

        SasaConfigBuilder::new()
            .probe_radii(
                options
                    .probe_radii
                    .clone()
                    .or(file.probe_radii)
                    .unwrap_or_else(|| defaults.probe_radii.clone()),
            )
            .n_dots(options.n_dots.or(file.n_dots).unwrap_or(defaults.n_dots))
            .mode(options.mode.or(file.mode).unwrap_or(defaults.mode))
            .frame_limit(frame_limit)
            .plot_trace(
                options
                    .plot_trace
                    .value()
                    .or(file.plot_trace)
                    .unwrap_or(defaults.plot_trace),
            )
            .keep_intermediate(
                options
                    .keep_output
                    .value()
                    .or(file.keep_intermediate)
                    .unwrap_or(defaults.keep_intermediate),
            )
            .parallel(file.parallel.unwrap_or(defaults.parallel))
            .output_dir(output_dir.to_path_buf())
            .build()
            .map_err(config_error)
    }

    pub fn traj_merge_config(&self, args: &TrajArgs) -> Result<MergeConfig> {
        MergeConfigBuilder::new()
            .output_structure(args.output.clone())
            .output_trajectory(args.output_traj.clone())
            .preview(args.preview.clone())
            .preview_frames(args.preview_frames.unwrap_or_else(|| self.preview_frames()))
            .build()
            .map_err(config_error)
    }

    /// The standard layout of `output_dir`, with the preview toggled by the config.
    pub fn pipeline_merge_config(&self, output_dir: &Path) -> MergeConfig {
        let mut config = MergeConfig::for_output_dir(output_dir);
        config.preview_frames = self.preview_frames();
        let preview = self
            .file
            .merge
            .as_ref()
            .and_then(|m| m.preview)
            .unwrap_or(self.defaults.preview);
        if !preview {
            config.preview = None;
        }
        config
    }

    pub fn pipeline_config(
        &self,
        clash_cutoff: Option<f64>,
        options: &SasaOptions,
        output_dir: &Path,
    ) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            generator: self.generator(clash_cutoff)?,
            shield: self.shield_config(),
            merge: self.pipeline_merge_config(output_dir),
            sasa: self.sasa_config(options, &sasa_dir(output_dir))?,
        })
    }

    fn preview_frames(&self) -> usize {
        self.file
            .merge
            .as_ref()
            .and_then(|m| m.preview_frames)
            .unwrap_or(self.defaults.preview_frames)
    }
}

/// SASA outputs of a pipeline run live next to the merged trajectory.
pub fn sasa_dir(output_dir: &Path) -> PathBuf {
    output_dir.join("sasa")
}

fn config_error(e: ConfigError) -> CliError {
    CliError::Config(e.to_string())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    parser::parse_bool(value)
        .map_err(|e| CliError::Config(format!("Invalid boolean value for {}: {}", key, e)))
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) =
            parser::parse_key_value(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;

        match key {
            "engine.binary" => {
                config.engine.get_or_insert_with(Default::default).binary =
                    Some(value.trim().to_string());
            }
            "shield.clash-cutoff" => {
                config.shield.get_or_insert_with(Default::default).clash_cutoff =
                    Some(parse_value(key, value, "float")?);
            }
            "shield.parallel" => {
                config.shield.get_or_insert_with(Default::default).parallel =
                    Some(parse_flag(key, value)?);
            }
            "merge.preview" => {
                config.merge.get_or_insert_with(Default::default).preview =
                    Some(parse_flag(key, value)?);
            }
            "merge.preview-frames" => {
                config.merge.get_or_insert_with(Default::default).preview_frames =
                    Some(parse_value(key, value, "integer")?);
            }
            "sasa.probe-radii" => {
                config.sasa.get_or_insert_with(Default::default).probe_radii = Some(
                    parser::parse_float_list(value)
                        .map_err(|e| CliError::Config(format!("Invalid list for {}: {}", key, e)))?,
                );
            }
            "sasa.n-dots" => {
                config.sasa.get_or_insert_with(Default::default).n_dots =
                    Some(parse_value(key, value, "integer")?);
            }
            "sasa.mode" => {
                config.sasa.get_or_insert_with(Default::default).mode =
                    Some(parse_value(key, value, "mode")?);
            }
            "sasa.end-frame" => {
                config.sasa.get_or_insert_with(Default::default).end_frame =
                    Some(parse_value(key, value, "integer")?);
            }
            "sasa.plot-trace" => {
                config.sasa.get_or_insert_with(Default::default).plot_trace =
                    Some(parse_flag(key, value)?);
            }
            "sasa.keep-intermediate" => {
                config.sasa.get_or_insert_with(Default::default).keep_intermediate =
                    Some(parse_flag(key, value)?);
            }
            "sasa.parallel" => {
                config.sasa.get_or_insert_with(Default::default).parallel =
                    Some(parse_flag(key, value)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unknown configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{KeepOutput, PlotTrace};
    use glycoshield::engine::config::AggregationMode;

    fn sets(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let settings = ResolvedSettings::from_file_config(FileConfig::default());
        let config = settings
            .sasa_config(&SasaOptions::default(), Path::new("out"))
            .unwrap();
        assert_eq!(config.probe_radii, vec![0.14]);
        assert_eq!(config.n_dots, 15);
        assert_eq!(config.mode, AggregationMode::Max);
        assert_eq!(config.frame_limit, FrameLimit::All);
        assert!(!config.plot_trace);
        assert!(!config.keep_intermediate);
        assert_eq!(settings.engine_binary(None), "gmx");
    }

    #[test]
    fn set_values_override_the_file_and_flags_override_both() {
        let file = FileConfig::from_toml("[sasa]\nn-dots = 30\nmode = \"avg\"\nend-frame = 4\n")
            .unwrap();
        let file = apply_set_values(file, &sets(&["sasa.n-dots=50", "sasa.plot-trace=yes"]))
            .unwrap();
        let settings = ResolvedSettings::from_file_config(file);

        let options = SasaOptions {
            mode: Some(AggregationMode::Max),
            plot_trace: PlotTrace {
                plottrace: false,
                no_plottrace: true,
            },
            keep_output: KeepOutput {
                keepoutput: true,
                no_keepoutput: false,
            },
            ..Default::default()
        };
        let config = settings.sasa_config(&options, Path::new("out")).unwrap();
        assert_eq!(config.n_dots, 50);
        assert_eq!(config.mode, AggregationMode::Max);
        assert_eq!(config.frame_limit, FrameLimit::First(4));
        assert!(!config.plot_trace);
        assert!(config.keep_intermediate);
    }

    #[test]
    fn unknown_or_malformed_set_values_are_rejected() {
        let unknown = apply_set_values(FileConfig::default(), &sets(&["sasa.probe=0.1"]));
        assert!(matches!(unknown, Err(CliError::Config(_))));

        let malformed = apply_set_values(FileConfig::default(), &sets(&["sasa.n-dots"]));
        assert!(matches!(malformed, Err(CliError::Config(_))));

        let bad_number = apply_set_values(FileConfig::default(), &sets(&["sasa.n-dots=many"]));
        assert!(matches!(bad_number, Err(CliError::Config(_))));
    }

    #[test]
    fn probe_list_and_end_frame_from_set_values() {
        let file = apply_set_values(
            FileConfig::default(),
            &sets(&["sasa.probe-radii=0.14, 0.5,0.7", "sasa.end-frame=-1"]),
        )
        .unwrap();
        let settings = ResolvedSettings::from_file_config(file);
        let config = settings
            .sasa_config(&SasaOptions::default(), Path::new("out"))
            .unwrap();
        assert_eq!(config.probe_radii, vec![0.14, 0.5, 0.7]);
        assert_eq!(config.frame_limit, FrameLimit::All);
    }

    #[test]
    fn invalid_end_frame_is_a_config_error() {
        let settings = ResolvedSettings::from_file_config(FileConfig::default());
        let options = SasaOptions {
            end_frame: Some(0),
            ..Default::default()
        };
        let result = settings.sasa_config(&options, Path::new("out"));
        assert!(matches!(result, Err(CliError::Config(_))));
    }

    #[test]
    fn engine_binary_precedence() {
        let file = apply_set_values(FileConfig::default(), &sets(&["engine.binary=gmx_mpi"]))
            .unwrap();
        let settings = ResolvedSettings::from_file_config(file);
        assert_eq!(settings.engine_binary(None), "gmx_mpi");
        assert_eq!(settings.engine_binary(Some("true")), "true");
    }

    #[test]
    fn generator_cutoff_is_validated() {
        let settings = ResolvedSettings::from_file_config(FileConfig::default());
        assert!(settings.generator(None).is_ok());
        assert!(matches!(
            settings.generator(Some(-1.0)),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn pipeline_merge_preview_can_be_disabled() {
        let file = apply_set_values(
            FileConfig::default(),
            &sets(&["merge.preview=false", "merge.preview-frames=7"]),
        )
        .unwrap();
        let settings = ResolvedSettings::from_file_config(file);
        let config = settings.pipeline_merge_config(Path::new("out"));
        assert!(config.preview.is_none());
        assert_eq!(config.preview_frames, 7);
        assert_eq!(config.output_structure, Path::new("out").join("merged_traj.pdb"));
    }
}
