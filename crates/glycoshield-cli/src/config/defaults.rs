use glycoshield::engine::config::{
    AggregationMode, DEFAULT_CLASH_CUTOFF_ANGSTROM, DEFAULT_DOTS_PER_ATOM,
    DEFAULT_PREVIEW_FRAMES, DEFAULT_PROBE_RADIUS_NM,
};
use glycoshield::engine::tools::DEFAULT_ENGINE_BINARY;

pub struct DefaultsConfig {
    pub engine_binary: String,
    pub clash_cutoff: f64,
    pub preview: bool,
    pub preview_frames: usize,
    pub probe_radii: Vec<f64>,
    pub n_dots: usize,
    pub mode: AggregationMode,
    pub end_frame: i64,
    pub plot_trace: bool,
    pub keep_intermediate: bool,
    pub parallel: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            engine_binary: DEFAULT_ENGINE_BINARY.to_string(),
            clash_cutoff: DEFAULT_CLASH_CUTOFF_ANGSTROM,
            preview: true,
            preview_frames: DEFAULT_PREVIEW_FRAMES,
            probe_radii: vec![DEFAULT_PROBE_RADIUS_NM],
            n_dots: DEFAULT_DOTS_PER_ATOM,
            mode: AggregationMode::Max,
            end_frame: -1,
            plot_trace: false,
            keep_intermediate: false,
            parallel: true,
        }
    }
}
