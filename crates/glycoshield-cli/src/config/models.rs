use glycoshield::engine::config::{MergeConfig, SasaConfig, ShieldConfig};
use glycoshield::engine::generator::GraftingGenerator;

/// Fully resolved settings of every stage for one `pipeline` run.
pub struct PipelineConfig {
    pub generator: GraftingGenerator,
    pub shield: ShieldConfig,
    pub merge: MergeConfig,
    pub sasa: SasaConfig,
}
