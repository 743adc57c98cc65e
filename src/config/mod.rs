mod file_config;

pub use file_config::FileConfig;

use anyhow::Result;

use crate::rack::ParseOptions;
use crate::similarity::SimilarityWeights;

/// CLI arguments that participate in config resolution. Mirrors the flags
/// that a TOML config file can override.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub device_weight: Option<f64>,
    pub macro_weight: Option<f64>,
    pub complexity_weight: Option<f64>,
    pub limit: Option<usize>,
    pub count_dangling_mappings: Option<bool>,
}

/// Resolved engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub weights: SimilarityWeights,
    /// Maximum number of recommendations to return.
    pub limit: usize,
    pub count_dangling_mappings: bool,
}

pub const DEFAULT_LIMIT: usize = 5;

impl EngineConfig {
    /// Resolve configuration from CLI arguments and optional TOML file
    /// config. TOML values override CLI values where present. Weights are
    /// validated at resolve time so a bad configuration fails before any
    /// work is done.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();
        let defaults = SimilarityWeights::default();

        let weights = SimilarityWeights {
            device_weight: file
                .device_weight
                .or(cli.device_weight)
                .unwrap_or(defaults.device_weight),
            macro_weight: file
                .macro_weight
                .or(cli.macro_weight)
                .unwrap_or(defaults.macro_weight),
            complexity_weight: file
                .complexity_weight
                .or(cli.complexity_weight)
                .unwrap_or(defaults.complexity_weight),
        };
        weights.validate()?;

        let limit = file.limit.or(cli.limit).unwrap_or(DEFAULT_LIMIT);
        let count_dangling_mappings = file
            .count_dangling_mappings
            .or(cli.count_dangling_mappings)
            .unwrap_or(true);

        Ok(Self {
            weights,
            limit,
            count_dangling_mappings,
        })
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            count_dangling_mappings: self.count_dangling_mappings,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            limit: DEFAULT_LIMIT,
            count_dangling_mappings: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_defaults() {
        let config = EngineConfig::resolve(&CliConfig::default(), None).unwrap();
        assert_eq!(config.weights, SimilarityWeights::default());
        assert_eq!(config.limit, DEFAULT_LIMIT);
        assert!(config.count_dangling_mappings);
    }

    #[test]
    fn test_resolve_cli_only() {
        let cli = CliConfig {
            device_weight: Some(0.8),
            limit: Some(10),
            ..Default::default()
        };
        let config = EngineConfig::resolve(&cli, None).unwrap();
        assert_eq!(config.weights.device_weight, 0.8);
        assert_eq!(config.weights.macro_weight, 0.3);
        assert_eq!(config.limit, 10);
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let cli = CliConfig {
            device_weight: Some(0.8),
            macro_weight: Some(0.1),
            ..Default::default()
        };
        let file = FileConfig {
            device_weight: Some(0.6),
            count_dangling_mappings: Some(false),
            ..Default::default()
        };
        let config = EngineConfig::resolve(&cli, Some(file)).unwrap();
        // TOML wins where present, CLI fills the rest.
        assert_eq!(config.weights.device_weight, 0.6);
        assert_eq!(config.weights.macro_weight, 0.1);
        assert!(!config.count_dangling_mappings);
    }

    #[test]
    fn test_resolve_rejects_negative_weight() {
        let cli = CliConfig {
            complexity_weight: Some(-1.0),
            ..Default::default()
        };
        assert!(EngineConfig::resolve(&cli, None).is_err());
    }
}
