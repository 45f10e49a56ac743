// =============================================================================
// Runtime Configuration — aggregation settings with atomic save
// =============================================================================
//
// Describes one aggregation run: which strategies to build, how to combine
// them, and where the price history lives.
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash.  All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.
//
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigurationError;
use crate::signals::AggregationConfig;
use crate::types::AggregationMethod;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_true() -> bool {
    true
}

fn default_weight() -> f64 {
    1.0
}

fn default_aggregation_method() -> String {
    AggregationMethod::WeightedAverage.as_str().to_string()
}

fn default_data_path() -> String {
    "data/prices.json".to_string()
}

fn default_strategies() -> Vec<StrategySpec> {
    vec![
        StrategySpec::new("ma_crossover"),
        StrategySpec::new("rsi"),
        StrategySpec::new("macd"),
    ]
}

// =============================================================================
// StrategySpec
// =============================================================================

/// One strategy entry: a registry kind plus its instance settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategySpec {
    /// Registry key, e.g. `"rsi"`.
    pub kind: String,

    /// Instance id; falls back to `kind` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default = "default_weight")]
    pub weight: f64,

    /// Disabled entries are kept in the file but never built.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Adapter-specific parameters; `null` means all defaults.
    #[serde(default)]
    pub parameters: serde_json::Value,
}

impl StrategySpec {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: None,
            weight: default_weight(),
            enabled: true,
            parameters: serde_json::Value::Null,
        }
    }

    pub fn strategy_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.kind)
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// `weighted_average`, `majority_vote` or `consensus`.
    /// Kept as a string so an unknown name is reported, not silently mapped.
    #[serde(default = "default_aggregation_method")]
    pub aggregation_method: String,

    /// Score threshold for the weighted-average policy.
    #[serde(default)]
    pub signal_threshold: f64,

    /// Run-level weight overrides keyed by strategy id.
    #[serde(default)]
    pub weights: HashMap<String, f64>,

    #[serde(default = "default_strategies")]
    pub strategies: Vec<StrategySpec>,

    /// OHLCV history the strategies run over.
    #[serde(default = "default_data_path")]
    pub data_path: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            aggregation_method: default_aggregation_method(),
            signal_threshold: 0.0,
            weights: HashMap::new(),
            strategies: default_strategies(),
            data_path: default_data_path(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            method = %config.aggregation_method,
            strategies = config.strategies.len(),
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }

    /// Write this configuration to `path` unless a file is already there,
    /// creating parent directories as needed. Returns whether it wrote.
    pub fn save_if_missing(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        self.save(path)?;
        Ok(true)
    }

    /// Strategy entries that should be built for this run.
    pub fn enabled_strategies(&self) -> impl Iterator<Item = &StrategySpec> {
        self.strategies.iter().filter(|s| s.enabled)
    }

    /// Resolve the method name and collect the aggregation settings.
    pub fn aggregation_config(&self) -> Result<AggregationConfig, ConfigurationError> {
        let method: AggregationMethod = self.aggregation_method.parse()?;
        Ok(AggregationConfig {
            method,
            signal_threshold: self.signal_threshold,
            weights: self.weights.clone(),
        })
    }
}
