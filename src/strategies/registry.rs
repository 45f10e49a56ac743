// =============================================================================
// Strategy Registry — explicit kind -> constructor map
// =============================================================================
//
// Populated once at process start (`with_builtin`) and queried by the run
// configuration. No reflection, no dynamic imports: a kind that was never
// registered is a configuration error.
// =============================================================================

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::ConfigurationError;
use crate::runtime_config::StrategySpec;
use crate::strategies::{
    BollingerBandsStrategy, FibonacciRetracementStrategy, IchimokuCloudStrategy, MacdStrategy,
    MovingAverageCrossover, RsiStrategy, Strategy, VolumeProfileStrategy,
};

/// Everything a constructor needs to build one strategy instance.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub id: String,
    pub weight: f64,
    pub parameters: serde_json::Value,
}

impl StrategyContext {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight: 1.0,
            parameters: serde_json::Value::Null,
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    pub(crate) fn invalid(&self, reason: impl Into<String>) -> ConfigurationError {
        ConfigurationError::InvalidParameters {
            strategy_id: self.id.clone(),
            reason: reason.into(),
        }
    }
}

pub type Constructor = fn(StrategyContext) -> Result<Box<dyn Strategy>, ConfigurationError>;

pub struct StrategyRegistry {
    constructors: BTreeMap<&'static str, Constructor>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// A registry holding every bundled strategy.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(MovingAverageCrossover::KIND, MovingAverageCrossover::build);
        registry.register(RsiStrategy::KIND, RsiStrategy::build);
        registry.register(MacdStrategy::KIND, MacdStrategy::build);
        registry.register(BollingerBandsStrategy::KIND, BollingerBandsStrategy::build);
        registry.register(IchimokuCloudStrategy::KIND, IchimokuCloudStrategy::build);
        registry.register(FibonacciRetracementStrategy::KIND, FibonacciRetracementStrategy::build);
        registry.register(VolumeProfileStrategy::KIND, VolumeProfileStrategy::build);
        registry
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register(&mut self, kind: &'static str, constructor: Constructor) {
        debug!(kind, "registered strategy");
        self.constructors.insert(kind, constructor);
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.constructors.keys().copied().collect()
    }

    /// Instantiate a strategy from its configuration entry.
    pub fn build(&self, spec: &StrategySpec) -> Result<Box<dyn Strategy>, ConfigurationError> {
        let constructor = self
            .constructors
            .get(spec.kind.as_str())
            .ok_or_else(|| ConfigurationError::UnknownStrategy(spec.kind.clone()))?;

        let ctx = StrategyContext::new(spec.strategy_id())
            .with_weight(spec.weight)
            .with_parameters(spec.parameters.clone());

        if !ctx.weight.is_finite() {
            return Err(ConfigurationError::NonFiniteWeight {
                strategy_id: ctx.id,
                weight: spec.weight,
            });
        }
        if ctx.weight < 0.0 {
            return Err(ConfigurationError::NegativeWeight {
                strategy_id: ctx.id,
                weight: spec.weight,
            });
        }

        constructor(ctx)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(kind: &str, parameters: serde_json::Value) -> StrategySpec {
        serde_json::from_value(json!({ "kind": kind, "parameters": parameters })).unwrap()
    }

    #[test]
    fn builtin_kinds_are_registered() {
        let registry = StrategyRegistry::with_builtin();
        assert_eq!(
            registry.kinds(),
            vec![
                "bollinger",
                "fibonacci_retracement",
                "ichimoku_cloud",
                "ma_crossover",
                "macd",
                "rsi",
                "volume_profile",
            ]
        );
    }

    #[test]
    fn unknown_kind_is_configuration_error() {
        let registry = StrategyRegistry::with_builtin();
        let err = registry.build(&spec("stochastic", json!({}))).err().unwrap();
        assert_eq!(err, ConfigurationError::UnknownStrategy("stochastic".into()));
    }

    #[test]
    fn build_applies_id_weight_and_parameters() {
        let registry = StrategyRegistry::with_builtin();
        let spec: StrategySpec = serde_json::from_value(json!({
            "kind": "rsi",
            "id": "rsi_fast",
            "weight": 2.5,
            "parameters": { "period": 7 }
        }))
        .unwrap();
        let strategy = registry.build(&spec).unwrap();
        assert_eq!(strategy.id(), "rsi_fast");
        assert_eq!(strategy.kind(), "rsi");
        assert!((strategy.weight() - 2.5).abs() < f64::EPSILON);
        assert!(strategy.describe().contains('7'));
    }

    #[test]
    fn bad_parameters_are_rejected() {
        let registry = StrategyRegistry::with_builtin();
        let err = registry
            .build(&spec("ma_crossover", json!({ "fast_period": 50, "slow_period": 20 })))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigurationError::InvalidParameters { .. }));

        let err = registry
            .build(&spec("rsi", json!({ "period": "fourteen" })))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigurationError::InvalidParameters { .. }));
    }

    #[test]
    fn every_builtin_builds_with_default_parameters() {
        let registry = StrategyRegistry::with_builtin();
        for kind in registry.kinds() {
            let strategy = registry.build(&spec(kind, json!(null))).unwrap();
            assert_eq!(strategy.kind(), kind);
            assert_eq!(strategy.id(), kind);
        }
    }

    #[test]
    fn negative_weight_is_rejected() {
        let registry = StrategyRegistry::with_builtin();
        let spec: StrategySpec =
            serde_json::from_value(json!({ "kind": "macd", "weight": -1.0 })).unwrap();
        assert!(matches!(
            registry.build(&spec).err().unwrap(),
            ConfigurationError::NegativeWeight { .. }
        ));
    }

    #[test]
    fn non_finite_weight_is_rejected() {
        let registry = StrategyRegistry::with_builtin();
        for weight in [f64::NAN, f64::INFINITY] {
            let mut spec = StrategySpec::new("rsi");
            spec.weight = weight;
            assert!(matches!(
                registry.build(&spec).err().unwrap(),
                ConfigurationError::NonFiniteWeight { ref strategy_id, .. } if strategy_id == "rsi"
            ));
        }
    }

    #[test]
    fn custom_constructor_can_be_registered() {
        fn build_slow_ma(ctx: StrategyContext) -> Result<Box<dyn Strategy>, ConfigurationError> {
            MovingAverageCrossover::build(
                ctx.with_parameters(json!({ "fast_period": 50, "slow_period": 200 })),
            )
        }

        let mut registry = StrategyRegistry::new();
        assert!(!registry.contains("golden_cross"));
        registry.register("golden_cross", build_slow_ma);
        let strategy = registry.build(&spec("golden_cross", json!(null))).unwrap();
        assert!(strategy.describe().contains("200"));
    }
}
