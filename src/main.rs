// =============================================================================
// Confluence — Main Entry Point
// =============================================================================
//
// Loads the run configuration and price history, computes every enabled
// strategy concurrently, aggregates the resulting series and prints the run
// envelope as JSON on stdout. Logs go to stderr.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::try_join_all;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use confluence::market_data::{load_candles, Candle};
use confluence::report::{RunEnvelope, StrategySummary};
use confluence::runtime_config::RuntimeConfig;
use confluence::signals::{RunDiagnostics, SignalAggregator, StrategyInput};
use confluence::strategies::{Strategy, StrategyRegistry};

const DEFAULT_CONFIG_PATH: &str = "confluence.json";

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path =
        std::env::var("CONFLUENCE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Seed a starter config file so the defaults can be edited in place.
    if env_flag("CONFLUENCE_SAVE_CONFIG") {
        match config.save_if_missing(&config_path) {
            Ok(true) => info!(path = %config_path, "Default config written"),
            Ok(false) => info!(path = %config_path, "Config already exists, not overwritten"),
            Err(e) => error!(error = %e, "Failed to save config"),
        }
    }

    if let Ok(data_path) = std::env::var("CONFLUENCE_DATA") {
        config.data_path = data_path;
    }
    if let Ok(method) = std::env::var("CONFLUENCE_METHOD") {
        config.aggregation_method = method.trim().to_string();
    }

    // ── 2. Aggregator & strategies ───────────────────────────────────────
    // Configuration problems surface before any data is read.
    let aggregator = SignalAggregator::new(config.aggregation_config()?)?;

    let registry = StrategyRegistry::with_builtin();
    let strategies: Vec<Arc<dyn Strategy>> = config
        .enabled_strategies()
        .map(|spec| registry.build(spec).map(Arc::<dyn Strategy>::from))
        .collect::<Result<_, _>>()?;

    info!(
        method = %aggregator.method(),
        strategies = strategies.len(),
        data = %config.data_path,
        "Configured aggregation run"
    );

    // ── 3. Price history ─────────────────────────────────────────────────
    let candles: Arc<[Candle]> = load_candles(&config.data_path)?.into();

    // ── 4. Strategy series (concurrent) ──────────────────────────────────
    let inputs = run_strategies(&strategies, &candles).await?;

    // ── 5. Aggregate & report ────────────────────────────────────────────
    let diagnostics = RunDiagnostics::new();
    let series = aggregator.aggregate_with(&inputs, &diagnostics)?;

    let summaries = strategies
        .iter()
        .zip(&inputs)
        .map(|(strategy, input)| {
            StrategySummary::from_strategy(strategy.as_ref(), input.records.len())
        })
        .collect();

    let envelope = RunEnvelope::new(series, summaries, &diagnostics);
    info!(
        run_id = %envelope.id,
        buy = envelope.buy_count,
        hold = envelope.hold_count,
        sell = envelope.sell_count,
        "Run complete"
    );

    println!(
        "{}",
        envelope
            .to_json_pretty()
            .context("failed to serialise run envelope")?
    );
    Ok(())
}

/// `1` / `true` / `yes` (any case) switch a flag on.
fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| {
        matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
    })
}

/// Compute every strategy's series on the blocking pool and collect them in
/// configuration order.
async fn run_strategies(
    strategies: &[Arc<dyn Strategy>],
    candles: &Arc<[Candle]>,
) -> Result<Vec<StrategyInput>> {
    let handles = strategies.iter().map(|strategy| {
        let strategy = Arc::clone(strategy);
        let candles = Arc::clone(candles);
        tokio::task::spawn_blocking(move || strategy.run(&candles))
    });

    try_join_all(handles)
        .await
        .context("strategy task panicked")
}
