// =============================================================================
// Candles — OHLCV bars and the price history loader
// =============================================================================
//
// A price history is read once per run and shared read-only by every
// strategy. Two on-disk shapes are accepted:
//   - JSON: an array of candle objects or exchange kline rows.
//   - CSV:  a header row naming `date` (or `open_time` / `timestamp`),
//           `open`, `high`, `low`, `close` and `volume`.
//
// Bars must arrive in strictly increasing time order; nothing is re-sorted.
// =============================================================================

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV bar. `open_time` doubles as the signal timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub close_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Close prices of a bar slice, oldest first.
pub fn closes(candles: &[Candle]) -> Vec<f64> {
    PriceSource::Close.series(candles)
}

/// Which bar price an indicator is computed on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    #[default]
    Close,
    Open,
    High,
    Low,
}

impl PriceSource {
    pub fn of(self, candle: &Candle) -> f64 {
        match self {
            Self::Close => candle.close,
            Self::Open => candle.open,
            Self::High => candle.high,
            Self::Low => candle.low,
        }
    }

    pub fn series(self, candles: &[Candle]) -> Vec<f64> {
        candles.iter().map(|c| self.of(c)).collect()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a price history from a file, choosing the format by extension
/// (`.csv` is CSV, anything else JSON).
///
/// Fails on an empty history or on bar times that do not strictly
/// increase.
pub fn load_candles(path: impl AsRef<Path>) -> Result<Vec<Candle>> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read price history from {}", path.display()))?;

    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let candles = if is_csv {
        parse_csv_candles(&content)
    } else {
        parse_candles(&content)
    }
    .with_context(|| format!("failed to parse price history from {}", path.display()))?;

    info!(
        path = %path.display(),
        bars = candles.len(),
        first = ?candles.first().map(|c| c.open_time),
        last = ?candles.last().map(|c| c.open_time),
        "price history loaded"
    );

    Ok(candles)
}

/// Parse a JSON price history.
///
/// Elements are either candle objects (`{"open_time": .., "open": .., ...}`)
/// or exchange kline rows
/// (`[open_time, "open", "high", "low", "close", "volume", close_time, ...]`).
/// Numeric fields may be JSON numbers or numeric strings.
pub fn parse_candles(text: &str) -> Result<Vec<Candle>> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("price history is not valid JSON")?;

    let rows = root
        .as_array()
        .context("price history must be a JSON array")?;
    if rows.is_empty() {
        anyhow::bail!("price history is empty");
    }

    let mut candles = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let candle = parse_candle(row).with_context(|| format!("bad candle at row {index}"))?;
        push_in_order(&mut candles, candle, index)?;
    }

    Ok(candles)
}

/// Parse a CSV price history with a header row.
///
/// The time column may hold epoch milliseconds, RFC 3339 timestamps,
/// `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (all UTC). Blank lines are skipped.
pub fn parse_csv_candles(text: &str) -> Result<Vec<Candle>> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().context("price history is empty")?;
    let columns: HashMap<String, usize> = header
        .split(',')
        .enumerate()
        .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
        .collect();

    let time_col = ["date", "open_time", "timestamp"]
        .iter()
        .find_map(|name| columns.get(*name).copied())
        .context("CSV header has no date, open_time or timestamp column")?;
    let column = |name: &str| {
        columns
            .get(name)
            .copied()
            .with_context(|| format!("CSV header is missing column {name}"))
    };
    let (open_col, high_col, low_col, close_col, volume_col) = (
        column("open")?,
        column("high")?,
        column("low")?,
        column("close")?,
        column("volume")?,
    );

    let mut candles = Vec::new();
    for (line_no, line) in lines {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |col: usize| {
            fields
                .get(col)
                .copied()
                .with_context(|| format!("line {}: too few fields", line_no + 1))
        };
        let number = |col: usize, name: &str| -> Result<f64> {
            let raw = field(col)?;
            let value = raw
                .parse::<f64>()
                .with_context(|| format!("line {}: failed to parse {name}: {raw}", line_no + 1))?;
            if !value.is_finite() {
                anyhow::bail!("line {}: {name} is not finite", line_no + 1);
            }
            Ok(value)
        };

        let open_time = parse_timestamp(field(time_col)?)
            .with_context(|| format!("line {}: bad bar time", line_no + 1))?;
        let candle = Candle {
            open_time,
            close_time: open_time,
            open: number(open_col, "open")?,
            high: number(high_col, "high")?,
            low: number(low_col, "low")?,
            close: number(close_col, "close")?,
            volume: number(volume_col, "volume")?,
        };
        push_in_order(&mut candles, candle, line_no)?;
    }

    if candles.is_empty() {
        anyhow::bail!("price history is empty");
    }
    Ok(candles)
}

fn push_in_order(candles: &mut Vec<Candle>, candle: Candle, index: usize) -> Result<()> {
    if let Some(prev) = candles.last().map(|c| c.open_time) {
        if candle.open_time <= prev {
            anyhow::bail!(
                "open_time {} at row {index} does not follow previous {prev}",
                candle.open_time
            );
        }
    }
    candles.push(candle);
    Ok(())
}

/// Epoch milliseconds from the date formats price exports commonly use.
fn parse_timestamp(raw: &str) -> Result<i64> {
    if let Ok(ms) = raw.parse::<i64>() {
        return Ok(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.timestamp_millis());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(Utc.from_utc_datetime(&dt).timestamp_millis());
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("unrecognised date: {raw}"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("unrecognised date: {raw}"))?;
    Ok(Utc.from_utc_datetime(&midnight).timestamp_millis())
}

fn parse_candle(row: &serde_json::Value) -> Result<Candle> {
    match row {
        serde_json::Value::Array(fields) => {
            let field = |i: usize, name: &str| array_field(fields, i, name);
            let open_time = parse_i64(field(0, "open_time")?, "open_time")?;
            Ok(Candle {
                open_time,
                open: parse_string_f64(field(1, "open")?, "open")?,
                high: parse_string_f64(field(2, "high")?, "high")?,
                low: parse_string_f64(field(3, "low")?, "low")?,
                close: parse_string_f64(field(4, "close")?, "close")?,
                volume: parse_string_f64(field(5, "volume")?, "volume")?,
                close_time: match fields.get(6) {
                    Some(v) => parse_i64(v, "close_time")?,
                    None => open_time,
                },
            })
        }
        serde_json::Value::Object(map) => {
            let field = |name: &str| object_field(map, name);
            let open_time = parse_i64(field("open_time")?, "open_time")?;
            Ok(Candle {
                open_time,
                open: parse_string_f64(field("open")?, "open")?,
                high: parse_string_f64(field("high")?, "high")?,
                low: parse_string_f64(field("low")?, "low")?,
                close: parse_string_f64(field("close")?, "close")?,
                volume: match map.get("volume") {
                    Some(v) => parse_string_f64(v, "volume")?,
                    None => 0.0,
                },
                close_time: match map.get("close_time") {
                    Some(v) => parse_i64(v, "close_time")?,
                    None => open_time,
                },
            })
        }
        _ => anyhow::bail!("candle must be a JSON object or array"),
    }
}

fn array_field<'a>(
    fields: &'a [serde_json::Value],
    index: usize,
    name: &str,
) -> Result<&'a serde_json::Value> {
    fields
        .get(index)
        .with_context(|| format!("missing field {name}"))
}

fn object_field<'a>(
    map: &'a serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> Result<&'a serde_json::Value> {
    map.get(name).with_context(|| format!("missing field {name}"))
}

/// Exchanges often send numeric values as JSON strings.
fn parse_string_f64(val: &serde_json::Value, name: &str) -> Result<f64> {
    let value = match val {
        serde_json::Value::String(s) => s
            .parse::<f64>()
            .with_context(|| format!("failed to parse {name} as f64: {s}"))?,
        serde_json::Value::Number(n) => n
            .as_f64()
            .with_context(|| format!("field {name} is not a valid f64"))?,
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    };
    if !value.is_finite() {
        anyhow::bail!("field {name} is not finite");
    }
    Ok(value)
}

fn parse_i64(val: &serde_json::Value, name: &str) -> Result<i64> {
    match val {
        serde_json::Value::String(s) => s
            .parse::<i64>()
            .with_context(|| format!("failed to parse {name} as i64: {s}")),
        serde_json::Value::Number(n) => n
            .as_i64()
            .with_context(|| format!("field {name} is not a valid i64")),
        _ => anyhow::bail!("field {name} has unexpected JSON type"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_object_rows() {
        let json = r#"[
            {"open_time": 1000, "close_time": 1999, "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.5, "volume": 10},
            {"open_time": 2000, "open": "1.5", "high": "2.5", "low": "1.0", "close": "2.0"}
        ]"#;
        let candles = parse_candles(json).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].close_time, 1999);
        assert!((candles[1].close - 2.0).abs() < 1e-10);
        assert_eq!(candles[1].close_time, 2000);
        assert!((candles[1].volume - 0.0).abs() < 1e-10);
    }

    #[test]
    fn parses_kline_rows() {
        let json = r#"[
            [1499040000000, "0.01634790", "0.80000000", "0.01575800", "0.01577100", "148976.11427815", 1499644799999, "2434.19055334", 308]
        ]"#;
        let candles = parse_candles(json).unwrap();
        assert_eq!(candles[0].open_time, 1_499_040_000_000);
        assert_eq!(candles[0].close_time, 1_499_644_799_999);
        assert!((candles[0].high - 0.8).abs() < 1e-10);
    }

    #[test]
    fn rejects_empty_history() {
        assert!(parse_candles("[]").is_err());
        assert!(parse_candles("{}").is_err());
    }

    #[test]
    fn rejects_unordered_bars() {
        let json = r#"[
            {"open_time": 2000, "open": 1, "high": 1, "low": 1, "close": 1},
            {"open_time": 1000, "open": 1, "high": 1, "low": 1, "close": 1}
        ]"#;
        let err = parse_candles(json).unwrap_err();
        assert!(err.to_string().contains("does not follow"));
    }

    #[test]
    fn rejects_missing_close() {
        let json = r#"[{"open_time": 1, "open": 1, "high": 1, "low": 1}]"#;
        assert!(parse_candles(json).is_err());
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"open_time": 1, "open": 1, "high": 1, "low": 1, "close": 3}}]"#
        )
        .unwrap();
        let candles = load_candles(file.path()).unwrap();
        assert_eq!(closes(&candles), vec![3.0]);
    }

    #[test]
    fn parses_csv_with_dates() {
        let csv = "date,open,high,low,close,volume\n\
                   2024-01-01,10,11,9,10.5,1000\n\
                   \n\
                   2024-01-02,10.5,12,10,11.5,1200\n";
        let candles = parse_csv_candles(csv).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].open_time, 1_704_067_200_000);
        assert_eq!(candles[1].open_time - candles[0].open_time, 86_400_000);
        assert!((candles[1].close - 11.5).abs() < 1e-10);
        assert_eq!(candles[0].close_time, candles[0].open_time);
    }

    #[test]
    fn csv_accepts_reordered_columns_and_other_time_formats() {
        let csv = "Close,Volume,Open,High,Low,Timestamp\n\
                   2,5,1,3,0.5,1700000000000\n\
                   3,5,2,4,1.5,2023-11-14T22:14:21Z\n\
                   4,5,3,5,2.5,2023-11-15 00:00:00\n";
        let candles = parse_csv_candles(csv).unwrap();
        assert_eq!(candles.len(), 3);
        assert!((candles[0].open - 1.0).abs() < 1e-10);
        assert_eq!(candles[1].open_time, 1_700_000_061_000);
        assert_eq!(candles[2].open_time, 1_700_006_400_000);
    }

    #[test]
    fn csv_rejects_missing_columns_and_bad_rows() {
        assert!(parse_csv_candles("date,open,high,low,close\n2024-01-01,1,1,1,1\n").is_err());
        assert!(parse_csv_candles("date,open,high,low,close,volume\n").is_err());
        let err = parse_csv_candles(
            "date,open,high,low,close,volume\n2024-01-02,1,1,1,1,1\n2024-01-01,1,1,1,1,1\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not follow"));
        let bad_date = "date,open,high,low,close,volume\nyesterday,1,1,1,1,1\n";
        assert!(parse_csv_candles(bad_date).is_err());
    }

    #[test]
    fn load_dispatches_on_csv_extension() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "date,open,high,low,close,volume\n2024-01-01,1,2,0.5,1.5,10\n").unwrap();
        let candles = load_candles(file.path()).unwrap();
        assert_eq!(closes(&candles), vec![1.5]);
    }

    #[test]
    fn load_missing_file_has_context() {
        let err = load_candles("/definitely/not/here.json").unwrap_err();
        assert!(err.to_string().contains("failed to read price history"));
    }
}
