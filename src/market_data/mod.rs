pub mod candles;

// Re-export the Candle struct for convenient access (e.g. `use crate::market_data::Candle`).
pub use candles::{closes, load_candles, parse_candles, parse_csv_candles, Candle, PriceSource};
