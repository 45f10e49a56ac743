// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator math used by the bundled strategies.
// Every function returns a series the same length as its input with `None`
// during the warm-up window, so strategies can tell "no value yet" from a
// real reading.

pub mod bollinger;
pub mod ema;
pub mod fibonacci;
pub mod ichimoku;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod volume_profile;

pub use bollinger::{calculate_bollinger, BollingerBands};
pub use ema::{calculate_ema, calculate_ema_of};
pub use fibonacci::{first_max, first_min, retracement_levels};
pub use ichimoku::{calculate_ichimoku, IchimokuPeriods, IchimokuPoint};
pub use macd::{calculate_macd, MacdPoint};
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use volume_profile::VolumeProfile;
