// Trading strategy module
pub mod crossover;
pub mod monitor;
pub mod single_shot;

pub use crossover::CrossoverStrategy;
pub use monitor::MonitorStrategy;
pub use single_shot::SingleShotStrategy;

use crate::config::{StrategyKind, TradingSettings};
use crate::execution::PositionState;
use crate::models::MarketSnapshot;

/// Short moving average window (candles)
pub const SHORT_MA_PERIOD: usize = 20;
/// Long moving average window (candles)
pub const LONG_MA_PERIOD: usize = 50;

/// What the loop should do on this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Buy { size: f64, price: f64 },
    Sell { size: f64, price: f64 },
    Hold,
}

/// Base trait for all decision policies
pub trait Strategy: Send + Sync {
    /// Decide based on the latest snapshot and the current position
    fn decide(&self, snapshot: &MarketSnapshot, position: &PositionState) -> Decision;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Whether the loop should return after the first confirmed fill
    fn stop_after_fill(&self) -> bool {
        false
    }

    /// Whether the loop needs candles at all
    fn needs_candles(&self) -> bool {
        true
    }
}

/// Build the strategy selected in the settings
pub fn from_settings(settings: &TradingSettings) -> Box<dyn Strategy> {
    match settings.strategy {
        StrategyKind::Crossover => Box::new(CrossoverStrategy::new(
            settings.buy_threshold,
            settings.sell_threshold,
            settings.trade_size,
        )),
        StrategyKind::SingleShot => Box::new(SingleShotStrategy::new(
            settings.buy_threshold,
            settings.trade_size,
        )),
        StrategyKind::Monitor => Box::new(MonitorStrategy),
    }
}
