use super::{Decision, Strategy};
use crate::execution::PositionState;
use crate::models::MarketSnapshot;

/// Moving average crossover with price thresholds
///
/// - Flat: buy `trade_size / price` units when MA20 is above MA50 and the
///   price is at or below the buy threshold
/// - Holding: sell everything when MA20 drops below MA50 or the price
///   reaches the sell threshold
///
/// The averages are compared as raw values, so a zero average (not enough
/// candles) takes part in the comparison like any other number.
#[derive(Debug, Clone)]
pub struct CrossoverStrategy {
    buy_threshold: f64,
    sell_threshold: f64,
    trade_size: f64, // Quote currency per buy
}

impl CrossoverStrategy {
    pub fn new(buy_threshold: f64, sell_threshold: f64, trade_size: f64) -> Self {
        Self {
            buy_threshold,
            sell_threshold,
            trade_size,
        }
    }
}

impl Strategy for CrossoverStrategy {
    fn decide(&self, snapshot: &MarketSnapshot, position: &PositionState) -> Decision {
        let price = snapshot.price;
        if price <= 0.0 {
            return Decision::Hold;
        }

        match position {
            PositionState::Flat => {
                if snapshot.ma_short > snapshot.ma_long && price <= self.buy_threshold {
                    Decision::Buy {
                        size: self.trade_size / price,
                        price,
                    }
                } else {
                    Decision::Hold
                }
            }
            PositionState::Holding { quantity } => {
                if snapshot.ma_short < snapshot.ma_long || price >= self.sell_threshold {
                    Decision::Sell {
                        size: *quantity,
                        price,
                    }
                } else {
                    Decision::Hold
                }
            }
        }
    }

    fn name(&self) -> &str {
        "CrossoverStrategy"
    }
}
