use super::{Decision, Strategy};
use crate::execution::PositionState;
use crate::models::MarketSnapshot;

/// Buy once when the price reaches the target, then stop trading
///
/// Ignores the moving averages. The loop exits after the first confirmed fill.
#[derive(Debug, Clone)]
pub struct SingleShotStrategy {
    buy_threshold: f64,
    trade_size: f64,
}

impl SingleShotStrategy {
    pub fn new(buy_threshold: f64, trade_size: f64) -> Self {
        Self {
            buy_threshold,
            trade_size,
        }
    }
}

impl Strategy for SingleShotStrategy {
    fn decide(&self, snapshot: &MarketSnapshot, position: &PositionState) -> Decision {
        let price = snapshot.price;
        if position.is_flat() && price > 0.0 && price <= self.buy_threshold {
            Decision::Buy {
                size: self.trade_size / price,
                price,
            }
        } else {
            Decision::Hold
        }
    }

    fn name(&self) -> &str {
        "SingleShotStrategy"
    }

    fn stop_after_fill(&self) -> bool {
        true
    }

    fn needs_candles(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price: f64) -> MarketSnapshot {
        MarketSnapshot {
            price,
            ma_short: 0.0,
            ma_long: 0.0,
        }
    }

    #[test]
    fn test_buys_at_target_without_averages() {
        let strategy = SingleShotStrategy::new(0.7, 100.0);
        let decision = strategy.decide(&snapshot(0.5), &PositionState::Flat);
        assert_eq!(
            decision,
            Decision::Buy {
                size: 200.0,
                price: 0.5
            }
        );
    }

    #[test]
    fn test_waits_above_target() {
        let strategy = SingleShotStrategy::new(0.7, 100.0);
        assert_eq!(strategy.decide(&snapshot(0.9), &PositionState::Flat), Decision::Hold);
    }

    #[test]
    fn test_never_sells() {
        let strategy = SingleShotStrategy::new(0.7, 100.0);
        let holding = PositionState::Holding { quantity: 200.0 };
        assert_eq!(strategy.decide(&snapshot(5.0), &holding), Decision::Hold);
    }
}
