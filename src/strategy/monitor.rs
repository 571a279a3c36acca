use super::{Decision, Strategy};
use crate::execution::PositionState;
use crate::models::MarketSnapshot;

/// Observe-only: the loop logs prices and averages but never trades
#[derive(Debug, Clone, Default)]
pub struct MonitorStrategy;

impl Strategy for MonitorStrategy {
    fn decide(&self, _snapshot: &MarketSnapshot, _position: &PositionState) -> Decision {
        Decision::Hold
    }

    fn name(&self) -> &str {
        "MonitorStrategy"
    }
}
