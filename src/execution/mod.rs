// Order execution and position tracking module
pub mod position;
pub mod trading_loop;

pub use position::PositionState;
pub use trading_loop::{LoopSettings, TickOutcome, TradingLoop};
