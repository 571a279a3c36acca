// Technical indicators module
// Simple moving averages over candle closes and MA crossover trend

pub mod moving_average;

pub use moving_average::{classify_trend, moving_average};
