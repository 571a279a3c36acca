use crate::models::{Candle, Trend};

/// Simple moving average of the closes of the first `period` candles
///
/// Candles are newest-first, so this covers the most recent `period` bars.
/// Returns 0.0 when fewer than `period` candles are available; callers treat
/// that as "not enough data" rather than an error.
pub fn moving_average(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period {
        return 0.0;
    }

    let sum: f64 = candles.iter().take(period).map(|c| c.close).sum();
    sum / period as f64
}

/// Classify the trend from a short and a long moving average
///
/// A zero average means insufficient data and always yields `Neutral`.
pub fn classify_trend(ma_short: f64, ma_long: f64) -> Trend {
    if ma_short == 0.0 || ma_long == 0.0 {
        return Trend::Neutral;
    }

    if ma_short > ma_long {
        Trend::Bullish
    } else if ma_short < ma_long {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}
