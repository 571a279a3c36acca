use serde::{Deserialize, Serialize};
use std::fmt;

/// OHLC candle as returned by the exchange (newest first)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64, // Unix millis of the bar open
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spot order body for `POST /api/v5/trade/order`
///
/// Field order matters: the serialized body is what gets signed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "tdMode")]
    pub td_mode: String,
    pub side: Side,
    #[serde(rename = "ordType")]
    pub ord_type: String,
    pub sz: String,
    pub px: String,
}

impl OrderRequest {
    /// Cash-mode limit order with size and price as 8-digit fixed-point strings
    pub fn limit(inst_id: &str, side: Side, size: f64, price: f64) -> Self {
        Self {
            inst_id: inst_id.to_string(),
            td_mode: "cash".to_string(),
            side,
            ord_type: "limit".to_string(),
            sz: format!("{:.8}", size),
            px: format!("{:.8}", price),
        }
    }
}

/// Outcome of a successfully acknowledged order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderResult {
    pub code: String,
    pub msg: String,
    pub ord_id: String,
    pub cl_ord_id: String,
    pub s_code: String,
    pub s_msg: String,
}

/// Trend derived from the MA20/MA50 relation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Trend::Bullish => "bullish",
            Trend::Bearish => "bearish",
            Trend::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

/// Everything a strategy sees on one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSnapshot {
    pub price: f64,
    pub ma_short: f64,
    pub ma_long: f64,
}

impl MarketSnapshot {
    pub fn trend(&self) -> Trend {
        crate::indicators::classify_trend(self.ma_short, self.ma_long)
    }
}
