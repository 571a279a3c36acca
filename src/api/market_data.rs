use super::{ensure_ok, read_envelope, Envelope, MarketData};
use crate::config::OkxSettings;
use crate::models::Candle;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const TICKER_PATH: &str = "/api/v5/market/ticker";
const CANDLES_PATH: &str = "/api/v5/market/candles";

/// Unauthenticated client for OKX market data
#[derive(Clone)]
pub struct MarketDataClient {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TickerData {
    #[serde(rename = "instId", default)]
    inst_id: String,
    last: String,
}

impl MarketDataClient {
    pub fn new(settings: &OkxSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Last traded price from the ticker endpoint
    pub async fn get_price(&self, instrument: &str) -> Result<f64> {
        let url = format!("{}{}", self.base_url, TICKER_PATH);

        let response = self
            .client
            .get(&url)
            .query(&[("instId", instrument)])
            .send()
            .await?;
        let envelope: Envelope<TickerData> = read_envelope(response).await?;
        ensure_ok(&envelope)?;

        let ticker = envelope
            .data
            .first()
            .ok_or_else(|| Error::NoData(format!("no ticker data for {}", instrument)))?;

        let price = ticker.last.parse::<f64>().map_err(|e| {
            Error::Decode(format!(
                "invalid last price {:?} for {}: {}",
                ticker.last, ticker.inst_id, e
            ))
        })?;

        tracing::debug!(instrument = %instrument, price, "Fetched ticker");
        Ok(price)
    }

    /// Recent candles, newest first
    pub async fn get_candles(
        &self,
        instrument: &str,
        bar: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        let url = format!("{}{}", self.base_url, CANDLES_PATH);
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[("instId", instrument), ("bar", bar), ("limit", limit.as_str())])
            .send()
            .await?;
        let envelope: Envelope<Vec<String>> = read_envelope(response).await?;
        ensure_ok(&envelope)?;

        let candles = parse_candle_rows(&envelope.data);
        tracing::debug!(
            instrument = %instrument,
            rows = envelope.data.len(),
            candles = candles.len(),
            "Fetched candles"
        );
        Ok(candles)
    }
}

#[async_trait]
impl MarketData for MarketDataClient {
    async fn fetch_price(&self, instrument: &str) -> Result<f64> {
        self.get_price(instrument).await
    }

    async fn fetch_candles(
        &self,
        instrument: &str,
        bar: &str,
        limit: usize,
    ) -> Result<Vec<Candle>> {
        self.get_candles(instrument, bar, limit).await
    }
}

/// Convert raw `[ts, o, h, l, c, ...]` rows into candles
///
/// Rows shorter than five fields are skipped. A field that fails to parse
/// becomes zero instead of failing the whole batch.
pub fn parse_candle_rows(rows: &[Vec<String>]) -> Vec<Candle> {
    rows.iter()
        .filter(|row| row.len() >= 5)
        .map(|row| Candle {
            timestamp: row[0].parse().unwrap_or(0),
            open: parse_or_zero(&row[1]),
            high: parse_or_zero(&row[2]),
            low: parse_or_zero(&row[3]),
            close: parse_or_zero(&row[4]),
        })
        .collect()
}

fn parse_or_zero(field: &str) -> f64 {
    field.parse().unwrap_or(0.0)
}
