// OKX REST API clients
pub mod market_data;
pub mod orders;
pub mod signer;

pub use market_data::{parse_candle_rows, MarketDataClient};
pub use orders::OrderClient;
pub use signer::RequestSigner;

use crate::models::{Candle, OrderResult, Side};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://www.okx.com";

/// Source of prices and candles for the trading loop
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Last traded price of `instrument`
    async fn fetch_price(&self, instrument: &str) -> Result<f64>;

    /// Up to `limit` candles of width `bar`, newest first
    async fn fetch_candles(&self, instrument: &str, bar: &str, limit: usize)
        -> Result<Vec<Candle>>;
}

/// Destination for signed orders
#[async_trait]
pub trait OrderGateway: Send + Sync {
    async fn place_order(
        &self,
        instrument: &str,
        side: Side,
        size: f64,
        price: f64,
    ) -> Result<OrderResult>;
}

/// Common `{code, msg, data}` wrapper around every OKX v5 response
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub code: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Envelope<T> {
    pub fn is_ok(&self) -> bool {
        self.code == "0"
    }
}

/// Read a response body and decode it as an envelope
///
/// Non-2xx responses that still carry an envelope are reported through the
/// envelope's code; anything else non-2xx is a transport failure.
pub(crate) async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<Envelope<T>> {
    let status = response.status();
    let body = response.text().await?;

    match serde_json::from_str::<Envelope<T>>(&body) {
        Ok(envelope) => Ok(envelope),
        Err(e) if status.is_success() => Err(Error::Decode(format!(
            "unexpected response shape: {}",
            e
        ))),
        Err(_) => Err(Error::Transport(format!(
            "HTTP {}: {}",
            status,
            truncate(&body, 200)
        ))),
    }
}

/// Turn a non-zero envelope code into `ExchangeRejected`
pub(crate) fn ensure_ok<T>(envelope: &Envelope<T>) -> Result<()> {
    if envelope.is_ok() {
        return Ok(());
    }

    Err(Error::ExchangeRejected {
        code: envelope.code.clone(),
        message: envelope.msg.clone(),
    })
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
