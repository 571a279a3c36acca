use super::{read_envelope, Envelope, OrderGateway, RequestSigner};
use crate::config::OkxSettings;
use crate::models::{OrderRequest, OrderResult, Side};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

const ORDER_PATH: &str = "/api/v5/trade/order";

/// Authenticated client for placing spot limit orders
#[derive(Clone)]
pub struct OrderClient {
    client: Client,
    base_url: String,
    api_key: String,
    passphrase: String,
    signer: RequestSigner,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OrderAckData {
    #[serde(rename = "ordId")]
    ord_id: String,
    #[serde(rename = "clOrdId")]
    cl_ord_id: String,
    #[serde(rename = "sCode")]
    s_code: String,
    #[serde(rename = "sMsg")]
    s_msg: String,
}

impl OrderClient {
    pub fn new(settings: &OkxSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            passphrase: settings.passphrase.clone(),
            signer: RequestSigner::new(settings.secret_key.clone()),
        })
    }

    /// Place a cash-mode limit order
    pub async fn place_limit_order(
        &self,
        instrument: &str,
        side: Side,
        size: f64,
        price: f64,
    ) -> Result<OrderResult> {
        let order = OrderRequest::limit(instrument, side, size, price);
        self.submit(&order).await
    }

    /// Sign and POST an order, returning the first acknowledgement
    pub async fn submit(&self, order: &OrderRequest) -> Result<OrderResult> {
        let body = serde_json::to_string(order)
            .map_err(|e| Error::Decode(format!("failed to encode order: {}", e)))?;
        let timestamp = RequestSigner::timestamp();
        let signature = self.signer.sign(&timestamp, "POST", ORDER_PATH, &body)?;

        tracing::debug!(
            instrument = %order.inst_id,
            side = %order.side,
            sz = %order.sz,
            px = %order.px,
            "Submitting order"
        );

        let response = self
            .client
            .post(format!("{}{}", self.base_url, ORDER_PATH))
            .header("Content-Type", "application/json")
            .header("OK-ACCESS-KEY", &self.api_key)
            .header("OK-ACCESS-SIGN", signature)
            .header("OK-ACCESS-TIMESTAMP", &timestamp)
            .header("OK-ACCESS-PASSPHRASE", &self.passphrase)
            .body(body)
            .send()
            .await?;

        let envelope: Envelope<OrderAckData> = read_envelope(response).await?;
        interpret_order_response(envelope)
    }
}

#[async_trait]
impl OrderGateway for OrderClient {
    async fn place_order(
        &self,
        instrument: &str,
        side: Side,
        size: f64,
        price: f64,
    ) -> Result<OrderResult> {
        self.place_limit_order(instrument, side, size, price).await
    }
}

fn interpret_order_response(envelope: Envelope<OrderAckData>) -> Result<OrderResult> {
    let ok = envelope.is_ok();
    let Envelope { code, msg, data } = envelope;

    if !ok {
        // Per-order failures carry the real reason in sMsg
        let message = match data.first() {
            Some(ack) if !ack.s_msg.is_empty() && ack.s_msg != msg => {
                format!("{} ({}: {})", msg, ack.s_code, ack.s_msg)
            }
            _ => msg,
        };
        return Err(Error::ExchangeRejected { code, message });
    }

    let ack = data
        .into_iter()
        .next()
        .ok_or_else(|| Error::Decode("order accepted but no acknowledgement returned".into()))?;

    Ok(OrderResult {
        code,
        msg,
        ord_id: ack.ord_id,
        cl_ord_id: ack.cl_ord_id,
        s_code: ack.s_code,
        s_msg: ack.s_msg,
    })
}
