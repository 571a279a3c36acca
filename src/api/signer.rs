use crate::{Error, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

type HmacSha256 = Hmac<Sha256>;

/// Last timestamp handed out, in epoch milliseconds
static LAST_TIMESTAMP_MS: AtomicI64 = AtomicI64::new(0);

/// Signs private OKX requests with the account secret
///
/// The signature is `base64(HMAC-SHA256(secret, timestamp + method + path + body))`
/// with no delimiters between the parts.
#[derive(Clone)]
pub struct RequestSigner {
    secret: String,
}

impl RequestSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// The exact string that gets MAC'd
    pub fn prehash(timestamp: &str, method: &str, request_path: &str, body: &str) -> String {
        format!("{}{}{}{}", timestamp, method, request_path, body)
    }

    pub fn sign(
        &self,
        timestamp: &str,
        method: &str,
        request_path: &str,
        body: &str,
    ) -> Result<String> {
        let prehash = Self::prehash(timestamp, method, request_path, body);
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| Error::Config(format!("invalid signing key: {}", e)))?;
        mac.update(prehash.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Current UTC time in the millisecond ISO-8601 form OKX expects
    ///
    /// Never goes backwards within the process, even if the wall clock is
    /// stepped back.
    pub fn timestamp() -> String {
        let now = Utc::now();
        let millis = non_decreasing_millis(now.timestamp_millis(), &LAST_TIMESTAMP_MS);
        format_timestamp(DateTime::from_timestamp_millis(millis).unwrap_or(now))
    }
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("secret", &"<redacted>")
            .finish()
    }
}

fn non_decreasing_millis(now: i64, last: &AtomicI64) -> i64 {
    let previous = last.fetch_max(now, Ordering::SeqCst);
    now.max(previous)
}

/// e.g. `2020-12-08T09:08:57.715Z`
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
