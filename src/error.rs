use thiserror::Error;

/// Errors surfaced by the exchange clients and settings loader
#[derive(Debug, Error)]
pub enum Error {
    /// Network, DNS or timeout failure talking to the exchange
    #[error("transport error: {0}")]
    Transport(String),

    /// Payload was malformed or did not have the expected shape
    #[error("decode error: {0}")]
    Decode(String),

    /// A list the exchange should have populated came back empty
    #[error("no data: {0}")]
    NoData(String),

    /// Exchange answered with a non-zero status code
    #[error("exchange rejected request (code {code}): {message}")]
    ExchangeRejected { code: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Error::Decode(err.to_string())
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}
