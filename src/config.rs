//! Settings for the trading bot
//!
//! Loaded once at startup from an optional config file and `TRENDBOT_*`
//! environment variables, then handed to the clients and the trading loop.

use crate::api::DEFAULT_BASE_URL;
use crate::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Config file looked up when no explicit path is given (any supported extension)
pub const DEFAULT_CONFIG_NAME: &str = "config/trendbot";

const ENV_PREFIX: &str = "TRENDBOT";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub okx: OkxSettings,
    #[serde(default)]
    pub trading: TradingSettings,
}

/// Exchange credentials and endpoint
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct OkxSettings {
    pub api_key: String,
    pub secret_key: String,
    pub passphrase: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for OkxSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            passphrase: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl OkxSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl fmt::Debug for OkxSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OkxSettings")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Which decision policy drives the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// MA20/MA50 crossover with buy/sell price thresholds
    Crossover,
    /// Buy once below the buy threshold, then stop
    SingleShot,
    /// Log prices only, never trade
    Monitor,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TradingSettings {
    pub instrument: String,
    pub poll_interval_secs: u64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub trade_size: f64, // Quote currency spent per buy
    pub candle_bar: String,
    pub candle_limit: usize,
    pub strategy: StrategyKind,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            instrument: "ZETA-USDT".to_string(),
            poll_interval_secs: 1,
            buy_threshold: 0.7,
            sell_threshold: 0.80,
            trade_size: 100.0,
            candle_bar: "5m".to_string(),
            candle_limit: 50,
            strategy: StrategyKind::Crossover,
        }
    }
}

impl TradingSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Settings {
    /// Load settings from `path` (or the default config name if present) and the environment
    ///
    /// An explicit path must exist; the default one is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings: Settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let trading = &self.trading;

        if trading.instrument.trim().is_empty() {
            return Err(Error::Config("trading.instrument must be set".into()));
        }
        if trading.poll_interval_secs == 0 {
            return Err(Error::Config(
                "trading.poll_interval_secs must be greater than 0".into(),
            ));
        }
        if self.okx.base_url.trim().is_empty() {
            return Err(Error::Config("okx.base_url must be set".into()));
        }

        if trading.strategy == StrategyKind::Monitor {
            return Ok(());
        }

        if trading.trade_size <= 0.0 {
            return Err(Error::Config("trading.trade_size must be positive".into()));
        }
        if trading.buy_threshold <= 0.0 {
            return Err(Error::Config("trading.buy_threshold must be positive".into()));
        }
        if trading.strategy == StrategyKind::Crossover {
            if trading.sell_threshold <= 0.0 {
                return Err(Error::Config("trading.sell_threshold must be positive".into()));
            }
            if trading.candle_limit < crate::strategy::LONG_MA_PERIOD {
                return Err(Error::Config(format!(
                    "trading.candle_limit must be at least {} for the crossover strategy",
                    crate::strategy::LONG_MA_PERIOD
                )));
            }
        }

        for (name, value) in [
            ("okx.api_key", &self.okx.api_key),
            ("okx.secret_key", &self.okx.secret_key),
            ("okx.passphrase", &self.okx.passphrase),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must be set", name)));
            }
        }

        Ok(())
    }
}
