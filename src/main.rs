use clap::Parser;
use okx_trendbot::config::{Settings, StrategyKind};
use okx_trendbot::execution::{LoopSettings, TradingLoop};
use okx_trendbot::{strategy, MarketDataClient, OrderClient};
use std::path::PathBuf;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "okx-trendbot")]
#[command(about = "MA crossover trading bot for OKX spot markets")]
#[command(version)]
struct Cli {
    /// Path to configuration file (defaults to config/trendbot.* if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the instrument, e.g. BTC-USDT
    #[arg(short, long)]
    instrument: Option<String>,

    /// Override the strategy
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyKind>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(instrument) = cli.instrument {
        settings.trading.instrument = instrument;
    }
    if let Some(kind) = cli.strategy {
        settings.trading.strategy = kind;
    }
    settings.validate()?;

    tracing::info!("🚀 Starting trading bot for {}", settings.trading.instrument);
    tracing::info!("\n📊 Configuration:");
    tracing::info!("  Strategy: {:?}", settings.trading.strategy);
    tracing::info!("  Interval: {}s", settings.trading.poll_interval_secs);
    tracing::info!("  Buy threshold: {}", settings.trading.buy_threshold);
    tracing::info!("  Sell threshold: {}", settings.trading.sell_threshold);
    tracing::info!("  Trade size: {}", settings.trading.trade_size);
    tracing::info!(
        "  Candles: {} x {}",
        settings.trading.candle_limit,
        settings.trading.candle_bar
    );

    let market = MarketDataClient::new(&settings.okx)?;
    let orders = OrderClient::new(&settings.okx)?;
    let mut trading_loop = TradingLoop::new(
        market,
        orders,
        strategy::from_settings(&settings.trading),
        LoopSettings::from(&settings.trading),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("\n⚠️  Received Ctrl+C, shutting down...");
            let _ = shutdown_tx.send(true);
        }
    });

    trading_loop.run(shutdown_rx).await;

    tracing::info!(
        "👋 Trading bot stopped (position: {:.8})",
        trading_loop.position().quantity()
    );
    Ok(())
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("okx_trendbot=info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
