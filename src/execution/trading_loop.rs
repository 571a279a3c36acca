use crate::api::{MarketData, OrderGateway};
use crate::config::TradingSettings;
use crate::execution::PositionState;
use crate::indicators::moving_average;
use crate::models::{MarketSnapshot, Side};
use crate::strategy::{Decision, Strategy, LONG_MA_PERIOD, SHORT_MA_PERIOD};
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};

/// Per-loop parameters, fixed for the lifetime of the loop
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub instrument: String,
    pub candle_bar: String,
    pub candle_limit: usize,
    pub poll_interval: Duration,
}

impl From<&TradingSettings> for LoopSettings {
    fn from(settings: &TradingSettings) -> Self {
        Self {
            instrument: settings.instrument.clone(),
            candle_bar: settings.candle_bar.clone(),
            candle_limit: settings.candle_limit,
            poll_interval: settings.poll_interval(),
        }
    }
}

/// What happened during a single tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Market data could not be fetched; nothing was decided
    Skipped { reason: String },
    /// No order this tick
    Held(MarketSnapshot),
    /// Order acknowledged and position updated
    Filled {
        side: Side,
        size: f64,
        price: f64,
        order_id: String,
    },
    /// Order submission failed or was refused before sending; position unchanged
    OrderFailed { side: Side, reason: String },
}

/// Polls market data, asks the strategy what to do and submits orders
///
/// Owns the position. Every error is contained inside `tick`, so a failed
/// fetch or a rejected order only ends the current tick.
pub struct TradingLoop<M, G> {
    market: M,
    gateway: G,
    strategy: Box<dyn Strategy>,
    settings: LoopSettings,
    position: PositionState,
}

impl<M: MarketData, G: OrderGateway> TradingLoop<M, G> {
    pub fn new(market: M, gateway: G, strategy: Box<dyn Strategy>, settings: LoopSettings) -> Self {
        Self {
            market,
            gateway,
            strategy,
            settings,
            position: PositionState::Flat,
        }
    }

    pub fn position(&self) -> PositionState {
        self.position
    }

    /// Run one fetch → compute → decide → submit cycle
    pub async fn tick(&mut self) -> TickOutcome {
        let instrument = self.settings.instrument.as_str();

        let price = match self.market.fetch_price(instrument).await {
            Ok(price) => price,
            Err(e) => {
                tracing::warn!(instrument = %instrument, "Failed to fetch price: {}", e);
                return TickOutcome::Skipped {
                    reason: format!("price: {}", e),
                };
            }
        };

        let candles = if self.strategy.needs_candles() {
            match self
                .market
                .fetch_candles(instrument, &self.settings.candle_bar, self.settings.candle_limit)
                .await
            {
                Ok(candles) => candles,
                Err(e) => {
                    tracing::warn!(instrument = %instrument, "Failed to fetch candles: {}", e);
                    return TickOutcome::Skipped {
                        reason: format!("candles: {}", e),
                    };
                }
            }
        } else {
            Vec::new()
        };

        let snapshot = MarketSnapshot {
            price,
            ma_short: moving_average(&candles, SHORT_MA_PERIOD),
            ma_long: moving_average(&candles, LONG_MA_PERIOD),
        };

        tracing::info!(
            position = self.position.quantity(),
            trend = %snapshot.trend(),
            "{} price: {:.8}, MA{}: {:.8}, MA{}: {:.8}",
            instrument,
            snapshot.price,
            SHORT_MA_PERIOD,
            snapshot.ma_short,
            LONG_MA_PERIOD,
            snapshot.ma_long
        );

        match self.strategy.decide(&snapshot, &self.position) {
            Decision::Hold => TickOutcome::Held(snapshot),
            Decision::Buy { size, price } => {
                tracing::info!(
                    "Buy signal ({}): {:.8} {} @ {:.8}",
                    self.strategy.name(),
                    size,
                    instrument,
                    price
                );
                self.execute(Side::Buy, size, price).await
            }
            Decision::Sell { size, price } => {
                tracing::info!(
                    "Sell signal ({}): {:.8} {} @ {:.8}",
                    self.strategy.name(),
                    size,
                    instrument,
                    price
                );
                self.execute(Side::Sell, size, price).await
            }
        }
    }

    /// Submit an order and update the position only on acknowledgement
    async fn execute(&mut self, side: Side, size: f64, price: f64) -> TickOutcome {
        // A buy that could not be recorded is never sent
        if side == Side::Buy {
            if let Err(e) = self.position.can_open(size) {
                tracing::error!(
                    instrument = %self.settings.instrument,
                    "Refusing buy of {:.8}: {}",
                    size,
                    e
                );
                return TickOutcome::OrderFailed {
                    side,
                    reason: e.to_string(),
                };
            }
        }

        let result = self
            .gateway
            .place_order(&self.settings.instrument, side, size, price)
            .await;

        let ack = match result {
            Ok(ack) => ack,
            Err(e) => {
                tracing::error!(
                    instrument = %self.settings.instrument,
                    side = %side,
                    "Order failed: {}",
                    e
                );
                return TickOutcome::OrderFailed {
                    side,
                    reason: e.to_string(),
                };
            }
        };

        match side {
            Side::Buy => {
                self.position = PositionState::Holding { quantity: size };
            }
            Side::Sell => {
                self.position.close();
            }
        }

        tracing::info!(
            order_id = %ack.ord_id,
            position = self.position.quantity(),
            "✓ {} filled: {:.8} {} @ {:.8}",
            side,
            size,
            self.settings.instrument,
            price
        );

        TickOutcome::Filled {
            side,
            size,
            price,
            order_id: ack.ord_id,
        }
    }

    /// Tick every poll interval until `shutdown` flips to true
    ///
    /// The first tick fires one interval after start. Ticks never overlap;
    /// a slow tick delays the next one and missed ticks are skipped. Returns
    /// early after the first fill when the strategy asks for it.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        if *shutdown.borrow() {
            return;
        }

        let period = self.settings.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            "🚀 Trading loop started for {} ({}, every {:?})",
            self.settings.instrument,
            self.strategy.name(),
            period
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::info!("Trading loop cancelled");
                        break;
                    }
                    continue;
                }
            }

            let outcome = self.tick().await;

            if matches!(outcome, TickOutcome::Filled { .. }) && self.strategy.stop_after_fill() {
                tracing::info!("Target trade done, stopping trading loop");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Candle, OrderResult};
    use crate::strategy::{CrossoverStrategy, MonitorStrategy, SingleShotStrategy};
    use crate::{Error, Result};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MarketScript {
        prices: VecDeque<Option<f64>>,
        candles: VecDeque<Option<Vec<Candle>>>,
        default_price: Option<f64>,
        default_candles: Vec<Candle>,
        price_calls: usize,
        candle_calls: usize,
    }

    #[derive(Clone, Default)]
    struct FakeMarket(Arc<Mutex<MarketScript>>);

    impl FakeMarket {
        fn steady(price: f64, candles: Vec<Candle>) -> Self {
            let market = Self::default();
            {
                let mut script = market.0.lock().unwrap();
                script.default_price = Some(price);
                script.default_candles = candles;
            }
            market
        }

        fn push(&self, price: Option<f64>, candles: Option<Vec<Candle>>) {
            let mut script = self.0.lock().unwrap();
            script.prices.push_back(price);
            script.candles.push_back(candles);
        }

        fn push_price(&self, price: Option<f64>) {
            self.0.lock().unwrap().prices.push_back(price);
        }

        fn price_calls(&self) -> usize {
            self.0.lock().unwrap().price_calls
        }

        fn candle_calls(&self) -> usize {
            self.0.lock().unwrap().candle_calls
        }
    }

    #[async_trait]
    impl MarketData for FakeMarket {
        async fn fetch_price(&self, _instrument: &str) -> Result<f64> {
            let mut script = self.0.lock().unwrap();
            script.price_calls += 1;
            let price = script.prices.pop_front().unwrap_or(script.default_price);
            price.ok_or_else(|| Error::Transport("connection reset by peer".into()))
        }

        async fn fetch_candles(
            &self,
            _instrument: &str,
            _bar: &str,
            _limit: usize,
        ) -> Result<Vec<Candle>> {
            let mut script = self.0.lock().unwrap();
            script.candle_calls += 1;
            let fallback = Some(script.default_candles.clone());
            let candles = script.candles.pop_front().unwrap_or(fallback);
            candles.ok_or_else(|| Error::Decode("unexpected response shape".into()))
        }
    }

    #[derive(Default)]
    struct GatewayScript {
        results: VecDeque<bool>,
        orders: Vec<(Side, f64, f64)>,
    }

    #[derive(Clone, Default)]
    struct FakeGateway(Arc<Mutex<GatewayScript>>);

    impl FakeGateway {
        fn push_result(&self, ok: bool) {
            self.0.lock().unwrap().results.push_back(ok);
        }

        fn orders(&self) -> Vec<(Side, f64, f64)> {
            self.0.lock().unwrap().orders.clone()
        }
    }

    #[async_trait]
    impl OrderGateway for FakeGateway {
        async fn place_order(
            &self,
            _instrument: &str,
            side: Side,
            size: f64,
            price: f64,
        ) -> Result<OrderResult> {
            let mut script = self.0.lock().unwrap();
            script.orders.push((side, size, price));
            let n = script.orders.len();

            if script.results.pop_front().unwrap_or(true) {
                Ok(OrderResult {
                    code: "0".into(),
                    msg: String::new(),
                    ord_id: format!("ord-{}", n),
                    cl_ord_id: String::new(),
                    s_code: "0".into(),
                    s_msg: String::new(),
                })
            } else {
                Err(Error::ExchangeRejected {
                    code: "51008".into(),
                    message: "Insufficient balance".into(),
                })
            }
        }
    }

    fn candles(closes: &[(usize, f64)]) -> Vec<Candle> {
        closes
            .iter()
            .flat_map(|&(count, close)| std::iter::repeat(close).take(count))
            .enumerate()
            .map(|(i, close)| Candle {
                timestamp: 1_700_000_000_000 - i as i64 * 300_000,
                open: close,
                high: close,
                low: close,
                close,
            })
            .collect()
    }

    /// MA20 = 1.0, MA50 = 0.5
    fn bullish() -> Vec<Candle> {
        candles(&[(25, 1.0), (25, 0.0)])
    }

    /// MA20 = 0.5, MA50 = 0.8
    fn bearish() -> Vec<Candle> {
        candles(&[(20, 0.5), (30, 1.0)])
    }

    fn settings(poll_interval: Duration) -> LoopSettings {
        LoopSettings {
            instrument: "ZETA-USDT".to_string(),
            candle_bar: "5m".to_string(),
            candle_limit: 50,
            poll_interval,
        }
    }

    fn crossover_loop(
        market: &FakeMarket,
        gateway: &FakeGateway,
    ) -> TradingLoop<FakeMarket, FakeGateway> {
        TradingLoop::new(
            market.clone(),
            gateway.clone(),
            Box::new(CrossoverStrategy::new(0.7, 0.80, 100.0)),
            settings(Duration::from_secs(1)),
        )
    }

    #[test]
    fn test_fixture_averages() {
        assert_eq!(moving_average(&bullish(), 20), 1.0);
        assert_eq!(moving_average(&bullish(), 50), 0.5);
        assert_eq!(moving_average(&bearish(), 20), 0.5);
        assert_eq!(moving_average(&bearish(), 50), 0.8);
    }

    #[tokio::test]
    async fn test_buy_then_sell_round_trip() {
        let market = FakeMarket::default();
        let gateway = FakeGateway::default();
        let mut trading_loop = crossover_loop(&market, &gateway);

        market.push(Some(0.65), Some(bullish()));
        let outcome = trading_loop.tick().await;

        let expected_size = 100.0 / 0.65;
        assert_eq!(
            outcome,
            TickOutcome::Filled {
                side: Side::Buy,
                size: expected_size,
                price: 0.65,
                order_id: "ord-1".into()
            }
        );
        assert_eq!(
            trading_loop.position(),
            PositionState::Holding {
                quantity: expected_size
            }
        );

        market.push(Some(0.6), Some(bearish()));
        let outcome = trading_loop.tick().await;

        assert!(matches!(outcome, TickOutcome::Filled { side: Side::Sell, .. }));
        assert_eq!(trading_loop.position(), PositionState::Flat);
        assert_eq!(
            gateway.orders(),
            vec![(Side::Buy, expected_size, 0.65), (Side::Sell, expected_size, 0.6)]
        );
    }

    #[tokio::test]
    async fn test_sell_above_threshold_even_when_bullish() {
        let market = FakeMarket::default();
        let gateway = FakeGateway::default();
        let mut trading_loop = crossover_loop(&market, &gateway);

        market.push(Some(0.65), Some(bullish()));
        market.push(Some(0.75), Some(bullish()));
        market.push(Some(0.85), Some(bullish()));

        trading_loop.tick().await;
        assert!(matches!(trading_loop.tick().await, TickOutcome::Held(_)));
        trading_loop.tick().await;

        let orders = gateway.orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[1], (Side::Sell, 100.0 / 0.65, 0.85));
        assert!(trading_loop.position().is_flat());
    }

    #[tokio::test]
    async fn test_failed_buy_stays_flat_and_retries() {
        let market = FakeMarket::steady(0.65, bullish());
        let gateway = FakeGateway::default();
        let mut trading_loop = crossover_loop(&market, &gateway);

        gateway.push_result(false);
        let outcome = trading_loop.tick().await;

        assert!(matches!(outcome, TickOutcome::OrderFailed { side: Side::Buy, .. }));
        assert_eq!(trading_loop.position(), PositionState::Flat);

        // Next tick is the retry
        let outcome = trading_loop.tick().await;
        assert!(matches!(outcome, TickOutcome::Filled { side: Side::Buy, .. }));
        assert_eq!(gateway.orders().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_sell_keeps_position() {
        let market = FakeMarket::default();
        let gateway = FakeGateway::default();
        let mut trading_loop = crossover_loop(&market, &gateway);

        market.push(Some(0.65), Some(bullish()));
        trading_loop.tick().await;
        let held = trading_loop.position();

        gateway.push_result(false);
        market.push(Some(0.6), Some(bearish()));
        let outcome = trading_loop.tick().await;

        assert!(matches!(outcome, TickOutcome::OrderFailed { side: Side::Sell, .. }));
        assert_eq!(trading_loop.position(), held);
    }

    #[tokio::test]
    async fn test_price_failure_skips_tick() {
        let market = FakeMarket::default();
        let gateway = FakeGateway::default();
        let mut trading_loop = crossover_loop(&market, &gateway);

        market.push_price(None);
        let outcome = trading_loop.tick().await;

        assert!(matches!(outcome, TickOutcome::Skipped { .. }));
        assert_eq!(market.candle_calls(), 0);
        assert!(gateway.orders().is_empty());
        assert!(trading_loop.position().is_flat());
    }

    #[tokio::test]
    async fn test_candle_failure_keeps_position() {
        let market = FakeMarket::default();
        let gateway = FakeGateway::default();
        let mut trading_loop = crossover_loop(&market, &gateway);

        market.push(Some(0.65), Some(bullish()));
        trading_loop.tick().await;
        let held = trading_loop.position();

        market.push(Some(0.9), None);
        let outcome = trading_loop.tick().await;

        match outcome {
            TickOutcome::Skipped { reason } => assert!(reason.starts_with("candles")),
            other => panic!("expected skip, got {:?}", other),
        }
        assert_eq!(trading_loop.position(), held);
        assert_eq!(gateway.orders().len(), 1);
    }

    #[tokio::test]
    async fn test_short_history_still_compares_averages() {
        // 30 candles: MA20 = 1.0, MA50 falls back to zero
        let market = FakeMarket::steady(0.65, candles(&[(30, 1.0)]));
        let gateway = FakeGateway::default();
        let mut trading_loop = crossover_loop(&market, &gateway);

        let outcome = trading_loop.tick().await;

        assert!(matches!(outcome, TickOutcome::Filled { side: Side::Buy, .. }));
        assert_eq!(gateway.orders(), vec![(Side::Buy, 100.0 / 0.65, 0.65)]);
    }

    #[tokio::test]
    async fn test_zeroed_recent_closes_trigger_sell() {
        let market = FakeMarket::default();
        let gateway = FakeGateway::default();
        let mut trading_loop = crossover_loop(&market, &gateway);

        market.push(Some(0.65), Some(bullish()));
        trading_loop.tick().await;
        let quantity = trading_loop.position().quantity();

        // Unparseable recent closes come back as zero: MA20 = 0.0, MA50 = 0.6
        market.push(Some(0.75), Some(candles(&[(20, 0.0), (30, 1.0)])));
        let outcome = trading_loop.tick().await;

        assert!(matches!(outcome, TickOutcome::Filled { side: Side::Sell, .. }));
        assert_eq!(gateway.orders()[1], (Side::Sell, quantity, 0.75));
        assert!(trading_loop.position().is_flat());
    }

    struct AlwaysBuy;

    impl Strategy for AlwaysBuy {
        fn decide(&self, snapshot: &MarketSnapshot, _position: &PositionState) -> Decision {
            Decision::Buy {
                size: 10.0,
                price: snapshot.price,
            }
        }

        fn name(&self) -> &str {
            "AlwaysBuy"
        }

        fn needs_candles(&self) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_buy_while_holding_is_not_sent() {
        let market = FakeMarket::steady(0.65, Vec::new());
        let gateway = FakeGateway::default();
        let mut trading_loop = TradingLoop::new(
            market.clone(),
            gateway.clone(),
            Box::new(AlwaysBuy),
            settings(Duration::from_secs(1)),
        );

        assert!(matches!(trading_loop.tick().await, TickOutcome::Filled { .. }));

        match trading_loop.tick().await {
            TickOutcome::OrderFailed { side, reason } => {
                assert_eq!(side, Side::Buy);
                assert!(reason.contains("already holding"));
            }
            other => panic!("expected refusal, got {:?}", other),
        }
        assert_eq!(gateway.orders().len(), 1);
        assert_eq!(trading_loop.position(), PositionState::Holding { quantity: 10.0 });
    }

    #[tokio::test]
    async fn test_monitor_never_orders() {
        let market = FakeMarket::steady(0.01, bullish());
        let gateway = FakeGateway::default();
        let mut trading_loop = TradingLoop::new(
            market.clone(),
            gateway.clone(),
            Box::new(MonitorStrategy),
            settings(Duration::from_secs(1)),
        );

        for _ in 0..3 {
            assert!(matches!(trading_loop.tick().await, TickOutcome::Held(_)));
        }
        assert!(gateway.orders().is_empty());
        assert_eq!(market.candle_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_after_single_shot_fill() {
        let market = FakeMarket::default();
        let gateway = FakeGateway::default();
        market.push(Some(0.9), None);
        market.push(Some(0.8), None);
        market.push(Some(0.5), None);

        let mut trading_loop = TradingLoop::new(
            market.clone(),
            gateway.clone(),
            Box::new(SingleShotStrategy::new(0.7, 100.0)),
            settings(Duration::from_secs(1)),
        );

        let (_tx, rx) = watch::channel(false);
        trading_loop.run(rx).await;

        assert_eq!(market.price_calls(), 3);
        assert_eq!(market.candle_calls(), 0);
        assert_eq!(gateway.orders(), vec![(Side::Buy, 200.0, 0.5)]);
        assert_eq!(trading_loop.position(), PositionState::Holding { quantity: 200.0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_cancelled() {
        let market = FakeMarket::steady(1.0, bullish());
        let gateway = FakeGateway::default();
        let mut trading_loop = TradingLoop::new(
            market.clone(),
            gateway.clone(),
            Box::new(MonitorStrategy),
            settings(Duration::from_secs(1)),
        );

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            let _ = tx.send(true);
        });

        trading_loop.run(rx).await;

        assert_eq!(market.price_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_survives_failing_ticks() {
        let market = FakeMarket::default();
        let gateway = FakeGateway::default();
        market.push_price(None);
        market.push(Some(0.65), None);
        market.push(Some(0.65), Some(bullish()));

        let mut trading_loop = TradingLoop::new(
            market.clone(),
            gateway.clone(),
            Box::new(CrossoverStrategy::new(0.7, 0.80, 100.0)),
            settings(Duration::from_secs(1)),
        );

        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            let _ = tx.send(true);
        });

        trading_loop.run(rx).await;

        assert_eq!(gateway.orders().len(), 1);
        assert!(!trading_loop.position().is_flat());
    }

    #[tokio::test]
    async fn test_run_returns_when_already_cancelled() {
        let market = FakeMarket::steady(0.65, bullish());
        let gateway = FakeGateway::default();
        let mut trading_loop = crossover_loop(&market, &gateway);

        let (tx, rx) = watch::channel(true);
        trading_loop.run(rx).await;
        drop(tx);

        assert_eq!(market.price_calls(), 0);
    }
}
