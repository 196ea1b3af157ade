//! The trading engine: polling loop, trade triggers and PnL settlement.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use common::logging;
use execution_core::{ExecutionError, Order, OrderSide, OrderType, Trader};
use metrics::SharedMetrics;
use model::{InstrumentSpec, MarketSnapshot};

use crate::config::{CloseFailurePolicy, EngineConfig};
use crate::error::SkipReason;
use crate::instruments::{fee_rate, InstrumentCache};
use crate::market_data::MarketData;
use crate::position::{settle, Position, PositionBook};
use crate::signal::{self, basis_deviation, Observation};
use crate::symbol_state::SymbolStates;

/// What one trade evaluation ended in.
#[derive(Debug)]
pub enum TradeOutcome {
    /// An order was accepted and a position recorded.
    Placed(Order),
    /// A gate declined.
    Skipped(SkipReason),
    /// The trader failed; nothing was recorded.
    Failed(ExecutionError),
}

impl TradeOutcome {
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed(_))
    }
}

/// Polls market data for every configured symbol, trades on basis
/// dislocations and closes positions once their holding period ends.
///
/// All mutable state is owned here and only touched from the loop.
pub struct Engine {
    config: EngineConfig,
    market: Arc<dyn MarketData>,
    trader: Arc<dyn Trader>,
    states: SymbolStates,
    book: PositionBook,
    instruments: InstrumentCache,
    metrics: SharedMetrics,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        market: Arc<dyn MarketData>,
        trader: Arc<dyn Trader>,
        metrics: SharedMetrics,
    ) -> Self {
        let states = SymbolStates::new(config.symbols.iter().cloned(), config.cooldown);
        Self {
            config,
            market,
            trader,
            states,
            book: PositionBook::new(),
            instruments: InstrumentCache::new(),
            metrics,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn states(&self) -> &SymbolStates {
        &self.states
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub fn instruments(&self) -> &InstrumentCache {
        &self.instruments
    }

    pub fn metrics(&self) -> &SharedMetrics {
        &self.metrics
    }

    /// Run until `shutdown_rx` turns true or its sender is dropped.
    ///
    /// Shutdown is only observed between handler runs; an in-flight tick
    /// always completes.
    pub async fn run(&mut self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            target: logging::INFO,
            symbols = ?self.config.symbols,
            trader = self.trader.name(),
            query_interval_ms = self.config.query_interval.as_millis() as u64,
            "starting engine"
        );

        self.log_startup_snapshot().await;
        if self.config.flatten_on_start {
            self.flatten_existing_positions().await;
        }

        let start = Instant::now();
        let mut tick_timer =
            interval_at(start + self.config.query_interval, self.config.query_interval);
        tick_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut summary_timer =
            interval_at(start + self.config.metrics_interval, self.config.metrics_interval);
        summary_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!(target: logging::INFO, "shutdown signal received");
                        break;
                    }
                }

                _ = tick_timer.tick() => {
                    self.tick().await;
                }

                _ = summary_timer.tick() => {
                    self.log_summary().await;
                }
            }
        }

        self.log_summary().await;
        info!(target: logging::INFO, "engine stopped");
    }

    /// Process every configured symbol once, in order.
    pub async fn tick(&mut self) {
        self.metrics.inc_ticks();
        let symbols = self.config.symbols.clone();
        for symbol in &symbols {
            self.process_symbol(symbol).await;
        }
    }

    /// Fetch, evaluate and settle one symbol.
    ///
    /// A failed read is logged and abandons only this symbol for this tick.
    pub async fn process_symbol(&mut self, symbol: &str) -> Option<TradeOutcome> {
        let snapshot = match self.market.snapshot(symbol).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.metrics.inc_symbol_failures();
                error!(
                    target: logging::ERROR,
                    symbol,
                    network = e.is_network(),
                    status = e.is_status(),
                    decode = e.is_decode(),
                    error = %e,
                    "market data fetch failed"
                );
                return None;
            }
        };
        self.metrics.inc_snapshots_fetched();

        let now = Instant::now();
        let outcome = self.evaluate_and_trade(&snapshot, now).await;
        self.evaluate_pnl(&snapshot, now).await;
        Some(outcome)
    }

    /// Score the snapshot and, if every gate passes, place one limit order.
    ///
    /// `now` stamps the cooldown and the new position's entry time.
    pub async fn evaluate_and_trade(
        &mut self,
        snapshot: &MarketSnapshot,
        now: Instant,
    ) -> TradeOutcome {
        let symbol = snapshot.symbol.as_str();

        let deviation = match basis_deviation(snapshot.mark, snapshot.index) {
            Some(dev) if snapshot.has_valid_prices() => dev,
            _ => return self.skipped(symbol, SkipReason::InvalidPrices),
        };

        let state = self.states.get_mut(symbol);
        let z = state.observe(deviation);
        let obs = Observation {
            snapshot,
            deviation,
            z,
            cooldown_remaining: state.cooldown_remaining(now),
        };

        let side = match signal::direction(&obs, &self.config) {
            Ok(side) => side,
            Err(reason) => return self.skipped(symbol, reason),
        };

        let size_increment = self
            .instrument(symbol)
            .await
            .map(|spec| spec.size_increment)
            .unwrap_or(Decimal::ZERO);

        let decision = match signal::size_order(&obs, side, size_increment, &self.config) {
            Ok(decision) => decision,
            Err(reason) => return self.skipped(symbol, reason),
        };

        let order = match self
            .trader
            .place_order(
                symbol,
                decision.side,
                OrderType::Limit,
                decision.price,
                decision.size,
            )
            .await
        {
            Ok(order) => order,
            Err(e) => {
                self.metrics.inc_placement_failures();
                error!(
                    target: logging::ERROR,
                    symbol,
                    side = %decision.side,
                    price = %decision.price,
                    size = %decision.size,
                    error = %e,
                    "order placement failed"
                );
                return TradeOutcome::Failed(e);
            }
        };

        self.states.get_mut(symbol).mark_triggered(now);
        self.book.open(
            symbol,
            Position {
                order_id: order.id.clone(),
                side: decision.side,
                entry_price: decision.price,
                entry_time: now,
                order_type: OrderType::Limit,
                size: decision.size,
            },
        );
        self.metrics.inc_triggers();

        info!(
            target: logging::TRADES,
            symbol,
            action = decision.side.position_side().as_str(),
            dev = decision.deviation,
            z = decision.z,
            price = %decision.price,
            size = %decision.size,
            order_id = %order.id,
            "strategy trigger"
        );

        TradeOutcome::Placed(order)
    }

    /// Close every position of this symbol whose holding period has elapsed
    /// and book its net PnL at the snapshot's last price.
    ///
    /// Positions opened at `now` are left for a later pass.
    pub async fn evaluate_pnl(&mut self, snapshot: &MarketSnapshot, now: Instant) {
        let symbol = snapshot.symbol.as_str();
        let exit_price = snapshot.last;
        if exit_price.is_zero() {
            return;
        }

        let due = self.book.take_due(symbol, now, self.config.hold_duration);
        for position in due {
            self.settle_position(symbol, position, exit_price).await;
        }
    }

    async fn settle_position(&mut self, symbol: &str, position: Position, exit_price: Decimal) {
        let spec = self.instrument(symbol).await;
        let rate = fee_rate(spec.as_ref(), position.order_type);
        let settlement = settle(&position, exit_price, rate);

        let closed = self
            .trader
            .close_position(
                symbol,
                position.side,
                OrderType::Market,
                Decimal::ZERO,
                position.size,
            )
            .await;

        if let Err(e) = closed {
            self.metrics.inc_close_failures();
            error!(
                target: logging::ERROR,
                symbol,
                order_id = %position.order_id,
                policy = ?self.config.close_failure_policy,
                error = %e,
                "position close failed"
            );
            if self.config.close_failure_policy == CloseFailurePolicy::KeepOpen {
                self.book.restore(symbol, position);
                return;
            }
        }

        self.book.book(symbol, settlement.net);
        self.metrics.inc_positions_closed();

        info!(
            target: logging::PNL,
            symbol,
            side = position.side.position_side().as_str(),
            entry = %position.entry_price,
            exit = %exit_price,
            gross = %settlement.gross,
            fee = %settlement.fee,
            net = %settlement.net,
            order_type = %position.order_type,
            "position closed"
        );
    }

    /// Contract metadata for `symbol`, fetched on first use.
    ///
    /// Failures are logged and not cached.
    async fn instrument(&mut self, symbol: &str) -> Option<InstrumentSpec> {
        if let Some(spec) = self.instruments.get(symbol) {
            return Some(spec.clone());
        }

        match self.market.instrument(symbol).await {
            Ok(Some(spec)) => {
                debug!(
                    target: logging::INFO,
                    symbol,
                    size_increment = %spec.size_increment,
                    maker_fee = %spec.maker_fee_rate,
                    taker_fee = %spec.taker_fee_rate,
                    "instrument cached"
                );
                self.instruments.insert(spec.clone());
                Some(spec)
            }
            Ok(None) => {
                warn!(target: logging::ERROR, symbol, "no contract metadata for symbol");
                None
            }
            Err(e) => {
                error!(target: logging::ERROR, symbol, error = %e, "contract metadata fetch failed");
                None
            }
        }
    }

    fn skipped(&self, symbol: &str, reason: SkipReason) -> TradeOutcome {
        self.metrics.inc_skips();
        match &reason {
            SkipReason::NotionalTooLarge { .. } => {
                info!(target: logging::INFO, symbol, reason = %reason, "trade skipped");
            }
            _ => {
                debug!(target: logging::INFO, symbol, gate = reason.label(), reason = %reason, "trade skipped");
            }
        }
        TradeOutcome::Skipped(reason)
    }

    /// Log collateral and exchange positions before trading starts.
    pub async fn log_startup_snapshot(&self) {
        match self.market.collateral().await {
            Ok(c) if c.is_unknown() => {
                info!(
                    target: logging::METRICS,
                    equity_usdt = "unknown",
                    available_usdt = "unknown",
                    "startup collateral"
                );
            }
            Ok(c) => {
                info!(
                    target: logging::METRICS,
                    equity_usdt = %c.equity,
                    available_usdt = %c.available,
                    "startup collateral"
                );
            }
            Err(e) => {
                error!(target: logging::ERROR, error = %e, "startup collateral fetch failed");
            }
        }

        match self.market.positions().await {
            Ok(positions) => {
                for p in positions {
                    info!(
                        target: logging::METRICS,
                        symbol = %p.symbol,
                        side = p.side.as_str(),
                        size = %p.size,
                        leverage = %p.leverage,
                        "startup position"
                    );
                }
            }
            Err(e) => {
                error!(target: logging::ERROR, error = %e, "startup position fetch failed");
            }
        }
    }

    /// Market-close every position the exchange reports.
    pub async fn flatten_existing_positions(&self) {
        let positions = match self.market.positions().await {
            Ok(positions) => positions,
            Err(e) => {
                error!(target: logging::ERROR, error = %e, "flatten: position fetch failed");
                return;
            }
        };

        for p in positions {
            let side = OrderSide::opening(p.side);
            match self
                .trader
                .close_position(&p.symbol, side, OrderType::Market, Decimal::ZERO, p.size)
                .await
            {
                Ok(order) => info!(
                    target: logging::TRADES,
                    symbol = %p.symbol,
                    side = p.side.as_str(),
                    size = %p.size,
                    order_id = %order.id,
                    "flattened startup position"
                ),
                Err(e) => error!(
                    target: logging::ERROR,
                    symbol = %p.symbol,
                    error = %e,
                    "flatten: close failed"
                ),
            }
        }
    }

    /// Periodic summary of open exposure and realized PnL.
    pub async fn log_summary(&self) {
        info!(
            target: logging::METRICS,
            open_positions = self.book.open_count(),
            total_net_pnl = %self.book.total_realized(),
            "summary"
        );

        for (symbol, pnl) in self.book.realized_by_symbol() {
            info!(
                target: logging::METRICS,
                symbol,
                closed = pnl.closed,
                net_pnl = %pnl.net,
                "symbol pnl"
            );
        }

        match self.market.positions().await {
            Ok(positions) if !positions.is_empty() => {
                for p in positions {
                    info!(
                        target: logging::METRICS,
                        symbol = %p.symbol,
                        side = p.side.as_str(),
                        size = %p.size,
                        leverage = %p.leverage,
                        "position detail"
                    );
                }
            }
            _ => {
                for symbol in self.book.symbols() {
                    let (long, short) = self.book.exposure(symbol);
                    for (side, size) in [("long", long), ("short", short)] {
                        if size > Decimal::ZERO {
                            info!(
                                target: logging::METRICS,
                                symbol,
                                side,
                                size = %size,
                                leverage = "n/a",
                                "position detail"
                            );
                        }
                    }
                }
            }
        }

        let snapshot = self.metrics.snapshot();
        info!(
            target: logging::METRICS,
            status = %snapshot.health_status(),
            ticks = snapshot.ticks,
            failures = snapshot.symbol_failures,
            triggers = snapshot.triggers,
            skips = snapshot.skips,
            closed = snapshot.positions_closed,
            close_failures = snapshot.close_failures,
            "engine counters"
        );
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("symbols", &self.config.symbols)
            .field("trader", &self.trader.name())
            .field("open_positions", &self.book.open_count())
            .finish()
    }
}
