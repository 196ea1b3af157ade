//! The exchange reads the engine depends on.

use async_trait::async_trait;
use common::logging;
use model::{Collateral, ExchangePosition, InstrumentSpec, MarketSnapshot};
use rust_decimal::Decimal;
use tracing::debug;
use weex_rest::{WeexRestClient, WeexRestError};

/// Order book depth requested per tick.
pub const DEPTH_LIMIT: u32 = 15;

/// Market and account reads used by the engine.
#[async_trait]
pub trait MarketData: Send + Sync {
    /// Ticker, index, depth and funding rate for `symbol`, fetched in that
    /// order. The first failure aborts the snapshot.
    async fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot, WeexRestError>;

    /// Contract metadata for `symbol`, `None` if the exchange lists no such contract.
    async fn instrument(&self, symbol: &str) -> Result<Option<InstrumentSpec>, WeexRestError>;

    /// Positions currently held on the exchange account.
    async fn positions(&self) -> Result<Vec<ExchangePosition>, WeexRestError>;

    /// USDT collateral on the exchange account.
    async fn collateral(&self) -> Result<Collateral, WeexRestError>;
}

#[async_trait]
impl MarketData for WeexRestClient {
    async fn snapshot(&self, symbol: &str) -> Result<MarketSnapshot, WeexRestError> {
        let ticker = self.get_ticker(symbol).await?;
        debug!(
            target: logging::INFO,
            symbol,
            last = %ticker.last(),
            mark = %ticker.mark_price(),
            "ticker"
        );

        let index = self.get_index(symbol).await?.index();
        debug!(target: logging::INFO, symbol, index = %index, "index");

        let depth = self.get_depth(symbol, DEPTH_LIMIT).await?;
        debug!(
            target: logging::INFO,
            symbol,
            asks = depth.asks.len(),
            bids = depth.bids.len(),
            "depth"
        );

        let funding_rate = self
            .get_current_fund_rate(symbol)
            .await?
            .first()
            .map(|r| r.funding_rate())
            .unwrap_or(Decimal::ZERO);
        debug!(target: logging::INFO, symbol, funding_rate = %funding_rate, "funding rate");

        Ok(MarketSnapshot {
            symbol: symbol.to_string(),
            last: ticker.last(),
            mark: ticker.mark_price(),
            index,
            best_bid: depth.best_bid(),
            best_ask: depth.best_ask(),
            funding_rate,
            timestamp_ms: ticker.timestamp_ms(),
        })
    }

    async fn instrument(&self, symbol: &str) -> Result<Option<InstrumentSpec>, WeexRestError> {
        let contracts = self.get_contracts(Some(symbol)).await?;
        Ok(contracts
            .iter()
            .find(|c| c.symbol == symbol)
            .or_else(|| contracts.first())
            .map(|c| c.to_instrument_spec()))
    }

    async fn positions(&self) -> Result<Vec<ExchangePosition>, WeexRestError> {
        self.get_positions().await
    }

    async fn collateral(&self) -> Result<Collateral, WeexRestError> {
        self.get_collateral_usdt().await
    }
}
