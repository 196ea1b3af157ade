//! WEEX API request and response types.
//!
//! Numerics arrive as strings and stay strings here; the accessor methods
//! parse them on demand, yielding zero for empty or malformed values.

use std::collections::HashMap;
use std::str::FromStr;

use model::{Collateral, ExchangePosition, InstrumentSpec, PositionSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Coin id of USDT in the collateral list.
pub const USDT_COIN_ID: i64 = 2;

/// Parse an exchange numeric string, accepting plain and scientific notation.
///
/// Empty or malformed input yields zero.
pub fn parse_decimal(s: &str) -> Decimal {
    let s = s.trim();
    if s.is_empty() {
        return Decimal::ZERO;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .unwrap_or(Decimal::ZERO)
}

/// Response from GET /capi/v2/market/time.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerTimeResponse {
    pub timestamp: i64,
}

/// Response from GET /capi/v2/market/ticker.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Ticker {
    pub symbol: String,
    pub last: String,
    pub best_ask: String,
    pub best_bid: String,
    pub high_24h: String,
    pub low_24h: String,
    pub volume_24h: String,
    #[serde(rename = "priceChangePercent")]
    pub price_change_percent: String,
    pub base_volume: String,
    #[serde(rename = "markPrice")]
    pub mark_price: String,
    #[serde(rename = "indexPrice")]
    pub index_price: String,
    pub timestamp: String,
}

impl Ticker {
    pub fn last(&self) -> Decimal {
        parse_decimal(&self.last)
    }

    pub fn mark_price(&self) -> Decimal {
        parse_decimal(&self.mark_price)
    }

    pub fn index_price(&self) -> Decimal {
        parse_decimal(&self.index_price)
    }

    pub fn best_bid(&self) -> Decimal {
        parse_decimal(&self.best_bid)
    }

    pub fn best_ask(&self) -> Decimal {
        parse_decimal(&self.best_ask)
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp.trim().parse().unwrap_or(0)
    }
}

/// Response from GET /capi/v2/market/index.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IndexResponse {
    pub symbol: String,
    pub index: String,
    pub timestamp: String,
}

impl IndexResponse {
    pub fn index(&self) -> Decimal {
        parse_decimal(&self.index)
    }
}

/// Response from GET /capi/v2/market/depth.
///
/// Levels are `[price, size, ...]`, best first.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DepthResponse {
    pub asks: Vec<Vec<String>>,
    pub bids: Vec<Vec<String>>,
    pub timestamp: String,
}

impl DepthResponse {
    /// Price of the first ask level, if any.
    pub fn best_ask(&self) -> Option<Decimal> {
        top_price(&self.asks)
    }

    /// Price of the first bid level, if any.
    pub fn best_bid(&self) -> Option<Decimal> {
        top_price(&self.bids)
    }
}

fn top_price(levels: &[Vec<String>]) -> Option<Decimal> {
    levels
        .first()
        .and_then(|level| level.first())
        .map(|p| parse_decimal(p))
        .filter(|p| !p.is_zero())
}

/// One entry from GET /capi/v2/market/currentFundRate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FundRate {
    pub symbol: String,
    #[serde(rename = "fundingRate")]
    pub funding_rate: String,
    #[serde(rename = "collectCycle")]
    pub collect_cycle: i64,
    pub timestamp: i64,
}

impl FundRate {
    pub fn funding_rate(&self) -> Decimal {
        parse_decimal(&self.funding_rate)
    }
}

/// One entry from GET /capi/v2/market/contracts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Contract {
    pub symbol: String,
    pub contract_id: i64,
    pub tick_size: String,
    pub size_increment: String,
    #[serde(rename = "makerFeeRate")]
    pub maker_fee_rate: String,
    #[serde(rename = "takerFeeRate")]
    pub taker_fee_rate: String,
}

impl Contract {
    pub fn to_instrument_spec(&self) -> InstrumentSpec {
        InstrumentSpec {
            symbol: self.symbol.clone(),
            tick_size: parse_decimal(&self.tick_size),
            size_increment: parse_decimal(&self.size_increment),
            maker_fee_rate: parse_decimal(&self.maker_fee_rate),
            taker_fee_rate: parse_decimal(&self.taker_fee_rate),
        }
    }
}

/// Leverage settings for one contract, keyed by contract id in the account.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LeverageSetting {
    #[serde(rename = "isolated_long_leverage")]
    pub isolated_long: String,
    #[serde(rename = "isolated_short_leverage")]
    pub isolated_short: String,
    #[serde(rename = "cross_leverage")]
    pub cross: String,
    #[serde(rename = "shared_leverage")]
    pub shared: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountInfo {
    #[serde(rename = "contract_id_to_leverage_setting")]
    pub contract_leverage: HashMap<String, LeverageSetting>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CollateralEntry {
    pub coin_id: i64,
    pub amount: String,
    pub equity: String,
    pub available: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountPosition {
    pub contract_id: i64,
    pub side: String,
    pub margin_mode: String,
    pub leverage: String,
    pub size: String,
}

/// Response from GET /capi/v2/account/accounts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountsResponse {
    pub account: AccountInfo,
    pub collateral: Vec<CollateralEntry>,
    pub position: Vec<AccountPosition>,
}

impl AccountsResponse {
    /// USDT collateral. Missing or zero `available`/`equity` fall back to `amount`.
    pub fn usdt_collateral(&self) -> Collateral {
        let Some(entry) = self.collateral.iter().find(|c| c.coin_id == USDT_COIN_ID) else {
            return Collateral::default();
        };

        let amount = parse_decimal(&entry.amount);
        let mut available = parse_decimal(&entry.available);
        let mut equity = parse_decimal(&entry.equity);

        if available.is_zero() {
            available = amount;
        }
        if equity.is_zero() {
            equity = amount;
        }

        Collateral { available, equity }
    }

    /// Open positions with contract ids resolved to symbols.
    ///
    /// Positions whose contract is unknown or whose side is unparseable are
    /// skipped.
    pub fn resolve_positions(&self, contracts: &[Contract]) -> Vec<ExchangePosition> {
        let id_to_symbol: HashMap<i64, &str> = contracts
            .iter()
            .filter(|c| c.contract_id != 0 && !c.symbol.is_empty())
            .map(|c| (c.contract_id, c.symbol.as_str()))
            .collect();

        self.position
            .iter()
            .filter_map(|p| {
                let symbol = id_to_symbol.get(&p.contract_id)?;
                let side = PositionSide::parse(&p.side)?;
                Some(ExchangePosition {
                    symbol: (*symbol).to_string(),
                    side,
                    leverage: self.position_leverage(p, side),
                    size: parse_decimal(&p.size),
                })
            })
            .collect()
    }

    fn position_leverage(&self, position: &AccountPosition, side: PositionSide) -> Decimal {
        if !position.leverage.trim().is_empty() {
            return parse_decimal(&position.leverage);
        }

        let Some(setting) = self
            .account
            .contract_leverage
            .get(&position.contract_id.to_string())
        else {
            return Decimal::ZERO;
        };

        let raw = match position.margin_mode.to_ascii_uppercase().as_str() {
            "CROSS" => &setting.cross,
            "ISOLATED" => match side {
                PositionSide::Long => &setting.isolated_long,
                PositionSide::Short => &setting.isolated_short,
            },
            _ => &setting.shared,
        };
        parse_decimal(raw)
    }
}

/// Body for POST /capi/v2/order/placeOrder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceOrderRequest {
    pub symbol: String,
    pub client_oid: String,
    pub size: String,
    /// 1 open long, 2 open short, 3 close long, 4 close short.
    #[serde(rename = "type")]
    pub order_kind: String,
    /// 0 normal; market execution is requested through `match_price`.
    pub order_type: String,
    /// "1" executes at the opponent's best price (market), "0" uses `price`.
    pub match_price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
}

/// Response from POST /capi/v2/order/placeOrder.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaceOrderResponse {
    pub client_oid: String,
    pub order_id: String,
}
