//! Static endpoint metadata: path, method, weight and quota scope.

use rate_limit::CredentialScope;
use rest_client::Method;

/// One REST endpoint and what it costs.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub path: &'static str,
    pub method: Method,
    /// Units charged against the scope's bucket per call.
    pub weight: u32,
    pub scope: CredentialScope,
}

impl Endpoint {
    const fn get(path: &'static str, weight: u32, scope: CredentialScope) -> Self {
        Self {
            path,
            method: Method::GET,
            weight,
            scope,
        }
    }

    const fn post(path: &'static str, weight: u32, scope: CredentialScope) -> Self {
        Self {
            path,
            method: Method::POST,
            weight,
            scope,
        }
    }
}

pub const SERVER_TIME: Endpoint =
    Endpoint::get("/capi/v2/market/time", 1, CredentialScope::Address);
pub const TICKER: Endpoint =
    Endpoint::get("/capi/v2/market/ticker", 1, CredentialScope::Address);
pub const INDEX: Endpoint = Endpoint::get("/capi/v2/market/index", 1, CredentialScope::Address);
pub const DEPTH: Endpoint = Endpoint::get("/capi/v2/market/depth", 1, CredentialScope::Address);
pub const CURRENT_FUND_RATE: Endpoint =
    Endpoint::get("/capi/v2/market/currentFundRate", 1, CredentialScope::Address);
pub const ACCOUNTS: Endpoint =
    Endpoint::get("/capi/v2/account/accounts", 5, CredentialScope::Account);
pub const CONTRACTS: Endpoint =
    Endpoint::get("/capi/v2/market/contracts", 10, CredentialScope::Address);
pub const PLACE_ORDER: Endpoint =
    Endpoint::post("/capi/v2/order/placeOrder", 2, CredentialScope::Account);

/// Every endpoint the client calls.
pub const ALL: [&Endpoint; 8] = [
    &SERVER_TIME,
    &TICKER,
    &INDEX,
    &DEPTH,
    &CURRENT_FUND_RATE,
    &ACCOUNTS,
    &CONTRACTS,
    &PLACE_ORDER,
];
