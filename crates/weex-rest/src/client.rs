//! WEEX contract REST API client.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use auth::{ApiCredentials, RequestSigner};
use common::logging;
use common::WeexEnvironment;
use model::{Collateral, ExchangePosition};
use rate_limit::RateLimiter;
use rest_client::RestClient;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::endpoints::{self, Endpoint};
use crate::error::WeexRestError;
use crate::responses::{
    AccountsResponse, Contract, DepthResponse, FundRate, IndexResponse, PlaceOrderRequest,
    PlaceOrderResponse, ServerTimeResponse, Ticker,
};

/// Request timeout for WEEX API calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Headers attached to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub timestamp: String,
    pub signature: String,
}

/// WEEX REST API client with admission control and request signing.
///
/// Every call first clears the shared [`RateLimiter`] for its endpoint's
/// scope and weight. Nothing is retried here.
pub struct WeexRestClient {
    client: RestClient,
    credentials: ApiCredentials,
    environment: WeexEnvironment,
    limiter: Arc<RateLimiter>,
    /// Server clock minus local clock, in milliseconds.
    drift_ms: AtomicI64,
}

impl WeexRestClient {
    /// Create a client for the given environment.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built, or if `limiter`
    /// has a bucket too small for some endpoint's weight.
    pub fn new(
        credentials: ApiCredentials,
        environment: WeexEnvironment,
        limiter: Arc<RateLimiter>,
    ) -> Result<Self, WeexRestError> {
        if let Some(ep) = endpoints::ALL
            .iter()
            .find(|ep| !limiter.admits(ep.scope, ep.weight))
        {
            return Err(WeexRestError::WeightExceedsCapacity {
                path: ep.path,
                weight: ep.weight,
                capacity: limiter.bucket(ep.scope).capacity(),
            });
        }

        let client = RestClient::new(environment.rest_base_url(), REQUEST_TIMEOUT)?;

        Ok(Self {
            client,
            credentials,
            environment,
            limiter,
            drift_ms: AtomicI64::new(0),
        })
    }

    /// Get the environment this client is connected to.
    pub fn environment(&self) -> &WeexEnvironment {
        &self.environment
    }

    /// Whether signed account calls can be made.
    pub fn has_credentials(&self) -> bool {
        !self.credentials.is_anonymous()
    }

    /// The limiter shared by all calls on this client.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Current server-minus-local clock drift.
    pub fn drift_ms(&self) -> i64 {
        self.drift_ms.load(Ordering::Relaxed)
    }

    /// Override the drift, e.g. from a previously measured value.
    pub fn set_drift_ms(&self, drift_ms: i64) {
        self.drift_ms.store(drift_ms, Ordering::Relaxed);
    }

    /// Local wall-clock time corrected by the stored drift.
    pub fn server_timestamp_ms(&self) -> i64 {
        local_time_ms() + self.drift_ms()
    }

    // ========================================================================
    // Time Synchronization
    // ========================================================================

    /// Measure and store the drift between local and server clocks.
    ///
    /// Called once at startup. There is no automatic re-sync, so a drift that
    /// grows past the exchange's timestamp tolerance will start getting
    /// signed calls rejected.
    pub async fn sync_time(&self) -> Result<(), WeexRestError> {
        let before = Instant::now();
        let response: ServerTimeResponse = self.public(&endpoints::SERVER_TIME, &[]).await?;
        let rtt = before.elapsed().as_millis() as i64;

        let local_time = local_time_ms();

        // Estimate server time at midpoint of request
        let estimated_server_time = response.timestamp + (rtt / 2);
        let drift = estimated_server_time - local_time;

        self.set_drift_ms(drift);

        info!(
            target: logging::INFO,
            server_time = response.timestamp,
            local_time = local_time,
            drift_ms = drift,
            rtt_ms = rtt,
            "Time synchronized with WEEX server"
        );

        Ok(())
    }

    /// One signed account read to prove credentials work.
    pub async fn ping_private(&self) -> Result<(), WeexRestError> {
        let _: serde_json::Value = self.private(&endpoints::ACCOUNTS, &[], None::<&()>).await?;
        Ok(())
    }

    // ========================================================================
    // Market Data
    // ========================================================================

    /// GET /capi/v2/market/ticker
    pub async fn get_ticker(&self, symbol: &str) -> Result<Ticker, WeexRestError> {
        self.public(&endpoints::TICKER, &[("symbol", symbol)]).await
    }

    /// GET /capi/v2/market/index
    pub async fn get_index(&self, symbol: &str) -> Result<IndexResponse, WeexRestError> {
        self.public(&endpoints::INDEX, &[("symbol", symbol)]).await
    }

    /// GET /capi/v2/market/depth
    ///
    /// A `limit` of zero leaves the depth to the exchange default.
    pub async fn get_depth(&self, symbol: &str, limit: u32) -> Result<DepthResponse, WeexRestError> {
        let limit = limit.to_string();
        let mut params = vec![("symbol", symbol)];
        if limit != "0" {
            params.push(("limit", limit.as_str()));
        }
        self.public(&endpoints::DEPTH, &params).await
    }

    /// GET /capi/v2/market/currentFundRate
    ///
    /// An empty `symbol` returns every contract.
    pub async fn get_current_fund_rate(&self, symbol: &str) -> Result<Vec<FundRate>, WeexRestError> {
        let params: Vec<(&str, &str)> = if symbol.is_empty() {
            Vec::new()
        } else {
            vec![("symbol", symbol)]
        };
        self.public(&endpoints::CURRENT_FUND_RATE, &params).await
    }

    /// GET /capi/v2/market/contracts
    ///
    /// `None` returns every contract.
    pub async fn get_contracts(&self, symbol: Option<&str>) -> Result<Vec<Contract>, WeexRestError> {
        let params: Vec<(&str, &str)> = symbol.map(|s| vec![("symbol", s)]).unwrap_or_default();
        self.public(&endpoints::CONTRACTS, &params).await
    }

    // ========================================================================
    // Account
    // ========================================================================

    /// GET /capi/v2/account/accounts
    pub async fn get_accounts(&self) -> Result<AccountsResponse, WeexRestError> {
        self.private(&endpoints::ACCOUNTS, &[], None::<&()>).await
    }

    /// Open exchange positions, resolved to symbols via contract metadata.
    ///
    /// If the contract list cannot be fetched no position can be resolved,
    /// and the result is empty.
    pub async fn get_positions(&self) -> Result<Vec<ExchangePosition>, WeexRestError> {
        let accounts = self.get_accounts().await?;
        let contracts = match self.get_contracts(None).await {
            Ok(contracts) => contracts,
            Err(e) => {
                error!(target: logging::ERROR, error = %e, "contract lookup for positions failed");
                Vec::new()
            }
        };
        Ok(accounts.resolve_positions(&contracts))
    }

    /// Available and equity USDT collateral.
    pub async fn get_collateral_usdt(&self) -> Result<Collateral, WeexRestError> {
        Ok(self.get_accounts().await?.usdt_collateral())
    }

    // ========================================================================
    // Order Management
    // ========================================================================

    /// POST /capi/v2/order/placeOrder
    pub async fn place_order(
        &self,
        request: &PlaceOrderRequest,
    ) -> Result<PlaceOrderResponse, WeexRestError> {
        info!(
            target: logging::INFO,
            symbol = %request.symbol,
            client_oid = %request.client_oid,
            kind = %request.order_kind,
            size = %request.size,
            price = ?request.price,
            "Placing order"
        );

        let response: PlaceOrderResponse = self
            .private(&endpoints::PLACE_ORDER, &[], Some(request))
            .await?;

        info!(
            target: logging::INFO,
            order_id = %response.order_id,
            client_oid = %response.client_oid,
            "Order placed"
        );

        Ok(response)
    }

    // ========================================================================
    // Transport
    // ========================================================================

    /// Unauthenticated call.
    async fn public<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        params: &[(&str, &str)],
    ) -> Result<T, WeexRestError> {
        self.limiter.acquire(endpoint.scope, endpoint.weight).await;

        let query = encode_query(params);
        let headers = [("Content-Type", "application/json"), ("locale", "en-US")];

        self.client
            .send(
                endpoint.method.clone(),
                endpoint.path,
                Some(query.as_str()),
                Some(&headers[..]),
                None,
            )
            .await
            .map_err(|e| {
                error!(target: logging::ERROR, path = endpoint.path, error = %e, "public request failed");
                e.into()
            })
    }

    /// Signed call.
    async fn private<T: DeserializeOwned, B: Serialize>(
        &self,
        endpoint: &Endpoint,
        params: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T, WeexRestError> {
        self.limiter.acquire(endpoint.scope, endpoint.weight).await;

        let query = encode_query(params);
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| WeexRestError::Encode(e.to_string()))?;

        let signed = self.sign(
            self.server_timestamp_ms(),
            endpoint.method.as_str(),
            endpoint.path,
            &query,
            body.as_deref(),
        );

        let headers = [
            ("ACCESS-KEY", self.credentials.api_key()),
            ("ACCESS-SIGN", signed.signature.as_str()),
            ("ACCESS-TIMESTAMP", signed.timestamp.as_str()),
            ("ACCESS-PASSPHRASE", self.credentials.expose_passphrase()),
            ("Content-Type", "application/json"),
            ("locale", "en-US"),
        ];

        debug!(path = endpoint.path, timestamp = %signed.timestamp, "signed request");

        self.client
            .send(
                endpoint.method.clone(),
                endpoint.path,
                Some(query.as_str()),
                Some(&headers[..]),
                body,
            )
            .await
            .map_err(|e| {
                error!(target: logging::ERROR, path = endpoint.path, error = %e, "private request failed");
                e.into()
            })
    }

    /// Build the signature headers for a request at `timestamp_ms`.
    pub fn sign(
        &self,
        timestamp_ms: i64,
        method: &str,
        path: &str,
        query: &str,
        body: Option<&str>,
    ) -> SignedHeaders {
        let timestamp = timestamp_ms.to_string();
        let signature = RequestSigner::new(&self.credentials).sign_request(
            &timestamp,
            method,
            path,
            Some(query),
            body,
        );
        SignedHeaders {
            timestamp,
            signature,
        }
    }
}

/// Form-encode parameters sorted by key, matching what gets signed.
pub fn encode_query(params: &[(&str, &str)]) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(sorted)
        .finish()
}

fn local_time_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

impl std::fmt::Debug for WeexRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeexRestClient")
            .field("environment", &self.environment)
            .field("base_url", &self.client.base_url())
            .field("api_key", &self.credentials.api_key())
            .field("drift_ms", &self.drift_ms())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rate_limit::{CredentialScope, RateLimitConfig};

    fn client_for(base_url: &str) -> WeexRestClient {
        WeexRestClient::new(
            ApiCredentials::new("key".into(), "secret".into(), "pass".into()),
            WeexEnvironment::Custom(base_url.into()),
            Arc::new(RateLimiter::new(RateLimitConfig::default())),
        )
        .unwrap()
    }

    #[test]
    fn test_encode_query_sorted_and_escaped() {
        assert_eq!(
            encode_query(&[("symbol", "cmt_btcusdt"), ("limit", "15")]),
            "limit=15&symbol=cmt_btcusdt"
        );
        assert_eq!(encode_query(&[("q", "a b&c")]), "q=a+b%26c");
        assert_eq!(encode_query(&[]), "");
    }

    #[test]
    fn test_sign_matches_known_vector() {
        let client = client_for("http://localhost");

        let signed = client.sign(
            1_700_000_000_000,
            "GET",
            "/capi/v2/market/depth",
            "limit=15&symbol=cmt_btcusdt",
            None,
        );

        assert_eq!(signed.timestamp, "1700000000000");
        assert_eq!(
            signed.signature,
            "2GdeU8t/ODBhEHqoax1HJfi+/p8UqVrV4XbxogZZYGY="
        );
    }

    #[test]
    fn test_sign_without_query() {
        let client = client_for("http://localhost");
        let signed = client.sign(1_700_000_000_000, "GET", "/capi/v2/account/accounts", "", None);
        assert_eq!(
            signed.signature,
            "66Mt4dNwtU2bgKeLKluuFZFwYgTLLOGkVZ+Ob55SZpg="
        );
    }

    #[test]
    fn test_server_timestamp_applies_drift() {
        let client = client_for("http://localhost");

        client.set_drift_ms(60_000);
        let ts = client.server_timestamp_ms();
        let local = local_time_ms();

        assert!(ts - local >= 59_000 && ts - local <= 60_000);
        assert_eq!(client.drift_ms(), 60_000);
    }

    #[tokio::test]
    async fn test_network_failure_still_charges_limiter() {
        let client = client_for("http://127.0.0.1:1");

        let err = client.get_ticker("cmt_btcusdt").await.unwrap_err();
        assert!(err.is_network(), "got {err:?}");
        assert_eq!(client.limiter().used(CredentialScope::Address), 1);

        let err = client.get_accounts().await.unwrap_err();
        assert!(err.is_network(), "got {err:?}");
        assert_eq!(client.limiter().used(CredentialScope::Account), 5);
    }

    #[test]
    fn test_new_rejects_limiter_smaller_than_endpoint_weight() {
        let limiter = RateLimiter::new(RateLimitConfig {
            address_capacity: 5,
            account_capacity: 500,
            window: Duration::from_secs(10),
        });

        let err = WeexRestClient::new(
            ApiCredentials::new("key".into(), "secret".into(), "pass".into()),
            WeexEnvironment::Custom("http://localhost".into()),
            Arc::new(limiter),
        )
        .err()
        .unwrap();

        match err {
            WeexRestError::WeightExceedsCapacity {
                path,
                weight,
                capacity,
            } => {
                assert_eq!(path, endpoints::CONTRACTS.path);
                assert_eq!(weight, 10);
                assert_eq!(capacity, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    /// Serve one HTTP exchange on a local socket, replying with `reply_body`.
    /// The join handle yields the raw request head and body.
    async fn serve_once(
        reply_body: &'static str,
    ) -> (String, tokio::task::JoinHandle<(String, String)>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut chunk = [0u8; 4096];

            let (head_end, body_len) = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before the request was complete");
                raw.extend_from_slice(&chunk[..n]);

                let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&raw[..end]).to_ascii_lowercase();
                let len = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .map_or(0, |v| v.trim().parse::<usize>().unwrap());
                if raw.len() >= end + 4 + len {
                    break (end, len);
                }
            };

            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply_body.len(),
                reply_body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            let head = String::from_utf8(raw[..head_end].to_vec()).unwrap();
            let body_start = head_end + 4;
            let body = String::from_utf8(raw[body_start..body_start + body_len].to_vec()).unwrap();
            (head, body)
        });

        (base_url, handle)
    }

    /// Header value by case-insensitive name.
    fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
        head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim().eq_ignore_ascii_case(name).then_some(value.trim())
        })
    }

    #[tokio::test]
    async fn test_place_order_sends_signed_headers_and_body() {
        let (base_url, server) =
            serve_once(r#"{"client_oid":"bot-1","order_id":"596471064624628269"}"#).await;
        let client = client_for(&base_url);

        let request = PlaceOrderRequest {
            symbol: "cmt_btcusdt".into(),
            client_oid: "bot-1".into(),
            size: "0.003".into(),
            order_kind: "1".into(),
            order_type: "0".into(),
            match_price: "0".into(),
            price: Some("50000.00000000".into()),
        };

        let response = client.place_order(&request).await.unwrap();
        assert_eq!(response.order_id, "596471064624628269");
        assert_eq!(response.client_oid, "bot-1");

        let (head, body) = server.await.unwrap();
        assert!(
            head.starts_with("POST /capi/v2/order/placeOrder HTTP/1.1"),
            "request line: {head}"
        );
        assert_eq!(body, serde_json::to_string(&request).unwrap());

        assert_eq!(header(&head, "ACCESS-KEY"), Some("key"));
        assert_eq!(header(&head, "ACCESS-PASSPHRASE"), Some("pass"));
        assert_eq!(header(&head, "Content-Type"), Some("application/json"));
        assert_eq!(header(&head, "locale"), Some("en-US"));

        let ts: i64 = header(&head, "ACCESS-TIMESTAMP").unwrap().parse().unwrap();
        let expected = client.sign(ts, "POST", "/capi/v2/order/placeOrder", "", Some(&body));
        assert_eq!(header(&head, "ACCESS-SIGN"), Some(expected.signature.as_str()));
        assert_eq!(client.limiter().used(CredentialScope::Account), 2);
    }

    #[tokio::test]
    async fn test_public_request_is_unsigned_with_sorted_query() {
        let (base_url, server) = serve_once(r#"{"asks":[],"bids":[]}"#).await;
        let client = client_for(&base_url);

        client.get_depth("cmt_btcusdt", 15).await.unwrap();

        let (head, body) = server.await.unwrap();
        assert!(
            head.starts_with("GET /capi/v2/market/depth?limit=15&symbol=cmt_btcusdt HTTP/1.1"),
            "request line: {head}"
        );
        assert!(body.is_empty());
        assert_eq!(header(&head, "ACCESS-SIGN"), None);
        assert_eq!(header(&head, "ACCESS-KEY"), None);
    }
}
