//! Engine configuration.
//!
//! Read from `WEEX_*` environment variables, with an optional `.env` file.
//! Absent variables fall back to defaults; present but unparseable values are
//! an error.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use thiserror::Error;

/// Symbols traded when `WEEX_SYMBOLS` is unset.
pub const DEFAULT_SYMBOLS: [&str; 8] = [
    "cmt_btcusdt",
    "cmt_ethusdt",
    "cmt_solusdt",
    "cmt_bnbusdt",
    "cmt_xrpusdt",
    "cmt_adausdt",
    "cmt_ltcusdt",
    "cmt_linkusdt",
];

/// A configuration value could not be used.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },
}

impl ConfigError {
    fn invalid(key: &str, value: &str) -> Self {
        Self::Invalid {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Which execution backend to trade through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraderMode {
    /// Simulated fills, no orders reach the exchange.
    #[default]
    Paper,
    /// Orders are placed on the exchange.
    Live,
}

impl FromStr for TraderMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paper" | "mock" => Ok(Self::Paper),
            "live" | "real" => Ok(Self::Live),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TraderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Paper => write!(f, "paper"),
            Self::Live => write!(f, "live"),
        }
    }
}

/// What to do with a position whose closing order failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseFailurePolicy {
    /// Drop the position and book PnL at the intended exit price anyway.
    #[default]
    BookAndDrop,
    /// Keep the position open and retry the close on the next tick.
    KeepOpen,
}

impl FromStr for CloseFailurePolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "book" | "book_and_drop" | "drop" => Ok(Self::BookAndDrop),
            "keep" | "keep_open" => Ok(Self::KeepOpen),
            _ => Err(()),
        }
    }
}

/// Everything the runner and engine need to start.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Symbols processed each tick, in this order.
    pub symbols: Vec<String>,
    pub query_interval: Duration,
    pub metrics_interval: Duration,
    /// Directory for per-channel log files; stdout only when unset.
    pub log_dir: Option<String>,

    // === Signal ===
    pub z_threshold: f64,
    pub funding_rate_max_abs: Decimal,
    pub spread_max_ratio: Decimal,
    pub cooldown: Duration,
    pub hold_duration: Duration,

    // === Sizing ===
    pub base_size: Decimal,
    /// Per-symbol minimum order size.
    pub min_size: HashMap<String, Decimal>,
    pub max_notional_usd: Decimal,

    // === Execution ===
    pub trader_mode: TraderMode,
    pub flatten_on_start: bool,
    pub close_failure_policy: CloseFailurePolicy,
    pub paper_fill_delay: Duration,

    // === Rate limits ===
    pub ip_capacity: u32,
    pub uid_capacity: u32,
    pub rate_window: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            query_interval: Duration::from_secs(1),
            metrics_interval: Duration::from_secs(10),
            log_dir: None,
            z_threshold: 1.2,
            funding_rate_max_abs: dec!(0.01),
            spread_max_ratio: dec!(0.005),
            cooldown: Duration::from_secs(60),
            hold_duration: Duration::from_secs(180),
            base_size: dec!(0.001),
            min_size: HashMap::new(),
            max_notional_usd: dec!(300),
            trader_mode: TraderMode::Paper,
            flatten_on_start: false,
            close_failure_policy: CloseFailurePolicy::BookAndDrop,
            paper_fill_delay: Duration::from_secs(2),
            ip_capacity: 500,
            uid_capacity: 500,
            rate_window: Duration::from_secs(10),
        }
    }
}

impl EngineConfig {
    /// Load from the process environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let symbols = match get("WEEX_SYMBOLS") {
            Some(v) => {
                let symbols = parse_symbols(&v);
                if symbols.is_empty() {
                    return Err(ConfigError::invalid("WEEX_SYMBOLS", &v));
                }
                symbols
            }
            None => defaults.symbols,
        };

        let min_size = match get("WEEX_MIN_SIZE_MAP") {
            Some(v) => parse_min_size_map(&v)
                .ok_or_else(|| ConfigError::invalid("WEEX_MIN_SIZE_MAP", &v))?,
            None => HashMap::new(),
        };

        Ok(Self {
            symbols,
            query_interval: period_var(&get, "WEEX_QUERY_INTERVAL", defaults.query_interval)?,
            metrics_interval: period_var(&get, "WEEX_METRICS_INTERVAL", defaults.metrics_interval)?,
            log_dir: get("WEEX_LOG_DIR"),
            z_threshold: checked_var(&get, "WEEX_Z_THRESHOLD", defaults.z_threshold, |z: &f64| {
                z.is_finite() && *z > 0.0
            })?,
            funding_rate_max_abs: parsed_var(
                &get,
                "WEEX_FUND_RATE_MAX_ABS",
                defaults.funding_rate_max_abs,
            )?,
            spread_max_ratio: parsed_var(&get, "WEEX_SPREAD_MAX_RATIO", defaults.spread_max_ratio)?,
            cooldown: duration_var(&get, "WEEX_COOLDOWN", defaults.cooldown)?,
            hold_duration: period_var(&get, "WEEX_HOLD_DURATION", defaults.hold_duration)?,
            base_size: parsed_var(&get, "WEEX_BASE_SIZE", defaults.base_size)?,
            min_size,
            max_notional_usd: parsed_var(&get, "WEEX_MAX_NOTIONAL_USD", defaults.max_notional_usd)?,
            trader_mode: parsed_var(&get, "WEEX_TRADER_MODE", defaults.trader_mode)?,
            flatten_on_start: bool_var(&get, "WEEX_FLATTEN_ON_START", defaults.flatten_on_start)?,
            close_failure_policy: parsed_var(
                &get,
                "WEEX_CLOSE_FAILURE_POLICY",
                defaults.close_failure_policy,
            )?,
            paper_fill_delay: duration_var(&get, "WEEX_PAPER_FILL_DELAY", defaults.paper_fill_delay)?,
            ip_capacity: checked_var(
                &get,
                "WEEX_IP_CAPACITY",
                defaults.ip_capacity,
                |c: &u32| *c > 0,
            )?,
            uid_capacity: checked_var(
                &get,
                "WEEX_UID_CAPACITY",
                defaults.uid_capacity,
                |c: &u32| *c > 0,
            )?,
            rate_window: period_var(&get, "WEEX_RATE_WINDOW", defaults.rate_window)?,
        })
    }

    /// Configured minimum size for `symbol`, if any.
    pub fn min_size_for(&self, symbol: &str) -> Option<Decimal> {
        self.min_size.get(symbol).copied()
    }
}

fn parsed_var<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match get(key) {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::invalid(key, &v)),
        None => Ok(default),
    }
}

/// Like [`parsed_var`], but the parsed value must also satisfy `valid`.
fn checked_var<G, T, V>(get: &G, key: &str, default: T, valid: V) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    V: Fn(&T) -> bool,
{
    match get(key) {
        Some(v) => v
            .trim()
            .parse()
            .ok()
            .filter(|parsed| valid(parsed))
            .ok_or_else(|| ConfigError::invalid(key, &v)),
        None => Ok(default),
    }
}

/// A duration that drives a timer or window and so must be non-zero.
fn period_var<G>(get: &G, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let period = duration_var(get, key, default)?;
    if period.is_zero() {
        let value = get(key).unwrap_or_default();
        return Err(ConfigError::invalid(key, &value));
    }
    Ok(period)
}

fn duration_var<G>(get: &G, key: &str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => parse_duration(&v).ok_or_else(|| ConfigError::invalid(key, &v)),
        None => Ok(default),
    }
}

fn bool_var<G>(get: &G, key: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::invalid(key, &v)),
        },
        None => Ok(default),
    }
}

/// Parse `500ms`, `10s`, `1m`, `2h`. A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let split = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    let (value, unit) = s.split_at(split);
    let value: f64 = value.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }

    let secs = match unit.trim() {
        "ms" => value / 1000.0,
        "" | "s" => value,
        "m" => value * 60.0,
        "h" => value * 3600.0,
        _ => return None,
    };
    Duration::try_from_secs_f64(secs).ok()
}

fn parse_symbols(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `sym:min,sym:min`. Every entry must have a positive size.
pub fn parse_min_size_map(s: &str) -> Option<HashMap<String, Decimal>> {
    let mut out = HashMap::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (symbol, size) = part.split_once(':')?;
        let symbol = symbol.trim();
        let size: Decimal = size.trim().parse().ok()?;
        if symbol.is_empty() || size <= Decimal::ZERO {
            return None;
        }
        out.insert(symbol.to_string(), size);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.symbols.len(), 8);
        assert_eq!(config.symbols[0], "cmt_btcusdt");
        assert_eq!(config.query_interval, Duration::from_secs(1));
        assert_eq!(config.metrics_interval, Duration::from_secs(10));
        assert_eq!(config.z_threshold, 1.2);
        assert_eq!(config.funding_rate_max_abs, dec!(0.01));
        assert_eq!(config.spread_max_ratio, dec!(0.005));
        assert_eq!(config.cooldown, Duration::from_secs(60));
        assert_eq!(config.hold_duration, Duration::from_secs(180));
        assert_eq!(config.max_notional_usd, dec!(300));
        assert_eq!(config.trader_mode, TraderMode::Paper);
        assert_eq!(config.close_failure_policy, CloseFailurePolicy::BookAndDrop);
        assert!(!config.flatten_on_start);
        assert!(config.log_dir.is_none());
        assert_eq!((config.ip_capacity, config.uid_capacity), (500, 500));
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("WEEX_SYMBOLS", " cmt_btcusdt, ,cmt_ethusdt "),
            ("WEEX_QUERY_INTERVAL", "500ms"),
            ("WEEX_COOLDOWN", "5m"),
            ("WEEX_Z_THRESHOLD", "2.5"),
            ("WEEX_TRADER_MODE", "REAL"),
            ("WEEX_FLATTEN_ON_START", "true"),
            ("WEEX_CLOSE_FAILURE_POLICY", "keep"),
            ("WEEX_MIN_SIZE_MAP", "cmt_btcusdt:0.01"),
            ("WEEX_LOG_DIR", "/var/log/weex"),
        ]))
        .unwrap();

        assert_eq!(config.symbols, vec!["cmt_btcusdt", "cmt_ethusdt"]);
        assert_eq!(config.query_interval, Duration::from_millis(500));
        assert_eq!(config.cooldown, Duration::from_secs(300));
        assert_eq!(config.z_threshold, 2.5);
        assert_eq!(config.trader_mode, TraderMode::Live);
        assert!(config.flatten_on_start);
        assert_eq!(config.close_failure_policy, CloseFailurePolicy::KeepOpen);
        assert_eq!(config.min_size_for("cmt_btcusdt"), Some(dec!(0.01)));
        assert_eq!(config.min_size_for("cmt_ethusdt"), None);
        assert_eq!(config.log_dir.as_deref(), Some("/var/log/weex"));
    }

    #[test]
    fn test_empty_value_uses_default() {
        let config = EngineConfig::from_lookup(lookup(&[("WEEX_Z_THRESHOLD", "  ")])).unwrap();
        assert_eq!(config.z_threshold, 1.2);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = EngineConfig::from_lookup(lookup(&[("WEEX_Z_THRESHOLD", "abc")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                key: "WEEX_Z_THRESHOLD".into(),
                value: "abc".into()
            }
        );

        assert!(EngineConfig::from_lookup(lookup(&[("WEEX_COOLDOWN", "5 days")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("WEEX_TRADER_MODE", "yolo")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("WEEX_FLATTEN_ON_START", "maybe")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("WEEX_SYMBOLS", ",,")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("WEEX_MIN_SIZE_MAP", "btc")])).is_err());
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration("3"), Some(Duration::from_secs(3)));
        assert_eq!(parse_duration("1.5m"), Some(Duration::from_secs(90)));
        assert_eq!(parse_duration("2h"), Some(Duration::from_secs(7200)));
        assert_eq!(parse_duration("s"), None);
        assert_eq!(parse_duration("10d"), None);
        assert_eq!(parse_duration("-1s"), None);
        assert_eq!(parse_duration("0s"), Some(Duration::ZERO));
        assert_eq!(parse_duration("99999999999999999999999h"), None);
    }

    #[test]
    fn test_zero_periods_rejected() {
        for key in [
            "WEEX_QUERY_INTERVAL",
            "WEEX_METRICS_INTERVAL",
            "WEEX_RATE_WINDOW",
            "WEEX_HOLD_DURATION",
        ] {
            let err = EngineConfig::from_lookup(lookup(&[(key, "0s")])).unwrap_err();
            assert_eq!(
                err,
                ConfigError::Invalid {
                    key: key.into(),
                    value: "0s".into()
                }
            );
        }

        // Cooldown and paper fill delay may be zero
        let config = EngineConfig::from_lookup(lookup(&[
            ("WEEX_COOLDOWN", "0s"),
            ("WEEX_PAPER_FILL_DELAY", "0ms"),
        ]))
        .unwrap();
        assert!(config.cooldown.is_zero());
    }

    #[test]
    fn test_overflowing_duration_rejected() {
        let err = EngineConfig::from_lookup(lookup(&[(
            "WEEX_COOLDOWN",
            "99999999999999999999999h",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "WEEX_COOLDOWN"));
    }

    #[test]
    fn test_z_threshold_must_be_finite_and_positive() {
        for value in ["NaN", "inf", "-1", "0"] {
            assert!(
                EngineConfig::from_lookup(lookup(&[("WEEX_Z_THRESHOLD", value)])).is_err(),
                "{value} accepted"
            );
        }
        let config = EngineConfig::from_lookup(lookup(&[("WEEX_Z_THRESHOLD", "0.5")])).unwrap();
        assert_eq!(config.z_threshold, 0.5);
    }

    #[test]
    fn test_capacities_must_be_positive() {
        assert!(EngineConfig::from_lookup(lookup(&[("WEEX_IP_CAPACITY", "0")])).is_err());
        assert!(EngineConfig::from_lookup(lookup(&[("WEEX_UID_CAPACITY", "0")])).is_err());
        let config = EngineConfig::from_lookup(lookup(&[("WEEX_UID_CAPACITY", "1200")])).unwrap();
        assert_eq!(config.uid_capacity, 1200);
    }

    #[test]
    fn test_parse_min_size_map() {
        let map = parse_min_size_map("cmt_btcusdt:0.01, cmt_ethusdt : 0.1,").unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["cmt_ethusdt"], dec!(0.1));

        assert!(parse_min_size_map("cmt_btcusdt:0").is_none());
        assert!(parse_min_size_map(":0.1").is_none());
        assert!(parse_min_size_map("").unwrap().is_empty());
    }
}
