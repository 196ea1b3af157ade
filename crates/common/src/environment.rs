//! WEEX environment configuration.
//!
//! Selects the contract REST endpoint the bot talks to.

use std::fmt;
use std::str::FromStr;

/// Default contract REST API base URL.
pub const PRODUCTION_BASE_URL: &str = "https://api-contract.weex.com";

/// WEEX environment (production or an explicit base URL).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WeexEnvironment {
    /// Production contract API (real money).
    #[default]
    Production,
    /// Any other base URL, e.g. a proxy or a local stub.
    Custom(String),
}

impl WeexEnvironment {
    /// REST API base URL, without a trailing slash.
    pub fn rest_base_url(&self) -> &str {
        match self {
            Self::Production => PRODUCTION_BASE_URL,
            Self::Custom(url) => url.trim_end_matches('/'),
        }
    }

    /// Returns true if this is the production environment.
    pub fn is_production(&self) -> bool {
        match self {
            Self::Production => true,
            Self::Custom(url) => url.trim_end_matches('/') == PRODUCTION_BASE_URL,
        }
    }

    /// Load environment from `WEEX_BASE_URL`.
    ///
    /// Returns `Production` if not set or empty.
    pub fn from_env() -> Self {
        std::env::var("WEEX_BASE_URL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for WeexEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Custom(url) => write!(f, "custom({})", url),
        }
    }
}

impl FromStr for WeexEnvironment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "" => Err(ParseEnvironmentError(s.to_string())),
            "production" | "prod" | "mainnet" => Ok(Self::Production),
            lower if lower.starts_with("http://") || lower.starts_with("https://") => {
                if trimmed.trim_end_matches('/') == PRODUCTION_BASE_URL {
                    Ok(Self::Production)
                } else {
                    Ok(Self::Custom(trimmed.trim_end_matches('/').to_string()))
                }
            }
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}

/// Error parsing environment string.
#[derive(Debug, Clone)]
pub struct ParseEnvironmentError(String);

impl fmt::Display for ParseEnvironmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid environment '{}', expected 'production' or an http(s) URL",
            self.0
        )
    }
}

impl std::error::Error for ParseEnvironmentError {}
