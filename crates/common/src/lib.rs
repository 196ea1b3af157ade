//! Shared infrastructure for the WEEX bot crates.

mod environment;
pub mod logging;

pub use environment::{ParseEnvironmentError, WeexEnvironment, PRODUCTION_BASE_URL};
pub use logging::{init_logging, init_logging_with_dir, LoggingGuard};
