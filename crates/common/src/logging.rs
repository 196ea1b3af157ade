//! Logging bootstrap.
//!
//! The bot writes to five channels, each a `tracing` target:
//!
//! | Target | Contents |
//! |--------|----------|
//! | `weex_bot::info` | Market reads, sizing, lifecycle |
//! | `weex_bot::error` | Every failed call, with symbol and cause |
//! | `weex_bot::metrics` | Startup snapshot and periodic summaries |
//! | `weex_bot::pnl` | One line per settled position |
//! | `weex_bot::trades` | Orders sent through a trader |
//!
//! Console output always goes through `RUST_LOG`. When a log directory is
//! given, each channel also gets its own day-rotating file.

use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

pub const INFO: &str = "weex_bot::info";
pub const ERROR: &str = "weex_bot::error";
pub const METRICS: &str = "weex_bot::metrics";
pub const PNL: &str = "weex_bot::pnl";
pub const TRADES: &str = "weex_bot::trades";

/// All channels, in directory order.
pub const CHANNELS: [(&str, &str); 5] = [
    ("info", INFO),
    ("error", ERROR),
    ("metrics", METRICS),
    ("pnl", PNL),
    ("trades", TRADES),
];

/// Keeps the non-blocking file writers alive. Drop flushes them.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _guards: Vec<WorkerGuard>,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialise console logging filtered by `RUST_LOG` (default `info`).
pub fn init_logging() {
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(env_filter()))
        .try_init();
}

/// Initialise console logging plus one daily-rotated file per channel
/// under `dir/<channel>/`.
pub fn init_logging_with_dir(dir: &Path) -> io::Result<LoggingGuard> {
    let mut guards = Vec::with_capacity(CHANNELS.len());
    let mut file_layers = Vec::with_capacity(CHANNELS.len());

    for (name, target) in CHANNELS {
        let channel_dir = dir.join(name);
        std::fs::create_dir_all(&channel_dir)?;

        let appender = rolling::daily(&channel_dir, format!("{}.log", name));
        let (writer, guard) = tracing_appender::non_blocking(appender);
        guards.push(guard);

        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(false)
            .with_filter(Targets::new().with_target(target, tracing::Level::TRACE))
            .boxed();
        file_layers.push(layer);
    }

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(env_filter()))
        .with(file_layers)
        .try_init();

    Ok(LoggingGuard { _guards: guards })
}
