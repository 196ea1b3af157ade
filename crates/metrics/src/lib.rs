use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe counters for the trading engine.
#[derive(Debug)]
pub struct EngineMetrics {
    // Counters
    ticks: AtomicU64,
    snapshots_fetched: AtomicU64,
    symbol_failures: AtomicU64,
    triggers: AtomicU64,
    skips: AtomicU64,
    placement_failures: AtomicU64,
    positions_closed: AtomicU64,
    close_failures: AtomicU64,

    // Timestamps
    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_snapshot_time: Option<Instant>,
    last_error_time: Option<Instant>,
    last_trigger_time: Option<Instant>,
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            snapshots_fetched: AtomicU64::new(0),
            symbol_failures: AtomicU64::new(0),
            triggers: AtomicU64::new(0),
            skips: AtomicU64::new(0),
            placement_failures: AtomicU64::new(0),
            positions_closed: AtomicU64::new(0),
            close_failures: AtomicU64::new(0),
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_snapshot_time: None,
                last_error_time: None,
                last_trigger_time: None,
            }),
        }
    }

    // --- Increment methods ---

    pub fn inc_ticks(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_snapshots_fetched(&self) {
        self.snapshots_fetched.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_snapshot_time = Some(Instant::now());
    }

    pub fn inc_symbol_failures(&self) {
        self.symbol_failures.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_triggers(&self) {
        self.triggers.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_trigger_time = Some(Instant::now());
    }

    pub fn inc_skips(&self) {
        self.skips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_placement_failures(&self) {
        self.placement_failures.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    pub fn inc_positions_closed(&self) {
        self.positions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_close_failures(&self) {
        self.close_failures.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_error_time = Some(Instant::now());
    }

    // --- Getter methods ---

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn snapshots_fetched(&self) -> u64 {
        self.snapshots_fetched.load(Ordering::Relaxed)
    }

    pub fn symbol_failures(&self) -> u64 {
        self.symbol_failures.load(Ordering::Relaxed)
    }

    pub fn triggers(&self) -> u64 {
        self.triggers.load(Ordering::Relaxed)
    }

    pub fn skips(&self) -> u64 {
        self.skips.load(Ordering::Relaxed)
    }

    pub fn placement_failures(&self) -> u64 {
        self.placement_failures.load(Ordering::Relaxed)
    }

    pub fn positions_closed(&self) -> u64 {
        self.positions_closed.load(Ordering::Relaxed)
    }

    pub fn close_failures(&self) -> u64 {
        self.close_failures.load(Ordering::Relaxed)
    }

    pub fn uptime_secs(&self) -> f64 {
        self.inner.read().start_time.elapsed().as_secs_f64()
    }

    pub fn secs_since_last_snapshot(&self) -> Option<f64> {
        self.inner
            .read()
            .last_snapshot_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_error(&self) -> Option<f64> {
        self.inner
            .read()
            .last_error_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    pub fn secs_since_last_trigger(&self) -> Option<f64> {
        self.inner
            .read()
            .last_trigger_time
            .map(|t| t.elapsed().as_secs_f64())
    }

    /// Share of symbol fetches that failed.
    pub fn failure_ratio(&self) -> f64 {
        let failures = self.symbol_failures();
        let total = failures + self.snapshots_fetched();
        if total > 0 {
            failures as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Generate a snapshot of all metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            ticks: self.ticks(),
            snapshots_fetched: self.snapshots_fetched(),
            symbol_failures: self.symbol_failures(),
            triggers: self.triggers(),
            skips: self.skips(),
            placement_failures: self.placement_failures(),
            positions_closed: self.positions_closed(),
            close_failures: self.close_failures(),
            uptime_secs: self.uptime_secs(),
            failure_ratio: self.failure_ratio(),
            secs_since_last_snapshot: self.secs_since_last_snapshot(),
            secs_since_last_error: self.secs_since_last_error(),
        }
    }
}

/// A point-in-time snapshot of metrics.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub snapshots_fetched: u64,
    pub symbol_failures: u64,
    pub triggers: u64,
    pub skips: u64,
    pub placement_failures: u64,
    pub positions_closed: u64,
    pub close_failures: u64,
    pub uptime_secs: f64,
    pub failure_ratio: f64,
    pub secs_since_last_snapshot: Option<f64>,
    pub secs_since_last_error: Option<f64>,
}

/// Health of the market data feed as seen by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Snapshots are arriving.
    Healthy,
    /// No snapshot for a while.
    Degraded,
    /// No snapshot for an extended period.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "HEALTHY"),
            HealthStatus::Degraded => write!(f, "DEGRADED"),
            HealthStatus::Unhealthy => write!(f, "UNHEALTHY"),
        }
    }
}

impl MetricsSnapshot {
    /// Seconds without a snapshot before the feed counts as stale.
    const STALE_THRESHOLD_SECS: f64 = 30.0;
    /// Seconds without a snapshot before the feed counts as down.
    const UNHEALTHY_THRESHOLD_SECS: f64 = 60.0;

    /// Determine the health status based on snapshot recency.
    pub fn health_status(&self) -> HealthStatus {
        let age = match self.secs_since_last_snapshot {
            Some(secs) => secs,
            // Nothing fetched yet; judge by how long we have been trying
            None => self.uptime_secs,
        };

        if age > Self::UNHEALTHY_THRESHOLD_SECS {
            HealthStatus::Unhealthy
        } else if age > Self::STALE_THRESHOLD_SECS {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Engine Metrics ===")?;
        writeln!(f, "Uptime:              {:.1}s", self.uptime_secs)?;
        writeln!(f, "Ticks:               {}", self.ticks)?;
        writeln!(f, "Snapshots fetched:   {}", self.snapshots_fetched)?;
        writeln!(f, "Symbol failures:     {}", self.symbol_failures)?;
        writeln!(f, "Failure ratio:       {:.3}", self.failure_ratio)?;
        writeln!(f, "Triggers:            {}", self.triggers)?;
        writeln!(f, "Skips:               {}", self.skips)?;
        writeln!(f, "Placement failures:  {}", self.placement_failures)?;
        writeln!(f, "Positions closed:    {}", self.positions_closed)?;
        writeln!(f, "Close failures:      {}", self.close_failures)?;
        if let Some(secs) = self.secs_since_last_snapshot {
            writeln!(f, "Since last snapshot: {:.1}s", secs)?;
        }
        if let Some(secs) = self.secs_since_last_error {
            writeln!(f, "Since last error:    {:.1}s", secs)?;
        }
        Ok(())
    }
}

/// Shared handle to metrics.
pub type SharedMetrics = Arc<EngineMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(EngineMetrics::new())
}
