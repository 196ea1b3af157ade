//! Per-symbol basis statistics and trigger cooldown.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Samples retained per symbol.
pub const SAMPLE_CAPACITY: usize = 120;

/// Fixed-capacity ring of the most recent basis deviations.
#[derive(Debug, Clone)]
pub struct Ring {
    buf: Vec<f64>,
    /// Next write position.
    head: usize,
    len: usize,
}

impl Ring {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity.max(1)],
            head: 0,
            len: 0,
        }
    }

    /// Append a sample, overwriting the oldest when full.
    pub fn push(&mut self, value: f64) {
        let cap = self.buf.len();
        self.buf[self.head] = value;
        self.head = (self.head + 1) % cap;
        if self.len < cap {
            self.len += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Held samples, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let cap = self.buf.len();
        let start = (self.head + cap - self.len) % cap;
        (0..self.len).map(move |i| self.buf[(start + i) % cap])
    }

    /// Mean and population standard deviation of held samples.
    ///
    /// An empty ring yields `(0, 0)`.
    pub fn mean_std(&self) -> (f64, f64) {
        if self.len == 0 {
            return (0.0, 0.0);
        }
        let n = self.len as f64;
        let mean = self.iter().sum::<f64>() / n;
        let var = self.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    }
}

/// Rolling state for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolState {
    samples: Ring,
    last_trigger: Option<Instant>,
    cooldown: Duration,
}

impl SymbolState {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            samples: Ring::new(SAMPLE_CAPACITY),
            last_trigger: None,
            cooldown,
        }
    }

    /// Record `deviation` and score it against the held samples (itself included).
    pub fn observe(&mut self, deviation: f64) -> f64 {
        self.samples.push(deviation);
        self.z_score(deviation)
    }

    /// `(value - mean) / std`, or zero when std is zero.
    pub fn z_score(&self, value: f64) -> f64 {
        let (mean, std) = self.samples.mean_std();
        if std > 0.0 {
            (value - mean) / std
        } else {
            0.0
        }
    }

    pub fn samples(&self) -> &Ring {
        &self.samples
    }

    pub fn last_trigger(&self) -> Option<Instant> {
        self.last_trigger
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Time left before another trigger is allowed, if any.
    pub fn cooldown_remaining(&self, now: Instant) -> Option<Duration> {
        let last = self.last_trigger?;
        let elapsed = now.saturating_duration_since(last);
        (elapsed < self.cooldown).then(|| self.cooldown - elapsed)
    }

    pub fn mark_triggered(&mut self, now: Instant) {
        self.last_trigger = Some(now);
    }
}

/// Owned per-symbol states, created up front for every configured symbol.
#[derive(Debug, Default)]
pub struct SymbolStates {
    states: HashMap<String, SymbolState>,
    cooldown: Duration,
}

impl SymbolStates {
    pub fn new<I, S>(symbols: I, cooldown: Duration) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let states = symbols
            .into_iter()
            .map(|s| (s.into(), SymbolState::new(cooldown)))
            .collect();
        Self { states, cooldown }
    }

    pub fn get(&self, symbol: &str) -> Option<&SymbolState> {
        self.states.get(symbol)
    }

    /// State for `symbol`, created on first use for unconfigured symbols.
    pub fn get_mut(&mut self, symbol: &str) -> &mut SymbolState {
        let cooldown = self.cooldown;
        self.states
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolState::new(cooldown))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
