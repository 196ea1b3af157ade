//! Weighted sliding-window buckets.

use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{error, trace};

/// Which quota an endpoint is charged against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialScope {
    /// Per source IP address (public market data).
    Address,
    /// Per account / API key (balances, positions, orders).
    Account,
}

impl fmt::Display for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address => write!(f, "address"),
            Self::Account => write!(f, "account"),
        }
    }
}

/// Capacities for both scopes plus the shared window.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Max weight per window for address-scoped calls.
    pub address_capacity: u32,
    /// Max weight per window for account-scoped calls.
    pub account_capacity: u32,
    /// Trailing window length.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            address_capacity: 500,
            account_capacity: 500,
            window: Duration::from_secs(10),
        }
    }
}

/// One weighted sliding window.
///
/// Entries are `(admitted_at, weight)` in arrival order. They are pruned
/// lazily whenever the bucket is inspected; there is no background sweeper.
pub struct RateBucket {
    capacity: u32,
    window: Duration,
    entries: Mutex<VecDeque<(Instant, u32)>>,
}

impl RateBucket {
    /// Create an empty bucket.
    pub fn new(capacity: u32, window: Duration) -> Self {
        Self {
            capacity,
            window,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Maximum weight per window.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Window duration.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Weight admitted within the trailing window as of now.
    pub fn used(&self) -> u32 {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        prune(&mut entries, self.window, now);
        total(&entries)
    }

    /// Admit `weight` if it fits, otherwise report the earliest instant at
    /// which enough old entries will have aged out.
    fn try_admit(&self, weight: u32, now: Instant) -> Result<(), Instant> {
        let mut entries = self.entries.lock();
        prune(&mut entries, self.window, now);

        // Widened so capacities near u32::MAX cannot overflow the check.
        let wanted = u64::from(total(&entries)) + u64::from(weight);
        let capacity = u64::from(self.capacity);
        if wanted <= capacity {
            entries.push_back((now, weight));
            return Ok(());
        }

        let excess = wanted - capacity;
        let mut freed = 0u64;
        for (admitted_at, w) in entries.iter() {
            freed += u64::from(*w);
            if freed >= excess {
                return Err(*admitted_at + self.window);
            }
        }

        // Unreachable while weight <= capacity; wait one window to be safe.
        Err(now + self.window)
    }

    /// Wait until `weight` fits, then record it.
    async fn acquire(&self, weight: u32) {
        loop {
            match self.try_admit(weight, Instant::now()) {
                Ok(()) => return,
                Err(retry_at) => {
                    trace!(weight, "bucket full, waiting for window to slide");
                    tokio::time::sleep_until(retry_at).await;
                }
            }
        }
    }
}

fn prune(entries: &mut VecDeque<(Instant, u32)>, window: Duration, now: Instant) {
    while let Some((admitted_at, _)) = entries.front() {
        if *admitted_at + window <= now {
            entries.pop_front();
        } else {
            break;
        }
    }
}

fn total(entries: &VecDeque<(Instant, u32)>) -> u32 {
    entries.iter().map(|(_, w)| *w).sum()
}

impl fmt::Debug for RateBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateBucket")
            .field("capacity", &self.capacity)
            .field("window", &self.window)
            .field("pending_entries", &self.entries.lock().len())
            .finish()
    }
}

/// Two independent buckets, one per credential scope.
///
/// `acquire` never fails and cannot be cancelled except by dropping the
/// future; sustained over-quota load shows up as latency, not errors.
#[derive(Debug)]
pub struct RateLimiter {
    address: RateBucket,
    account: RateBucket,
}

impl RateLimiter {
    /// Create a limiter from the given capacities.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            address: RateBucket::new(config.address_capacity, config.window),
            account: RateBucket::new(config.account_capacity, config.window),
        }
    }

    /// The bucket that backs a scope.
    pub fn bucket(&self, scope: CredentialScope) -> &RateBucket {
        match scope {
            CredentialScope::Address => &self.address,
            CredentialScope::Account => &self.account,
        }
    }

    /// Whether a single call of `weight` can ever be admitted into `scope`.
    pub fn admits(&self, scope: CredentialScope, weight: u32) -> bool {
        weight <= self.bucket(scope).capacity()
    }

    /// Wait until `weight` more units fit into `scope`'s window, then record them.
    ///
    /// A zero weight returns immediately. A weight larger than the bucket's
    /// capacity could never be admitted; it is logged as an error and
    /// recorded as the full capacity, which undercounts the exchange's own
    /// charge. Callers should check [`RateLimiter::admits`] up front.
    pub async fn acquire(&self, scope: CredentialScope, weight: u32) {
        if weight == 0 {
            return;
        }

        let bucket = self.bucket(scope);
        let weight = if weight > bucket.capacity() {
            error!(
                scope = %scope,
                weight,
                capacity = bucket.capacity(),
                "request weight exceeds bucket capacity, clamping"
            );
            bucket.capacity()
        } else {
            weight
        };

        bucket.acquire(weight).await;
    }

    /// Weight currently admitted within `scope`'s trailing window.
    pub fn used(&self, scope: CredentialScope) -> u32 {
        self.bucket(scope).used()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(capacity: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            address_capacity: capacity,
            account_capacity: capacity,
            window: Duration::from_secs(window_secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_admitted_without_waiting() {
        let limiter = limiter(500, 10);
        let start = Instant::now();

        for _ in 0..500 {
            limiter.acquire(CredentialScope::Address, 1).await;
        }

        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.used(CredentialScope::Address), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_over_capacity_waits_for_oldest_entry() {
        let limiter = limiter(500, 10);
        let start = Instant::now();

        for _ in 0..500 {
            limiter.acquire(CredentialScope::Address, 1).await;
        }

        // Still blocked just before the first entries age out.
        let early = tokio::time::timeout(
            Duration::from_millis(9_900),
            limiter.acquire(CredentialScope::Address, 1),
        )
        .await;
        assert!(early.is_err());

        limiter.acquire(CredentialScope::Address, 1).await;
        assert_eq!(Instant::now() - start, Duration::from_secs(10));
        assert_eq!(limiter.used(CredentialScope::Address), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_weight_is_noop() {
        let limiter = limiter(1, 10);
        limiter.acquire(CredentialScope::Account, 1).await;

        let start = Instant::now();
        limiter.acquire(CredentialScope::Account, 0).await;

        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.used(CredentialScope::Account), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scopes_are_independent() {
        let limiter = limiter(5, 10);
        limiter.acquire(CredentialScope::Account, 5).await;

        let start = Instant::now();
        limiter.acquire(CredentialScope::Address, 5).await;

        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.used(CredentialScope::Account), 5);
        assert_eq!(limiter.used(CredentialScope::Address), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_only_as_long_as_needed() {
        let limiter = limiter(10, 10);
        let start = Instant::now();

        limiter.acquire(CredentialScope::Address, 4).await;
        tokio::time::advance(Duration::from_secs(3)).await;
        limiter.acquire(CredentialScope::Address, 6).await;

        // Needs 4 units back: the first entry expires at t=10s.
        limiter.acquire(CredentialScope::Address, 3).await;
        assert_eq!(Instant::now() - start, Duration::from_secs(10));

        // Needs the second entry (t=3s) to expire as well.
        limiter.acquire(CredentialScope::Address, 5).await;
        assert_eq!(Instant::now() - start, Duration::from_secs(13));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_weight_is_clamped() {
        let limiter = limiter(5, 10);
        let start = Instant::now();

        limiter.acquire(CredentialScope::Address, 50).await;

        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.used(CredentialScope::Address), 5);
    }

    #[test]
    fn test_admits() {
        let limiter = limiter(5, 10);
        assert!(limiter.admits(CredentialScope::Address, 5));
        assert!(!limiter.admits(CredentialScope::Address, 6));
        assert!(limiter.admits(CredentialScope::Account, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_near_u32_max_does_not_overflow() {
        let limiter = limiter(u32::MAX, 10);
        let start = Instant::now();

        limiter.acquire(CredentialScope::Address, u32::MAX - 1).await;
        limiter.acquire(CredentialScope::Address, 1).await;
        assert_eq!(Instant::now(), start);
        assert_eq!(limiter.used(CredentialScope::Address), u32::MAX);

        // Full: the next unit waits for the window to slide
        limiter.acquire(CredentialScope::Address, 2).await;
        assert_eq!(Instant::now() - start, Duration::from_secs(10));
        assert_eq!(limiter.used(CredentialScope::Address), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_pruned_after_window() {
        let limiter = limiter(10, 10);
        limiter.acquire(CredentialScope::Address, 7).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(limiter.used(CredentialScope::Address), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_capacity_under_contention() {
        let limiter = Arc::new(limiter(20, 1));
        let mut handles = Vec::new();

        for task in 0..8u32 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move {
                for i in 0..15u32 {
                    let weight = 1 + (task + i) % 4;
                    limiter.acquire(CredentialScope::Address, weight).await;
                    assert!(limiter.used(CredentialScope::Address) <= 20);
                    tokio::time::sleep(Duration::from_millis(u64::from(37 * (i % 3)))).await;
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(limiter.used(CredentialScope::Address) <= 20);
    }

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.address_capacity, 500);
        assert_eq!(config.account_capacity, 500);
        assert_eq!(config.window, Duration::from_secs(10));
    }
}
