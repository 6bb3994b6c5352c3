//! Per-client admission control.
//!
//! Each client identity owns a counter of consumed tokens and the instant its
//! current window started. A client may consume up to `max_tokens` requests;
//! once exhausted it is denied until the window is older than `interval`, at
//! which point the next request starts a fresh window with one token consumed.
//! Consuming a token does not move the window start, only creating or
//! resetting an entry does.
//!
//! A background task sweeps the map every `interval` and drops clients whose
//! window is older than `interval`, so idle clients do not accumulate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::rate_limit_config::RateLimiterConfig;

type ClientMap = Arc<Mutex<HashMap<String, ClientEntry>>>;

#[derive(Debug, Clone, Copy)]
struct ClientEntry {
    tokens: u32,
    last_seen: Instant,
}

impl ClientEntry {
    fn new(now: Instant) -> Self {
        Self {
            tokens: 1,
            last_seen: now,
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    clients: ClientMap,
    max_tokens: u32,
    interval: Duration,
    cancel: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl RateLimiter {
    /// Create a limiter and start its sweep task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: RateLimiterConfig) -> Result<Self, ConfigError> {
        Self::with_cancellation(config, &CancellationToken::new())
    }

    /// Like [`RateLimiter::new`], but the sweep also stops when `parent` is cancelled.
    pub fn with_cancellation(
        config: RateLimiterConfig,
        parent: &CancellationToken,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let clients: ClientMap = Arc::new(Mutex::new(HashMap::new()));
        let cancel = parent.child_token();
        let sweeper = tokio::spawn(run_sweeper(
            Arc::clone(&clients),
            config.interval,
            cancel.clone(),
        ));

        Ok(Self {
            clients,
            max_tokens: config.max_tokens,
            interval: config.interval,
            cancel,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Decide whether `client` may make another request, consuming a token if so.
    pub fn admit(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut clients = lock(&self.clients);

        if let Some(entry) = clients.get_mut(client) {
            if entry.tokens < self.max_tokens {
                entry.tokens += 1;
                return true;
            }
            if now.duration_since(entry.last_seen) > self.interval {
                *entry = ClientEntry::new(now);
                return true;
            }
            debug!(client, tokens = entry.tokens, "rate limit exceeded");
            return false;
        }

        clients.insert(client.to_string(), ClientEntry::new(now));
        true
    }

    /// Drop every client whose window is older than `interval`. Returns how many were evicted.
    pub fn sweep(&self) -> usize {
        sweep_clients(&self.clients, self.interval)
    }

    /// Stop the sweep task. Existing entries are kept and admission keeps working.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the sweep task and wait for it to finish.
    pub async fn shutdown(&self) {
        self.cancel();
        let handle = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!(error = %err, "rate limiter sweep task failed");
            }
        }
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        lock(&self.clients).len()
    }

    pub fn contains(&self, client: &str) -> bool {
        lock(&self.clients).contains_key(client)
    }

    /// Tokens consumed by `client` in its current window.
    pub fn tokens(&self, client: &str) -> Option<u32> {
        lock(&self.clients).get(client).map(|entry| entry.tokens)
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_sweeper(clients: ClientMap, interval: Duration, cancel: CancellationToken) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    debug!(interval = ?interval, "rate limiter sweep started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                sweep_clients(&clients, interval);
            }
        }
    }

    debug!("rate limiter sweep stopped");
}

fn sweep_clients(clients: &Mutex<HashMap<String, ClientEntry>>, interval: Duration) -> usize {
    let now = Instant::now();
    let mut clients = lock(clients);
    let before = clients.len();
    clients.retain(|_, entry| now.duration_since(entry.last_seen) <= interval);

    let evicted = before - clients.len();
    if evicted > 0 {
        debug!(evicted, remaining = clients.len(), "rate limiter sweep");
    }
    evicted
}

// Every critical section leaves the map consistent, so a poisoned lock is still usable.
fn lock(
    clients: &Mutex<HashMap<String, ClientEntry>>,
) -> MutexGuard<'_, HashMap<String, ClientEntry>> {
    clients.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    const CLIENT: &str = "test-client";

    fn limiter(max_tokens: u32, secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimiterConfig::new(max_tokens, Duration::from_secs(secs)).unwrap())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_then_deny() {
        let rl = limiter(3, 10);

        assert!(rl.admit(CLIENT));
        assert!(rl.admit(CLIENT));
        assert!(rl.admit(CLIENT));
        assert!(!rl.admit(CLIENT));
        assert!(!rl.admit(CLIENT));
        assert_eq!(rl.tokens(CLIENT), Some(3));

        // other clients are unaffected
        assert!(rl.admit("other-client"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reset_after_interval() {
        let rl = limiter(2, 2);

        assert!(rl.admit(CLIENT));
        assert!(rl.admit(CLIENT));
        assert!(!rl.admit(CLIENT));

        time::sleep(Duration::from_millis(2100)).await;
        assert!(rl.admit(CLIENT));
        assert_eq!(rl.tokens(CLIENT), Some(1));
        assert!(rl.admit(CLIENT));
        assert!(!rl.admit(CLIENT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_does_not_refresh_window() {
        let rl = limiter(2, 10);

        assert!(rl.admit(CLIENT));
        time::sleep(Duration::from_secs(6)).await;
        assert!(rl.admit(CLIENT));

        // 11s after the window opened but only 5s after the last request
        time::sleep(Duration::from_secs(5)).await;
        assert!(rl.admit(CLIENT));
        assert_eq!(rl.tokens(CLIENT), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_clients_are_evicted() {
        let rl = limiter(2, 10);
        assert!(rl.admit(CLIENT));
        assert!(rl.contains(CLIENT));

        // first tick at 10s sees an entry exactly `interval` old and keeps it
        time::sleep(Duration::from_millis(10_500)).await;
        assert!(rl.contains(CLIENT));

        time::sleep(Duration::from_secs(10)).await;
        assert!(!rl.contains(CLIENT));
        assert_eq!(rl.tracked_clients(), 0);

        // a returning client starts from scratch
        assert!(rl.admit(CLIENT));
        assert_eq!(rl.tokens(CLIENT), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_sweep() {
        let rl = limiter(5, 10);
        rl.cancel();
        assert!(rl.admit("a"));
        time::sleep(Duration::from_secs(6)).await;
        assert!(rl.admit("b"));
        time::sleep(Duration::from_secs(5)).await;

        assert_eq!(rl.sweep(), 1);
        assert!(!rl.contains("a"));
        assert!(rl.contains("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_sweep_without_clearing() {
        let rl = limiter(1, 1);
        assert!(rl.admit(CLIENT));

        rl.shutdown().await;
        assert!(rl.is_cancelled());

        time::sleep(Duration::from_secs(5)).await;
        assert!(rl.contains(CLIENT));

        // still usable: the stale window resets in place
        assert!(rl.admit(CLIENT));
        assert!(!rl.admit(CLIENT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_stops_sweep() {
        let parent = CancellationToken::new();
        let rl = RateLimiter::with_cancellation(
            RateLimiterConfig::new(1, Duration::from_secs(1)).unwrap(),
            &parent,
        )
        .unwrap();
        assert!(rl.admit(CLIENT));

        parent.cancel();
        assert!(rl.is_cancelled());
        time::sleep(Duration::from_secs(5)).await;
        assert!(rl.contains(CLIENT));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_config_rejected() {
        let config = RateLimiterConfig {
            max_tokens: 3,
            interval: Duration::ZERO,
        };
        assert!(matches!(
            RateLimiter::new(config),
            Err(ConfigError::RateLimiter(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admission_is_exact() {
        const THREADS: usize = 32;
        let rl = limiter(1, 60);
        let admitted = AtomicUsize::new(0);
        let barrier = Barrier::new(THREADS);

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    barrier.wait();
                    if rl.admit(CLIENT) {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert_eq!(rl.tokens(CLIENT), Some(1));
    }
}
