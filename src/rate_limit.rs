use dashmap::DashMap;
use std::sync::Arc;
use tokio::time::{Duration, Instant, interval};
use tracing::debug;

use crate::error::RateLimitExceeded;
use crate::metrics::RATE_LIMITER_CLIENTS;
use prometheus::Gauge;

// Rate window - tracks requests per IP/key
#[derive(Debug, Clone, Copy)]
pub struct RateWindow {
    pub count: u32,
    pub window_start: Instant,
}

impl RateWindow {
    fn expired(&self, now: Instant, window: Duration) -> bool {
        now.duration_since(self.window_start) >= window
    }
}

// Fixed-window request counter keyed by client.
//
// Each key gets a window that starts on its first request and lasts `window`.
// The DashMap entry guard serializes updates for a key, so two concurrent
// requests from the same client can never both see a stale count.
//
// `max_clients` is a soft cap: unseen keys racing past the capacity check can
// overshoot it by the number of concurrent inserts until the next eviction.
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    window: Duration,
    max_clients: usize,
    clients: Gauge,
}

impl RateLimiter {
    pub fn new(window: Duration, max_clients: usize) -> Self {
        Self::with_gauge(window, max_clients, RATE_LIMITER_CLIENTS.clone())
    }

    // Same limiter, reporting tracked clients into `clients`
    pub fn with_gauge(window: Duration, max_clients: usize, clients: Gauge) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_clients: max_clients.max(1),
            clients,
        }
    }

    // Admit or reject one request from `key`, allowing `limit` per window
    pub fn admit(&self, key: &str, limit: u32) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();

        if !self.windows.contains_key(key) && self.windows.len() >= self.max_clients {
            self.make_room(now);
        }

        let mut inserted = false;
        let result = {
            let mut entry = self.windows.entry(key.to_string()).or_insert_with(|| {
                inserted = true;
                RateWindow {
                    count: 0,
                    window_start: now,
                }
            });
            self.count(&mut entry, now, limit)
        };

        // len() locks every shard, so only after the entry guard is gone
        if inserted {
            self.clients.set(self.windows.len() as f64);
        }
        result
    }

    fn count(
        &self,
        entry: &mut RateWindow,
        now: Instant,
        limit: u32,
    ) -> Result<(), RateLimitExceeded> {
        // window expired..? start over
        if entry.expired(now, self.window) {
            entry.count = 1;
            entry.window_start = now;
            return Ok(());
        }

        // under limit..? allow
        if entry.count < limit {
            entry.count += 1;
            return Ok(());
        }

        // over limit, count stays put
        let reset_at = entry.window_start + self.window;
        Err(RateLimitExceeded {
            retry_after: reset_at.saturating_duration_since(now),
        })
    }

    // Drop every window that has run out, returns how many went away
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.expired(now, self.window));
        let removed = before.saturating_sub(self.windows.len());
        self.clients.set(self.windows.len() as f64);
        removed
    }

    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    // Called with no entry guard held, so iterating the shards can't deadlock.
    // Evicts a batch of the oldest windows so a stream of unseen keys pays for
    // the full scan once per batch, not once per request.
    fn make_room(&self, now: Instant) {
        self.windows.retain(|_, w| !w.expired(now, self.window));

        if self.windows.len() >= self.max_clients {
            let batch = self.eviction_batch() + self.windows.len() - self.max_clients;

            let mut oldest: Vec<(Instant, String)> = self
                .windows
                .iter()
                .map(|e| (e.value().window_start, e.key().clone()))
                .collect();
            if batch < oldest.len() {
                oldest.select_nth_unstable(batch);
                oldest.truncate(batch);
            }

            debug!(evicted = oldest.len(), "Rate limiter at capacity, evicting oldest windows");
            for (_, key) in oldest {
                self.windows.remove(&key);
            }
        }
        self.clients.set(self.windows.len() as f64);
    }

    fn eviction_batch(&self) -> usize {
        (self.max_clients / 16).max(1)
    }
}

// Sweeps expired windows on a fixed interval, runs for the process lifetime
pub async fn cleanup_task(limiter: Arc<RateLimiter>, every: Duration) {
    let mut interval = interval(every);

    debug!(interval = ?every, "Rate window cleanup started");

    loop {
        interval.tick().await;
        let removed = limiter.purge_expired();
        if removed > 0 {
            debug!(removed, remaining = limiter.tracked_clients(), "Purged expired rate windows");
        }
    }
}
