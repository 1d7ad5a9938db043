use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Per-user sliding window over message sends. Process-local by design:
/// each API instance enforces its own window, which is acceptable because
/// the limit is an abuse guard, not an accounting feature.
pub struct RateLimiter {
    window: Duration,
    max_events: usize,
    buckets: RwLock<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_events: usize) -> Self {
        Self {
            window,
            max_events,
            buckets: RwLock::new(HashMap::new()),
        }
    }

    /// Records the event if allowed; otherwise returns the seconds until
    /// the oldest event in the window expires.
    pub async fn check(&self, user_id: &str) -> Result<(), u64> {
        let now = Instant::now();
        let mut buckets = self.buckets.write().await;
        let bucket = buckets.entry(user_id.to_string()).or_default();

        while let Some(front) = bucket.front() {
            if now.duration_since(*front) >= self.window {
                bucket.pop_front();
            } else {
                break;
            }
        }

        if bucket.len() >= self.max_events {
            let oldest = bucket.front().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(retry_after.as_secs().max(1));
        }

        bucket.push_back(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_quota_then_rejects() {
        let limiter = RateLimiter::new(Duration::from_secs(60), 3);
        for _ in 0..3 {
            assert!(limiter.check("u1").await.is_ok());
        }
        let retry = limiter.check("u1").await.unwrap_err();
        assert!(retry >= 1);
        // Other users are unaffected
        assert!(limiter.check("u2").await.is_ok());
    }

    #[tokio::test]
    async fn window_expiry_frees_quota() {
        let limiter = RateLimiter::new(Duration::from_millis(50), 1);
        assert!(limiter.check("u1").await.is_ok());
        assert!(limiter.check("u1").await.is_err());
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(limiter.check("u1").await.is_ok());
    }
}
