//! Sliding-window throttle for unauthenticated credential endpoints.
//!
//! Attempts are kept per client key (usually the peer IP) in process memory,
//! so limits are per instance.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct LoginThrottle {
    attempts: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
    max_attempts: usize,
    window: Duration,
}

impl LoginThrottle {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Arc::new(RwLock::new(HashMap::new())),
            max_attempts,
            window,
        }
    }

    pub fn per_minute(max_attempts: usize) -> Self {
        Self::new(max_attempts, Duration::from_secs(60))
    }

    /// Records an attempt for `key`. When the window is full the attempt is
    /// not recorded and the time until the oldest one expires is returned.
    pub async fn hit(&self, key: &str) -> Result<(), Duration> {
        self.hit_at(key, Instant::now()).await
    }

    async fn hit_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        let mut attempts = self.attempts.write().await;
        let history = attempts.entry(key.to_string()).or_default();
        history.retain(|t| now.duration_since(*t) < self.window);

        if history.len() < self.max_attempts {
            history.push(now);
            return Ok(());
        }
        let oldest = history.iter().min().copied().unwrap_or(now);
        Err(self.window.saturating_sub(now.duration_since(oldest)))
    }

    /// Forgets a key, e.g. after a successful login.
    pub async fn reset(&self, key: &str) {
        self.attempts.write().await.remove(key);
    }

    /// Drops keys whose attempts all fell out of the window.
    pub async fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut attempts = self.attempts.write().await;
        attempts.retain(|_, history| {
            history.retain(|t| now.duration_since(*t) < self.window);
            !history.is_empty()
        });
        tracing::debug!("Login throttle cleanup: {} active clients", attempts.len());
        attempts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn blocks_after_limit_per_key() {
        let throttle = LoginThrottle::per_minute(3);

        assert!(throttle.hit("10.0.0.1").await.is_ok());
        assert!(throttle.hit("10.0.0.1").await.is_ok());
        assert!(throttle.hit("10.0.0.1").await.is_ok());

        let retry = throttle.hit("10.0.0.1").await.unwrap_err();
        assert!(retry <= Duration::from_secs(60));

        assert!(throttle.hit("10.0.0.2").await.is_ok());
    }

    #[tokio::test]
    async fn window_expiry_frees_slots() {
        let throttle = LoginThrottle::new(1, Duration::from_secs(30));
        let start = Instant::now();
        assert!(throttle.hit_at("ip", start).await.is_ok());
        assert!(throttle.hit_at("ip", start + Duration::from_secs(10)).await.is_err());
        assert!(throttle.hit_at("ip", start + Duration::from_secs(31)).await.is_ok());
    }

    #[tokio::test]
    async fn reset_clears_history() {
        let throttle = LoginThrottle::per_minute(1);
        assert!(throttle.hit("ip").await.is_ok());
        assert!(throttle.hit("ip").await.is_err());
        throttle.reset("ip").await;
        assert!(throttle.hit("ip").await.is_ok());
    }

    #[tokio::test]
    async fn cleanup_removes_idle_keys() {
        let throttle = LoginThrottle::new(5, Duration::from_millis(20));
        throttle.hit("a").await.unwrap();
        throttle.hit("b").await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(throttle.cleanup().await, 0);
    }
}
