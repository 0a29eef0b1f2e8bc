use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{Error, Result};

/// (submitter identity, coding-question id).
pub type SubmissionKey = (Uuid, Uuid);

#[derive(Debug)]
struct WindowState {
    start: Instant,
    count: u32,
}

/// Fixed-window counter per (candidate, coding question) key.
///
/// The check-and-increment runs under one mutex over the window map, so
/// concurrent submissions for the same key cannot undercount. Entries reset
/// when their window elapses; stale keys are pruned opportunistically.
/// Injected into the submission ledger so a distributed counter can replace
/// it without touching ledger logic.
#[derive(Clone, Debug)]
pub struct SubmissionRateLimiter {
    limit: u32,
    window: Duration,
    windows: Arc<Mutex<HashMap<SubmissionKey, WindowState>>>,
}

const PRUNE_THRESHOLD: usize = 1024;

impl SubmissionRateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit: limit.max(1),
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Admits the request or fails with `RateLimitExceeded`. Must be called
    /// before any execution or persistence.
    pub fn check(&self, key: SubmissionKey) -> Result<()> {
        let mut guard = self.windows.lock().expect("rate limiter mutex poisoned");
        let now = Instant::now();

        if guard.len() > PRUNE_THRESHOLD {
            let window = self.window;
            guard.retain(|_, state| now.duration_since(state.start) < window);
        }

        let state = guard.entry(key).or_insert(WindowState { start: now, count: 0 });
        if now.duration_since(state.start) >= self.window {
            state.start = now;
            state.count = 0;
        }

        if state.count < self.limit {
            state.count += 1;
            Ok(())
        } else {
            let elapsed = now.duration_since(state.start);
            let retry_after_secs = self.window.saturating_sub(elapsed).as_secs().max(1);
            Err(Error::RateLimitExceeded { retry_after_secs })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SubmissionKey {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn eleventh_request_in_window_is_rejected() {
        let limiter = SubmissionRateLimiter::new(10, Duration::from_secs(60));
        let k = key();
        for _ in 0..10 {
            assert!(limiter.check(k).is_ok());
        }
        assert!(matches!(
            limiter.check(k),
            Err(Error::RateLimitExceeded { .. })
        ));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = SubmissionRateLimiter::new(1, Duration::from_secs(60));
        let a = key();
        let b = key();
        assert!(limiter.check(a).is_ok());
        assert!(limiter.check(b).is_ok());
        assert!(limiter.check(a).is_err());
    }

    #[test]
    fn window_rollover_admits_again() {
        let limiter = SubmissionRateLimiter::new(2, Duration::from_millis(40));
        let k = key();
        assert!(limiter.check(k).is_ok());
        assert!(limiter.check(k).is_ok());
        assert!(limiter.check(k).is_err());
        std::thread::sleep(Duration::from_millis(60));
        assert!(limiter.check(k).is_ok());
    }

    #[test]
    fn concurrent_increments_do_not_undercount() {
        let limiter = SubmissionRateLimiter::new(10, Duration::from_secs(60));
        let k = key();
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || limiter.check(k).is_ok())
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap_or(false))
            .filter(|admitted| *admitted)
            .count();
        assert_eq!(admitted, 10);
    }
}
