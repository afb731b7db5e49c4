//! Rate limiter (component D): a true sliding window over per-key grant
//! issuance timestamps, keyed by `(projectId, userId)`. Policy is fixed at
//! 5 issuances per rolling 2-hour window (spec §4.D); this is deliberately
//! not configurable per tenant.
//!
//! Grounded on the request-scope sliding-window throttle this workspace
//! already ships (bucketed by IP and route), generalized here to a single
//! fixed policy keyed by tenant identity instead of by request shape.

use {
    dashmap::DashMap,
    pulsegate_protocol::{RATE_LIMIT_MAX_GRANTS, RATE_LIMIT_WINDOW_SECS},
    std::collections::VecDeque,
};

#[derive(Default)]
pub struct SlidingWindowRateLimiter {
    events: DashMap<(String, String), VecDeque<i64>>,
}

impl SlidingWindowRateLimiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate the window as of `now` (unix seconds). Split out from the
    /// trait method so tests can drive the clock explicitly.
    pub fn check_at(&self, project_id: &str, user_id: &str, now: i64) -> pulsegate_common::RateLimitDecision {
        let key = (project_id.to_string(), user_id.to_string());
        let mut entry = self.events.entry(key).or_default();
        let cutoff = now - RATE_LIMIT_WINDOW_SECS;
        while matches!(entry.front(), Some(&ts) if ts <= cutoff) {
            entry.pop_front();
        }

        if entry.len() as u32 >= RATE_LIMIT_MAX_GRANTS {
            let reset_at = entry.front().copied().unwrap_or(now) + RATE_LIMIT_WINDOW_SECS;
            return pulsegate_common::RateLimitDecision { ok: false, remaining: 0, reset_at };
        }

        entry.push_back(now);
        let remaining = RATE_LIMIT_MAX_GRANTS - entry.len() as u32;
        let reset_at = entry.front().copied().unwrap_or(now) + RATE_LIMIT_WINDOW_SECS;
        pulsegate_common::RateLimitDecision { ok: true, remaining, reset_at }
    }
}

#[async_trait::async_trait]
impl pulsegate_common::RateLimiter for SlidingWindowRateLimiter {
    async fn check(&self, project_id: &str, user_id: &str) -> pulsegate_common::RateLimitDecision {
        let now = crate::signer::now_unix();
        self.check_at(project_id, user_id, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_five_then_denies() {
        let limiter = SlidingWindowRateLimiter::new();
        let now = 1_000_000;
        for i in 0..5 {
            let d = limiter.check_at("proj", "user", now + i);
            assert!(d.ok, "attempt {i} should be allowed");
        }
        let denied = limiter.check_at("proj", "user", now + 5);
        assert!(!denied.ok);
        assert_eq!(denied.remaining, 0);
    }

    #[test]
    fn window_slides_and_frees_budget() {
        let limiter = SlidingWindowRateLimiter::new();
        let now = 1_000_000;
        for i in 0..5 {
            assert!(limiter.check_at("proj", "user", now + i).ok);
        }
        assert!(!limiter.check_at("proj", "user", now + 5).ok);
        // past the 2h window from the first event
        let later = now + RATE_LIMIT_WINDOW_SECS + 1;
        assert!(limiter.check_at("proj", "user", later).ok);
    }

    #[test]
    fn different_users_have_independent_budgets() {
        let limiter = SlidingWindowRateLimiter::new();
        let now = 1_000_000;
        for i in 0..5 {
            assert!(limiter.check_at("proj", "alice", now + i).ok);
        }
        assert!(limiter.check_at("proj", "bob", now).ok);
    }
}
