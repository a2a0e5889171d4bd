use crate::error::AppError;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

#[derive(Clone)]
struct Bucket {
    capacity: u32,
    tokens: f64,
    refill_rate: f64,
    last_update: Instant,
}

impl Bucket {
    fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            tokens: capacity as f64,
            refill_rate,
            last_update: Instant::now(),
        }
    }

    fn allow_request(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = f64::min(self.capacity as f64, self.tokens + elapsed * self.refill_rate);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Process-wide token bucket in front of the intake gate
///
/// Bursts up to `per_second` requests, refilled at the same rate. Built with
/// a rate of zero it lets everything through.
pub struct RateLimiter {
    bucket: Option<Mutex<Bucket>>,
}

impl RateLimiter {
    pub fn new(per_second: u32) -> Self {
        let bucket = (per_second > 0).then(|| Mutex::new(Bucket::new(per_second, per_second as f64)));
        Self { bucket }
    }

    pub fn check_rate_limit(&self) -> Result<(), AppError> {
        self.check_at(Instant::now())
    }

    fn check_at(&self, now: Instant) -> Result<(), AppError> {
        let Some(bucket) = &self.bucket else {
            return Ok(());
        };

        let allowed = bucket.lock().unwrap_or_else(PoisonError::into_inner).allow_request(now);
        if allowed {
            Ok(())
        } else {
            Err(AppError::RateLimitExceeded("too many order submissions".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_burst_then_reject() {
        let limiter = RateLimiter::new(3);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(limiter.check_at(now).is_ok());
        }
        assert!(matches!(limiter.check_at(now), Err(AppError::RateLimitExceeded(_))));
    }

    #[test]
    fn test_refill_over_time() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();

        assert!(limiter.check_at(start).is_ok());
        assert!(limiter.check_at(start).is_ok());
        assert!(limiter.check_at(start).is_err());

        // Half a second at 2/s buys one more request.
        let later = start + Duration::from_millis(500);
        assert!(limiter.check_at(later).is_ok());
        assert!(limiter.check_at(later).is_err());
    }

    #[test]
    fn test_zero_rate_disables_limit() {
        let limiter = RateLimiter::new(0);
        for _ in 0..10_000 {
            assert!(limiter.check_rate_limit().is_ok());
        }
    }
}
