//! Continuous token bucket arithmetic
//!
//! Balances are kept as integer credit: one token is worth `interval`
//! nanoseconds of credit and every elapsed nanosecond accrues `refill_rate`
//! credit. Refill is therefore exact however the elapsed time is split
//! between checks.

use std::time::Duration;

use chrono::{DateTime, Utc};

use super::AdmissionError;

/// Bucket-level constants.
///
/// Every call site charging the same caller shares one policy; only the cost
/// varies per operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketPolicy {
    capacity: u32,
    refill_rate: u32,
    interval: Duration,
}

impl BucketPolicy {
    /// Create a policy holding at most `capacity` tokens and regaining
    /// `refill_rate` tokens every `interval`.
    pub fn new(capacity: u32, refill_rate: u32, interval: Duration) -> Result<Self, AdmissionError> {
        if capacity == 0 {
            return Err(AdmissionError::InvalidPolicy(
                "capacity must be greater than zero".to_string(),
            ));
        }
        if refill_rate == 0 {
            return Err(AdmissionError::InvalidPolicy(
                "refill_rate must be greater than zero".to_string(),
            ));
        }
        if interval.is_zero() {
            return Err(AdmissionError::InvalidPolicy(
                "interval must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            refill_rate,
            interval,
        })
    }

    /// Maximum balance
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Tokens regained per interval
    #[must_use]
    pub fn refill_rate(&self) -> u32 {
        self.refill_rate
    }

    /// Refill interval
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Credit worth `tokens` whole tokens
    fn credit(&self, tokens: u32) -> u128 {
        u128::from(tokens).saturating_mul(self.interval.as_nanos())
    }

    /// Credit accrued over `elapsed`
    fn accrued(&self, elapsed: Duration) -> u128 {
        u128::from(self.refill_rate).saturating_mul(elapsed.as_nanos())
    }
}

/// Per-caller admission state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Current balance in credit units, always within `[0, capacity]` tokens
    credit: u128,
    /// Last time the balance was recomputed
    pub last_refill_at: DateTime<Utc>,
}

impl Bucket {
    /// A bucket holding `tokens` (clamped to capacity) as of `now`
    #[must_use]
    pub fn new(policy: &BucketPolicy, tokens: u32, now: DateTime<Utc>) -> Self {
        Self {
            credit: policy.credit(tokens.min(policy.capacity)),
            last_refill_at: now,
        }
    }

    /// A bucket at full capacity, as seen on a caller's first request.
    #[must_use]
    pub fn full(policy: &BucketPolicy, now: DateTime<Utc>) -> Self {
        Self::new(policy, policy.capacity, now)
    }

    /// Current balance in tokens, fractional part included
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tokens(&self, policy: &BucketPolicy) -> f64 {
        self.credit as f64 / policy.interval.as_nanos() as f64
    }

    /// Whether at least `tokens` whole tokens are available
    #[must_use]
    pub fn covers(&self, policy: &BucketPolicy, tokens: u32) -> bool {
        self.credit >= policy.credit(tokens)
    }

    /// Add the credit accrued since the last recompute, clamped to capacity.
    ///
    /// A clock that moved backwards accrues nothing. `last_refill_at` always
    /// advances to `now`.
    pub fn refill(&mut self, policy: &BucketPolicy, now: DateTime<Utc>) {
        let elapsed = (now - self.last_refill_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        self.credit = self
            .credit
            .saturating_add(policy.accrued(elapsed))
            .min(policy.credit(policy.capacity));
        self.last_refill_at = now;
    }

    /// Spend `cost` tokens if the balance covers it; otherwise leave it untouched.
    pub fn try_charge(&mut self, policy: &BucketPolicy, cost: u32) -> bool {
        if self.covers(policy, cost) {
            self.credit -= policy.credit(cost);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    fn policy() -> BucketPolicy {
        BucketPolicy::new(10, 10, Duration::from_secs(60)).unwrap()
    }

    #[test]
    fn rejects_degenerate_policies() {
        assert!(BucketPolicy::new(0, 1, Duration::from_secs(1)).is_err());
        assert!(BucketPolicy::new(1, 0, Duration::from_secs(1)).is_err());
        assert!(BucketPolicy::new(1, 1, Duration::ZERO).is_err());
    }

    #[test]
    fn refill_is_proportional_to_elapsed_time() {
        let policy = policy();
        let mut bucket = Bucket::new(&policy, 0, t0());
        bucket.refill(&policy, t0() + chrono::Duration::seconds(30));
        assert_eq!(bucket.tokens(&policy), 5.0);
        assert_eq!(bucket.last_refill_at, t0() + chrono::Duration::seconds(30));
    }

    #[test]
    fn refill_clamps_to_capacity() {
        let policy = policy();
        let mut bucket = Bucket::new(&policy, 8, t0());
        bucket.refill(&policy, t0() + chrono::Duration::hours(5));
        assert_eq!(bucket, Bucket::full(&policy, t0() + chrono::Duration::hours(5)));
    }

    #[test]
    fn new_clamps_to_capacity() {
        let policy = policy();
        assert_eq!(Bucket::new(&policy, 50, t0()), Bucket::full(&policy, t0()));
    }

    #[test]
    fn backwards_clock_accrues_nothing() {
        let policy = policy();
        let mut bucket = Bucket::new(&policy, 3, t0());
        let earlier = t0() - chrono::Duration::seconds(30);
        bucket.refill(&policy, earlier);
        assert_eq!(bucket.tokens(&policy), 3.0);
        assert_eq!(bucket.last_refill_at, earlier);
    }

    #[test]
    fn insufficient_balance_is_left_untouched() {
        let policy = policy();
        let mut bucket = Bucket::new(&policy, 4, t0());
        bucket.refill(&policy, t0() + chrono::Duration::seconds(3));
        assert_eq!(bucket.tokens(&policy), 4.5);

        assert!(!bucket.try_charge(&policy, 5));
        assert_eq!(bucket.tokens(&policy), 4.5);
        assert!(bucket.try_charge(&policy, 4));
        assert_eq!(bucket.tokens(&policy), 0.5);
    }

    #[test]
    fn stepwise_refill_matches_one_full_interval() {
        let policy = BucketPolicy::new(1, 1, Duration::from_secs(10)).unwrap();
        let mut bucket = Bucket::full(&policy, t0());
        assert!(bucket.try_charge(&policy, 1));

        for step in 1..10 {
            bucket.refill(&policy, t0() + chrono::Duration::seconds(step));
            assert!(!bucket.try_charge(&policy, 1), "step {step}");
        }

        bucket.refill(&policy, t0() + chrono::Duration::seconds(10));
        assert!(bucket.try_charge(&policy, 1));
        assert_eq!(bucket.tokens(&policy), 0.0);
    }

    #[test]
    fn uneven_steps_accrue_exactly() {
        let policy = BucketPolicy::new(3, 1, Duration::from_secs(3)).unwrap();
        let mut bucket = Bucket::new(&policy, 0, t0());
        let mut now = t0();
        for _ in 0..3_000 {
            now += chrono::Duration::milliseconds(1);
            bucket.refill(&policy, now);
        }
        assert!(bucket.covers(&policy, 1));
        assert!(!bucket.covers(&policy, 2));
        assert_eq!(bucket.tokens(&policy), 1.0);
    }
}
