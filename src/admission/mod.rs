//! Per-caller admission control: a continuous token bucket charged before any
//! tool work is done.
//!
//! Capacity and refill rate belong to the bucket; the cost belongs to the
//! operation, so unrelated call sites can charge different amounts against the
//! same caller's budget.

mod bucket;
mod clock;
mod store;

pub use bucket::{Bucket, BucketPolicy};
pub use clock::{Clock, ManualClock, SystemClock};
pub use store::{BucketStore, InMemoryBucketStore};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RateLimitConfig;

/// Failures inside the admission layer itself (not denials)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdmissionError {
    /// The clock could not be read
    #[error("clock unavailable: {0}")]
    Clock(String),
    /// The bucket store could not be read or written
    #[error("bucket store unavailable: {0}")]
    Store(String),
    /// Policy constants are unusable
    #[error("invalid bucket policy: {0}")]
    InvalidPolicy(String),
}

/// What to do when the admission layer itself fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the call; availability wins over strict enforcement
    #[default]
    FailOpen,
    /// Deny the call
    FailClosed,
}

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    /// Whether the call may proceed
    pub allowed: bool,
    /// Balance left after the check
    pub remaining: f64,
    /// The decision came from the failure policy, not from a bucket
    pub degraded: bool,
}

/// Refill the caller's bucket to `now`, then charge `cost` if the balance
/// covers it.
///
/// The refill is persisted even when the charge is denied. The whole
/// recompute, compare and subtract sequence runs inside one
/// [`BucketStore::update`] call.
pub fn check_and_charge(
    store: &dyn BucketStore,
    key: &str,
    cost: u32,
    policy: &BucketPolicy,
    now: DateTime<Utc>,
) -> Result<Admission, AdmissionError> {
    debug_assert!(cost > 0, "admission cost must be positive");

    let mut allowed = false;
    let bucket = store.update(key, &mut |current| {
        let mut bucket = current.unwrap_or_else(|| Bucket::full(policy, now));
        bucket.refill(policy, now);
        allowed = bucket.try_charge(policy, cost);
        bucket
    })?;

    Ok(Admission {
        allowed,
        remaining: bucket.tokens(policy),
        degraded: false,
    })
}

/// Admission gate shared by every call site that charges a caller
pub struct AdmissionControl {
    store: Arc<dyn BucketStore>,
    clock: Arc<dyn Clock>,
    policy: BucketPolicy,
    failure_policy: FailurePolicy,
}

impl AdmissionControl {
    /// Gate with an in-memory store, the system clock, and fail-open behaviour
    #[must_use]
    pub fn new(policy: BucketPolicy) -> Self {
        Self {
            store: Arc::new(InMemoryBucketStore::new()),
            clock: Arc::new(SystemClock),
            policy,
            failure_policy: FailurePolicy::default(),
        }
    }

    /// Build from the `rate_limit` configuration section
    pub fn from_config(config: &RateLimitConfig) -> Result<Self, AdmissionError> {
        let policy = BucketPolicy::new(config.capacity, config.refill_rate, config.interval)?;
        Ok(Self::new(policy).with_failure_policy(config.failure_policy))
    }

    /// Replace the bucket store
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn BucketStore>) -> Self {
        self.store = store;
        self
    }

    /// Replace the clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the failure policy
    #[must_use]
    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Bucket constants in force
    #[must_use]
    pub fn policy(&self) -> &BucketPolicy {
        &self.policy
    }

    /// Charge `cost` against `key`'s bucket.
    ///
    /// Never fails: clock or store errors are resolved by the configured
    /// [`FailurePolicy`] and logged.
    pub fn admit(&self, key: &str, cost: u32) -> Admission {
        let checked = self
            .clock
            .now()
            .and_then(|now| check_and_charge(self.store.as_ref(), key, cost, &self.policy, now));

        match checked {
            Ok(admission) => {
                if admission.allowed {
                    debug!(caller = %key, cost, remaining = admission.remaining, "Admitted");
                } else {
                    warn!(caller = %key, cost, remaining = admission.remaining, "Rate limit exceeded");
                }
                admission
            }
            Err(e) => {
                let allowed = self.failure_policy == FailurePolicy::FailOpen;
                warn!(
                    caller = %key,
                    error = %e,
                    policy = ?self.failure_policy,
                    allowed,
                    "Admission layer unavailable, applying failure policy"
                );
                Admission {
                    allowed,
                    remaining: 0.0,
                    degraded: true,
                }
            }
        }
    }
}
