//! Brute-force lockout policy.
//!
//! Pure state transitions over an account's failed-attempt counter and lock
//! expiry. No IO and no clock: callers pass `now`.
//!
//! An account is locked while `locked_until > now` (strictly). Once the lock
//! has expired the next failure starts counting from 1 again.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_FAILED_ATTEMPTS: u32 = 5;
pub const LOCK_DURATION_MINUTES: i64 = 30;

/// Per-account lockout fields as persisted alongside the user record.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockoutState {
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LockStatus {
    Unlocked,
    Locked { until: DateTime<Utc> },
}

impl LockStatus {
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Consecutive failures (within the current unlocked window) that engage the lock.
    pub max_failed_attempts: u32,
    /// Absolute wall-clock length of a lock.
    pub lock_duration: TimeDelta,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_failed_attempts: MAX_FAILED_ATTEMPTS,
            lock_duration: TimeDelta::minutes(LOCK_DURATION_MINUTES),
        }
    }
}

impl LockoutPolicy {
    pub fn status(&self, state: &LockoutState, now: DateTime<Utc>) -> LockStatus {
        match state.locked_until {
            Some(until) if until > now => LockStatus::Locked { until },
            _ => LockStatus::Unlocked,
        }
    }

    /// State after a wrong password on an unlocked account.
    ///
    /// An expired lock forgives earlier failures: counting restarts at 1.
    pub fn after_failure(&self, state: &LockoutState, now: DateTime<Utc>) -> LockoutState {
        let failed_attempts = match state.locked_until {
            Some(until) if until <= now => 1,
            _ => state.failed_attempts.saturating_add(1),
        };

        let locked_until = if failed_attempts >= self.max_failed_attempts {
            Some(now + self.lock_duration)
        } else {
            None
        };

        LockoutState {
            failed_attempts,
            locked_until,
        }
    }

    /// State after a correct password.
    pub fn after_success(&self) -> LockoutState {
        LockoutState::default()
    }
}
