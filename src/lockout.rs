/// Brute-force lockout policy
///
/// Pure decision logic over the lock-related fields of a user record. No
/// I/O happens here: each method emits a [`UserPatch`] that the session
/// service applies through the credential store.
use crate::credentials::UserPatch;
use chrono::{DateTime, Duration, Utc};

/// Lockout policy parameters
#[derive(Debug, Clone, Copy)]
pub struct LockoutPolicy {
    max_attempts: i64,
    lockout: Duration,
}

impl LockoutPolicy {
    pub fn new(max_attempts: i64, lockout_minutes: i64) -> Self {
        Self {
            max_attempts,
            lockout: Duration::minutes(lockout_minutes),
        }
    }

    /// Unlock patch for a lock whose deadline has passed.
    ///
    /// A locked account with no `locked_until` stays locked until an
    /// explicit unlock.
    pub fn expired_unlock(
        &self,
        locked: bool,
        locked_until: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<UserPatch> {
        match (locked, locked_until) {
            (true, Some(until)) if until <= now => Some(UserPatch {
                locked: Some(false),
                locked_until: Some(None),
                login_attempts: Some(0),
                ..Default::default()
            }),
            _ => None,
        }
    }

    /// Lock patch when a failed attempt crosses the threshold.
    ///
    /// `attempts` is the count after the current failure has been recorded.
    pub fn on_failure(&self, attempts: i64, now: DateTime<Utc>) -> Option<UserPatch> {
        if attempts >= self.max_attempts {
            Some(UserPatch {
                locked: Some(true),
                locked_until: Some(Some(now + self.lockout)),
                ..Default::default()
            })
        } else {
            None
        }
    }

    /// Counter-reset patch for a successful login
    pub fn on_success(&self, now: DateTime<Utc>) -> UserPatch {
        UserPatch {
            login_attempts: Some(0),
            last_login: Some(now),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::new(5, 30)
    }

    #[test]
    fn test_below_threshold_does_not_lock() {
        let now = Utc::now();
        for attempts in 1..5 {
            assert!(policy().on_failure(attempts, now).is_none());
        }
    }

    #[test]
    fn test_fifth_failure_locks_for_thirty_minutes() {
        let now = Utc::now();
        let patch = policy().on_failure(5, now).expect("should lock");

        assert_eq!(patch.locked, Some(true));
        assert_eq!(patch.locked_until, Some(Some(now + Duration::minutes(30))));
    }

    #[test]
    fn test_expired_lock_unlocks_and_resets_counter() {
        let now = Utc::now();
        let patch = policy()
            .expired_unlock(true, Some(now - Duration::minutes(1)), now)
            .expect("should unlock");

        assert_eq!(patch.locked, Some(false));
        assert_eq!(patch.locked_until, Some(None));
        assert_eq!(patch.login_attempts, Some(0));
    }

    #[test]
    fn test_future_lock_stays_locked() {
        let now = Utc::now();
        assert!(policy()
            .expired_unlock(true, Some(now + Duration::minutes(10)), now)
            .is_none());
    }

    #[test]
    fn test_lock_without_deadline_needs_explicit_unlock() {
        let now = Utc::now();
        assert!(policy().expired_unlock(true, None, now).is_none());
    }

    #[test]
    fn test_unlocked_account_gets_no_patch() {
        let now = Utc::now();
        assert!(policy().expired_unlock(false, None, now).is_none());
    }

    #[test]
    fn test_success_resets_counter_and_stamps_login() {
        let now = Utc::now();
        let patch = policy().on_success(now);

        assert_eq!(patch.login_attempts, Some(0));
        assert_eq!(patch.last_login, Some(now));
        assert_eq!(patch.locked, None);
    }
}
