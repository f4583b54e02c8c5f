//! Session model

use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Login session; the id doubles as the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (token)
    pub id: String,
    /// Associated user ID
    pub user_id: i64,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Start a fresh session for `user_id` that lives for `days`
    ///
    /// Fails when the lifetime does not fit in a timestamp.
    pub fn issue(user_id: i64, days: i64) -> anyhow::Result<Self> {
        let now = Utc::now();
        let expires_at = Duration::try_days(days)
            .and_then(|lifetime| now.checked_add_signed(lifetime))
            .ok_or_else(|| anyhow!("Session lifetime of {} days is out of range", days))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            expires_at,
            created_at: now,
        })
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_sets_expiry() {
        let session = Session::issue(7, 7).unwrap();
        assert_eq!(session.user_id, 7);
        assert!(!session.is_expired());
        assert_eq!((session.expires_at - session.created_at).num_days(), 7);
        assert!(Uuid::parse_str(&session.id).is_ok());
    }

    #[test]
    fn test_expired_session() {
        let mut session = Session::issue(1, 7).unwrap();
        session.expires_at = Utc::now() - Duration::seconds(1);
        assert!(session.is_expired());
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error() {
        assert!(Session::issue(1, 9_000_000_000_000).is_err());
        assert!(Session::issue(1, i64::MAX).is_err());
    }
}
