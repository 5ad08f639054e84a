use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::AppError;

/// One issued login, the record a token's `jti` claim points at.
///
/// Deleting the row revokes every token that references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Fails if the expiry would fall outside the representable date range.
    pub fn new(user_id: Uuid, lifetime: Duration) -> Result<Self, AppError> {
        let expires_at = Utc::now()
            .checked_add_signed(lifetime)
            .ok_or_else(|| AppError::InternalServerError("session lifetime out of range".into()))?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            expires_at,
        })
    }

    /// Live for `owner` at `now`: owner matches and expiry is strictly in the future.
    pub fn is_valid_for(&self, owner: Uuid, now: DateTime<Utc>) -> bool {
        self.user_id == owner && self.expires_at > now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_validity() {
        let owner = Uuid::new_v4();
        let session = Session::new(owner, Duration::days(7)).unwrap();
        let now = Utc::now();

        assert!(session.is_valid_for(owner, now));
        assert!(!session.is_valid_for(Uuid::new_v4(), now));
        assert!(!session.is_valid_for(owner, session.expires_at));
        assert!(!session.is_valid_for(owner, now + Duration::days(8)));
    }

    #[test]
    fn test_lifetime_past_max_date_is_an_error() {
        let result = Session::new(Uuid::new_v4(), Duration::days(100_000_000));
        assert!(matches!(result, Err(AppError::InternalServerError(_))));
    }
}
