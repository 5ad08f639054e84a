use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Session, User};
use crate::store::SessionRepository;

/// Server-side session records backing revocation.
///
/// A session is live while a row with its id and owner exists and has not
/// expired. Expired rows are not purged; they simply stop verifying.
#[derive(Clone)]
pub struct SessionStore {
    repo: Arc<dyn SessionRepository>,
}

impl SessionStore {
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self { repo }
    }

    /// Persists a new session for `user_id` expiring after `lifetime` and returns its id.
    pub async fn create(&self, user_id: Uuid, lifetime: Duration) -> Result<Uuid, AppError> {
        let session = Session::new(user_id, lifetime)?;
        self.repo.insert_session(&session).await?;
        log::info!(
            "created session {} for user {} expiring at {}",
            session.id,
            user_id,
            session.expires_at.to_rfc3339()
        );
        Ok(session.id)
    }

    /// Returns the owner of a live session keyed on both `session_id` and `user_id`.
    ///
    /// Missing, expired and foreign sessions all fail the same way.
    pub async fn verify(&self, user_id: Uuid, session_id: Uuid) -> Result<User, AppError> {
        match self
            .repo
            .find_session_owner(session_id, user_id, Utc::now())
            .await?
        {
            Some(owner) => {
                log::debug!("verified session {} for user {}", session_id, user_id);
                Ok(owner)
            }
            None => {
                log::warn!("invalid or expired session provided for user {}", user_id);
                Err(AppError::invalid_token())
            }
        }
    }

    /// Removes the session. Deleting an unknown id still succeeds.
    pub async fn delete(&self, session_id: Uuid) -> Result<bool, AppError> {
        let removed = self.repo.delete_session(session_id).await?;
        log::info!("deleted session {} ({} row(s))", session_id, removed);
        Ok(true)
    }
}
