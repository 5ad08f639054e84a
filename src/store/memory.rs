use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{SessionRepository, Store, UserRepository};
use crate::error::AppError;
use crate::models::{Session, User};

/// Process-local store. Used when no database is configured, and by tests.
///
/// Locks are held for a single map operation and never across an `.await`.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    sessions: RwLock<HashMap<Uuid, Session>>,
}

fn poisoned<T>(_: T) -> AppError {
    AppError::DatabaseError("in-memory store lock poisoned".into())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, User>>, AppError> {
        self.users.read().map_err(poisoned)
    }

    fn users_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, User>>, AppError> {
        self.users.write().map_err(poisoned)
    }

    fn sessions(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, Session>>, AppError> {
        self.sessions.read().map_err(poisoned)
    }

    fn sessions_mut(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, Session>>, AppError> {
        self.sessions.write().map_err(poisoned)
    }

    /// Number of session rows, expired ones included.
    pub fn session_count(&self) -> usize {
        self.sessions().map(|s| s.len()).unwrap_or(0)
    }

    pub fn sessions_of(&self, user_id: Uuid) -> Vec<Session> {
        self.sessions()
            .map(|s| {
                s.values()
                    .filter(|session| session.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut users = self.users_mut()?;
        if users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email already in use".into()));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users()?.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users()?.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let mut users: Vec<User> = self.users()?.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<u64, AppError> {
        let mut users = self.users_mut()?;
        if users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(AppError::Conflict("Email already in use".into()));
        }
        match users.get_mut(&user.id) {
            Some(stored) => {
                stored.email = user.email.clone();
                stored.password_hash = user.password_hash.clone();
                stored.role = user.role;
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_user(&self, id: Uuid) -> Result<u64, AppError> {
        let removed = self.users_mut()?.remove(&id).is_some();
        if removed {
            self.sessions_mut()?.retain(|_, s| s.user_id != id);
        }
        Ok(removed as u64)
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn insert_session(&self, session: &Session) -> Result<(), AppError> {
        self.sessions_mut()?.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_session_owner(
        &self,
        id: Uuid,
        owner: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError> {
        let live = self
            .sessions()?
            .get(&id)
            .is_some_and(|s| s.is_valid_for(owner, now));
        if !live {
            return Ok(None);
        }
        self.find_user(owner).await
    }

    async fn delete_session(&self, id: Uuid) -> Result<u64, AppError> {
        Ok(self.sessions_mut()?.remove(&id).is_some() as u64)
    }
}

impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }
}
