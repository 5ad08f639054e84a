//! Storage collaborators for users and sessions.
//!
//! The rest of the crate only sees the two repository traits. `PgStore` backs
//! them with Postgres, `MemoryStore` keeps everything in the process.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Session, User};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn list_users(&self) -> Result<Vec<User>, AppError>;
    /// Overwrites email, password hash and role of the user with `user.id`.
    /// Returns the number of rows changed; taking another user's email is a conflict.
    async fn update_user(&self, user: &User) -> Result<u64, AppError>;
    /// Returns the number of rows removed. The user's sessions go with it.
    async fn delete_user(&self, id: Uuid) -> Result<u64, AppError>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn insert_session(&self, session: &Session) -> Result<(), AppError>;
    /// Owner of the session `id` if it belongs to `owner` and expires after `now`.
    async fn find_session_owner(
        &self,
        id: Uuid,
        owner: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, AppError>;
    /// Returns the number of rows removed.
    async fn delete_session(&self, id: Uuid) -> Result<u64, AppError>;
}

/// A backend that stores both users and sessions.
pub trait Store: UserRepository + SessionRepository {
    fn backend(&self) -> &'static str;
}
