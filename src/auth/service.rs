use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password, HashScheme, PasswordError};
use crate::auth::session::SessionStore;
use crate::auth::token::{TokenIssuer, TokenKeys, TokenKind, TokenPair, TokenPayload};
use crate::auth::validator::TokenValidator;
use crate::auth::LoginRequest;
use crate::config::JwtConfig;
use crate::error::AppError;
use crate::models::{CreateUserRequest, UpdateUserRequest, User};
use crate::store::{SessionRepository, UserRepository};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Default-cost scrypt hash of a throwaway password. Logins for unknown
/// emails verify against it so they take as long as a wrong password.
const UNKNOWN_USER_HASH: &str = "$scrypt$N=32768,r=8,p=1,maxmem=67108864$gd2y0KZmHySg2otObPAqor5LTUumiLRog/beJnjPdFk$ySiXCwkBLE/15RUUaMnE/m2IpdKjXwUMdUEPTtbcsXGkjKY3kBp/xO77mdt4LSYO1TkNFFPQrt+NL+RAFwFZOA";

/// Login, logout and refresh, plus the two validators the request gates use.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    sessions: SessionStore,
    issuer: TokenIssuer,
    access: TokenValidator,
    refresh: TokenValidator,
}

/// Runs a password KDF off the async executor.
async fn blocking<T, F>(job: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, PasswordError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|e| AppError::InternalServerError(format!("password task failed: {}", e)))?
        .map_err(AppError::from)
}

impl AuthService {
    pub fn new(
        config: &JwtConfig,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_keys(TokenKeys::from_config(config), users, sessions)
    }

    pub fn with_keys(
        keys: TokenKeys,
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionRepository>,
    ) -> Self {
        let sessions = SessionStore::new(sessions);
        Self {
            users,
            issuer: TokenIssuer::new(keys.clone(), sessions.clone()),
            access: TokenValidator::new(TokenKind::Access, keys.access, sessions.clone()),
            refresh: TokenValidator::new(TokenKind::Refresh, keys.refresh, sessions.clone()),
            sessions,
        }
    }

    pub fn access_validator(&self) -> &TokenValidator {
        &self.access
    }

    pub fn refresh_validator(&self) -> &TokenValidator {
        &self.refresh
    }

    pub fn validator(&self, kind: TokenKind) -> &TokenValidator {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    /// Checks credentials and opens a new session.
    ///
    /// Unknown email and wrong password fail with the same error.
    pub async fn login(&self, request: &LoginRequest) -> Result<TokenPair, AppError> {
        log::info!("attempting to log in with email: {}", request.email);

        let Some(user) = self.users.find_user_by_email(&request.email).await? else {
            log::warn!("login failed: no user found with email: {}", request.email);
            let password = request.password.clone();
            blocking(move || verify_password(&password, UNKNOWN_USER_HASH)).await?;
            return Err(AppError::invalid_credentials());
        };

        let password = request.password.clone();
        let stored = user.password_hash.clone();
        if !blocking(move || verify_password(&password, &stored)).await? {
            log::warn!("login failed: invalid password for email: {}", request.email);
            return Err(AppError::invalid_credentials());
        }

        let tokens = self.issuer.generate_tokens(user.id).await?;
        log::info!("login successful for user {}", user.id);
        Ok(tokens)
    }

    /// Revokes the session. Always `true` unless the store fails.
    pub async fn logout(&self, session_id: Uuid) -> Result<bool, AppError> {
        log::info!("logging out session {}", session_id);
        self.sessions.delete(session_id).await
    }

    /// Mints a new access token for a payload that already passed the refresh validator.
    pub fn refresh_access_token(
        &self,
        payload: TokenPayload,
    ) -> Result<AccessTokenResponse, AppError> {
        let access_token = self.issuer.refresh_access_token(payload)?;
        log::info!("access token refreshed for user {}", payload.user_id);
        Ok(AccessTokenResponse { access_token })
    }

    /// Creates a user with an scrypt password hash.
    pub async fn register(&self, request: &CreateUserRequest) -> Result<User, AppError> {
        if self.users.find_user_by_email(&request.email).await?.is_some() {
            log::warn!("user with email {} already exists", request.email);
            return Err(AppError::Conflict("Email already in use".into()));
        }

        let password = request.password.clone();
        let password_hash = blocking(move || hash_password(&password, HashScheme::Scrypt)).await?;
        let user = User::new(request.email.clone(), password_hash, request.role);
        self.users.insert_user(&user).await?;
        log::info!("user {} created with role {:?}", user.id, user.role);
        Ok(user)
    }

    /// Applies the fields present in `changes` to user `id`. A new password
    /// is stored as a fresh scrypt hash.
    pub async fn update_user(
        &self,
        id: Uuid,
        changes: &UpdateUserRequest,
    ) -> Result<User, AppError> {
        let mut user = self
            .users
            .find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        if let Some(email) = &changes.email {
            user.email = email.clone();
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(password) = changes.password.clone() {
            user.password_hash =
                blocking(move || hash_password(&password, HashScheme::Scrypt)).await?;
        }

        if self.users.update_user(&user).await? == 0 {
            return Err(AppError::NotFound("User not found".into()));
        }
        log::info!("user {} updated", user.id);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::tests::fast_scrypt;
    use crate::auth::token::tests::keys;
    use crate::models::UserRole;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    async fn service_with_user(
        email: &str,
        password: &str,
    ) -> (Arc<MemoryStore>, AuthService, User) {
        let store = Arc::new(MemoryStore::new());
        let user = User::new(email.into(), fast_scrypt(password), UserRole::Performer);
        store.insert_user(&user).await.unwrap();
        let service = AuthService::with_keys(keys(), store.clone(), store.clone());
        (store, service, user)
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[actix_rt::test]
    async fn test_login_with_scrypt_hash_then_logout() {
        let (store, service, user) = service_with_user("a@b.com", "Password123!").await;

        let tokens = service.login(&login("a@b.com", "Password123!")).await.unwrap();
        assert_ne!(tokens.access_token, tokens.refresh_token);
        assert_eq!(store.sessions_of(user.id).len(), 1);

        let auth = service
            .access_validator()
            .validate(&tokens.access_token)
            .await
            .unwrap();
        assert_eq!(auth.user.id, user.id);

        assert!(service.logout(auth.session_id).await.unwrap());
        match service.access_validator().validate(&tokens.access_token).await {
            Err(AppError::Unauthorized(_)) => {}
            other => panic!("expected unauthorized after logout, got {:?}", other),
        }
        // Nothing left to delete, still a success.
        assert!(service.logout(auth.session_id).await.unwrap());
    }

    #[actix_rt::test]
    async fn test_login_failures_are_indistinguishable() {
        let (store, service, _) = service_with_user("a@b.com", "Password123!").await;

        let unknown = service
            .login(&login("nobody@b.com", "Password123!"))
            .await
            .unwrap_err();
        let wrong = service
            .login(&login("a@b.com", "WrongPassword1!"))
            .await
            .unwrap_err();

        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(matches!(wrong, AppError::Unauthorized(ref m) if m == "Invalid credentials"));
        assert_eq!(store.session_count(), 0);
    }

    #[actix_rt::test]
    async fn test_each_login_opens_its_own_session() {
        let (store, service, user) = service_with_user("a@b.com", "Password123!").await;

        let first = service.login(&login("a@b.com", "Password123!")).await.unwrap();
        let second = service.login(&login("a@b.com", "Password123!")).await.unwrap();

        assert_eq!(store.sessions_of(user.id).len(), 2);
        let a = service.access_validator().validate(&first.access_token).await.unwrap();
        let b = service.access_validator().validate(&second.access_token).await.unwrap();
        assert_ne!(a.session_id, b.session_id);
    }

    #[actix_rt::test]
    async fn test_refresh_keeps_the_session_id() {
        let (store, service, _) = service_with_user("a@b.com", "Password123!").await;
        let tokens = service.login(&login("a@b.com", "Password123!")).await.unwrap();
        let auth = service
            .refresh_validator()
            .validate(&tokens.refresh_token)
            .await
            .unwrap();

        let refreshed = service.refresh_access_token(auth.payload()).unwrap();

        let again = service
            .access_validator()
            .validate(&refreshed.access_token)
            .await
            .unwrap();
        assert_eq!(again.session_id, auth.session_id);
        assert_eq!(store.session_count(), 1);
    }

    #[actix_rt::test]
    async fn test_unsupported_stored_hash_surfaces() {
        let store = Arc::new(MemoryStore::new());
        let user = User::new("a@b.com".into(), "$md5$abc".into(), UserRole::Admin);
        store.insert_user(&user).await.unwrap();
        let service = AuthService::with_keys(keys(), store.clone(), store);

        let err = service.login(&login("a@b.com", "Password123!")).await.unwrap_err();
        assert!(matches!(err, AppError::Unsupported(_)));
    }

    #[test]
    fn test_unknown_user_hash_costs_a_default_scrypt() {
        let prefix = format!("$scrypt${}$", crate::auth::password::ScryptParams::default());
        assert!(UNKNOWN_USER_HASH.starts_with(&prefix));
        assert!(!verify_password("Password123!", UNKNOWN_USER_HASH).unwrap());
    }

    #[actix_rt::test]
    async fn test_update_user_applies_present_fields() {
        let (store, service, user) = service_with_user("a@b.com", "Password123!").await;
        let old_hash = user.password_hash.clone();

        let updated = service
            .update_user(
                user.id,
                &UpdateUserRequest {
                    email: Some("new@b.com".into()),
                    password: Some("NewPassword1!".into()),
                    role: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.email, "new@b.com");
        assert_eq!(updated.role, UserRole::Performer);
        let stored = store.find_user(user.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, old_hash);
        assert!(stored.password_hash.starts_with("$scrypt$"));

        assert!(service.login(&login("new@b.com", "NewPassword1!")).await.is_ok());
        assert!(service.login(&login("new@b.com", "Password123!")).await.is_err());
    }

    #[actix_rt::test]
    async fn test_update_user_missing_or_conflicting() {
        let (store, service, user) = service_with_user("a@b.com", "Password123!").await;
        let other = User::new("c@d.com".into(), fast_scrypt("Password123!"), UserRole::Admin);
        store.insert_user(&other).await.unwrap();

        let missing = service
            .update_user(Uuid::new_v4(), &UpdateUserRequest::default())
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let taken = UpdateUserRequest {
            email: Some("c@d.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_user(user.id, &taken).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[actix_rt::test]
    async fn test_register_rejects_duplicate_email() {
        let (_, service, _) = service_with_user("a@b.com", "Password123!").await;
        let request = CreateUserRequest {
            email: "a@b.com".into(),
            password: "Password123!".into(),
            role: UserRole::Manager,
        };

        assert!(matches!(
            service.register(&request).await,
            Err(AppError::Conflict(_))
        ));
    }
}
