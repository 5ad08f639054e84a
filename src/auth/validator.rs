use jsonwebtoken::{decode, Algorithm, Validation};
use uuid::Uuid;

use crate::auth::session::SessionStore;
use crate::auth::token::{Claims, TokenKey, TokenKind, TokenPayload};
use crate::error::AppError;
use crate::models::User;

/// The identity a validated token grants for the rest of the request.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: User,
    pub session_id: Uuid,
}

impl Authenticated {
    pub fn payload(&self) -> TokenPayload {
        TokenPayload {
            user_id: self.user.id,
            jti: self.session_id,
        }
    }
}

/// Checks one token class: signature, expiry, then the session it names.
#[derive(Clone)]
pub struct TokenValidator {
    kind: TokenKind,
    key: TokenKey,
    validation: Validation,
    sessions: SessionStore,
}

impl TokenValidator {
    pub fn new(kind: TokenKind, key: TokenKey, sessions: SessionStore) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            kind,
            key,
            validation,
            sessions,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Decodes `token` without consulting the session store.
    pub fn decode(&self, token: &str) -> Result<TokenPayload, AppError> {
        let data = decode::<Claims>(token, &self.key.decoding, &self.validation)?;
        Ok(data.claims.payload)
    }

    /// Full validation. Every failure other than a storage fault is
    /// `Unauthorized("Invalid token")`.
    pub async fn validate(&self, token: &str) -> Result<Authenticated, AppError> {
        let payload = self.decode(token).map_err(|err| {
            log::warn!("rejected {:?} token", self.kind);
            err
        })?;
        let user = self.sessions.verify(payload.user_id, payload.jti).await?;
        Ok(Authenticated {
            user,
            session_id: payload.jti,
        })
    }
}
