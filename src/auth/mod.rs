pub mod extractors;
pub mod middleware;
pub mod password;
pub mod service;
pub mod session;
pub mod token;
pub mod validator;

use serde::Deserialize;
use ::validator::Validate;

// Re-export necessary items
pub use middleware::{AuthMiddleware, RoleGuard};
pub use password::{hash_password, verify_password, HashScheme};
pub use service::{AccessTokenResponse, AuthService};
pub use session::SessionStore;
pub use token::{Claims, TokenKind, TokenPair, TokenPayload};
pub use validator::{Authenticated, TokenValidator};

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// User's email address.
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// User's password, 8 to 20 characters.
    #[validate(length(min = 8, max = 20, message = "Password must be 8 to 20 characters"))]
    pub password: String,
}
