use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Role of a user. Corresponds to the `user_role` SQL enum.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Manager,
    Performer,
}

/// A user account as stored in the `users` table.
///
/// The password hash is never serialized into responses.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String, role: UserRole) -> Self {
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            role,
            created_at: Utc::now(),
        }
    }
}

/// Payload for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, max = 20, message = "Password must be 8 to 20 characters"))]
    pub password: String,
    pub role: UserRole,
}

/// Partial update of a user. Absent fields keep their stored value.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 20, message = "Password must be 8 to 20 characters"))]
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_create_user_request_validation() {
        let input = CreateUserRequest {
            email: "test@example.com".to_string(),
            password: "password123".to_string(),
            role: UserRole::Performer,
        };
        assert!(input.validate().is_ok());

        let input = CreateUserRequest {
            email: "invalid-email".to_string(),
            password: "password123".to_string(),
            role: UserRole::Performer,
        };
        assert!(input.validate().is_err());

        let input = CreateUserRequest {
            email: "test@example.com".to_string(),
            password: "short".to_string(),
            role: UserRole::Admin,
        };
        assert!(input.validate().is_err());

        let input = CreateUserRequest {
            email: "test@example.com".to_string(),
            password: "a".repeat(21),
            role: UserRole::Manager,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_update_user_request_validates_present_fields_only() {
        assert!(UpdateUserRequest::default().validate().is_ok());

        let input: UpdateUserRequest = serde_json::from_str(r#"{"role":"admin"}"#).unwrap();
        assert_eq!(input.role, Some(UserRole::Admin));
        assert!(input.email.is_none());
        assert!(input.validate().is_ok());

        let input = UpdateUserRequest {
            email: Some("invalid-email".into()),
            ..Default::default()
        };
        assert!(input.validate().is_err());

        let input = UpdateUserRequest {
            password: Some("short".into()),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User::new(
            "a@b.com".into(),
            "$scrypt$secret".into(),
            UserRole::Manager,
        );
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["email"], "a@b.com");
        assert_eq!(json["role"], "manager");
    }

    #[test]
    fn test_role_deserialization() {
        let role: UserRole = serde_json::from_str("\"performer\"").unwrap();
        assert_eq!(role, UserRole::Performer);
        assert!(serde_json::from_str::<UserRole>("\"owner\"").is_err());
    }
}
