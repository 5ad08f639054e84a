use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::validator::Authenticated;
use crate::error::AppError;

/// Extracts the identity placed in request extensions by `AuthMiddleware`.
///
/// On a route without a gate there is nothing to extract, and the request
/// fails with `AppError::Unauthorized`.
impl FromRequest for Authenticated {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Authenticated>().cloned() {
            Some(auth) => ready(Ok(auth)),
            None => ready(Err(AppError::missing_token().into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{User, UserRole};
    use actix_web::http::StatusCode;
    use actix_web::test;
    use uuid::Uuid;

    #[actix_rt::test]
    async fn test_authenticated_extractor_success() {
        let req = test::TestRequest::default().to_http_request();
        let user = User::new("a@b.com".into(), "$scrypt$x".into(), UserRole::Manager);
        let session_id = Uuid::new_v4();
        req.extensions_mut().insert(Authenticated {
            user: user.clone(),
            session_id,
        });

        let mut payload = Payload::None;
        let extracted = Authenticated::from_request(&req, &mut payload).await.unwrap();
        assert_eq!(extracted.user.id, user.id);
        assert_eq!(extracted.session_id, session_id);
    }

    #[actix_rt::test]
    async fn test_authenticated_extractor_failure() {
        let req = test::TestRequest::default().to_http_request();

        let mut payload = Payload::None;
        let err = Authenticated::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // Same body the auth gate sends for a request without a token.
        let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Missing token");
    }
}
