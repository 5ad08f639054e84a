use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::{
    auth::{AuthMiddleware, Authenticated, LoginRequest},
    error::AppError,
    state::AppState,
};

/// Login user
///
/// Verifies the credentials and returns a fresh access/refresh token pair.
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let tokens = state.auth.login(&login_data).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

/// Logout user
///
/// Revokes the session behind the presented access token.
pub async fn logout(
    state: web::Data<AppState>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let revoked = state.auth.logout(auth.session_id).await?;
    Ok(HttpResponse::Ok().json(revoked))
}

/// Refresh access token
///
/// Issues a new access token for the session behind the presented refresh token.
pub async fn refresh(
    state: web::Data<AppState>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let response = state.auth.refresh_access_token(auth.payload())?;
    Ok(HttpResponse::Ok().json(response))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/login").route(web::post().to(login)))
        .service(
            web::resource("/logout")
                .wrap(AuthMiddleware::access())
                .route(web::post().to(logout)),
        )
        .service(
            web::resource("/refresh")
                .wrap(AuthMiddleware::refresh())
                .route(web::post().to(refresh)),
        );
}
