//! Per-route authentication gates.
//!
//! Routes opt in explicitly when they are registered:
//! `AuthMiddleware::access()` or `AuthMiddleware::refresh()` validate the
//! bearer token of the matching class, and `RoleGuard` narrows an access
//! gated route further to a set of roles.

use std::rc::Rc;

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::auth::token::TokenKind;
use crate::auth::validator::Authenticated;
use crate::error::AppError;
use crate::models::UserRole;
use crate::state::AppState;

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
}

/// Validates the bearer token of one class and stores the resulting
/// `Authenticated` in the request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthMiddleware {
    kind: TokenKind,
}

impl AuthMiddleware {
    pub fn access() -> Self {
        Self {
            kind: TokenKind::Access,
        }
    }

    pub fn refresh() -> Self {
        Self {
            kind: TokenKind::Refresh,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
            kind: self.kind,
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
    kind: TokenKind,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let kind = self.kind;

        Box::pin(async move {
            let state = req
                .app_data::<web::Data<AppState>>()
                .cloned()
                .ok_or_else(|| {
                    AppError::InternalServerError("application state not configured".into())
                })?;
            let token = bearer_token(&req).ok_or_else(AppError::missing_token)?;

            let auth = state.auth.validator(kind).validate(&token).await?;
            req.extensions_mut().insert(auth);
            service.call(req).await
        })
    }
}

/// Lets a request through only if the authenticated user's role is in the set.
///
/// Must sit inside an access gate; without an identity the request is unauthorized.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Rc<[UserRole]>,
}

impl RoleGuard {
    pub fn any_of(roles: &[UserRole]) -> Self {
        Self {
            allowed: Rc::from(roles),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RoleGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RoleGuardService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RoleGuardService {
            service,
            allowed: Rc::clone(&self.allowed),
        }))
    }
}

pub struct RoleGuardService<S> {
    service: S,
    allowed: Rc<[UserRole]>,
}

impl<S, B> Service<ServiceRequest> for RoleGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let permitted = req
            .extensions()
            .get::<Authenticated>()
            .map(|auth| self.allowed.contains(&auth.user.role));

        match permitted {
            Some(true) => Box::pin(self.service.call(req)),
            Some(false) => {
                let err = AppError::Forbidden("Insufficient role".into());
                Box::pin(async move { Err(err.into()) })
            }
            None => {
                let err = AppError::missing_token();
                Box::pin(async move { Err(err.into()) })
            }
        }
    }
}
