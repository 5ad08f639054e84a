use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthMiddleware, Authenticated, RoleGuard},
    error::AppError,
    models::{CreateUserRequest, UpdateUserRequest, User, UserRole},
    state::AppState,
};

/// Creates a new user account.
///
/// ## Request Body:
/// - `email`: A valid email address, unique across users.
/// - `password`: 8 to 20 characters.
/// - `role`: One of `"admin"`, `"manager"`, `"performer"`.
///
/// ## Responses:
/// - `201 Created`: Returns the new `User` (without its password hash).
/// - `409 Conflict`: If the email is already registered.
/// - `422 Unprocessable Entity`: If validation fails.
pub async fn register(
    state: web::Data<AppState>,
    user_data: web::Json<CreateUserRequest>,
) -> Result<impl Responder, AppError> {
    user_data.validate()?;

    let user = state.auth.register(&user_data).await?;
    Ok(HttpResponse::Created().json(user))
}

/// Lists the users visible to the caller.
///
/// Admins and managers see every user; a performer sees only itself.
///
/// ## Responses:
/// - `200 OK`: A JSON array of `User` objects.
/// - `401 Unauthorized`: Missing or invalid access token.
pub async fn list_users(
    state: web::Data<AppState>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let users = match auth.user.role {
        UserRole::Admin | UserRole::Manager => all_users(&state).await?,
        UserRole::Performer => only_self(auth.user),
    };
    Ok(HttpResponse::Ok().json(users))
}

/// Returns the authenticated user.
pub async fn get_me(auth: Authenticated) -> impl Responder {
    HttpResponse::Ok().json(auth.user)
}

/// Retrieves one user by id.
///
/// A performer asking for anyone else gets its own record back.
///
/// ## Responses:
/// - `200 OK`: The `User`.
/// - `401 Unauthorized`: Missing or invalid access token.
/// - `404 Not Found`: No such user.
pub async fn get_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let user_id = path.into_inner();
    let user = match auth.user.role {
        UserRole::Admin | UserRole::Manager => any_user(&state, user_id).await?,
        UserRole::Performer => auth.user,
    };
    Ok(HttpResponse::Ok().json(user))
}

/// Updates email, password or role of a user.
///
/// Admins may change anyone's fields, including roles. Managers may change
/// anyone's email or password. A performer may only change its own.
///
/// ## Request Body:
/// Any subset of `email`, `password` and `role`, validated as on registration.
///
/// ## Responses:
/// - `200 OK`: The updated `User`.
/// - `401 Unauthorized`: Missing or invalid access token.
/// - `403 Forbidden`: A non-admin changing a role, or a performer targeting someone else.
/// - `404 Not Found`: No such user.
/// - `409 Conflict`: The new email belongs to another user.
/// - `422 Unprocessable Entity`: If validation fails.
pub async fn update_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    auth: Authenticated,
    changes: web::Json<UpdateUserRequest>,
) -> Result<impl Responder, AppError> {
    changes.validate()?;

    let user_id = path.into_inner();
    let user = match auth.user.role {
        UserRole::Admin => edit_user(&state, user_id, &changes).await?,
        UserRole::Manager => {
            keep_roles(&auth.user, &changes)?;
            edit_user(&state, user_id, &changes).await?
        }
        UserRole::Performer => {
            keep_roles(&auth.user, &changes)?;
            edit_self(&state, &auth.user, user_id, &changes).await?
        }
    };
    Ok(HttpResponse::Ok().json(user))
}

/// Deletes a user.
///
/// Only admins and performers reach this handler. An admin may delete
/// anyone, a performer only itself.
///
/// ## Responses:
/// - `204 No Content`: The user and its sessions are gone.
/// - `401 Unauthorized`: Missing or invalid access token.
/// - `403 Forbidden`: Role not allowed, or a performer targeting someone else.
/// - `404 Not Found`: No such user.
pub async fn delete_user(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    auth: Authenticated,
) -> Result<impl Responder, AppError> {
    let user_id = path.into_inner();
    match auth.user.role {
        UserRole::Admin => remove_user(&state, user_id).await?,
        UserRole::Performer => remove_self(&state, &auth.user, user_id).await?,
        UserRole::Manager => {
            return Err(AppError::Forbidden("Insufficient role".into()));
        }
    }
    Ok(HttpResponse::NoContent().finish())
}

async fn all_users(state: &AppState) -> Result<Vec<User>, AppError> {
    state.users.list_users().await
}

fn only_self(user: User) -> Vec<User> {
    vec![user]
}

async fn any_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    state
        .users
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

async fn edit_user(
    state: &AppState,
    user_id: Uuid,
    changes: &UpdateUserRequest,
) -> Result<User, AppError> {
    state.auth.update_user(user_id, changes).await
}

async fn edit_self(
    state: &AppState,
    caller: &User,
    user_id: Uuid,
    changes: &UpdateUserRequest,
) -> Result<User, AppError> {
    if caller.id != user_id {
        log::warn!("performer {} tried to update user {}", caller.id, user_id);
        return Err(AppError::Forbidden("Performers may only update themselves".into()));
    }
    edit_user(state, user_id, changes).await
}

fn keep_roles(caller: &User, changes: &UpdateUserRequest) -> Result<(), AppError> {
    if changes.role.is_some() {
        log::warn!("{:?} {} tried to change a role", caller.role, caller.id);
        return Err(AppError::Forbidden("Only admins may change roles".into()));
    }
    Ok(())
}

async fn remove_user(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    if state.users.delete_user(user_id).await? == 0 {
        return Err(AppError::NotFound("User not found".into()));
    }
    log::info!("user {} deleted", user_id);
    Ok(())
}

async fn remove_self(state: &AppState, caller: &User, user_id: Uuid) -> Result<(), AppError> {
    if caller.id != user_id {
        log::warn!("performer {} tried to delete user {}", caller.id, user_id);
        return Err(AppError::Forbidden("Performers may only delete themselves".into()));
    }
    remove_user(state, user_id).await
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::post().to(register))
            .route(
                web::get()
                    .to(list_users)
                    .wrap(AuthMiddleware::access()),
            ),
    )
    .service(
        web::resource("/me")
            .wrap(AuthMiddleware::access())
            .route(web::get().to(get_me)),
    )
    .service(
        web::resource("/{id}")
            .wrap(AuthMiddleware::access())
            .route(web::get().to(get_user))
            .route(web::patch().to(update_user))
            .route(
                web::delete()
                    .to(delete_user)
                    .wrap(RoleGuard::any_of(&[UserRole::Admin, UserRole::Performer])),
            ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::tests::fast_scrypt;
    use crate::auth::token::tests::keys;
    use crate::auth::{AuthService, LoginRequest};
    use crate::store::{MemoryStore, UserRepository};
    use actix_web::{http::StatusCode, test, App};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use std::sync::Arc;

    struct Fixture {
        state: web::Data<AppState>,
        store: Arc<MemoryStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let auth = AuthService::with_keys(keys(), store.clone(), store.clone());
            let state = web::Data::new(AppState::from_parts(auth, store.clone(), "memory"));
            Self { state, store }
        }

        async fn user(&self, email: &str, role: UserRole) -> (User, String) {
            let user = User::new(email.into(), fast_scrypt("Password123!"), role);
            self.store.insert_user(&user).await.unwrap();
            let tokens = self
                .state
                .auth
                .login(&LoginRequest {
                    email: email.into(),
                    password: "Password123!".into(),
                })
                .await
                .unwrap();
            (user, format!("Bearer {}", tokens.access_token))
        }
    }

    #[actix_rt::test]
    async fn test_list_users_by_role() {
        let f = Fixture::new();
        let (_, manager) = f.user("manager@example.com", UserRole::Manager).await;
        let (performer_user, performer) =
            f.user("performer@example.com", UserRole::Performer).await;
        let app = test::init_service(
            App::new()
                .app_data(f.state.clone())
                .service(web::scope("/users").configure(config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/users")
            .insert_header(("Authorization", manager))
            .to_request();
        let body: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.len(), 2);

        let req = test::TestRequest::get()
            .uri("/users")
            .insert_header(("Authorization", performer))
            .to_request();
        let body: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.len(), 1);
        assert_eq!(body[0]["id"], performer_user.id.to_string());
        assert!(body[0].get("passwordHash").is_none());
    }

    #[actix_rt::test]
    async fn test_get_user_by_role() {
        let f = Fixture::new();
        let (manager_user, manager) = f.user("manager@example.com", UserRole::Manager).await;
        let (performer_user, performer) =
            f.user("performer@example.com", UserRole::Performer).await;
        let app = test::init_service(
            App::new()
                .app_data(f.state.clone())
                .service(web::scope("/users").configure(config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/users/{}", performer_user.id))
            .insert_header(("Authorization", manager.clone()))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["email"], "performer@example.com");

        let req = test::TestRequest::get()
            .uri(&format!("/users/{}", manager_user.id))
            .insert_header(("Authorization", performer))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["email"], "performer@example.com");

        let req = test::TestRequest::get()
            .uri(&format!("/users/{}", Uuid::new_v4()))
            .insert_header(("Authorization", manager))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_rt::test]
    async fn test_update_rules() {
        let f = Fixture::new();
        let (admin_user, admin) = f.user("admin@example.com", UserRole::Admin).await;
        let (manager_user, manager) = f.user("manager@example.com", UserRole::Manager).await;
        let (performer_user, performer) =
            f.user("performer@example.com", UserRole::Performer).await;
        let app = test::init_service(
            App::new()
                .app_data(f.state.clone())
                .service(web::scope("/users").configure(config)),
        )
        .await;

        let patch = |id: Uuid, token: &str, body: Value| {
            test::TestRequest::patch()
                .uri(&format!("/users/{}", id))
                .insert_header(("Authorization", token.to_string()))
                .set_json(body)
                .to_request()
        };

        // Performers may update themselves but nobody else.
        let req = patch(
            performer_user.id,
            &performer,
            serde_json::json!({ "email": "renamed@example.com" }),
        );
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["email"], "renamed@example.com");
        assert_eq!(body["role"], "performer");

        let req = patch(
            admin_user.id,
            &performer,
            serde_json::json!({ "email": "x@example.com" }),
        );
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // Only admins change roles.
        for token in [&performer, &manager] {
            let req = patch(
                performer_user.id,
                token,
                serde_json::json!({ "role": "admin" }),
            );
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        }

        let req = patch(
            performer_user.id,
            &manager,
            serde_json::json!({ "password": "NewPassword1!" }),
        );
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = patch(
            manager_user.id,
            &admin,
            serde_json::json!({ "role": "admin" }),
        );
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["role"], "admin");
        let stored = f.store.find_user(manager_user.id).await.unwrap().unwrap();
        assert_eq!(stored.role, UserRole::Admin);

        let req = patch(Uuid::new_v4(), &admin, serde_json::json!({}));
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = patch(
            admin_user.id,
            &admin,
            serde_json::json!({ "email": "not-an-email" }),
        );
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let req = patch(
            admin_user.id,
            &admin,
            serde_json::json!({ "email": "renamed@example.com" }),
        );
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::patch()
            .uri(&format!("/users/{}", admin_user.id))
            .set_json(serde_json::json!({}))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_delete_rules() {
        let f = Fixture::new();
        let (admin_user, admin) = f.user("admin@example.com", UserRole::Admin).await;
        let (manager_user, manager) = f.user("manager@example.com", UserRole::Manager).await;
        let (performer_user, performer) =
            f.user("performer@example.com", UserRole::Performer).await;
        let app = test::init_service(
            App::new()
                .app_data(f.state.clone())
                .service(web::scope("/users").configure(config)),
        )
        .await;

        // Managers are stopped by the role guard.
        let req = test::TestRequest::delete()
            .uri(&format!("/users/{}", performer_user.id))
            .insert_header(("Authorization", manager))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::FORBIDDEN);

        // Performers may not delete others.
        let req = test::TestRequest::delete()
            .uri(&format!("/users/{}", admin_user.id))
            .insert_header(("Authorization", performer.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // Admins delete anyone.
        let req = test::TestRequest::delete()
            .uri(&format!("/users/{}", manager_user.id))
            .insert_header(("Authorization", admin))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(f.store.sessions_of(manager_user.id).len(), 0);

        // Performers delete themselves, which also ends their sessions.
        let req = test::TestRequest::delete()
            .uri(&format!("/users/{}", performer_user.id))
            .insert_header(("Authorization", performer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(f.store.find_user(performer_user.id).await.unwrap().is_none());
    }
}
