pub mod auth;
pub mod health;
pub mod users;

use actix_web::web;

/// Mounts the API under whatever scope the caller provides (`/api` in `main.rs`).
///
/// Each route declares its own gate where it is registered; nothing is
/// authenticated at the scope level.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/auth").configure(auth::config))
        .service(web::scope("/users").configure(users::config));
}
