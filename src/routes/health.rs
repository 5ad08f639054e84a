use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
///
/// Returns the current status of the API, the storage backend in use and a timestamp.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "storage": state.backend,
        "timestamp": Utc::now()
    }))
}
