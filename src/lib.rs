#![doc = "The `taskauth` library crate."]
#![doc = ""]
#![doc = "Session-backed JWT authentication: credential verification, the session"]
#![doc = "store, token issuing and validation, and the HTTP routes built on them."]
#![doc = "It is used by the main binary (`main.rs`) to construct and run the application."]

pub mod auth;
pub mod config;
pub mod duration;
pub mod error;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;

pub use crate::error::AppError;
pub use crate::state::AppState;
