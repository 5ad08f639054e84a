use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::JwtConfig;
use crate::store::{Store, UserRepository};

/// Shared application state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub users: Arc<dyn UserRepository>,
    /// Name of the storage backend, reported by the health check.
    pub backend: &'static str,
}

impl AppState {
    pub fn new<S: Store + 'static>(config: &JwtConfig, store: Arc<S>) -> Self {
        let backend = store.backend();
        let auth = AuthService::new(config, store.clone(), store.clone());
        Self::from_parts(auth, store, backend)
    }

    pub fn from_parts(
        auth: AuthService,
        users: Arc<dyn UserRepository>,
        backend: &'static str,
    ) -> Self {
        Self {
            auth,
            users,
            backend,
        }
    }
}
