use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;

use taskauth::config::Config;
use taskauth::routes::{self, health};
use taskauth::store::{MemoryStore, PgStore};
use taskauth::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let state = match config.database_url.as_deref() {
        Some(url) => match PgStore::connect(url).await {
            Ok(store) => AppState::new(&config.jwt, Arc::new(store)),
            Err(e) => {
                log::error!("failed to connect to database: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            log::warn!("DATABASE_URL not set, sessions and users are kept in memory");
            AppState::new(&config.jwt, Arc::new(MemoryStore::new()))
        }
    };
    let state = web::Data::new(state);

    log::info!(
        "Starting server at {} ({} storage)",
        config.server_url(),
        state.backend
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(health::health)
            .service(web::scope("/api").configure(routes::config))
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await
}
