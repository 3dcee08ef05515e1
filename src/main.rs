// src/main.rs
// DOCUMENTATION: Application entry point
// PURPOSE: Initialize config, place store, finder and start HTTP server

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod services;

use actix_web::{middleware::Logger, web, App, HttpServer};
use config::{Config, StoreBackend};
use db::{MemoryPlaceStore, PgPlaceStore, PlaceStore};
use dotenv::dotenv;
use services::{ClientRateLimiter, NearestPlaceFinder, ResultCache};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured PlaceStore
/// DOCUMENTATION: Postgres connects, verifies and creates the tables;
/// memory starts empty and is meant for development only
async fn build_store(config: &Config) -> Result<Arc<dyn PlaceStore>, sqlx::Error> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = config::init_db_pool(config).await?;
            config::ensure_schema(&pool).await?;
            Ok(Arc::new(PgPlaceStore::new(
                pool,
                Duration::from_secs(config.db_query_timeout),
            )))
        }
        StoreBackend::Memory => {
            log::warn!("Using in-memory place store - data is lost on restart");
            Ok(Arc::new(MemoryPlaceStore::new()))
        }
    }
}

/// env_logger filter from LOG_LEVEL, falling back to the service default
fn log_filter(level: Option<&str>) -> String {
    match level.map(str::trim) {
        Some(level) if !level.is_empty() => level.to_string(),
        _ => "info,actix_web=info,sqlx=warn".to_string(),
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // 1. Load environment variables
    dotenv().ok();

    // 2. Initialize logging ahead of config parsing
    if std::env::var("RUST_LOG").is_err() {
        let level = std::env::var("LOG_LEVEL").ok();
        std::env::set_var("RUST_LOG", log_filter(level.as_deref()));
    }
    env_logger::init();

    // 3. Load configuration
    let config = Config::from_env();

    if let Err(e) = config.validate() {
        log::error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    log::info!("Starting autocare-places service...");
    log::info!("Environment: {}", config.environment);
    log::info!("Store backend: {}", config.store_backend.as_str());
    log::info!(
        "Server Address: {}:{}",
        config.server_address,
        config.server_port
    );

    // 4. Initialize place store
    let store = match build_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            log::error!("Failed to initialize place store: {}", e);
            std::process::exit(1);
        }
    };

    // 5. Initialize result cache, finder and rate limiter
    let cache = Arc::new(ResultCache::new(
        Duration::from_secs(config.result_cache_ttl),
        config.result_cache_capacity,
    ));
    log::info!(
        "Initialized result cache (TTL: {}s, capacity: {})",
        config.result_cache_ttl,
        config.result_cache_capacity
    );

    let finder = Arc::new(NearestPlaceFinder::new(
        store.clone(),
        cache,
        config.default_radius_km,
    ));
    let limiter = Arc::new(ClientRateLimiter::new(config.rate_limit_per_second));

    // 6. Start HTTP server
    let server_addr = format!("{}:{}", config.server_address, config.server_port);
    let config_clone = config.clone();

    HttpServer::new(move || {
        App::new()
            // Application state (store, finder, limiter and config)
            .app_data(web::Data::new(store.clone()))
            .app_data(web::Data::new(finder.clone()))
            .app_data(web::Data::new(limiter.clone()))
            .app_data(web::Data::new(config_clone.clone()))
            // Middleware
            .wrap(Logger::default())
            .wrap(actix_web::middleware::Compress::default())
            // Routes
            .configure(handlers::health_config)
            .configure(handlers::places_config)
            .configure(handlers::admin_config)
    })
    .bind(&server_addr)?
    .run()
    .await
}
