// src/config/db.rs
// DOCUMENTATION: Database connection pool initialization
// PURPOSE: Setup PostgreSQL connection pool and the place tables

use crate::config::Config;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Schema for both category tables, executed one statement at a time
/// Tables share one shape; legacy rows may carry working_hours = '{}'
const SCHEMA_STATEMENTS: [&str; 6] = [
    r#"
    CREATE TABLE IF NOT EXISTS autoservice (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        lat DOUBLE PRECISION NOT NULL,
        lon DOUBLE PRECISION NOT NULL,
        address TEXT,
        phone TEXT,
        services JSONB,
        working_days INTEGER[],
        working_hours JSONB,
        is_24_7 BOOLEAN DEFAULT FALSE,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT now(),
        updated_at TIMESTAMP WITH TIME ZONE DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS carwash (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        lat DOUBLE PRECISION NOT NULL,
        lon DOUBLE PRECISION NOT NULL,
        address TEXT,
        phone TEXT,
        services JSONB,
        working_days INTEGER[],
        working_hours JSONB,
        is_24_7 BOOLEAN DEFAULT FALSE,
        created_at TIMESTAMP WITH TIME ZONE DEFAULT now(),
        updated_at TIMESTAMP WITH TIME ZONE DEFAULT now()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_autoservice_coords ON autoservice(lat, lon)",
    "CREATE INDEX IF NOT EXISTS idx_carwash_coords ON carwash(lat, lon)",
    "CREATE INDEX IF NOT EXISTS idx_autoservice_services ON autoservice USING GIN(services)",
    "CREATE INDEX IF NOT EXISTS idx_carwash_services ON carwash USING GIN(services)",
];

/// Initialize PostgreSQL connection pool
/// DOCUMENTATION: Creates connection pool with optimal settings
/// Called once during application startup in main.rs
/// Returns pool that is used for all database operations
pub async fn init_db_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    // Never log credentials
    let host = config
        .database_url
        .rsplit('@')
        .next()
        .unwrap_or_default();
    log::info!("Initializing database pool: {}", host);

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(1)
        // Timeout waiting for connection from pool
        .acquire_timeout(Duration::from_secs(config.db_connection_timeout))
        // Connection idle timeout (5 minutes)
        .idle_timeout(Duration::from_secs(300))
        // Connection lifetime (30 minutes before recycle)
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database_url)
        .await?;

    // Verify connection works
    sqlx::query("SELECT 1").execute(&pool).await?;

    log::info!("Database pool initialized successfully");
    Ok(pool)
}

/// Create the category tables and their indexes if missing
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    log::info!("Database tables created/verified successfully");
    Ok(())
}
