//! Storage selection.
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;

use crate::config::Postgres;
use crate::user::{MemoryRepository, PostgresRepository, UserRepository};

pub const DEFAULT_CREDENTIALS: &str = "postgres";
pub const DEFAULT_DATABASE_NAME: &str = "devroom";
pub const DEFAULT_POOL_SIZE: u32 = 10;

/// Connect to PostgreSQL and run migrations.
pub async fn connect(config: &Postgres) -> Result<PostgresRepository, Box<dyn std::error::Error>> {
    let username = config.username.as_deref().unwrap_or(DEFAULT_CREDENTIALS);
    let password = config.password.as_deref().unwrap_or(DEFAULT_CREDENTIALS);
    let db = config.database.as_deref().unwrap_or(DEFAULT_DATABASE_NAME);
    let hostname = &config.address;

    let addr = format!("postgres://{username}:{password}@{hostname}/{db}");
    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
        .connect(&addr)
        .await?;

    tracing::info!(%hostname, %db, "postgres connected");

    // execute migrations scripts on start.
    sqlx::migrate!().run(&pool).await?;

    Ok(PostgresRepository::new(pool))
}

/// Pick the user store from configuration.
///
/// Without a `postgres` entry, users live in memory and are lost on exit.
pub async fn repository(
    config: Option<&Postgres>,
) -> Result<Arc<dyn UserRepository>, Box<dyn std::error::Error>> {
    match config {
        Some(config) => Ok(Arc::new(connect(config).await?)),
        None => {
            tracing::warn!("missing `postgres` entry on `config.yaml` file, using in-memory storage");
            Ok(Arc::new(MemoryRepository::new()))
        },
    }
}
