//! Database layer for yatube.
//!
//! Entities, schema migrations and one repository per table.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::{info, log::LevelFilter};
use yatube_common::{AppError, AppResult, Config};

/// Pool settings for the configured database.
#[must_use]
pub fn connect_options(config: &Config) -> ConnectOptions {
    let db = &config.database;
    let mut opt = ConnectOptions::new(db.url.as_str());
    opt.max_connections(db.max_connections)
        .min_connections(db.min_connections.min(db.max_connections))
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);
    opt
}

/// Open the connection pool.
pub async fn init(config: &Config) -> AppResult<DatabaseConnection> {
    let db = Database::connect(connect_options(config))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!(
        max_connections = config.database.max_connections,
        "Database pool ready"
    );
    Ok(db)
}

/// Bring the schema up to date.
pub async fn migrate(db: &DatabaseConnection) -> AppResult<()> {
    let pending = migrations::Migrator::get_pending_migrations(db)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .len();

    migrations::Migrator::up(db, None)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    info!(applied = pending, "Schema is up to date");
    Ok(())
}
