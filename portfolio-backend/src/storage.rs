use std::path::Path;
use std::time::Duration;

use portfolio_shared::error::PortfolioError;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::debug;

use crate::migration::Migrator;

/// Open (creating if needed) the database file at `db_path` and bring the schema up to date.
pub async fn new(db_path: &Path) -> Result<DatabaseConnection, PortfolioError> {
    start_db(Some(db_path)).await
}

/// Start the database, `None` gives a private in-memory one.
pub async fn start_db(db_path: Option<&Path>) -> Result<DatabaseConnection, PortfolioError> {
    let db_url = match db_path {
        Some(path) => format!("sqlite://{}?mode=rwc", path.display()),
        None => "sqlite::memory:".to_string(),
    };
    debug!("Opening Database: {db_url}");

    let mut options = ConnectOptions::new(db_url);
    options
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Trace)
        .sqlx_slow_statements_logging_settings(log::LevelFilter::Warn, Duration::from_millis(500));
    if db_path.is_none() {
        // every pooled connection to :memory: is its own database
        options.max_connections(1).min_connections(1);
    }

    let conn = Database::connect(options).await?;

    Migrator::up(&conn, None).await?;

    Ok(conn)
}
