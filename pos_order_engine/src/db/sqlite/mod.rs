pub mod db;
mod errors;

pub mod orders;
pub mod payments;
pub mod shifts;

pub use db::SqliteDatabase;
pub use errors::SqliteDatabaseError;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqliteDatabaseError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections.max(1)).connect(url).await?;
    Ok(pool)
}

/// `true` if the error is a UNIQUE constraint violation, which the store uses to detect conflicts atomically.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}
