use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Could not run database migrations: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
    #[error("Could not convert a stored {0} record: {1}")]
    ConversionError(&'static str, String),
    #[error("Could not serialize order data: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("A record that was just written could not be read back: {0}")]
    ReadBackError(String),
}
