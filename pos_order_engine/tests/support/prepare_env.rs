use log::*;
use pos_order_engine::{config::EngineConfig, PosDatabase, SqliteDatabase};
use sqlx::{migrate::MigrateDatabase, Sqlite};

/// Creates a fresh, empty database at `config.database_url`. The engine applies the migrations when it connects.
pub async fn prepare_test_env(config: &EngineConfig) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(&config.database_url).await;
}

pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("pos_test_store_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

pub async fn create_database(url: &str) {
    if Sqlite::database_exists(url).await.unwrap_or(false) {
        if let Err(e) = Sqlite::drop_database(url).await {
            warn!("🚀️ Error dropping database {url}: {e:?}");
        }
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {url}");
}

pub async fn tear_down(db: &SqliteDatabase) {
    let mut db = db.clone();
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("🚀️ Could not remove test database {url}: {e}");
    }
}
