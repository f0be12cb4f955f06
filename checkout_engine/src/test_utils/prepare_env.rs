use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

use crate::SqliteDatabase;

pub async fn prepare_test_env(url: &str) {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    create_database(url).await;
    run_migrations(url).await;
}

pub fn random_db_path() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/cpg_test_store_{}.db", dir.display(), rand::random::<u64>())
}

pub async fn run_migrations(url: &str) {
    let db = SqliteDatabase::new_with_url(url, 5).await.expect("Error creating connection to database");
    db.run_migrations().await.expect("Error running DB migrations");
    info!("🚀️ Migrations complete");
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        trace!("Could not drop database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("🚀️ Created Sqlite database {url}");
}

/// Creates a fresh, migrated database at a random path and connects to it.
pub async fn fresh_database(max_connections: u32) -> (String, SqliteDatabase) {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, max_connections).await.expect("Error creating connection to database");
    (url, db)
}
