//! SQLite backend.
//!
//! The query functions in [`orders`] and [`products`] take a bare `SqliteConnection`, so they can run against a pooled
//! connection or inside a transaction (`&mut *tx`). [`SqliteDatabase`] stitches them together and implements the
//! backend traits.
pub mod orders;
pub mod products;
mod sqlite_impl;

use std::env;

use log::*;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
pub use sqlite_impl::SqliteDatabase;

const SQLITE_DB_URL: &str = "sqlite://data/checkout_store.db";

pub fn db_url() -> String {
    let result = env::var("CPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ CPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
