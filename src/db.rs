use std::str::FromStr;

use log::info;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};

use crate::error::Result;

pub type DbPool = SqlitePool;
pub type DbTransaction = Transaction<'static, Sqlite>;

/// Get the schema migrator.
pub fn migrator() -> Migrator {
    sqlx::migrate!("./migrations")
}

/// Open a pool against `url` and bring the schema up to date.
pub async fn connect(url: &str) -> Result<DbPool> {
    let opts = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(opts)
        .await?;
    migrator().run(&pool).await?;
    info!("Database schema is up to date.");

    Ok(pool)
}

/// Start a transaction. Dropping it without `commit` rolls back.
pub async fn begin(pool: &DbPool) -> Result<DbTransaction> {
    Ok(pool.begin().await?)
}

/// Current UTC time as a unix timestamp.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
