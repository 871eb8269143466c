use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub async fn init_db(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .with_context(|| format!("invalid staging database url: {database_url}"))?
        .create_if_missing(true);

    // every connection to :memory: is its own database, so pin a single one
    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(4)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .context("Failed to connect to staging database")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS checkin_stage (
            slot_key   TEXT PRIMARY KEY NOT NULL,
            payload    TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .context("Failed to create checkin_stage table")?;

    Ok(pool)
}
