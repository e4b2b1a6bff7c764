use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Open (creating if missing) the on-disk catalog and bring its schema up to date.
pub async fn init_database(db_path: impl AsRef<Path>) -> Result<SqlitePool> {
    let path = db_path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    info!(path = %path.display(), "Opening catalog database");
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

/// Private in-memory catalog. One connection, since each `:memory:`
/// connection is its own database.
pub async fn init_test_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    migrate(&pool).await?;
    Ok(pool)
}

async fn migrate(pool: &SqlitePool) -> Result<()> {
    info!("Running catalog migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
