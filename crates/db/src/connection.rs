use std::time::Duration;

use orderlens_core::config::DatabaseConfig;
use sqlx::sqlite::SqlitePoolOptions;

pub type DbPool = sqlx::SqlitePool;

pub async fn connect(database_url: &str) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(database_url, 5, 30).await
}

pub async fn connect_with_config(database: &DatabaseConfig) -> Result<DbPool, sqlx::Error> {
    connect_with_settings(&database.url, database.max_connections, database.timeout_secs).await
}

/// Opens a pool, creating the database file if it is missing.
///
/// In-memory databases are private to each connection, so they get a single connection and no
/// WAL journal.
pub async fn connect_with_settings(
    database_url: &str,
    max_connections: u32,
    timeout_secs: u64,
) -> Result<DbPool, sqlx::Error> {
    let in_memory = is_in_memory(database_url);
    let max_connections = if in_memory { 1 } else { max_connections.max(1) };
    let url = with_create_mode(database_url);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(timeout_secs.max(1)))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                sqlx::query("PRAGMA foreign_keys = ON").execute(&mut *conn).await?;
                if !in_memory {
                    sqlx::query("PRAGMA journal_mode = WAL").execute(&mut *conn).await?;
                }
                sqlx::query("PRAGMA busy_timeout = 5000").execute(&mut *conn).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
}

fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

fn with_create_mode(database_url: &str) -> String {
    if database_url == ":memory:" {
        return "sqlite::memory:".to_string();
    }
    if is_in_memory(database_url) || database_url.contains("mode=") {
        return database_url.to_string();
    }

    let separator = if database_url.contains('?') { '&' } else { '?' };
    format!("{database_url}{separator}mode=rwc")
}
