use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};

use shared::domain::AccessToken;

/// Storage key under which the room access token is persisted. Fixed by the
/// wire contract: one opaque token, set on grant, removed on denial.
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Durable local key-value state, backed by SQLite. Survives client restarts;
/// `sqlite::memory:` works for tests.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        let storage = Self { pool };
        storage.ensure_local_state_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_local_state_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS local_state (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure local_state table exists")?;
        Ok(())
    }

    pub async fn load_access_token(&self) -> Result<Option<AccessToken>> {
        let row = sqlx::query("SELECT value FROM local_state WHERE key = ?")
            .bind(ACCESS_TOKEN_KEY)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load access token")?;
        Ok(row.map(|r| AccessToken(r.get::<String, _>(0))))
    }

    pub async fn store_access_token(&self, token: &AccessToken) -> Result<()> {
        sqlx::query(
            "INSERT INTO local_state (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP",
        )
        .bind(ACCESS_TOKEN_KEY)
        .bind(token.as_str())
        .execute(&self.pool)
        .await
        .context("failed to store access token")?;
        Ok(())
    }

    pub async fn clear_access_token(&self) -> Result<()> {
        sqlx::query("DELETE FROM local_state WHERE key = ?")
            .bind(ACCESS_TOKEN_KEY)
            .execute(&self.pool)
            .await
            .context("failed to clear access token")?;
        Ok(())
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
