//! SQLite connection pool and migration runner for Libris.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use thiserror::Error;

const MIGRATIONS_TABLE: &str = "_libris_migrations";

/// Connection settings for the relational store.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "DatabaseSettings::default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://libris.db".to_string()
    }

    fn default_max_connections() -> u32 {
        5
    }

    fn default_acquire_timeout_ms() -> u64 {
        5000
    }

    /// Settings for a private in-memory database.
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite::memory:".to_string(),
            ..Self::default()
        }
    }

    /// Whether the URL points at an in-memory SQLite database.
    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:") || self.url.contains("mode=memory")
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
            acquire_timeout_ms: Self::default_acquire_timeout_ms(),
        }
    }
}

/// A schema change contributed by a module.
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("invalid database url '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("failed to connect to '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: sqlx::Error,
    },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Process-wide handle on the connection pool.
///
/// Cloning is cheap; every clone shares the same pool. The pool is released
/// by [`Database::close`], which should run once at shutdown.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the pool described by `settings`.
    ///
    /// In-memory URLs are pinned to a single connection that never idles out,
    /// since each SQLite memory connection is its own database.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(&settings.url)
            .map_err(|source| DbError::InvalidUrl {
                url: settings.url.clone(),
                source,
            })?
            .create_if_missing(true);

        let mut pool_options = SqlitePoolOptions::new()
            .acquire_timeout(Duration::from_millis(settings.acquire_timeout_ms));

        pool_options = if settings.is_in_memory() {
            pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            pool_options.max_connections(settings.max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|source| DbError::Connect {
                url: settings.url.clone(),
                source,
            })?;

        tracing::info!(target: "libris-db", url = %settings.url, "database pool ready");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trip a trivial query to confirm the store is reachable.
    pub async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Apply every migration not yet recorded, returning how many ran.
    ///
    /// Migrations are keyed by `(module, id)`; each one runs in its own
    /// transaction together with its bookkeeping row.
    pub async fn apply_migrations(
        &self,
        migrations: &[(String, Migration)],
    ) -> Result<usize, DbError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS _libris_migrations (
                module     TEXT NOT NULL,
                id         TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (module, id)
            )",
        )
        .execute(&self.pool)
        .await?;

        let mut applied = 0;
        for (module, migration) in migrations {
            let already: Option<(String,)> = sqlx::query_as(&format!(
                "SELECT id FROM {MIGRATIONS_TABLE} WHERE module = ? AND id = ?"
            ))
            .bind(module)
            .bind(migration.id)
            .fetch_optional(&self.pool)
            .await?;

            if already.is_some() {
                tracing::debug!(target: "libris-db", %module, id = migration.id, "migration already applied");
                continue;
            }

            let as_migration_error = |source: sqlx::Error| DbError::Migration {
                module: module.clone(),
                id: migration.id.to_string(),
                source,
            };

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(migration.up)
                .execute(&mut *tx)
                .await
                .map_err(as_migration_error)?;
            sqlx::query(&format!(
                "INSERT INTO {MIGRATIONS_TABLE} (module, id) VALUES (?, ?)"
            ))
            .bind(module)
            .bind(migration.id)
            .execute(&mut *tx)
            .await
            .map_err(as_migration_error)?;
            tx.commit().await?;

            tracing::info!(target: "libris-db", %module, id = migration.id, "migration applied");
            applied += 1;
        }

        Ok(applied)
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!(target: "libris-db", "database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widgets() -> Vec<(String, Migration)> {
        vec![(
            "widgets".to_string(),
            Migration {
                id: "001_init",
                up: "CREATE TABLE widgets (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
            },
        )]
    }

    #[test]
    fn memory_urls_are_detected() {
        assert!(DatabaseSettings::in_memory().is_in_memory());
        assert!(DatabaseSettings {
            url: "sqlite://file:books?mode=memory&cache=shared".to_string(),
            ..DatabaseSettings::default()
        }
        .is_in_memory());
        assert!(!DatabaseSettings::default().is_in_memory());
    }

    #[tokio::test]
    async fn migrations_apply_once() {
        let db = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();

        assert_eq!(db.apply_migrations(&widgets()).await.unwrap(), 1);
        assert_eq!(db.apply_migrations(&widgets()).await.unwrap(), 0);

        sqlx::query("INSERT INTO widgets (name) VALUES ('gear')")
            .execute(db.pool())
            .await
            .unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn failing_migration_reports_module_and_id() {
        let db = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        let broken = vec![(
            "broken".to_string(),
            Migration {
                id: "001_bad",
                up: "CREATE TABLE (",
            },
        )];

        let err = db.apply_migrations(&broken).await.unwrap_err();
        assert!(matches!(err, DbError::Migration { ref module, ref id, .. } if module == "broken" && id == "001_bad"));
    }

    #[tokio::test]
    async fn ping_succeeds_on_open_pool() {
        let db = Database::connect(&DatabaseSettings::in_memory())
            .await
            .unwrap();
        db.ping().await.unwrap();
    }
}
