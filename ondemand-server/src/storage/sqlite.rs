//! SQLite storage backend for both tiers

use async_trait::async_trait;
use chrono::Utc;
use error_stack::ResultExt;
use ondemand::store::{ArchiveStore, DashboardEntry, HotStore, Tier};
use sqlx::{Row, SqlitePool, sqlite::SqlitePoolOptions};

use super::{parse_timestamp, store_error};

/// Connection pool shared by the hot and archive tier tables
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(path: &str) -> anyhow::Result<Self> {
        let url = format!("sqlite:{}?mode=rwc", path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Ok(Self { pool })
    }

    /// Private in-memory database; a single connection so every query sees the same data
    pub async fn in_memory() -> anyhow::Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS hot_dashboards (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                last_modified TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS archive_versions (
                version_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                body TEXT NOT NULL,
                last_modified TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_archive_versions_name ON archive_versions(name)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub fn hot(&self) -> SqliteHotStore {
        SqliteHotStore {
            pool: self.pool.clone(),
        }
    }

    pub fn archive(&self) -> SqliteArchiveStore {
        SqliteArchiveStore {
            pool: self.pool.clone(),
        }
    }
}

fn row_to_entry(tier: Tier, row: sqlx::sqlite::SqliteRow) -> ondemand::Result<DashboardEntry> {
    let name: String = row.get("name");
    let size: i64 = row.get("size");
    let last_modified: String = row.get("last_modified");
    Ok(DashboardEntry::new(
        name,
        parse_timestamp(tier, &last_modified)?,
        size.max(0) as u64,
    ))
}

/// Hot tier: one row per dashboard
pub struct SqliteHotStore {
    pool: SqlitePool,
}

#[async_trait]
impl HotStore for SqliteHotStore {
    async fn list(&self) -> ondemand::Result<Vec<DashboardEntry>> {
        let rows = sqlx::query(
            "SELECT name, length(CAST(body AS BLOB)) AS size, last_modified FROM hot_dashboards",
        )
        .fetch_all(&self.pool)
        .await
        .change_context_lazy(|| store_error(Tier::Hot, "list", None))?;

        rows.into_iter()
            .map(|row| row_to_entry(Tier::Hot, row))
            .collect()
    }

    async fn get_body(&self, name: &str) -> ondemand::Result<Option<String>> {
        let row = sqlx::query("SELECT body FROM hot_dashboards WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .change_context_lazy(|| store_error(Tier::Hot, "get", Some(name)))?;

        Ok(row.map(|row| row.get("body")))
    }

    async fn put_body(&self, name: &str, body: &str) -> ondemand::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO hot_dashboards (name, body, last_modified) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                body = excluded.body,
                last_modified = excluded.last_modified
            "#,
        )
        .bind(name)
        .bind(body)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .change_context_lazy(|| store_error(Tier::Hot, "put", Some(name)))?;

        Ok(())
    }

    async fn delete(&self, name: &str) -> ondemand::Result<()> {
        sqlx::query("DELETE FROM hot_dashboards WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .change_context_lazy(|| store_error(Tier::Hot, "delete", Some(name)))?;

        Ok(())
    }
}

/// Archive tier: every put appends a version, the newest one is current
pub struct SqliteArchiveStore {
    pool: SqlitePool,
}

#[cfg(test)]
impl SqliteArchiveStore {
    pub async fn version_count(&self, name: &str) -> ondemand::Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS versions FROM archive_versions WHERE name = ?")
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .change_context_lazy(|| store_error(Tier::Archive, "count", Some(name)))?;

        Ok(row.get("versions"))
    }
}

#[async_trait]
impl ArchiveStore for SqliteArchiveStore {
    async fn list(&self) -> ondemand::Result<Vec<DashboardEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT a.name, length(CAST(a.body AS BLOB)) AS size, a.last_modified
            FROM archive_versions a
            WHERE a.version_id = (
                SELECT MAX(b.version_id) FROM archive_versions b WHERE b.name = a.name
            )
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .change_context_lazy(|| store_error(Tier::Archive, "list", None))?;

        rows.into_iter()
            .map(|row| row_to_entry(Tier::Archive, row))
            .collect()
    }

    async fn get_body(&self, name: &str) -> ondemand::Result<Option<String>> {
        let row = sqlx::query(
            "SELECT body FROM archive_versions WHERE name = ? ORDER BY version_id DESC LIMIT 1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .change_context_lazy(|| store_error(Tier::Archive, "get", Some(name)))?;

        Ok(row.map(|row| row.get("body")))
    }

    async fn put_body(&self, name: &str, body: &str) -> ondemand::Result<()> {
        sqlx::query("INSERT INTO archive_versions (name, body, last_modified) VALUES (?, ?, ?)")
            .bind(name)
            .bind(body)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .change_context_lazy(|| store_error(Tier::Archive, "put", Some(name)))?;

        Ok(())
    }

    async fn delete(&self, name: &str) -> ondemand::Result<()> {
        sqlx::query("DELETE FROM archive_versions WHERE name = ?")
            .bind(name)
            .execute(&self.pool)
            .await
            .change_context_lazy(|| store_error(Tier::Archive, "delete", Some(name)))?;

        Ok(())
    }
}
