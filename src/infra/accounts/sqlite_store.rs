use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Row, Sqlite};

use crate::core::accounts::{AccountError, MetaLink, MetaTokenStore, UserStore};

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data/accounts.db?mode=rwc";

/// Users and linked Meta accounts in one SQLite file.
#[derive(Clone)]
pub struct SqliteAccountStore {
    pool: Pool<Sqlite>,
}

fn store_err(e: sqlx::Error) -> AccountError {
    AccountError::Store(e.to_string())
}

impl SqliteAccountStore {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let conn_str = if database_url.starts_with("sqlite:") {
            database_url.to_string()
        } else {
            format!("sqlite://{database_url}")
        };

        if !conn_str.contains(":memory:") {
            let path = conn_str
                .trim_start_matches("sqlite://")
                .split('?')
                .next()
                .unwrap_or_default();
            if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        // a single connection keeps every handle on the same in-memory database
        let max = if conn_str.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .connect(&conn_str)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password_digest TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS meta_links (
                user_id TEXT PRIMARY KEY,
                access_token TEXT NOT NULL,
                meta_user_id TEXT NOT NULL,
                linked_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for SqliteAccountStore {
    async fn password_digest(&self, username: &str) -> Result<Option<String>, AccountError> {
        let row = sqlx::query("SELECT password_digest FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(|row| row.get::<String, _>(0)))
    }

    async fn insert_user(&self, username: &str, digest: &str) -> Result<bool, AccountError> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_digest, created_at) VALUES (?, ?, ?) ON CONFLICT(username) DO NOTHING",
        )
        .bind(username)
        .bind(digest)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl MetaTokenStore for SqliteAccountStore {
    async fn save_link(&self, user_id: &str, link: &MetaLink) -> Result<(), AccountError> {
        sqlx::query(
            r#"
            INSERT INTO meta_links (user_id, access_token, meta_user_id, linked_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
            access_token = excluded.access_token,
            meta_user_id = excluded.meta_user_id,
            linked_at = excluded.linked_at
            "#,
        )
        .bind(user_id)
        .bind(&link.access_token)
        .bind(&link.meta_user_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(())
    }

    async fn link(&self, user_id: &str) -> Result<Option<MetaLink>, AccountError> {
        let row = sqlx::query("SELECT access_token, meta_user_id FROM meta_links WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(row.map(|row| MetaLink {
            access_token: row.get("access_token"),
            meta_user_id: row.get("meta_user_id"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteAccountStore {
        SqliteAccountStore::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn duplicate_usernames_are_refused() {
        let store = store().await;
        assert!(store.insert_user("ana", "s$1").await.unwrap());
        assert!(!store.insert_user("ana", "s$2").await.unwrap());
        assert_eq!(store.password_digest("ana").await.unwrap().as_deref(), Some("s$1"));
        assert_eq!(store.password_digest("bo").await.unwrap(), None);
    }

    #[tokio::test]
    async fn relinking_replaces_the_token() {
        let store = store().await;
        let first = MetaLink {
            access_token: "t1".into(),
            meta_user_id: "fb-1".into(),
        };
        let second = MetaLink {
            access_token: "t2".into(),
            meta_user_id: "fb-1".into(),
        };
        store.save_link("ana", &first).await.unwrap();
        store.save_link("ana", &second).await.unwrap();
        assert_eq!(store.link("ana").await.unwrap(), Some(second));
        assert_eq!(store.link("bo").await.unwrap(), None);
    }
}
