use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::StageError;
use super::store::KeyValueStore;

/// Staging slots persisted in a local SQLite file, so a check-in survives the
/// device being closed or the agent restarting.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn backend(e: sqlx::Error) -> StageError {
    StageError::Backend(e.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StageError> {
        sqlx::query_scalar::<_, String>("SELECT payload FROM checkin_stage WHERE slot_key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StageError> {
        sqlx::query(
            r#"
            INSERT INTO checkin_stage (slot_key, payload, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(slot_key) DO UPDATE
            SET payload = excluded.payload, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn insert_new(&self, key: &str, value: &str) -> Result<bool, StageError> {
        let done = sqlx::query(
            r#"
            INSERT INTO checkin_stage (slot_key, payload, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(slot_key) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(done.rows_affected() == 1)
    }

    async fn delete(&self, key: &str) -> Result<Option<String>, StageError> {
        // single statement, so two racing deletes cannot both see the row
        sqlx::query_scalar::<_, String>(
            "DELETE FROM checkin_stage WHERE slot_key = ? RETURNING payload",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)
    }

    async fn scan(&self, prefix: &str) -> Result<Vec<(String, String)>, StageError> {
        sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT slot_key, payload
            FROM checkin_stage
            WHERE substr(slot_key, 1, length(?)) = ?
            ORDER BY slot_key
            "#,
        )
        .bind(prefix)
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    #[actix_web::test]
    async fn slots_survive_reopening_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("stage.db").display());

        {
            let store = SqliteStore::new(init_db(&url).await.unwrap());
            store.set("attendance:checkin:7:3", "{\"v\":1}").await.unwrap();
            store.set("attendance:checkin:7:3", "{\"v\":2}").await.unwrap();
        }

        let store = SqliteStore::new(init_db(&url).await.unwrap());
        assert_eq!(
            store.get("attendance:checkin:7:3").await.unwrap().as_deref(),
            Some("{\"v\":2}")
        );
        assert_eq!(store.scan("attendance:checkin:").await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn delete_is_read_and_remove() {
        let store = SqliteStore::new(init_db("sqlite::memory:").await.unwrap());
        store.set("k", "v").await.unwrap();

        assert_eq!(store.delete("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(store.delete("k").await.unwrap(), None);
    }

    #[actix_web::test]
    async fn insert_new_does_not_overwrite() {
        let store = SqliteStore::new(init_db("sqlite::memory:").await.unwrap());

        assert!(store.insert_new("k", "first").await.unwrap());
        assert!(!store.insert_new("k", "second").await.unwrap());
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("first"));

        store.delete("k").await.unwrap();
        assert!(store.insert_new("k", "third").await.unwrap());
    }

    #[actix_web::test]
    async fn scan_treats_prefix_literally() {
        let store = SqliteStore::new(init_db("sqlite::memory:").await.unwrap());
        store.set("a%b:1", "x").await.unwrap();
        store.set("azb:1", "y").await.unwrap();

        let found = store.scan("a%b:").await.unwrap();
        assert_eq!(found, vec![("a%b:1".to_string(), "x".to_string())]);
    }
}
