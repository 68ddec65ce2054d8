use crate::{
    error::{Result, TaskboardError},
    storage::KeyValueStore,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::{path::Path, sync::Mutex};

/// SQLite-backed record storage: a single `records(key, value)` table
pub struct SqliteStorage {
    connection: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `database_path`
    pub fn open(database_path: impl AsRef<Path>) -> Result<Self> {
        let connection = Connection::open(database_path).map_err(sqlite_error)?;
        Self::with_connection(connection)
    }

    pub fn in_memory() -> Result<Self> {
        let connection = Connection::open_in_memory().map_err(sqlite_error)?;
        Self::with_connection(connection)
    }

    fn with_connection(connection: Connection) -> Result<Self> {
        connection
            .execute(
                "CREATE TABLE IF NOT EXISTS records (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
                [],
            )
            .map_err(sqlite_error)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn with_db<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let connection = self
            .connection
            .lock()
            .map_err(|_| TaskboardError::Storage("sqlite connection lock poisoned".to_string()))?;
        f(&connection).map_err(sqlite_error)
    }
}

fn sqlite_error(e: rusqlite::Error) -> TaskboardError {
    TaskboardError::Storage(e.to_string())
}

#[async_trait]
impl KeyValueStore for SqliteStorage {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_db(|db| {
            db.query_row(
                "SELECT value FROM records WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_db(|db| {
            db.execute(
                "INSERT INTO records (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .map(|_| ())
        })
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.with_db(|db| {
            db.execute("DELETE FROM records WHERE key = ?1", params![key])
                .map(|_| ())
        })
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.with_db(|db| {
            let mut stmt = db.prepare("SELECT key FROM records ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keys)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_records() {
        let storage = SqliteStorage::in_memory().unwrap();
        assert_eq!(storage.get("a").await.unwrap(), None);

        storage.set("b", "2").await.unwrap();
        storage.set("a", "1").await.unwrap();
        storage.set("a", "3").await.unwrap();

        assert_eq!(storage.get("a").await.unwrap().as_deref(), Some("3"));
        assert_eq!(storage.keys().await.unwrap(), vec!["a", "b"]);

        storage.remove("a").await.unwrap();
        assert_eq!(storage.get("a").await.unwrap(), None);
    }
}
