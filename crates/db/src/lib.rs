//! SQLite connection factory and migration runner.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bookshelf_kernel::Migration;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Errors raised while opening or migrating the database.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to create database directory {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("database error: {message}")]
    Sqlite {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("migration {module}/{id} failed: {source}")]
    Migration {
        module: String,
        id: String,
        #[source]
        source: rusqlite::Error,
    },
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        DbError::Sqlite {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Shared handle to a single SQLite connection.
///
/// Every statement runs while holding the connection mutex, so a closure
/// passed to [`Database::with_conn`] observes and mutates the database
/// without interleaving from other callers.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a database file, creating its parent directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DbError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| DbError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;

        tracing::info!(target: "bookshelf-db", path = %path.display(), "database opened");

        Ok(Self::from_connection(conn))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Run `f` with exclusive access to the connection.
    pub fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut conn = self.conn.lock().map_err(|e| DbError::Sqlite {
            message: format!("failed to lock database: {}", e),
            source: None,
        })?;
        f(&mut *conn)
    }

    /// Apply every migration not yet recorded in `schema_migrations`.
    ///
    /// Each migration runs in its own transaction together with its ledger
    /// row. Returns the number of migrations applied by this call.
    pub fn run_migrations(&self, migrations: &[(String, Migration)]) -> Result<usize, DbError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS schema_migrations (
                    module TEXT NOT NULL,
                    id TEXT NOT NULL,
                    applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                    PRIMARY KEY (module, id)
                );
                "#,
            )?;

            let mut applied = 0;
            for (module, migration) in migrations {
                let done = conn
                    .query_row(
                        "SELECT 1 FROM schema_migrations WHERE module = ?1 AND id = ?2",
                        params![module, migration.id],
                        |_| Ok(()),
                    )
                    .optional()?
                    .is_some();
                if done {
                    tracing::debug!(target: "bookshelf-db", %module, id = migration.id, "migration already applied");
                    continue;
                }

                let wrap = |source: rusqlite::Error| DbError::Migration {
                    module: module.clone(),
                    id: migration.id.to_string(),
                    source,
                };
                let tx = conn.transaction().map_err(wrap)?;
                tx.execute_batch(migration.up).map_err(wrap)?;
                tx.execute(
                    "INSERT INTO schema_migrations (module, id) VALUES (?1, ?2)",
                    params![module, migration.id],
                )
                .map_err(wrap)?;
                tx.commit().map_err(wrap)?;

                tracing::info!(target: "bookshelf-db", %module, id = migration.id, "migration applied");
                applied += 1;
            }

            Ok(applied)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migrations() -> Vec<(String, Migration)> {
        vec![(
            "shelf".to_string(),
            Migration {
                id: "001_init",
                up: "CREATE TABLE shelf (id INTEGER PRIMARY KEY, label TEXT NOT NULL);",
            },
        )]
    }

    #[test]
    fn migrations_apply_once() {
        let db = Database::open_in_memory().unwrap();

        assert_eq!(db.run_migrations(&migrations()).unwrap(), 1);
        assert_eq!(db.run_migrations(&migrations()).unwrap(), 0);

        let count: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
                    row.get(0)
                })
                .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn failed_migration_is_not_recorded() {
        let db = Database::open_in_memory().unwrap();
        let broken = vec![(
            "shelf".to_string(),
            Migration {
                id: "001_broken",
                up: "CREATE TABLE;",
            },
        )];

        let err = db.run_migrations(&broken).unwrap_err();
        assert!(matches!(err, DbError::Migration { ref id, .. } if id == "001_broken"));

        // A corrected run still applies the good migration set.
        assert_eq!(db.run_migrations(&migrations()).unwrap(), 1);
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("books.db");

        let db = Database::open(&path).unwrap();
        db.run_migrations(&migrations()).unwrap();

        assert!(path.exists());
    }
}
