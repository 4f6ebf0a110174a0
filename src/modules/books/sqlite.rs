use async_trait::async_trait;
use bookshelf_db::Database;
use bookshelf_kernel::Migration;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{Book, BookId, NewBook, ReservationStatus};
use super::store::{BookStore, StoreError};

/// Schema for the `book` table.
pub fn migrations() -> Vec<Migration> {
    vec![Migration {
        id: "001_init",
        up: r#"
            CREATE TABLE book (
                id       INTEGER PRIMARY KEY AUTOINCREMENT,
                title    TEXT    NOT NULL CHECK (trim(title) <> ''),
                author   TEXT    NOT NULL CHECK (trim(author) <> ''),
                reserved INTEGER NOT NULL DEFAULT 0 CHECK (reserved IN (0, 1))
            );
            CREATE INDEX book_title_idx ON book (title);
            "#,
    }]
}

/// Book store backed by SQLite.
///
/// Statements run on the blocking pool; the reservation guard is the
/// `reserved = ?` predicate of the `UPDATE`, so it also holds against
/// other processes writing the same file.
#[derive(Clone)]
pub struct SqliteBookStore {
    db: Database,
}

impl SqliteBookStore {
    /// Wrap an already migrated database
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| StoreError::Backend {
                message: format!("store task failed: {}", e),
                source: Some(Box::new(e)),
            })?
    }
}

fn book_from_row(row: &Row<'_>) -> rusqlite::Result<Book> {
    Ok(Book {
        id: BookId(row.get("id")?),
        title: row.get("title")?,
        author: row.get("author")?,
        reserved: row.get("reserved")?,
    })
}

#[async_trait]
impl BookStore for SqliteBookStore {
    async fn list_all(&self) -> Result<Vec<Book>, StoreError> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT id, title, author, reserved FROM book")?;
            let books = stmt
                .query_map([], book_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(books)
        })
        .await
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<BookId>, StoreError> {
        let title = title.to_string();
        self.run(move |conn| {
            let id = conn
                .query_row(
                    "SELECT id FROM book WHERE title = ?1 ORDER BY reserved ASC, id ASC LIMIT 1",
                    params![title],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(id.map(BookId))
        })
        .await
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        self.run(move |conn| {
            let book = conn
                .query_row(
                    "SELECT id, title, author, reserved FROM book WHERE id = ?1",
                    params![id.0],
                    book_from_row,
                )
                .optional()?;
            Ok(book)
        })
        .await
    }

    async fn insert(&self, book: &NewBook) -> Result<BookId, StoreError> {
        let book = book.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO book (title, author, reserved) VALUES (?1, ?2, 0)",
                params![book.title(), book.author()],
            )?;
            Ok(BookId(conn.last_insert_rowid()))
        })
        .await
    }

    async fn update(&self, book: &Book, expected: ReservationStatus) -> Result<(), StoreError> {
        let book = book.clone();
        self.run(move |conn| {
            let rows = conn.execute(
                r#"
                UPDATE book
                SET title = ?1, author = ?2, reserved = ?3
                WHERE id = ?4 AND reserved = ?5
                "#,
                params![
                    book.title,
                    book.author,
                    book.reserved,
                    book.id.0,
                    expected.is_reserved()
                ],
            )?;
            if rows > 0 {
                return Ok(());
            }

            let exists = conn
                .query_row("SELECT 1 FROM book WHERE id = ?1", params![book.id.0], |_| {
                    Ok(())
                })
                .optional()?
                .is_some();
            if exists {
                Err(StoreError::StaleWrite(book.id))
            } else {
                Err(StoreError::NotFound(book.id))
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteBookStore {
        let db = Database::open_in_memory().unwrap();
        let migrations: Vec<(String, Migration)> = migrations()
            .into_iter()
            .map(|m| ("books".to_string(), m))
            .collect();
        db.run_migrations(&migrations).unwrap();
        SqliteBookStore::new(db)
    }

    fn new_book(title: &str, author: &str) -> NewBook {
        NewBook::new(title, author).unwrap()
    }

    #[tokio::test]
    async fn get_all_books_from_db() {
        let store = store();
        for (title, author) in [
            ("Hamlet", "Shakespeare"),
            ("Les fleurs du mal", "Beaudelaire"),
            ("Harry Potter", "Rowling"),
        ] {
            store.insert(&new_book(title, author)).await.unwrap();
        }

        let mut titles: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.title)
            .collect();
        titles.sort();

        assert_eq!(titles, vec!["Hamlet", "Harry Potter", "Les fleurs du mal"]);
    }

    #[tokio::test]
    async fn create_book_in_db() {
        let store = store();
        let id = store
            .insert(&new_book("Les misérables", "Victor Hugo"))
            .await
            .unwrap();

        let book = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(
            book,
            Book {
                id,
                title: "Les misérables".to_string(),
                author: "Victor Hugo".to_string(),
                reserved: false,
            }
        );
    }

    #[tokio::test]
    async fn get_book_with_non_existing_id() {
        let store = store();
        assert_eq!(store.find_by_id(BookId(999)).await.unwrap(), None);
        assert_eq!(store.find_by_title("Le Petit Prince").await.unwrap(), None);
    }

    #[tokio::test]
    async fn find_by_title_prefers_available_copy() {
        let store = store();
        let first = store.insert(&new_book("Dune", "Herbert")).await.unwrap();
        let second = store.insert(&new_book("Dune", "Herbert")).await.unwrap();

        let book = store.find_by_id(first).await.unwrap().unwrap();
        store
            .update(&book.into_reserved(), ReservationStatus::Available)
            .await
            .unwrap();

        assert_eq!(store.find_by_title("Dune").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn update_book() {
        let store = store();
        let id = store
            .insert(&new_book("Le Petit Prince", "Saint-Exupéry"))
            .await
            .unwrap();
        let book = store.find_by_id(id).await.unwrap().unwrap();

        store
            .update(&book.into_reserved(), ReservationStatus::Available)
            .await
            .unwrap();

        assert!(store.find_by_id(id).await.unwrap().unwrap().reserved);
    }

    #[tokio::test]
    async fn update_with_stale_status_is_rejected() {
        let store = store();
        let id = store.insert(&new_book("Hamlet", "Shakespeare")).await.unwrap();
        let book = store.find_by_id(id).await.unwrap().unwrap();

        store
            .update(&book.clone().into_reserved(), ReservationStatus::Available)
            .await
            .unwrap();
        let err = store
            .update(&book.into_reserved(), ReservationStatus::Available)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::StaleWrite(stale) if stale == id));
    }

    #[tokio::test]
    async fn update_book_with_non_existing_id() {
        let store = store();
        let ghost = new_book("Les misérables", "Victor Hugo").into_book(BookId(999));

        let err = store
            .update(&ghost, ReservationStatus::Available)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(BookId(999))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_on_file_database_have_one_winner() {
        use crate::modules::books::{error::CatalogError, service::CatalogService};
        use std::sync::Arc;

        let dir = tempfile::tempdir().unwrap();

        for round in 0..30 {
            let db = Database::open(dir.path().join(format!("round-{round}.db"))).unwrap();
            let migrations: Vec<(String, Migration)> = migrations()
                .into_iter()
                .map(|m| ("books".to_string(), m))
                .collect();
            db.run_migrations(&migrations).unwrap();

            let catalog = CatalogService::new(Arc::new(SqliteBookStore::new(db)));
            catalog.add_book("Hamlet", "Shakespeare").await.unwrap();

            let tasks: Vec<_> = (0..4)
                .map(|_| {
                    let catalog = catalog.clone();
                    tokio::spawn(async move { catalog.reserve_book("Hamlet").await })
                })
                .collect();

            let mut wins = 0;
            let mut conflicts = 0;
            for task in tasks {
                match task.await.unwrap() {
                    Ok(_) => wins += 1,
                    Err(CatalogError::AlreadyReserved { .. }) => conflicts += 1,
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
            assert_eq!((wins, conflicts), (1, 3), "round {round}");
        }
    }

    #[tokio::test]
    async fn schema_rejects_blank_title() {
        let store = store();
        let err = store
            .run(|conn| {
                conn.execute(
                    "INSERT INTO book (title, author) VALUES ('  ', 'Nobody')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Backend { .. }));
    }
}
