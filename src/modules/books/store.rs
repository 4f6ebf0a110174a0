//! Book Store contract consumed by the catalog service.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{Book, BookId, NewBook, ReservationStatus};

/// Failures reported by a [`BookStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No book is stored under the identifier.
    #[error("book {0} not found")]
    NotFound(BookId),

    /// The conditional update found the book in a different reservation
    /// state than the caller observed.
    #[error("book {0} changed since it was read")]
    StaleWrite(BookId),

    #[error("storage failure: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl StoreError {
    pub fn backend(message: impl Into<String>) -> Self {
        StoreError::Backend {
            message: message.into(),
            source: None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<bookshelf_db::DbError> for StoreError {
    fn from(err: bookshelf_db::DbError) -> Self {
        StoreError::Backend {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Durable keyed storage of books.
///
/// Duplicate titles are allowed. `find_by_title` resolves them to the
/// lowest-id copy that is still available, or to the lowest-id copy when
/// every copy is reserved.
#[async_trait]
pub trait BookStore: Send + Sync {
    /// Every stored book, in no particular order
    async fn list_all(&self) -> Result<Vec<Book>, StoreError>;

    /// Exact, case-sensitive title lookup
    async fn find_by_title(&self, title: &str) -> Result<Option<BookId>, StoreError>;

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError>;

    /// Persist a new, unreserved book and return its fresh identifier
    async fn insert(&self, book: &NewBook) -> Result<BookId, StoreError>;

    /// Replace the stored fields of `book.id`, but only while its stored
    /// reservation status still equals `expected`.
    ///
    /// Fails with [`StoreError::NotFound`] when the book is gone and with
    /// [`StoreError::StaleWrite`] when the status no longer matches. The
    /// comparison and the write are a single atomic step.
    async fn update(&self, book: &Book, expected: ReservationStatus) -> Result<(), StoreError>;
}
