use std::sync::Arc;

use super::error::{CatalogError, LookupKey};
use super::models::{Book, BookId, NewBook, ReservationStatus};
use super::store::{BookStore, StoreError};

/// Listing and reservation rules on top of a [`BookStore`].
///
/// Holds no state of its own; clones share the store and may be used from
/// any number of tasks.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn BookStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn BookStore>) -> Self {
        Self { store }
    }

    /// All books ordered by title, ignoring case. Books with equal keys
    /// keep the order the store returned them in.
    pub async fn list_books(&self) -> Result<Vec<Book>, CatalogError> {
        let mut books = self.store.list_all().await.map_err(CatalogError::Storage)?;
        books.sort_by_cached_key(|book| book.title.to_lowercase());
        Ok(books)
    }

    /// Add an unreserved book. Titles need not be unique.
    pub async fn add_book(&self, title: &str, author: &str) -> Result<BookId, CatalogError> {
        let book = NewBook::new(title, author)?;
        let id = self
            .store
            .insert(&book)
            .await
            .map_err(CatalogError::Storage)?;

        tracing::info!(book_id = %id, title = book.title(), "book added");
        Ok(id)
    }

    /// Reserve the book known by `title` and return its reserved state.
    pub async fn reserve_book(&self, title: &str) -> Result<Book, CatalogError> {
        let id = self
            .store
            .find_by_title(title)
            .await
            .map_err(CatalogError::Storage)?
            .ok_or_else(|| CatalogError::NotFound(LookupKey::Title(title.to_string())))?;

        self.reserve_book_by_id(id).await
    }

    /// Reserve the book stored under `id` and return its reserved state.
    ///
    /// The decision is made against a fresh read, and the write only lands
    /// if the book is still available at write time; losing that race is
    /// reported as [`CatalogError::AlreadyReserved`].
    pub async fn reserve_book_by_id(&self, id: BookId) -> Result<Book, CatalogError> {
        let book = self
            .store
            .find_by_id(id)
            .await
            .map_err(CatalogError::Storage)?
            .ok_or(CatalogError::NotFound(LookupKey::Id(id)))?;

        if book.status() == ReservationStatus::Reserved {
            return Err(CatalogError::AlreadyReserved {
                title: book.title,
                id,
            });
        }

        let reserved = book.into_reserved();
        match self
            .store
            .update(&reserved, ReservationStatus::Available)
            .await
        {
            Ok(()) => {
                tracing::info!(book_id = %id, title = %reserved.title, "book reserved");
                Ok(reserved)
            }
            Err(StoreError::StaleWrite(_)) => {
                tracing::debug!(book_id = %id, "reservation lost a concurrent race");
                Err(CatalogError::AlreadyReserved {
                    title: reserved.title,
                    id,
                })
            }
            Err(StoreError::NotFound(_)) => Err(CatalogError::NotFound(LookupKey::Id(id))),
            Err(e) => Err(CatalogError::Storage(e)),
        }
    }
}
