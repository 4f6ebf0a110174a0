use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::models::{Book, BookId, NewBook, ReservationStatus};
use super::store::{BookStore, StoreError};

/// Process-local book store.
///
/// Each instance is independent, so tests and the `memory` backend get
/// isolated catalogs. Identifiers start at 1 and are never reused.
#[derive(Default)]
pub struct InMemoryBookStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    books: BTreeMap<BookId, Book>,
    last_id: i64,
}

impl InMemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryBookStore {
    async fn list_all(&self) -> Result<Vec<Book>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.books.values().cloned().collect())
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<BookId>, StoreError> {
        let inner = self.inner.read().await;
        let mut copies = inner.books.values().filter(|book| book.title == title);

        let Some(first) = copies.next() else {
            return Ok(None);
        };
        if !first.reserved {
            return Ok(Some(first.id));
        }

        let available = copies.find(|book| !book.reserved);
        Ok(Some(available.map_or(first.id, |book| book.id)))
    }

    async fn find_by_id(&self, id: BookId) -> Result<Option<Book>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.books.get(&id).cloned())
    }

    async fn insert(&self, book: &NewBook) -> Result<BookId, StoreError> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = BookId(inner.last_id);
        inner.books.insert(id, book.clone().into_book(id));
        Ok(id)
    }

    async fn update(&self, book: &Book, expected: ReservationStatus) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let stored = inner
            .books
            .get_mut(&book.id)
            .ok_or(StoreError::NotFound(book.id))?;

        if stored.status() != expected {
            return Err(StoreError::StaleWrite(book.id));
        }

        *stored = book.clone();
        Ok(())
    }
}
