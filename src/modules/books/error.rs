use std::fmt;

use bookshelf_http::error::AppError;
use serde_json::json;
use thiserror::Error;

use super::models::{BookId, ValidationError};
use super::store::StoreError;

/// How a missing book was looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    Title(String),
    Id(BookId),
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Title(title) => write!(f, "title '{}'", title),
            LookupKey::Id(id) => write!(f, "id {}", id),
        }
    }
}

/// Every outcome of a catalog operation other than success.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Book with {0} not found")]
    NotFound(LookupKey),

    #[error("Book '{title}' with ID {id} is already reserved")]
    AlreadyReserved { title: String, id: BookId },

    #[error(transparent)]
    Storage(StoreError),
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::Validation(e) => AppError::validation(
                vec![json!({ "field": e.field(), "error": "blank" })],
                message,
            ),
            CatalogError::NotFound(_) => AppError::not_found(message),
            CatalogError::AlreadyReserved { title, id } => {
                AppError::conflict(vec![json!({ "title": title, "id": id })], message)
            }
            CatalogError::Storage(e) => AppError::Internal(anyhow::Error::new(e)),
        }
    }
}
