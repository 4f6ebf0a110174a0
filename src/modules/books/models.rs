use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Store-assigned book identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(pub i64);

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Rejected book input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Book title cannot be blank")]
    BlankTitle,
    #[error("Book author cannot be blank")]
    BlankAuthor,
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::BlankTitle => "title",
            ValidationError::BlankAuthor => "author",
        }
    }
}

/// Reservation state of a single book. `Reserved` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    Available,
    Reserved,
}

impl ReservationStatus {
    pub fn is_reserved(self) -> bool {
        matches!(self, ReservationStatus::Reserved)
    }
}

impl From<bool> for ReservationStatus {
    fn from(reserved: bool) -> Self {
        if reserved {
            ReservationStatus::Reserved
        } else {
            ReservationStatus::Available
        }
    }
}

/// A stored book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Unique identifier for the book
    pub id: BookId,
    /// Title of the book
    pub title: String,
    /// Author of the book
    pub author: String,
    /// Whether the book has been reserved
    pub reserved: bool,
}

impl Book {
    pub fn status(&self) -> ReservationStatus {
        self.reserved.into()
    }

    /// The next state of this book after a reservation. Title and author
    /// are carried over unchanged.
    pub fn into_reserved(self) -> Book {
        Book {
            reserved: true,
            ..self
        }
    }
}

/// A validated book that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    title: String,
    author: String,
}

impl NewBook {
    /// Rejects empty or whitespace-only titles and authors. Accepted values
    /// are kept exactly as given.
    pub fn new(title: impl Into<String>, author: impl Into<String>) -> Result<Self, ValidationError> {
        let title = title.into();
        let author = author.into();

        if title.trim().is_empty() {
            return Err(ValidationError::BlankTitle);
        }
        if author.trim().is_empty() {
            return Err(ValidationError::BlankAuthor);
        }

        Ok(Self { title, author })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Attach a store-assigned identifier
    pub fn into_book(self, id: BookId) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            reserved: false,
        }
    }
}

/// Request model for adding a book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBook {
    pub title: String,
    pub author: String,
}

/// Request model for reserving a book by title.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveBook {
    pub title: String,
}
