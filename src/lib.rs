//! Bookshelf application library
//!
//! The `books` module (catalog, stores, reservation workflow) and the
//! bootstrap that wires it into the HTTP server.

pub mod app;
pub mod modules;

pub use app::App;
pub use modules::*;
