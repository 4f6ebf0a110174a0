pub mod error;
pub mod memory;
pub mod models;
pub mod routes;
pub mod service;
pub mod sqlite;
pub mod store;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Migration, Module};

pub use error::{CatalogError, LookupKey};
pub use memory::InMemoryBookStore;
pub use models::{Book, BookId, NewBook, ReservationStatus, ValidationError};
pub use service::CatalogService;
pub use sqlite::SqliteBookStore;
pub use store::{BookStore, StoreError};

/// Book catalog and reservations, mounted under `/api/books`
pub struct BooksModule {
    catalog: CatalogService,
}

impl BooksModule {
    pub fn new(catalog: CatalogService) -> Self {
        Self { catalog }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.catalog.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi())
    }

    fn migrations(&self) -> Vec<Migration> {
        sqlite::migrations()
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn error_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn book_response(description: &str) -> serde_json::Value {
    serde_json::json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/Book" }
            }
        }
    })
}

fn openapi() -> serde_json::Value {
    serde_json::json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books ordered by title",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "List of books",
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "array",
                                        "items": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            }
                        },
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Add a book",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/CreateBook" }
                            }
                        }
                    },
                    "responses": {
                        "201": book_response("Book added"),
                        "400": error_response("Malformed request body"),
                        "422": error_response("Blank title or author"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/reservations": {
                "post": {
                    "summary": "Reserve a book by title",
                    "tags": ["Books"],
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/ReserveBook" }
                            }
                        }
                    },
                    "responses": {
                        "200": book_response("Book reserved"),
                        "404": error_response("No book with this title"),
                        "409": error_response("Book already reserved"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/{id}/reserve": {
                "post": {
                    "summary": "Reserve a book by id",
                    "tags": ["Books"],
                    "parameters": [{
                        "name": "id",
                        "in": "path",
                        "required": true,
                        "schema": { "type": "integer", "format": "int64" }
                    }],
                    "responses": {
                        "200": book_response("Book reserved"),
                        "404": error_response("No book with this id"),
                        "409": error_response("Book already reserved"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/health": {
                "get": {
                    "summary": "Books health check",
                    "tags": ["Books"],
                    "responses": {
                        "200": {
                            "description": "OK",
                            "content": { "text/plain": { "schema": { "type": "string" } } }
                        }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "reserved": { "type": "boolean" }
                    },
                    "required": ["id", "title", "author", "reserved"]
                },
                "CreateBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" }
                    },
                    "required": ["title", "author"]
                },
                "ReserveBook": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" }
                    },
                    "required": ["title"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module(catalog: CatalogService) -> Arc<dyn Module> {
    Arc::new(BooksModule::new(catalog))
}
