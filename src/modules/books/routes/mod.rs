//! HTTP handlers for the books module.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bookshelf_http::error::AppError;

use super::models::{Book, BookId, CreateBook, ReserveBook};
use super::service::CatalogService;

pub fn router(catalog: CatalogService) -> Router {
    Router::new()
        .route("/", get(list_books).post(add_book))
        .route("/reservations", post(reserve_book))
        .route("/{id}/reserve", post(reserve_book_by_id))
        .route("/health", get(health_check))
        .with_state(catalog)
}

async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(catalog): State<CatalogService>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(catalog.list_books().await?))
}

async fn add_book(
    State(catalog): State<CatalogService>,
    payload: Result<Json<CreateBook>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(request) = payload?;
    let id = catalog.add_book(&request.title, &request.author).await?;

    let book = Book {
        id,
        title: request.title,
        author: request.author,
        reserved: false,
    };
    Ok((StatusCode::CREATED, Json(book)))
}

async fn reserve_book(
    State(catalog): State<CatalogService>,
    payload: Result<Json<ReserveBook>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let Json(request) = payload?;
    Ok(Json(catalog.reserve_book(&request.title).await?))
}

async fn reserve_book_by_id(
    State(catalog): State<CatalogService>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Book>, AppError> {
    let Path(id) = id?;
    Ok(Json(catalog.reserve_book_by_id(BookId(id)).await?))
}
