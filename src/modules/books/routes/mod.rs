//! HTTP handlers for the books module.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use libris_http::{AppError, JsonPayload};

use super::models::{BookEnvelope, BookFilter, BookList, DeletedMessage};
use super::store::{BookStore, StoreError};
use super::validation::{self, ValidationError};

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::not_found(err.to_string()),
            StoreError::Database(_) => AppError::Internal(anyhow::Error::new(err)),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::validation(err.messages)
    }
}

pub fn router(store: BookStore) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route(
            "/{isbn}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(store)
}

async fn list_books(
    State(store): State<BookStore>,
    Query(filter): Query<BookFilter>,
) -> Result<Json<BookList>, AppError> {
    let books = store.list(&filter).await?;
    Ok(Json(BookList { books }))
}

async fn get_book(
    State(store): State<BookStore>,
    Path(isbn): Path<String>,
) -> Result<Json<BookEnvelope>, AppError> {
    let book = store.get(&isbn).await?;
    Ok(Json(BookEnvelope { book }))
}

async fn create_book(
    State(store): State<BookStore>,
    JsonPayload(payload): JsonPayload,
) -> Result<(StatusCode, Json<BookEnvelope>), AppError> {
    let book = validation::validate_create(&payload)?;
    let book = store.create(&book).await?;
    Ok((StatusCode::CREATED, Json(BookEnvelope { book })))
}

/// Runs two statements: a lookup, then the store's single `UPDATE`. The
/// target must exist before the payload is judged, so an unknown isbn is a
/// 404 whatever the body holds. A row deleted between the two still gives a
/// 404 from the `UPDATE` itself.
async fn update_book(
    State(store): State<BookStore>,
    Path(isbn): Path<String>,
    JsonPayload(payload): JsonPayload,
) -> Result<Json<BookEnvelope>, AppError> {
    store.get(&isbn).await?;
    let fields = validation::validate_update(&payload)?;
    let book = store.update(&isbn, &fields).await?;
    Ok(Json(BookEnvelope { book }))
}

async fn delete_book(
    State(store): State<BookStore>,
    Path(isbn): Path<String>,
) -> Result<Json<DeletedMessage>, AppError> {
    store.delete(&isbn).await?;
    Ok(Json(DeletedMessage {
        message: "Book deleted",
    }))
}
