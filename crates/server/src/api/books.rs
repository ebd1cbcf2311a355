use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use bookshelf_core::error::StoreError;

use super::{ApiError, ListQuery, Paginated};
use crate::storage::{Book, BookInput};
use crate::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/books", get(list_books).post(create_book))
        .route("/v1/books/{id}", get(get_book).put(update_book).delete(delete_book))
}

async fn list_books(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Result<Json<Paginated<Book>>, ApiError> {
    let page = state.books.list(&q.options())?;
    Ok(Json(Paginated::new(q.paging(), page)))
}

async fn get_book(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Book>, ApiError> {
    Ok(Json(state.books.get(&id)?))
}

/// The book is persisted before the cover request is published.
async fn create_book(
    State(state): State<AppState>,
    Json(input): Json<BookInput>,
) -> Result<(StatusCode, Json<Book>), ApiError> {
    ensure_author(&state, input.author_id.as_deref())?;
    let book = state.books.create(input)?;
    tracing::info!(book_id = %book.id, title = %book.title, "book created");
    state.trigger.request_cover(&book.id, &book.title).await;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<BookInput>,
) -> Result<Json<Book>, ApiError> {
    ensure_author(&state, input.author_id.as_deref())?;
    Ok(Json(state.books.update(&id, input)?))
}

async fn delete_book(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    state.books.delete(&id)?;
    let dropped = state.favorites.remove_for_book(&id)?;
    tracing::info!(book_id = %id, favorites_dropped = dropped, "book deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// A book may only point at an author that exists.
fn ensure_author(state: &AppState, author_id: Option<&str>) -> Result<(), ApiError> {
    let Some(author_id) = author_id else {
        return Ok(());
    };
    match state.authors.get(author_id) {
        Ok(_) => Ok(()),
        Err(StoreError::NotFound(_)) => Err(ApiError::BadRequest(format!("author {} does not exist", author_id))),
        Err(e) => Err(e.into()),
    }
}
