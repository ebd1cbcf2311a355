use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::{ApiError, ListQuery, Paginated};
use crate::storage::{Author, AuthorInput, Book};
use crate::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/authors", get(list_authors).post(create_author))
        .route("/v1/authors/{id}", get(get_author).put(update_author).delete(delete_author))
        .route("/v1/authors/{id}/books", get(author_books))
}

async fn list_authors(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Paginated<Author>>, ApiError> {
    let page = state.authors.list(&q.options())?;
    Ok(Json(Paginated::new(q.paging(), page)))
}

async fn get_author(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Author>, ApiError> {
    Ok(Json(state.authors.get(&id)?))
}

async fn create_author(
    State(state): State<AppState>,
    Json(input): Json<AuthorInput>,
) -> Result<(StatusCode, Json<Author>), ApiError> {
    let author = state.authors.create(input)?;
    tracing::info!(author_id = %author.id, "author created");
    Ok((StatusCode::CREATED, Json(author)))
}

async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AuthorInput>,
) -> Result<Json<Author>, ApiError> {
    Ok(Json(state.authors.update(&id, input)?))
}

/// Books by the author stay, without an author.
async fn delete_author(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    state.authors.delete(&id)?;
    let detached = state.books.detach_author(&id)?;
    tracing::info!(author_id = %id, books_detached = detached, "author deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Sorted by title; `search` narrows within the author's books.
async fn author_books(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Paginated<Book>>, ApiError> {
    state.authors.get(&id)?;
    let page = state.books.list_by_author(&id, &q.options())?;
    Ok(Json(Paginated::new(q.paging(), page)))
}
