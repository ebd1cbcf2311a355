use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use bookshelf_core::error::StoreError;

use super::{ApiError, ListQuery, Paginated};
use crate::storage::{Book, Favorite, NewUser, Page, User};
use crate::AppState;

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/users", post(create_user))
        .route("/v1/users/{id}", get(get_user))
        .route("/v1/users/{id}/favorites", get(list_favorites).post(add_favorite))
        .route("/v1/users/{id}/favorites/{favorite_id}", delete(remove_favorite))
}

/// A favorite with the book it points at.
#[derive(Debug, Serialize)]
pub struct FavoriteBook {
    #[serde(flatten)]
    pub favorite: Favorite,
    pub book: Book,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub book_id: String,
}

/// Argon2 hashing is CPU-bound and runs on the blocking pool.
async fn create_user(State(state): State<AppState>, Json(input): Json<NewUser>) -> Result<(StatusCode, Json<User>), ApiError> {
    let users = state.users.clone();
    let user = tokio::task::spawn_blocking(move || users.create(input)).await??;
    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<User>, ApiError> {
    Ok(Json(state.users.get(&id)?))
}

async fn list_favorites(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Paginated<FavoriteBook>>, ApiError> {
    state.users.get(&user_id)?;
    let page = state.favorites.list_for_user(&user_id, &q.options())?;
    let mut items = Vec::with_capacity(page.items.len());
    for favorite in page.items {
        match state.books.get(&favorite.book_id) {
            Ok(book) => items.push(FavoriteBook { favorite, book }),
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(favorite_id = %favorite.id, book_id = %favorite.book_id, "favorite points at a missing book");
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(Json(Paginated::new(q.paging(), Page { items, total: page.total })))
}

async fn add_favorite(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<FavoriteRequest>,
) -> Result<(StatusCode, Json<FavoriteBook>), ApiError> {
    state.users.get(&user_id)?;
    let book = state.books.get(&req.book_id)?;
    let favorite = state.favorites.add(&user_id, &book.id)?;
    Ok((StatusCode::CREATED, Json(FavoriteBook { favorite, book })))
}

/// Idempotent: removing a missing or foreign favorite is still 204.
async fn remove_favorite(
    State(state): State<AppState>,
    Path((user_id, favorite_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    if !state.favorites.remove(&user_id, &favorite_id)? {
        tracing::debug!(user_id = %user_id, favorite_id = %favorite_id, "nothing to remove");
    }
    Ok(StatusCode::NO_CONTENT)
}
