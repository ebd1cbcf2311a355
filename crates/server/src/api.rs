//! HTTP API routes: health, plus books, authors, users and favorites under /v1.

mod authors;
mod books;
mod users;

use axum::{http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use bookshelf_core::error::StoreError;

use crate::storage::{ListOptions, Page};
use crate::AppState;

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

/// Query params shared by every listing.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy)]
struct Paging {
    page: u64,
    limit: u64,
}

impl ListQuery {
    fn paging(&self) -> Paging {
        Paging {
            page: self.page.unwrap_or(1).max(1),
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
        }
    }

    fn options(&self) -> ListOptions {
        let Paging { page, limit } = self.paging();
        ListOptions {
            offset: (page - 1).saturating_mul(limit),
            limit,
            search: self.search.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    fn new(paging: Paging, page: Page<T>) -> Self {
        Self {
            meta: PageMeta {
                total: page.total,
                page: paging.page,
                total_pages: page.total.div_ceil(paging.limit),
            },
            data: page.items,
        }
    }
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    timestamp: String,
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(books::routes())
        .merge(authors::routes())
        .merge(users::routes())
        .with_state(state)
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            StoreError::Invalid(msg) | StoreError::Conflict(msg) => ApiError::BadRequest(msg),
            other => {
                tracing::error!(error = %other, "store failure");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        tracing::error!(error = %e, "blocking task failed");
        ApiError::Internal(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match self {
            ApiError::NotFound(s) => (StatusCode::NOT_FOUND, s),
            ApiError::BadRequest(s) => (StatusCode::BAD_REQUEST, s),
            ApiError::Internal(s) => (StatusCode::INTERNAL_SERVER_ERROR, s),
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<u64>, limit: Option<u64>) -> ListQuery {
        ListQuery { page, limit, search: None }
    }

    #[test]
    fn paging_defaults_and_caps() {
        let opts = query(None, None).options();
        assert_eq!((opts.offset, opts.limit), (0, DEFAULT_LIMIT));

        let opts = query(Some(0), Some(1000)).options();
        assert_eq!((opts.offset, opts.limit), (0, MAX_LIMIT));

        let opts = query(Some(3), Some(0)).options();
        assert_eq!((opts.offset, opts.limit), (2, 1));
    }

    #[test]
    fn meta_rounds_pages_up() {
        let paging = query(Some(2), Some(4)).paging();
        let list = Paginated::new(paging, Page { items: vec![5, 6, 7, 8], total: 9 });
        assert_eq!(list.meta.total_pages, 3);
        assert_eq!(list.meta.page, 2);
        assert_eq!(list.data.len(), 4);
    }

    #[test]
    fn conflicts_are_bad_requests() {
        let e = ApiError::from(StoreError::Conflict("already".into()));
        assert_eq!(e.into_response().status(), StatusCode::BAD_REQUEST);
        let e = ApiError::from(StoreError::Backend("disk".into()));
        assert_eq!(e.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
