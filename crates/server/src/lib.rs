//! Book catalog HTTP server.
//!
//! Exposes books, authors, users and per-user favorites over directory-backed
//! stores. Creating a book schedules cover enrichment through `bookshelf-core`;
//! the resolved cover URL is written back to the book store by the cover worker.

pub mod api;
pub mod config;
pub mod storage;

use std::sync::Arc;

use axum::Router;
use bookshelf_core::error::StoreError;
use bookshelf_core::trigger::CoverTrigger;

use crate::config::ServerConfig;
use crate::storage::{AuthorStore, BookStore, FavoriteStore, Stores, UserStore};

/// Shared application state (stores, cover trigger and config).
#[derive(Clone)]
pub struct AppState {
    pub books: Arc<BookStore>,
    pub authors: Arc<AuthorStore>,
    pub users: Arc<UserStore>,
    pub favorites: Arc<FavoriteStore>,
    pub trigger: CoverTrigger,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig, stores: Stores, trigger: CoverTrigger) -> Self {
        let Stores {
            books,
            authors,
            users,
            favorites,
        } = stores;
        Self {
            books,
            authors,
            users,
            favorites,
            trigger,
            config,
        }
    }

    /// Open every store under `config.data_path` with cover enrichment disabled.
    pub fn without_covers(config: ServerConfig) -> Result<Self, StoreError> {
        let stores = Stores::open(&config.data_path)?;
        Ok(Self::new(config, stores, CoverTrigger::disabled()))
    }
}

/// Build API routes with state.
pub fn api_routes(state: AppState) -> Router {
    api::routes(state)
}
