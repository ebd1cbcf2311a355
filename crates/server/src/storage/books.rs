use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookshelf_core::cover::CoverStore;
use bookshelf_core::error::StoreError;

use super::{require, ListOptions, Page, Record, RecordDir};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub publication_year: Option<i32>,
    pub author_id: Option<String>,
    /// Filled in asynchronously by cover enrichment.
    pub cover_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Book {
    const KIND: &'static str = "book";

    fn id(&self) -> &str {
        &self.id
    }
}

/// Client-editable fields for create and update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookInput {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub publication_year: Option<i32>,
    pub author_id: Option<String>,
}

/// Cheap to clone: clones share the directory and its write lock.
#[derive(Clone)]
pub struct BookStore {
    dir: RecordDir<Book>,
}

impl BookStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            dir: RecordDir::open(root.as_ref())?,
        })
    }

    /// Books sorted by title, filtered on title or summary by `search`, then paged.
    pub fn list(&self, opts: &ListOptions) -> Result<Page<Book>, StoreError> {
        self.list_where(opts, |_| true)
    }

    pub fn list_by_author(&self, author_id: &str, opts: &ListOptions) -> Result<Page<Book>, StoreError> {
        self.list_where(opts, |book| book.author_id.as_deref() == Some(author_id))
    }

    fn list_where<F>(&self, opts: &ListOptions, keep: F) -> Result<Page<Book>, StoreError>
    where
        F: Fn(&Book) -> bool,
    {
        let needle = opts.needle();
        let mut books: Vec<Book> = self
            .dir
            .scan()?
            .into_iter()
            .filter(|b| keep(b))
            .filter(|b| match &needle {
                Some(q) => b.title.to_lowercase().contains(q) || b.summary.to_lowercase().contains(q),
                None => true,
            })
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(opts.slice(books))
    }

    pub fn get(&self, id: &str) -> Result<Book, StoreError> {
        self.dir.read(id)
    }

    pub fn create(&self, input: BookInput) -> Result<Book, StoreError> {
        require(&input.title, "title")?;
        let now = Utc::now();
        let book = Book {
            id: uuid::Uuid::new_v4().to_string(),
            title: input.title.trim().to_string(),
            summary: input.summary,
            publication_year: input.publication_year,
            author_id: input.author_id,
            cover_url: None,
            created_at: now,
            updated_at: now,
        };
        let _guard = self.dir.lock();
        self.dir.write(&book)?;
        Ok(book)
    }

    /// Replace editable fields; id, cover and creation time are kept.
    pub fn update(&self, id: &str, input: BookInput) -> Result<Book, StoreError> {
        require(&input.title, "title")?;
        let _guard = self.dir.lock();
        let mut book = self.dir.read(id)?;
        book.title = input.title.trim().to_string();
        book.summary = input.summary;
        book.publication_year = input.publication_year;
        book.author_id = input.author_id;
        book.updated_at = Utc::now();
        self.dir.write(&book)?;
        Ok(book)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.dir.lock();
        self.dir.remove(id)
    }

    pub fn set_cover_url(&self, id: &str, cover_url: &str) -> Result<Book, StoreError> {
        let _guard = self.dir.lock();
        let mut book = self.dir.read(id)?;
        book.cover_url = Some(cover_url.to_string());
        book.updated_at = Utc::now();
        self.dir.write(&book)?;
        Ok(book)
    }

    /// Clear `author_id` on every book by this author. Returns how many changed.
    pub fn detach_author(&self, author_id: &str) -> Result<usize, StoreError> {
        let _guard = self.dir.lock();
        let mut changed = 0;
        for mut book in self.dir.scan()? {
            if book.author_id.as_deref() == Some(author_id) {
                book.author_id = None;
                book.updated_at = Utc::now();
                self.dir.write(&book)?;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

/// File IO runs on the blocking pool so the worker's runtime threads stay free.
#[async_trait]
impl CoverStore for BookStore {
    async fn update_cover_url(&self, book_id: &str, cover_url: &str) -> Result<(), StoreError> {
        let store = self.clone();
        let (book_id, cover_url) = (book_id.to_string(), cover_url.to_string());
        tokio::task::spawn_blocking(move || store.set_cover_url(&book_id, &cover_url).map(|_| ()))
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?
    }
}
