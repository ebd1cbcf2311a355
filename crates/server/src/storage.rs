//! Directory-backed record stores: one JSON file per record, named by its UUID.
//!
//! Each record kind lives in its own subdirectory of the data path. Writes go
//! to a temp file and are renamed into place, so readers never see a partial
//! record. Writers of one kind serialize on a shared lock.

mod authors;
mod books;
mod favorites;
mod users;

pub use authors::{Author, AuthorInput, AuthorStore};
pub use books::{Book, BookInput, BookStore};
pub use favorites::{Favorite, FavoriteStore};
pub use users::{NewUser, User, UserStore};

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;

use bookshelf_core::error::StoreError;

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub offset: u64,
    pub limit: u64,
    /// Case-insensitive substring match; which fields it covers depends on the store.
    pub search: Option<String>,
}

impl ListOptions {
    pub fn everything() -> Self {
        Self {
            offset: 0,
            limit: u64::MAX,
            search: None,
        }
    }

    fn needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    fn slice<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len() as u64;
        let items = items
            .into_iter()
            .skip(usize::try_from(self.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(self.limit).unwrap_or(usize::MAX))
            .collect();
        Page { items, total }
    }
}

/// One page of a listing plus the unpaged match count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

pub trait Record: Serialize + DeserializeOwned {
    /// Noun used in not-found errors.
    const KIND: &'static str;

    fn id(&self) -> &str;
}

pub(crate) struct RecordDir<T> {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Clone for RecordDir<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            write_lock: Arc::clone(&self.write_lock),
            _kind: PhantomData,
        }
    }
}

impl<T: Record> RecordDir<T> {
    pub(crate) fn open(root: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Arc::new(Mutex::new(())),
            _kind: PhantomData,
        })
    }

    /// Held across read-modify-write sequences.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn not_found(id: &str) -> StoreError {
        StoreError::NotFound(format!("{} {}", T::KIND, id))
    }

    /// Ids are UUIDs, which also keeps every path inside the store root.
    fn path_for(&self, id: &str) -> Result<PathBuf, StoreError> {
        let uuid = uuid::Uuid::parse_str(id).map_err(|_| Self::not_found(id))?;
        Ok(self.root.join(format!("{}.json", uuid.hyphenated())))
    }

    pub(crate) fn read(&self, id: &str) -> Result<T, StoreError> {
        let path = self.path_for(id)?;
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Self::not_found(id)),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data).map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))
    }

    pub(crate) fn write(&self, record: &T) -> Result<(), StoreError> {
        let path = self.path_for(record.id())?;
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(record).map_err(|e| StoreError::Corrupt(e.to_string()))?;
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub(crate) fn remove(&self, id: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(id)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Self::not_found(id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Every readable record; corrupt files are logged and skipped.
    pub(crate) fn scan(&self) -> Result<Vec<T>, StoreError> {
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.root)?.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed: Result<T, StoreError> = std::fs::read(&path)
                .map_err(StoreError::from)
                .and_then(|data| serde_json::from_slice(&data).map_err(|e| StoreError::Corrupt(e.to_string())));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(kind = T::KIND, path = %path.display(), error = %e, "skipping unreadable record"),
            }
        }
        Ok(records)
    }
}

/// All stores of one deployment, each in its own subdirectory.
#[derive(Clone)]
pub struct Stores {
    pub books: Arc<BookStore>,
    pub authors: Arc<AuthorStore>,
    pub users: Arc<UserStore>,
    pub favorites: Arc<FavoriteStore>,
}

impl Stores {
    pub fn open(data_path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            books: Arc::new(BookStore::open(data_path.join("books"))?),
            authors: Arc::new(AuthorStore::open(data_path.join("authors"))?),
            users: Arc::new(UserStore::open(data_path.join("users"))?),
            favorites: Arc::new(FavoriteStore::open(data_path.join("favorites"))?),
        })
    }
}

fn require(value: &str, what: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Invalid(format!("{} must not be empty", what)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Note {
        id: String,
        at: DateTime<Utc>,
    }

    impl Record for Note {
        const KIND: &'static str = "note";

        fn id(&self) -> &str {
            &self.id
        }
    }

    #[test]
    fn write_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let notes = RecordDir::<Note>::open(dir.path()).unwrap();
        let note = Note { id: uuid::Uuid::new_v4().to_string(), at: Utc::now() };

        notes.write(&note).unwrap();
        assert_eq!(notes.read(&note.id).unwrap(), note);
        assert_eq!(notes.scan().unwrap().len(), 1);
        assert!(!dir.path().join(format!("{}.json.tmp", note.id)).exists());

        notes.remove(&note.id).unwrap();
        match notes.read(&note.id) {
            Err(StoreError::NotFound(what)) => assert_eq!(what, format!("note {}", note.id)),
            other => panic!("expected not found, got {other:?}"),
        }
        assert!(matches!(notes.remove(&note.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn non_uuid_ids_never_touch_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let notes = RecordDir::<Note>::open(dir.path()).unwrap();
        assert!(matches!(notes.read("../etc/passwd"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn scan_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let notes = RecordDir::<Note>::open(dir.path()).unwrap();
        notes.write(&Note { id: uuid::Uuid::new_v4().to_string(), at: Utc::now() }).unwrap();
        std::fs::write(dir.path().join("junk.json"), b"{not json").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"ignored").unwrap();
        assert_eq!(notes.scan().unwrap().len(), 1);
    }

    #[test]
    fn slice_pages_and_counts() {
        let opts = ListOptions { offset: 2, limit: 2, search: None };
        let page = opts.slice((1..=5).collect());
        assert_eq!(page.items, vec![3, 4]);
        assert_eq!(page.total, 5);
        assert_eq!(ListOptions::everything().slice(vec![1, 2]).items.len(), 2);
    }

    #[test]
    fn blank_search_matches_everything() {
        let opts = ListOptions { search: Some("  ".into()), ..ListOptions::everything() };
        assert_eq!(opts.needle(), None);
        let opts = ListOptions { search: Some(" Dune ".into()), ..ListOptions::everything() };
        assert_eq!(opts.needle().as_deref(), Some("dune"));
    }
}
