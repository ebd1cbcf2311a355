use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookshelf_core::error::StoreError;

use super::{ListOptions, Page, Record, RecordDir};

/// A (user, book) pair; unique per pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    pub user_id: String,
    pub book_id: String,
    pub created_at: DateTime<Utc>,
}

impl Record for Favorite {
    const KIND: &'static str = "favorite";

    fn id(&self) -> &str {
        &self.id
    }
}

pub struct FavoriteStore {
    dir: RecordDir<Favorite>,
}

impl FavoriteStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            dir: RecordDir::open(root.as_ref())?,
        })
    }

    /// Oldest first. `search` is ignored.
    pub fn list_for_user(&self, user_id: &str, opts: &ListOptions) -> Result<Page<Favorite>, StoreError> {
        let mut favorites: Vec<Favorite> = self.dir.scan()?.into_iter().filter(|f| f.user_id == user_id).collect();
        favorites.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(opts.slice(favorites))
    }

    /// Existence of the user and the book is the caller's concern.
    pub fn add(&self, user_id: &str, book_id: &str) -> Result<Favorite, StoreError> {
        let _guard = self.dir.lock();
        let duplicate = self
            .dir
            .scan()?
            .iter()
            .any(|f| f.user_id == user_id && f.book_id == book_id);
        if duplicate {
            return Err(StoreError::Conflict(format!("book {} is already a favorite", book_id)));
        }
        let favorite = Favorite {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            book_id: book_id.to_string(),
            created_at: Utc::now(),
        };
        self.dir.write(&favorite)?;
        Ok(favorite)
    }

    /// Remove a favorite only if it belongs to `user_id`. Returns whether anything was removed.
    pub fn remove(&self, user_id: &str, favorite_id: &str) -> Result<bool, StoreError> {
        let _guard = self.dir.lock();
        match self.dir.read(favorite_id) {
            Ok(f) if f.user_id == user_id => {
                self.dir.remove(favorite_id)?;
                Ok(true)
            }
            Ok(_) | Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Drop every favorite pointing at a deleted book.
    pub fn remove_for_book(&self, book_id: &str) -> Result<usize, StoreError> {
        let _guard = self.dir.lock();
        let mut removed = 0;
        for favorite in self.dir.scan()? {
            if favorite.book_id == book_id {
                self.dir.remove(&favorite.id)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    #[test]
    fn add_list_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoriteStore::open(dir.path()).unwrap();
        let (alice, bob, dune, hyperion) = (id(), id(), id(), id());

        let first = store.add(&alice, &dune).unwrap();
        store.add(&alice, &hyperion).unwrap();
        store.add(&bob, &dune).unwrap();

        let page = store.list_for_user(&alice, &ListOptions::everything()).unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.contains(&first));

        assert!(!store.remove(&bob, &first.id).unwrap());
        assert!(store.remove(&alice, &first.id).unwrap());
        assert!(!store.remove(&alice, &first.id).unwrap());
        assert_eq!(store.list_for_user(&alice, &ListOptions::everything()).unwrap().total, 1);
    }

    #[test]
    fn same_book_twice_is_a_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoriteStore::open(dir.path()).unwrap();
        let (alice, dune) = (id(), id());
        store.add(&alice, &dune).unwrap();
        assert!(matches!(store.add(&alice, &dune), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn deleting_a_book_clears_its_favorites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FavoriteStore::open(dir.path()).unwrap();
        let (alice, bob, dune) = (id(), id(), id());
        store.add(&alice, &dune).unwrap();
        store.add(&bob, &dune).unwrap();
        assert_eq!(store.remove_for_book(&dune).unwrap(), 2);
        assert_eq!(store.list_for_user(&alice, &ListOptions::everything()).unwrap().total, 0);
    }
}
