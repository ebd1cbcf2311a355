use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookshelf_core::error::StoreError;

use super::{require, ListOptions, Page, Record, RecordDir};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: String,
    pub name: String,
    pub bio: String,
    pub birth_year: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Author {
    const KIND: &'static str = "author";

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInput {
    pub name: String,
    #[serde(default)]
    pub bio: String,
    pub birth_year: Option<i32>,
}

pub struct AuthorStore {
    dir: RecordDir<Author>,
}

impl AuthorStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            dir: RecordDir::open(root.as_ref())?,
        })
    }

    /// Sorted by name; `search` matches name or bio.
    pub fn list(&self, opts: &ListOptions) -> Result<Page<Author>, StoreError> {
        let needle = opts.needle();
        let mut authors: Vec<Author> = self
            .dir
            .scan()?
            .into_iter()
            .filter(|a| match &needle {
                Some(q) => a.name.to_lowercase().contains(q) || a.bio.to_lowercase().contains(q),
                None => true,
            })
            .collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(opts.slice(authors))
    }

    pub fn get(&self, id: &str) -> Result<Author, StoreError> {
        self.dir.read(id)
    }

    pub fn create(&self, input: AuthorInput) -> Result<Author, StoreError> {
        require(&input.name, "name")?;
        let now = Utc::now();
        let author = Author {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            bio: input.bio,
            birth_year: input.birth_year,
            created_at: now,
            updated_at: now,
        };
        let _guard = self.dir.lock();
        self.dir.write(&author)?;
        Ok(author)
    }

    pub fn update(&self, id: &str, input: AuthorInput) -> Result<Author, StoreError> {
        require(&input.name, "name")?;
        let _guard = self.dir.lock();
        let mut author = self.dir.read(id)?;
        author.name = input.name.trim().to_string();
        author.bio = input.bio;
        author.birth_year = input.birth_year;
        author.updated_at = Utc::now();
        self.dir.write(&author)?;
        Ok(author)
    }

    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let _guard = self.dir.lock();
        self.dir.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author(name: &str, bio: &str) -> AuthorInput {
        AuthorInput {
            name: name.to_string(),
            bio: bio.to_string(),
            birth_year: None,
        }
    }

    #[test]
    fn crud() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthorStore::open(dir.path()).unwrap();
        let herbert = store.create(AuthorInput { birth_year: Some(1920), ..author("Frank Herbert", "") }).unwrap();
        assert_eq!(store.get(&herbert.id).unwrap(), herbert);

        let updated = store.update(&herbert.id, author("Frank Herbert", "Dune")).unwrap();
        assert_eq!(updated.bio, "Dune");
        assert_eq!(updated.birth_year, None);
        assert_eq!(updated.created_at, herbert.created_at);

        store.delete(&herbert.id).unwrap();
        assert!(matches!(store.get(&herbert.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn list_searches_name_and_bio() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthorStore::open(dir.path()).unwrap();
        store.create(author("William Gibson", "cyberpunk")).unwrap();
        store.create(author("Dan Simmons", "Hyperion cantos")).unwrap();
        store.create(author("Frank Herbert", "wrote about the desert")).unwrap();

        let all = store.list(&ListOptions::everything()).unwrap();
        let names: Vec<_> = all.items.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Dan Simmons", "Frank Herbert", "William Gibson"]);

        let hits = store.list(&ListOptions { search: Some("CYBER".into()), ..ListOptions::everything() }).unwrap();
        assert_eq!(hits.total, 1);
        assert_eq!(hits.items[0].name, "William Gibson");
    }

    #[test]
    fn blank_name_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = AuthorStore::open(dir.path()).unwrap();
        assert!(matches!(store.create(author(" ", "")), Err(StoreError::Invalid(_))));
    }
}
