use std::path::Path;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bookshelf_core::error::StoreError;

use super::{require, Record, RecordDir};

/// A user as the API sees it. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    #[serde(flatten)]
    user: User,
    password_hash: String,
}

impl Record for StoredUser {
    const KIND: &'static str = "user";

    fn id(&self) -> &str {
        &self.user.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    pub password: String,
    #[serde(alias = "password_confirmation")]
    pub password_confirmation: String,
    pub name: Option<String>,
}

pub struct UserStore {
    dir: RecordDir<StoredUser>,
}

impl UserStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self {
            dir: RecordDir::open(root.as_ref())?,
        })
    }

    pub fn get(&self, id: &str) -> Result<User, StoreError> {
        Ok(self.dir.read(id)?.user)
    }

    /// Emails compare case-insensitively.
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let wanted = email.trim().to_lowercase();
        Ok(self
            .dir
            .scan()?
            .into_iter()
            .map(|stored| stored.user)
            .find(|u| u.email.to_lowercase() == wanted))
    }

    /// Validate, hash the password with Argon2 and persist. Hashing is CPU-bound; call from a blocking context.
    pub fn create(&self, input: NewUser) -> Result<User, StoreError> {
        let email = input.email.trim().to_string();
        validate_email(&email)?;
        require(&input.password, "password")?;
        if input.password != input.password_confirmation {
            return Err(StoreError::Invalid("passwords do not match".to_string()));
        }
        let password_hash = hash_password(&input.password)?;

        let _guard = self.dir.lock();
        if self.find_by_email(&email)?.is_some() {
            return Err(StoreError::Conflict(format!("user {} already exists", email)));
        }
        let now = Utc::now();
        let stored = StoredUser {
            user: User {
                id: uuid::Uuid::new_v4().to_string(),
                email,
                name: input.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
                created_at: now,
                updated_at: now,
            },
            password_hash,
        };
        self.dir.write(&stored)?;
        Ok(stored.user)
    }
}

fn validate_email(email: &str) -> Result<(), StoreError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.contains('@') && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(StoreError::Invalid(format!("{:?} is not an email address", email)));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, StoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StoreError::Backend(format!("failed to hash password: {}", e)))
}
