//! In-memory user directory
//!
//! Implements `UserDirectory` over a lock-protected map. Suitable for
//! single-instance deployments and tests; a database-backed directory plugs
//! in through the same trait.

use async_trait::async_trait;
use chrono::Utc;
use login_gate_core::{CredentialRecord, DirectoryError, NewCredential, UserDirectory};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    next_id: u64,
    by_id: HashMap<u64, CredentialRecord>,
    id_by_username: HashMap<String, u64>,
    id_by_email: HashMap<String, u64>,
}

/// User directory held in process memory
#[derive(Default)]
pub struct InMemoryDirectory {
    inner: RwLock<Inner>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.inner.read().await.by_id.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserDirectory for InMemoryDirectory {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<CredentialRecord>, DirectoryError> {
        let inner = self.inner.read().await;
        Ok(inner
            .id_by_username
            .get(username)
            .and_then(|id| inner.by_id.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: u64) -> Result<Option<CredentialRecord>, DirectoryError> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool, DirectoryError> {
        Ok(self.inner.read().await.id_by_username.contains_key(username))
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, DirectoryError> {
        Ok(self.inner.read().await.id_by_email.contains_key(email))
    }

    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord, DirectoryError> {
        // Uniqueness is checked and claimed under one write lock.
        let mut inner = self.inner.write().await;

        if inner.id_by_username.contains_key(&credential.username) {
            return Err(DirectoryError::UsernameTaken);
        }
        if let Some(email) = &credential.email {
            if inner.id_by_email.contains_key(email) {
                return Err(DirectoryError::EmailTaken);
            }
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let now = Utc::now();
        let record = CredentialRecord {
            id,
            username: credential.username,
            password_hash: credential.password_hash,
            email: credential.email,
            created_at: now,
            updated_at: now,
        };

        inner.id_by_username.insert(record.username.clone(), id);
        if let Some(email) = &record.email {
            inner.id_by_email.insert(email.clone(), id);
        }
        inner.by_id.insert(id, record.clone());

        Ok(record)
    }
}
