//! Credential verification
//!
//! Checks a username/password pair against the directory. Unknown users and
//! wrong passwords collapse into the same `Unauthenticated` outcome, and both
//! paths pay for one Argon2 verification so response timing does not reveal
//! which usernames exist.

use super::password::{hash_password_with_config, verify_password, PasswordConfig, PasswordError};
use login_gate_core::{CredentialRecord, DirectoryError, Identity, UserDirectory};
use std::sync::Arc;
use thiserror::Error;

const DUMMY_PASSWORD: &str = "login-gate-dummy-password";

/// Credential verification errors
#[derive(Debug, Error)]
pub enum CredentialError {
    /// Unknown username or wrong password
    #[error("Invalid username or password")]
    Unauthenticated,

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Password verification task failed: {0}")]
    Internal(String),
}

/// Verifies presented credentials against the user directory
#[derive(Clone)]
pub struct CredentialVerifier {
    directory: Arc<dyn UserDirectory>,
    password_config: PasswordConfig,
    dummy_hash: Arc<str>,
}

impl CredentialVerifier {
    /// Create a verifier; hashes the timing-equalisation dummy once up front
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        password_config: PasswordConfig,
    ) -> Result<Self, PasswordError> {
        let dummy_hash = hash_password_with_config(DUMMY_PASSWORD, &password_config)?;
        Ok(Self {
            directory,
            password_config,
            dummy_hash: dummy_hash.into(),
        })
    }

    /// Parameters used for newly stored hashes
    pub fn password_config(&self) -> &PasswordConfig {
        &self.password_config
    }

    /// Verify credentials and return the bound identity
    pub async fn verify(&self, username: &str, password: &str) -> Result<Identity, CredentialError> {
        self.authenticate(username, password)
            .await
            .map(|record| record.identity())
    }

    /// Verify credentials and return the full directory record
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<CredentialRecord, CredentialError> {
        let record = self.directory.find_by_username(username).await?;

        let hash = match &record {
            Some(record) => record.password_hash.clone(),
            None => self.dummy_hash.to_string(),
        };

        let matched = check_password(password.to_string(), hash).await?;

        match record {
            Some(record) if matched => Ok(record),
            Some(record) => {
                tracing::debug!(user_id = record.id, "password mismatch");
                Err(CredentialError::Unauthenticated)
            }
            None => {
                tracing::debug!("unknown username");
                Err(CredentialError::Unauthenticated)
            }
        }
    }
}

/// Argon2 is CPU-bound; keep it off the async worker threads.
async fn check_password(password: String, hash: String) -> Result<bool, CredentialError> {
    let outcome = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| CredentialError::Internal(e.to_string()))?;

    match outcome {
        Ok(matched) => Ok(matched),
        Err(e) => {
            // An unusable stored hash can never authenticate anyone.
            tracing::warn!(error = %e, "stored password hash rejected");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::InMemoryDirectory;
    use async_trait::async_trait;
    use login_gate_core::NewCredential;

    async fn directory_with(users: &[(&str, &str)]) -> Arc<InMemoryDirectory> {
        let directory = Arc::new(InMemoryDirectory::new());
        for (username, password) in users {
            let hash = hash_password_with_config(password, &PasswordConfig::for_testing()).unwrap();
            directory
                .insert(NewCredential {
                    username: username.to_string(),
                    password_hash: hash,
                    email: None,
                })
                .await
                .unwrap();
        }
        directory
    }

    fn verifier(directory: Arc<dyn UserDirectory>) -> CredentialVerifier {
        CredentialVerifier::new(directory, PasswordConfig::for_testing()).unwrap()
    }

    #[tokio::test]
    async fn test_correct_password() {
        let directory = directory_with(&[("alice", "secret1")]).await;
        let verifier = verifier(directory);

        let identity = verifier.verify("alice", "secret1").await.unwrap();
        assert_eq!(identity.username, "alice");
        assert_eq!(identity.user_id, 1);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_are_indistinguishable() {
        let directory = directory_with(&[("alice", "secret1")]).await;
        let verifier = verifier(directory);

        let wrong = verifier.verify("alice", "wrong").await.unwrap_err();
        let unknown = verifier.verify("mallory", "secret1").await.unwrap_err();

        assert!(matches!(wrong, CredentialError::Unauthenticated));
        assert!(matches!(unknown, CredentialError::Unauthenticated));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn test_username_is_case_sensitive() {
        let directory = directory_with(&[("alice", "secret1")]).await;
        let verifier = verifier(directory);

        assert!(matches!(
            verifier.verify("Alice", "secret1").await,
            Err(CredentialError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_plaintext_stored_password_never_matches() {
        let directory = Arc::new(InMemoryDirectory::new());
        directory
            .insert(NewCredential {
                username: "legacy".to_string(),
                password_hash: "secret1".to_string(),
                email: None,
            })
            .await
            .unwrap();
        let verifier = verifier(directory);

        assert!(matches!(
            verifier.verify("legacy", "secret1").await,
            Err(CredentialError::Unauthenticated)
        ));
    }

    struct BrokenDirectory;

    #[async_trait]
    impl UserDirectory for BrokenDirectory {
        async fn find_by_username(
            &self,
            _username: &str,
        ) -> Result<Option<CredentialRecord>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }

        async fn find_by_id(&self, _id: u64) -> Result<Option<CredentialRecord>, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }

        async fn exists_by_username(&self, _username: &str) -> Result<bool, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }

        async fn exists_by_email(&self, _email: &str) -> Result<bool, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }

        async fn insert(
            &self,
            _credential: NewCredential,
        ) -> Result<CredentialRecord, DirectoryError> {
            Err(DirectoryError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_directory_failure_is_not_unauthenticated() {
        let verifier = verifier(Arc::new(BrokenDirectory));

        assert!(matches!(
            verifier.verify("alice", "secret1").await,
            Err(CredentialError::Directory(DirectoryError::Unavailable(_)))
        ));
    }
}
