//! login-gate core - domain types, traits, and shared configuration
//!
//! This crate defines the abstractions shared by the login gate:
//! - The authenticated `Identity` bound into session tokens
//! - Credential records owned by the user directory
//! - The `UserDirectory` trait the gate consumes for lookups
//! - Configuration management

pub mod config;

pub use config::{AppConfig, AuthConfig, ConfigError, LoggingConfig, ServerConfig};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors reported by a user directory implementation
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Username already exists")]
    UsernameTaken,

    #[error("Email already exists")]
    EmailTaken,

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, DirectoryError>;

// ============================================================================
// Identity
// ============================================================================

/// The authenticated subject bound into a session token
///
/// Always taken from the directory record at verification time, never from
/// client input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Directory user id
    pub user_id: u64,
    /// Display username
    pub username: String,
}

impl Identity {
    pub fn new(user_id: u64, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.username, self.user_id)
    }
}

// ============================================================================
// Credential records
// ============================================================================

/// A user record as stored by the directory
///
/// `password_hash` holds a PHC-format Argon2id string; plaintext passwords
/// are never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// The identity this record authenticates as
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.username.clone())
    }
}

/// A record about to be inserted; the directory assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
}

// ============================================================================
// Directory trait
// ============================================================================

/// Narrow lookup interface onto the user directory
///
/// Username lookup is exact-match and case-sensitive. Implementations own
/// their consistency: `insert` must enforce username and email uniqueness
/// atomically.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find the credential record for a username
    async fn find_by_username(&self, username: &str) -> Result<Option<CredentialRecord>>;

    /// Find a record by id
    async fn find_by_id(&self, id: u64) -> Result<Option<CredentialRecord>>;

    /// Check whether a username is taken
    async fn exists_by_username(&self, username: &str) -> Result<bool>;

    /// Check whether an email is taken
    async fn exists_by_email(&self, email: &str) -> Result<bool>;

    /// Insert a new record, returning it with id and timestamps assigned
    async fn insert(&self, credential: NewCredential) -> Result<CredentialRecord>;
}
