//! Authentication and request gating
//!
//! This module provides cookie-carried JWT sessions with the following components:
//! - Token issuance and verification
//! - Password hashing with Argon2
//! - Credential verification against the user directory
//! - The session cookie carrier
//! - The request gate middleware
//! - An in-memory user directory

pub mod carrier;
pub mod credentials;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod repository;

pub use carrier::SessionCarrier;
pub use credentials::{CredentialError, CredentialVerifier};
pub use jwt::{
    Claims, IssuedToken, TokenError, TokenRejection, TokenService, TokenVerdict, VerifiedToken,
};
pub use middleware::{
    request_gate, AuthError, AuthenticatedUser, GateDecision, PathClass, RequestGate,
    NOT_AUTHENTICATED,
};
pub use password::{hash_password, hash_password_with_config, verify_password, PasswordConfig};
pub use repository::InMemoryDirectory;
