//! Application state management

use crate::auth::{
    password::PasswordError, CredentialVerifier, PasswordConfig, RequestGate, SessionCarrier,
    TokenService,
};
use login_gate_core::{AppConfig, ConfigError, UserDirectory};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

/// Errors that prevent the service from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Password hasher setup failed: {0}")]
    Password(#[from] PasswordError),
}

/// Application state shared across handlers
///
/// Built once at startup from an immutable `AppConfig`.
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Token issuance and verification
    pub tokens: TokenService,
    /// Session cookie handling
    pub carrier: SessionCarrier,
    /// Request gate
    pub gate: RequestGate,
    /// Credential verification
    pub verifier: CredentialVerifier,
    /// User directory
    pub directory: Arc<dyn UserDirectory>,
}

impl AppState {
    /// Create application state with production password parameters
    pub fn new(config: AppConfig, directory: Arc<dyn UserDirectory>) -> Result<Self, StartupError> {
        Self::with_password_config(config, directory, PasswordConfig::default())
    }

    /// Create application state with explicit password parameters
    pub fn with_password_config(
        config: AppConfig,
        directory: Arc<dyn UserDirectory>,
        password_config: PasswordConfig,
    ) -> Result<Self, StartupError> {
        config.validate()?;

        let tokens = TokenService::new(&config.auth)?;
        let carrier = SessionCarrier::new(&config.auth);
        let gate = RequestGate::new(&config.auth, tokens.clone());
        let verifier = CredentialVerifier::new(directory.clone(), password_config)?;

        Ok(Self {
            config,
            start_time: Instant::now(),
            tokens,
            carrier,
            gate,
            verifier,
            directory,
        })
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
