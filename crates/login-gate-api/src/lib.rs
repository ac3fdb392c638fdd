//! login-gate API - credential verification, session tokens and the request gate
//!
//! Provides the HTTP surface around the gate: login, logout, registration
//! and profile lookup, all mounted under a configurable base route that the
//! gate middleware protects.

pub mod audit;
pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;

pub use routes::create_router;
pub use state::{AppState, StartupError};
