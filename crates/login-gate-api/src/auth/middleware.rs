/// Request gate middleware
///
/// Classifies every request path, reads the session cookie for protected
/// paths, verifies it, and either admits the request with an
/// `AuthenticatedUser` in its extensions or rejects it with one uniform 401.
///
/// Requests outside the base route are not governed by the gate at all.
use super::carrier::SessionCarrier;
use super::jwt::{TokenRejection, TokenService, TokenVerdict, VerifiedToken};
use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use login_gate_core::AuthConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Message returned for every gate rejection
pub const NOT_AUTHENTICATED: &str = "Not authenticated or session expired";

/// Authenticated user information extracted from the session token
///
/// Added to request extensions by the gate; handlers read it with
/// `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    /// Directory user id
    pub user_id: u64,
    /// Username bound into the token
    pub username: String,
    /// JWT ID, for audit correlation
    pub jti: String,
}

impl From<VerifiedToken> for AuthenticatedUser {
    fn from(verified: VerifiedToken) -> Self {
        Self {
            user_id: verified.identity.user_id,
            username: verified.identity.username,
            jti: verified.jti,
        }
    }
}

/// Gate rejection
///
/// The reason is kept for audit logging; the response never varies with it.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Request not authenticated: {0}")]
    NotAuthenticated(TokenRejection),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": NOT_AUTHENTICATED });
        (StatusCode::UNAUTHORIZED, axum::Json(body)).into_response()
    }
}

/// How the gate treats a request path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Outside the base route; not governed by the gate
    OutOfScope,
    /// On the public allow-list
    Public,
    /// Everything else under the base route
    Protected,
}

/// Per-request admission decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Outside the gate's namespace
    Bypass,
    /// Public path, admitted without looking at any token
    AdmitPublic,
    /// Token verified
    Admit(AuthenticatedUser),
    /// Protected path without a valid token
    Reject(TokenRejection),
}

struct GateInner {
    base_path: String,
    public_paths: Vec<String>,
    public_aliases: Vec<String>,
    carrier: SessionCarrier,
    tokens: TokenService,
}

/// The request gate
///
/// Stateless across requests; holds only read-only configuration and the
/// token service.
#[derive(Clone)]
pub struct RequestGate {
    inner: Arc<GateInner>,
}

impl RequestGate {
    pub fn new(config: &AuthConfig, tokens: TokenService) -> Self {
        let base_path = config.base_path.trim_end_matches('/').to_string();
        let public_paths = config
            .public_paths
            .iter()
            .map(|p| format!("{}/{}", base_path, p.trim_matches('/')))
            .collect();

        Self {
            inner: Arc::new(GateInner {
                base_path,
                public_paths,
                public_aliases: config.public_aliases.clone(),
                carrier: SessionCarrier::new(config),
                tokens,
            }),
        }
    }

    /// Classify a request path
    pub fn classify(&self, path: &str) -> PathClass {
        let inner = &self.inner;

        let in_scope = inner.base_path.is_empty()
            || path == inner.base_path
            || path
                .strip_prefix(inner.base_path.as_str())
                .is_some_and(|rest| rest.starts_with('/'));
        if !in_scope {
            return PathClass::OutOfScope;
        }

        let public = inner.public_paths.iter().any(|p| {
            path == p
                || path
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        }) || inner.public_aliases.iter().any(|alias| path == alias);

        if public {
            PathClass::Public
        } else {
            PathClass::Protected
        }
    }

    /// Decide whether a request is admitted
    pub fn decide(&self, path: &str, headers: &HeaderMap) -> GateDecision {
        match self.classify(path) {
            PathClass::OutOfScope => GateDecision::Bypass,
            PathClass::Public => GateDecision::AdmitPublic,
            PathClass::Protected => {
                let token = self.inner.carrier.extract(headers);
                match self.inner.tokens.verify(&token) {
                    TokenVerdict::Valid(verified) => GateDecision::Admit(verified.into()),
                    TokenVerdict::Invalid(reason) => GateDecision::Reject(reason),
                }
            }
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.inner.tokens
    }
}

/// Gate middleware
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, middleware};
/// use login_gate_api::auth::middleware::{request_gate, RequestGate};
///
/// let app = Router::new()
///     .nest("/api", api_routes)
///     .layer(middleware::from_fn_with_state(gate, request_gate));
/// ```
pub async fn request_gate(
    State(gate): State<RequestGate>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request.uri().path().to_string();

    match gate.decide(&path, request.headers()) {
        GateDecision::Bypass | GateDecision::AdmitPublic => Ok(next.run(request).await),
        GateDecision::Admit(user) => {
            tracing::debug!(user_id = user.user_id, path = %path, "request admitted");
            request.extensions_mut().insert(user);
            Ok(next.run(request).await)
        }
        GateDecision::Reject(reason) => {
            audit_log(&AuditEvent::InvalidToken {
                path,
                reason: reason.to_string(),
                ip_address: extract_ip_address(request.headers()),
                user_agent: extract_user_agent(request.headers()),
            });
            Err(AuthError::NotAuthenticated(reason))
        }
    }
}
