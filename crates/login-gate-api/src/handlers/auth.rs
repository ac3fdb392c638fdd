//! Authentication API handlers
//!
//! Login issues a session token and hands it to the cookie carrier; logout
//! tells the client to drop the cookie; registration adds a directory record
//! with an Argon2id password hash.

use crate::audit::{audit_log, extract_ip_address, extract_user_agent, AuditEvent};
use crate::auth::{hash_password_with_config, CredentialError, TokenVerdict};
use crate::error::AppError;
use crate::extract::ValidatedJson;
use crate::models::{LoginRequest, MessageResponse, RegisterRequest, UserProfile, UserResponse};
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use login_gate_core::{DirectoryError, NewCredential};
use std::sync::Arc;

/// Login with username and password
///
/// On success the response sets the session cookie and returns the user's
/// public profile. Every failure returns the same 401 body and sets no cookie.
#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful, session cookie set", body = UserResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);
    let user_agent = extract_user_agent(&headers);

    let record = match state
        .verifier
        .authenticate(&request.username, &request.password)
        .await
    {
        Ok(record) => record,
        Err(e) => {
            let reason = match &e {
                CredentialError::Unauthenticated => "invalid credentials".to_string(),
                other => other.to_string(),
            };
            audit_log(&AuditEvent::LoginFailure {
                username: request.username,
                reason,
                ip_address,
                user_agent,
            });
            return Err(e.into());
        }
    };

    let issued = state
        .tokens
        .issue(&record.identity())
        .map_err(|e| AppError::Internal(format!("Failed to issue token: {e}")))?;
    let cookie = state
        .carrier
        .hold(&issued.token, issued.expires_in_secs)
        .map_err(|e| AppError::Internal(format!("Failed to build session cookie: {e}")))?;

    audit_log(&AuditEvent::LoginSuccess {
        user_id: record.id,
        username: record.username.clone(),
        token_id: issued.jti,
        ip_address,
        user_agent,
    });

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(UserResponse {
            message: "Login successful".to_string(),
            user: UserProfile::from(record),
        }),
    ))
}

/// Logout
///
/// Tells the client to discard the session cookie. Always succeeds. The
/// token itself stays valid until it expires; any other copy of it is still
/// honoured by the gate.
#[utoipa::path(
    post,
    path = "/api/login/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Session cookie cleared", body = MessageResponse),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    // Identify the caller for the audit trail only; logout never fails.
    let user_id = match state.tokens.verify(&state.carrier.extract(&headers)) {
        TokenVerdict::Valid(verified) => Some(verified.identity.user_id),
        TokenVerdict::Invalid(_) => None,
    };
    audit_log(&AuditEvent::Logout {
        user_id,
        ip_address: extract_ip_address(&headers),
    });

    let cookie = state
        .carrier
        .discard()
        .map_err(|e| AppError::Internal(format!("Failed to build session cookie: {e}")))?;

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse {
            message: "Logout successful".to_string(),
        }),
    ))
}

/// Register a new user
///
/// Usernames and emails must be unique. The password is stored only as an
/// Argon2id hash.
#[utoipa::path(
    post,
    path = "/api/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = UserResponse),
        (status = 400, description = "Invalid input or duplicate username/email", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ip_address = extract_ip_address(&headers);

    match register(&state, request.clone()).await {
        Ok(profile) => {
            audit_log(&AuditEvent::RegistrationSuccess {
                user_id: profile.id,
                username: profile.username.clone(),
                ip_address,
            });
            Ok((
                StatusCode::CREATED,
                Json(UserResponse {
                    message: "Registration successful".to_string(),
                    user: profile,
                }),
            ))
        }
        Err(e) => {
            let reason = match &e {
                AppError::BadRequest(msg) => msg.clone(),
                _ => "internal error".to_string(),
            };
            audit_log(&AuditEvent::RegistrationFailure {
                username: request.username,
                reason,
                ip_address,
            });
            Err(e)
        }
    }
}

async fn register(state: &AppState, request: RegisterRequest) -> Result<UserProfile, AppError> {
    let directory = &state.directory;

    // Cheap pre-checks; `insert` re-checks atomically.
    if directory.exists_by_username(&request.username).await? {
        return Err(DirectoryError::UsernameTaken.into());
    }
    if let Some(email) = &request.email {
        if directory.exists_by_email(email).await? {
            return Err(DirectoryError::EmailTaken.into());
        }
    }

    let password_config = state.verifier.password_config().clone();
    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || {
        hash_password_with_config(&password, &password_config)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))?
    .map_err(|e| AppError::Internal(e.to_string()))?;

    let record = directory
        .insert(NewCredential {
            username: request.username,
            password_hash,
            email: request.email,
        })
        .await?;

    Ok(UserProfile::from(record))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response_serialization() {
        let json = serde_json::to_value(MessageResponse {
            message: "Logout successful".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "message": "Logout successful" }));
    }
}
