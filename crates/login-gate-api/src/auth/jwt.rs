//! JWT session token issuance and verification
//!
//! Implements stateless bearer tokens signed with HMAC-SHA256. A token is
//! honoured if and only if its signature verifies under the process key and
//! the current time is strictly before its `exp` claim.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use login_gate_core::{AuthConfig, ConfigError, Identity};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

/// JWT claims carried by a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - username
    pub sub: String,
    /// JWT ID, used only to correlate audit records
    pub jti: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
    /// Directory user id
    pub user_id: u64,
    /// Username at issue time
    pub username: String,
}

/// Token issuance errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// Why a presented token was not honoured
///
/// Kept for diagnostics and audit only; clients always see the same response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenRejection {
    /// No token, or a blank one
    Missing,
    /// Bad signature, wrong key or issuer, or unparseable structure
    Malformed,
    /// Signature fine but `now >= exp`
    Expired,
}

impl TokenRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenRejection::Missing => "missing",
            TokenRejection::Malformed => "malformed-or-tampered",
            TokenRejection::Expired => "expired",
        }
    }
}

impl std::fmt::Display for TokenRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying a raw token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenVerdict {
    Valid(VerifiedToken),
    Invalid(TokenRejection),
}

/// Identity extracted from a verified token, with its audit id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub identity: Identity,
    pub jti: String,
    pub exp: u64,
}

/// A freshly signed token together with its lifetime
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Compact serialized JWT
    pub token: String,
    /// Lifetime in seconds, also used for the carrier's Max-Age
    pub expires_in_secs: u64,
    /// JWT ID for audit correlation
    pub jti: String,
}

struct Keys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

/// Token service bound to the process signing key
///
/// Cheap to clone; the key material is shared and never mutated.
#[derive(Clone)]
pub struct TokenService {
    keys: Arc<Keys>,
    issuer: String,
    lifetime_secs: u64,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    /// Build the service from validated auth configuration
    ///
    /// Fails if the secret is missing or too short, or the lifetime is zero.
    pub fn new(config: &AuthConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let secret = config.jwt_secret.as_bytes();
        Ok(Self {
            keys: Arc::new(Keys {
                encoding: EncodingKey::from_secret(secret),
                decoding: DecodingKey::from_secret(secret),
            }),
            issuer: config.issuer.clone(),
            lifetime_secs: config.token_lifetime_secs,
        })
    }

    /// Configured token lifetime in seconds
    pub fn lifetime_secs(&self) -> u64 {
        self.lifetime_secs
    }

    /// Issue a token for `identity`, valid from now for the configured lifetime
    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenError> {
        self.issue_at(identity, unix_now()?)
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(&self, identity: &Identity, now: u64) -> Result<IssuedToken, TokenError> {
        let jti = Uuid::new_v4().to_string();
        let claims = Claims {
            iss: self.issuer.clone(),
            sub: identity.username.clone(),
            jti: jti.clone(),
            iat: now,
            exp: now.saturating_add(self.lifetime_secs),
            user_id: identity.user_id,
            username: identity.username.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.keys.encoding)?;

        Ok(IssuedToken {
            token,
            expires_in_secs: self.lifetime_secs,
            jti,
        })
    }

    /// Verify a raw token against the current time
    pub fn verify(&self, raw: &str) -> TokenVerdict {
        match unix_now() {
            Ok(now) => self.verify_at(raw, now),
            // A clock before the epoch cannot prove anything unexpired.
            Err(_) => TokenVerdict::Invalid(TokenRejection::Expired),
        }
    }

    /// Verify a raw token as if the current time were `now`
    ///
    /// Every parse or signature fault collapses into `Malformed`; expiry is
    /// only reported for tokens whose signature checked out.
    pub fn verify_at(&self, raw: &str, now: u64) -> TokenVerdict {
        let raw = raw.trim();
        if raw.is_empty() {
            return TokenVerdict::Invalid(TokenRejection::Missing);
        }

        // Expiry is checked below against `now` with no leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = match decode::<Claims>(raw, &self.keys.decoding, &validation) {
            Ok(data) => data.claims,
            Err(_) => return TokenVerdict::Invalid(TokenRejection::Malformed),
        };

        if now >= claims.exp {
            return TokenVerdict::Invalid(TokenRejection::Expired);
        }

        TokenVerdict::Valid(VerifiedToken {
            identity: Identity::new(claims.user_id, claims.username),
            jti: claims.jti,
            exp: claims.exp,
        })
    }
}

fn unix_now() -> Result<u64, std::time::SystemTimeError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "test-secret-key-that-is-long-enough-for-hs256";

    fn config_with(secret: &str, lifetime: u64) -> AuthConfig {
        AuthConfig {
            jwt_secret: secret.to_string(),
            token_lifetime_secs: lifetime,
            ..Default::default()
        }
    }

    fn service() -> TokenService {
        TokenService::new(&config_with(SECRET, 1800)).expect("valid config")
    }

    fn assert_valid(verdict: TokenVerdict, expected: &Identity) {
        match verdict {
            TokenVerdict::Valid(verified) => assert_eq!(&verified.identity, expected),
            other => panic!("expected valid token, got {other:?}"),
        }
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let service = service();
        let identity = Identity::new(42, "alice");

        let issued = service.issue(&identity).expect("Failed to issue token");
        assert_eq!(issued.expires_in_secs, 1800);

        match service.verify(&issued.token) {
            TokenVerdict::Valid(verified) => {
                assert_eq!(verified.identity, identity);
                assert_eq!(verified.jti, issued.jti);
            }
            other => panic!("expected valid token, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_token_is_missing() {
        let service = service();
        for raw in ["", "   ", "\t\n"] {
            assert_eq!(
                service.verify(raw),
                TokenVerdict::Invalid(TokenRejection::Missing)
            );
        }
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let service = service();
        for raw in ["invalid.token.here", "not-a-jwt", "a.b", "...."] {
            assert_eq!(
                service.verify(raw),
                TokenVerdict::Invalid(TokenRejection::Malformed)
            );
        }
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = TokenService::new(&config_with(SECRET, 1800)).unwrap();
        let service2 =
            TokenService::new(&config_with("another-secret-key-also-long-enough-x", 1800))
                .unwrap();

        let issued = service1.issue(&Identity::new(1, "alice")).unwrap();

        assert_eq!(
            service2.verify(&issued.token),
            TokenVerdict::Invalid(TokenRejection::Malformed)
        );
    }

    #[test]
    fn test_wrong_issuer() {
        let service1 = service();
        let service2 = TokenService::new(&AuthConfig {
            issuer: "someone-else".to_string(),
            ..config_with(SECRET, 1800)
        })
        .unwrap();

        let issued = service2.issue(&Identity::new(1, "alice")).unwrap();
        assert_eq!(
            service1.verify(&issued.token),
            TokenVerdict::Invalid(TokenRejection::Malformed)
        );
    }

    #[test]
    fn test_expiry_boundary() {
        let service = TokenService::new(&config_with(SECRET, 60)).unwrap();
        let identity = Identity::new(7, "bob");
        let issued_at = 1_700_000_000;

        let issued = service.issue_at(&identity, issued_at).unwrap();

        assert_valid(service.verify_at(&issued.token, issued_at), &identity);
        assert_valid(service.verify_at(&issued.token, issued_at + 59), &identity);
        assert_eq!(
            service.verify_at(&issued.token, issued_at + 60),
            TokenVerdict::Invalid(TokenRejection::Expired)
        );
        assert_eq!(
            service.verify_at(&issued.token, issued_at + 61),
            TokenVerdict::Invalid(TokenRejection::Expired)
        );
    }

    #[test]
    fn test_expired_token_from_real_clock() {
        let service = service();
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();

        // Issued two hours ago with a 30 minute lifetime
        let issued = service
            .issue_at(&Identity::new(7, "bob"), now - 7200)
            .unwrap();

        assert_eq!(
            service.verify(&issued.token),
            TokenVerdict::Invalid(TokenRejection::Expired)
        );
    }

    #[test]
    fn test_non_numeric_user_id_is_malformed() {
        let service = service();
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();

        let claims = serde_json::json!({
            "iss": "login-gate",
            "sub": "alice",
            "jti": "x",
            "iat": now,
            "exp": now + 600,
            "user_id": "forty-two",
            "username": "alice",
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            service.verify(&token),
            TokenVerdict::Invalid(TokenRejection::Malformed)
        );
    }

    #[test]
    fn test_missing_user_id_is_malformed() {
        let service = service();
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();

        let claims = serde_json::json!({
            "iss": "login-gate",
            "sub": "alice",
            "jti": "x",
            "iat": now,
            "exp": now + 600,
            "username": "alice",
        });
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            service.verify(&token),
            TokenVerdict::Invalid(TokenRejection::Malformed)
        );
    }

    #[test]
    fn test_other_algorithms_rejected() {
        let service = service();
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs();
        let claims = Claims {
            iss: "login-gate".to_string(),
            sub: "alice".to_string(),
            jti: "x".to_string(),
            iat: now,
            exp: now + 600,
            user_id: 1,
            username: "alice".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        assert_eq!(
            service.verify(&token),
            TokenVerdict::Invalid(TokenRejection::Malformed)
        );
    }

    #[test]
    fn test_rejects_bad_config() {
        assert!(TokenService::new(&config_with("", 1800)).is_err());
        assert!(TokenService::new(&config_with("short", 1800)).is_err());
        assert!(TokenService::new(&config_with(SECRET, 0)).is_err());
    }

    #[test]
    fn test_debug_hides_keys() {
        let printed = format!("{:?}", service());
        assert!(!printed.contains(SECRET));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_byte_flip_never_yields_other_identity(pos in any::<prop::sample::Index>(), bit in 0u8..8) {
            let service = service();
            let identity = Identity::new(42, "alice");
            let issued = service.issue(&identity).unwrap();

            let mut bytes = issued.token.clone().into_bytes();
            let i = pos.index(bytes.len());
            bytes[i] ^= 1 << bit;

            match String::from_utf8(bytes) {
                Ok(tampered) => match service.verify(&tampered) {
                    TokenVerdict::Valid(verified) => {
                        // Base64 padding bits can absorb a flip in the final
                        // signature character; the claims must still be ours.
                        prop_assert_eq!(verified.identity, identity);
                    }
                    TokenVerdict::Invalid(reason) => {
                        prop_assert_eq!(reason, TokenRejection::Malformed);
                    }
                },
                Err(_) => {}
            }
        }
    }
}
