//! Session carrier: the cookie that transports the session token
//!
//! On login the client is told to hold the token in an HttpOnly,
//! SameSite=Lax cookie scoped to the gate's base path, with Max-Age equal to
//! the token lifetime. On logout the same cookie is overwritten with
//! Max-Age=0. Discarding the cookie does not invalidate other copies of the
//! token; the scheme is stateless.

use axum::http::{
    header::{self, InvalidHeaderValue},
    HeaderMap, HeaderValue,
};
use login_gate_core::AuthConfig;

/// Cookie settings derived from the auth configuration
#[derive(Debug, Clone)]
pub struct SessionCarrier {
    name: String,
    path: String,
    secure: bool,
}

impl SessionCarrier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            path: config.base_path.clone(),
            secure: config.cookie_secure,
        }
    }

    /// Cookie name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read the token from the request cookies
    ///
    /// Returns an empty string when no cookie header or no entry with the
    /// configured name is present; the caller's verification reports that
    /// as a missing token.
    pub fn extract(&self, headers: &HeaderMap) -> String {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .find_map(|pair| {
                let (key, value) = pair.trim().split_once('=')?;
                (key.trim() == self.name).then(|| value.trim().trim_matches('"').to_string())
            })
            .unwrap_or_default()
    }

    /// `Set-Cookie` value instructing the client to hold `token`
    pub fn hold(&self, token: &str, max_age_secs: u64) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.cookie(token, max_age_secs))
    }

    /// `Set-Cookie` value instructing the client to drop the token now
    pub fn discard(&self) -> Result<HeaderValue, InvalidHeaderValue> {
        HeaderValue::from_str(&self.cookie("", 0))
    }

    fn cookie(&self, value: &str, max_age_secs: u64) -> String {
        let mut cookie = format!(
            "{}={}; Path={}; Max-Age={}; HttpOnly; SameSite=Lax",
            self.name, value, self.path, max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}
