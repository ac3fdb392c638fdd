//! login-gate configuration management
//!
//! Handles configuration from environment variables and TOML config files.
//! The resulting `AppConfig` is built once at startup and handed to the
//! token service and request gate by value; nothing reads the environment
//! after that.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Minimum accepted signing secret length in bytes (HS256 key size)
pub const MIN_SECRET_LEN: usize = 32;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Token, carrier and gate configuration
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup, starting from defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(&lookup)?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_lookup(&|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_lookup<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }

        // Auth
        if let Some(secret) = lookup("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(secs) = lookup("JWT_EXPIRATION_SECS") {
            self.auth.token_lifetime_secs = parse_value("JWT_EXPIRATION_SECS", secs)?;
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            self.auth.issuer = issuer;
        }
        if let Some(name) = lookup("AUTH_COOKIE_NAME") {
            self.auth.cookie_name = name;
        }
        if let Some(secure) = lookup("AUTH_COOKIE_SECURE") {
            self.auth.cookie_secure = parse_value("AUTH_COOKIE_SECURE", secure)?;
        }
        if let Some(base) = lookup("AUTH_BASE_PATH") {
            self.auth.base_path = base;
        }
        if let Some(paths) = lookup("AUTH_PUBLIC_PATHS") {
            self.auth.public_paths = split_list(&paths);
        }
        if let Some(aliases) = lookup("AUTH_PUBLIC_ALIASES") {
            self.auth.public_aliases = split_list(&aliases);
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_value("LOG_JSON", json)?;
        }

        Ok(())
    }

    /// Check the values the process cannot start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.auth.validate()
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Token service, session carrier and request gate configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing secret; required, at least `MIN_SECRET_LEN` bytes
    pub jwt_secret: String,

    /// Token lifetime in seconds, also used as the cookie Max-Age
    pub token_lifetime_secs: u64,

    /// Token issuer (`iss` claim)
    pub issuer: String,

    /// Name of the cookie carrying the token
    pub cookie_name: String,

    /// Mark the cookie `Secure`
    pub cookie_secure: bool,

    /// Route prefix governed by the gate, e.g. `/api`
    pub base_path: String,

    /// Public paths relative to `base_path`, matched exactly or as a prefix
    pub public_paths: Vec<String>,

    /// Extra absolute paths that are public on exact match only
    pub public_aliases: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_lifetime_secs: 1800,
            issuer: "login-gate".to_string(),
            cookie_name: "auth_token".to_string(),
            cookie_secure: false,
            base_path: "/api".to_string(),
            public_paths: vec!["login".to_string(), "register".to_string()],
            public_aliases: Vec::new(),
        }
    }
}

// Keeps the secret out of debug output and logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_lifetime_secs", &self.token_lifetime_secs)
            .field("issuer", &self.issuer)
            .field("cookie_name", &self.cookie_name)
            .field("cookie_secure", &self.cookie_secure)
            .field("base_path", &self.base_path)
            .field("public_paths", &self.public_paths)
            .field("public_aliases", &self.public_aliases)
            .finish()
    }
}

impl AuthConfig {
    /// Validate the auth settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::InvalidValue {
                key: "JWT_SECRET".to_string(),
                value: format!("<{} bytes, need {MIN_SECRET_LEN}>", self.jwt_secret.len()),
            });
        }
        if self.token_lifetime_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "JWT_EXPIRATION_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        if self.cookie_name.is_empty() || self.cookie_name.contains([';', '=', ' ']) {
            return Err(ConfigError::InvalidValue {
                key: "AUTH_COOKIE_NAME".to_string(),
                value: self.cookie_name.clone(),
            });
        }
        if !self.base_path.starts_with('/') || (self.base_path.len() > 1 && self.base_path.ends_with('/')) {
            return Err(ConfigError::InvalidValue {
                key: "AUTH_BASE_PATH".to_string(),
                value: self.base_path.clone(),
            });
        }
        // A blank entry would expand to `{base}/` and open the whole route.
        if let Some(path) = self
            .public_paths
            .iter()
            .find(|p| p.trim_matches('/').trim().is_empty())
        {
            return Err(ConfigError::InvalidValue {
                key: "AUTH_PUBLIC_PATHS".to_string(),
                value: path.clone(),
            });
        }
        if let Some(alias) = self
            .public_aliases
            .iter()
            .find(|a| !self.is_under_base(a))
        {
            return Err(ConfigError::InvalidValue {
                key: "AUTH_PUBLIC_ALIASES".to_string(),
                value: alias.clone(),
            });
        }
        Ok(())
    }

    /// Whether an absolute path falls inside the base route
    fn is_under_base(&self, path: &str) -> bool {
        let base = self.base_path.trim_end_matches('/');
        path.starts_with('/')
            && (base.is_empty()
                || path == base
                || path
                    .strip_prefix(base)
                    .is_some_and(|rest| rest.starts_with('/')))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_lifetime_secs, 1800);
        assert_eq!(config.auth.base_path, "/api");
        assert_eq!(config.auth.public_paths, vec!["login", "register"]);
        assert!(config.auth.public_aliases.is_empty());
    }

    #[test]
    fn test_default_config_requires_secret() {
        let config = AppConfig::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(key)) if key == "JWT_SECRET"
        ));
    }

    #[test]
    fn test_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("API_PORT", "9090"),
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("JWT_EXPIRATION_SECS", "60"),
            ("AUTH_BASE_PATH", "/core"),
            ("AUTH_PUBLIC_PATHS", "login, register ,signup,"),
            ("AUTH_PUBLIC_ALIASES", "/core/users/login"),
            ("AUTH_COOKIE_SECURE", "true"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.auth.token_lifetime_secs, 60);
        assert_eq!(config.auth.base_path, "/core");
        assert_eq!(config.auth.public_paths, vec!["login", "register", "signup"]);
        assert_eq!(config.auth.public_aliases, vec!["/core/users/login"]);
        assert!(config.auth.cookie_secure);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_port() {
        let result = AppConfig::from_lookup(lookup_from(&[("API_PORT", "eighty")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "API_PORT"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let config = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "short")])).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_zero_lifetime_rejected() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("JWT_EXPIRATION_SECS", "0"),
        ]))
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_base_path_rejected() {
        for base in ["api", "/api/"] {
            let config = AppConfig::from_lookup(lookup_from(&[
                ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
                ("AUTH_BASE_PATH", base),
            ]))
            .unwrap();
            assert!(config.validate().is_err(), "base path {base} accepted");
        }
    }

    #[test]
    fn test_blank_public_path_rejected() {
        for entry in ["", "/", " / "] {
            let config = AuthConfig {
                jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
                public_paths: vec!["login".to_string(), entry.to_string()],
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidValue { key, .. }) if key == "AUTH_PUBLIC_PATHS"),
                "public path {entry:?} accepted"
            );
        }
    }

    #[test]
    fn test_alias_outside_base_rejected() {
        let config = |alias: &str| AuthConfig {
            jwt_secret: "0123456789abcdef0123456789abcdef".to_string(),
            base_path: "/core".to_string(),
            public_aliases: vec![alias.to_string()],
            ..Default::default()
        };

        for alias in ["/api/users/login", "/corelogin", "users/login"] {
            assert!(
                matches!(config(alias).validate(), Err(ConfigError::InvalidValue { key, .. }) if key == "AUTH_PUBLIC_ALIASES"),
                "alias {alias} accepted"
            );
        }
        assert!(config("/core/users/login").validate().is_ok());

        let root = AuthConfig {
            base_path: "/".to_string(),
            ..config("/users/login")
        };
        assert!(root.validate().is_ok());
    }

    #[test]
    fn test_toml_partial_file() {
        let config: AppConfig = toml::from_str(
            r#"
            [auth]
            jwt_secret = "0123456789abcdef0123456789abcdef"
            base_path = "/core"
            "#,
        )
        .unwrap();
        assert_eq!(config.auth.base_path, "/core");
        assert_eq!(config.auth.cookie_name, "auth_token");
        assert_eq!(config.server.port, 8080);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let auth = AuthConfig {
            jwt_secret: "super-secret-value-that-must-not-leak".to_string(),
            ..Default::default()
        };
        let printed = format!("{auth:?}");
        assert!(!printed.contains("super-secret"));
    }
}
