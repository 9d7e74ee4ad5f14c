use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Main configuration for the pondok backend.
///
/// All settings are carried explicitly and passed to components at startup;
/// nothing reads process environment after construction.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub notifier: NotifierConfig,
    pub uploads: UploadConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HS256 signing secret for issued tokens. Required.
    pub token_secret: String,
    /// Issued-token lifetime in seconds (default: 7 days).
    #[serde(default = "default_token_ttl")]
    pub token_ttl_seconds: u64,
    /// Privileged key for server-to-server automation. Bearers of this key
    /// resolve to the `automation-service` admin identity.
    pub service_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL, or the literal `memory` to run on the
    /// in-memory store (useful for local development).
    #[serde(default = "default_database_url")]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotifierConfig {
    /// Outbound webhook for payment-status notifications. Unset disables
    /// delivery; decisions then report `notified: false`.
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadConfig {
    #[serde(default = "default_upload_dir")]
    pub dir: String,
    /// Maximum upload size in bytes (default: 10MB).
    #[serde(default = "default_max_upload_size")]
    pub max_size: usize,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Allowed origins; empty means any origin is allowed.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
            auth: AuthConfig::default(),
            database: DatabaseConfig::default(),
            notifier: NotifierConfig { webhook_url: None },
            uploads: UploadConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_seconds: default_token_ttl(),
            service_key: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: default_upload_dir(),
            max_size: default_max_upload_size(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_token_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_database_url() -> String {
    "sqlite://pondok.db".to_string()
}

fn default_upload_dir() -> String {
    "public/uploads".to_string()
}

fn default_max_upload_size() -> usize {
    10 * 1024 * 1024
}

impl ServerConfig {
    pub fn addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Builder for [`Config`] with environment variable support.
#[must_use = "builder does nothing until you call build()"]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.config.server.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_token_secret(mut self, secret: impl Into<String>) -> Self {
        self.config.auth.token_secret = secret.into();
        self
    }

    pub fn with_service_key(mut self, key: impl Into<String>) -> Self {
        self.config.auth.service_key = Some(key.into());
        self
    }

    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database.url = url.into();
        self
    }

    pub fn with_webhook_url(mut self, url: impl Into<String>) -> Self {
        self.config.notifier.webhook_url = Some(url.into());
        self
    }

    pub fn with_upload_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.uploads.dir = dir.into();
        self
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.config.cors.allowed_origins = origins;
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Load configuration from environment variables with the `PONDOK_`
    /// prefix. `PORT` without the prefix is honored as a fallback for
    /// container platforms.
    pub fn from_env(mut self) -> Self {
        if let Some(host) = env_var("HOST") {
            self.config.server.host = host;
        }
        if let Some(port) = env_var("PORT").or_else(|| std::env::var("PORT").ok()) {
            if let Ok(p) = port.parse() {
                self.config.server.port = p;
            }
        }
        if let Some(level) = env_var("LOG_LEVEL") {
            self.config.logging.level = level;
        }
        if let Some(json) = env_var("LOG_JSON") {
            self.config.logging.json = json.parse().unwrap_or(false);
        }
        if let Some(secret) = env_var("TOKEN_SECRET") {
            self.config.auth.token_secret = secret;
        }
        if let Some(ttl) = env_var("TOKEN_TTL_SECONDS") {
            if let Ok(t) = ttl.parse() {
                self.config.auth.token_ttl_seconds = t;
            }
        }
        if let Some(key) = env_var("SERVICE_KEY") {
            self.config.auth.service_key = Some(key);
        }
        if let Some(url) = env_var("DATABASE_URL") {
            self.config.database.url = url;
        }
        if let Some(url) = env_var("WEBHOOK_URL") {
            self.config.notifier.webhook_url = Some(url);
        }
        if let Some(dir) = env_var("UPLOAD_DIR") {
            self.config.uploads.dir = dir;
        }
        if let Some(size) = env_var("MAX_UPLOAD_SIZE") {
            if let Ok(s) = size.parse() {
                self.config.uploads.max_size = s;
            }
        }
        if let Some(origins) = env_var("ALLOWED_ORIGINS") {
            self.config.cors.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> crate::error::Result<Config> {
        self.config.server.addr().map_err(|e| {
            crate::error::ApiError::validation(format!(
                "Invalid server address {}:{} - {}",
                self.config.server.host, self.config.server.port, e
            ))
        })?;

        if self.config.server.port == 0 {
            return Err(crate::error::ApiError::validation(
                "Server port must be greater than 0",
            ));
        }

        if self.config.auth.token_secret.is_empty() {
            return Err(crate::error::ApiError::validation(
                "PONDOK_TOKEN_SECRET must be set",
            ));
        }

        if self.config.auth.token_ttl_seconds == 0 {
            return Err(crate::error::ApiError::validation(
                "Token TTL must be greater than 0",
            ));
        }

        if self.config.uploads.max_size == 0 {
            return Err(crate::error::ApiError::validation(
                "Maximum upload size must be greater than 0",
            ));
        }

        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("PONDOK_{name}")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_token_secret() {
        assert!(ConfigBuilder::new().build().is_err());
        assert!(ConfigBuilder::new()
            .with_token_secret("test-secret-key-32-bytes-long!!")
            .build()
            .is_ok());
    }

    #[test]
    fn defaults_are_sane() {
        let config = ConfigBuilder::new()
            .with_token_secret("test-secret-key-32-bytes-long!!")
            .build()
            .unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.database.url, "sqlite://pondok.db");
        assert!(config.notifier.webhook_url.is_none());
        assert!(config.cors.allowed_origins.is_empty());
    }
}
