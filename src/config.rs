//! Configuration manager for devroom.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::FromRef;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::AppState;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_PORT: u16 = 8888;
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Placeholder picture given to users registering without one.
pub const DEFAULT_AVATAR: &str =
    "https://encrypted-tbn0.gstatic.com/images?q=tbn:ANd9GcTTOkHm3_mPQ5PPRvGtU6Si7FJg8DVDtZ47rw&usqp=CAU";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Instance name.
    pub name: String,
    /// Domain name of current instance. Used as token issuer.
    pub url: String,
    /// Listening port.
    pub port: Option<u16>,
    /// Avatar given to new accounts.
    pub default_avatar: Option<String>,
    #[serde(default)]
    pub version: String,
    #[serde(skip)]
    path: PathBuf,
    /// Related to JsonWebToken configuration.
    #[serde(skip_serializing)]
    pub token: Option<Token>,
    /// Related to PostgreSQL configuration.
    #[serde(skip_serializing)]
    pub postgres: Option<Postgres>,
    /// Related to Argon2 configuration.
    #[serde(skip_serializing)]
    pub argon2: Option<Argon2>,
    /// Related to follow edges reconciliation.
    #[serde(skip_serializing)]
    pub repair: Option<Repair>,
    /// Expose Prometheus metrics on `/metrics`.
    #[serde(default)]
    pub metrics: bool,
}

/// PostgreSQL configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Postgres {
    /// Hostname:(?port) for PostgreSQL instance.
    pub address: String,
    /// Database name.
    pub database: Option<String>,
    /// Username credential to connect.
    pub username: Option<String>,
    /// Password credential to connect.
    pub password: Option<String>,
    /// Maximum pool connections.
    pub pool_size: Option<u32>,
}

/// Argon2 configuration.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Argon2 {
    /// Memory used while hashing, in KiB.
    pub memory_cost: u32,
    /// Iterations of hash.
    pub iterations: u32,
    /// Parallelism degree.
    pub parallelism: u32,
    /// Output hash length.
    pub hash_length: usize,
}

impl Default for Argon2 {
    fn default() -> Self {
        Self {
            memory_cost: 1024 * 64, // 64 MiB.
            iterations: 4,
            parallelism: 2,
            hash_length: 32,
        }
    }
}

/// Json Web Token configuration.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
pub struct Token {
    /// HMAC secret. `TOKEN_SECRET` environment variable takes precedence.
    #[serde(default)]
    pub secret: String,
    /// Lifetime of a token, in seconds.
    pub expiration: Option<u64>,
    /// Update token audience.
    pub audience: Option<String>,
}

/// Periodic edge reconciliation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Repair {
    /// Seconds between two passes.
    pub interval: u64,
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Port to bind on.
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Avatar applied on registration.
    pub fn default_avatar(&self) -> String {
        self.default_avatar
            .clone()
            .unwrap_or_else(|| DEFAULT_AVATAR.to_owned())
    }

    /// Normalizes a URL string by ensuring it starts with a valid scheme
    /// (`http` or `https`).
    fn normalize_url(&self, url: &str) -> Result<String, url::ParseError> {
        let url_with_scheme = if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("https://{url}")
        };

        let parsed_url = Url::parse(&url_with_scheme)?;
        Ok(parsed_url.to_string())
    }

    /// Parse a YAML document.
    pub fn from_yaml(&self, content: &str) -> Result<Self, serde_yaml::Error> {
        let mut config: Configuration = serde_yaml::from_str(content)?;
        config.path = self.path.clone();
        Ok(config)
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location, then applies environment overrides.
    pub fn read(self) -> Result<Arc<Self>, url::ParseError> {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let config = match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader::<_, Configuration>(file) {
                Ok(config) => config,
                Err(err) => self.error(err),
            },
            Err(err) => self.error(err),
        };

        Ok(Arc::new(config.finalize()?))
    }

    /// Set version, normalize URLs and apply environment variables.
    pub fn finalize(mut self) -> Result<Self, url::ParseError> {
        self.version = VERSION.to_owned();

        if !self.url.is_empty() {
            self.url = self.normalize_url(&self.url)?;
        }
        let avatar = self.default_avatar.take();
        self.default_avatar = avatar.map(|a| self.normalize_url(&a)).transpose()?;

        if let Ok(secret) = std::env::var("TOKEN_SECRET") {
            self.token.get_or_insert_with(Token::default).secret = secret;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            self.port = Some(port);
        }

        Ok(self)
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, "`config.yaml` file not found or invalid");
        Self {
            name: env!("CARGO_PKG_NAME").to_owned(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
name: devroom
url: devroom.example
port: 9000
default_avatar: cdn.example/placeholder.png
token:
  secret: s3cr3t
  expiration: 3600
postgres:
  address: localhost:5432
  database: devroom
argon2:
  memory_cost: 1024
  iterations: 1
  parallelism: 1
  hash_length: 32
repair:
  interval: 600
metrics: true
"#;

    #[test]
    fn test_parse_yaml() {
        let config = Configuration::default().from_yaml(YAML).unwrap();

        assert_eq!(config.name, "devroom");
        assert_eq!(config.port(), 9000);
        assert_eq!(config.token.as_ref().unwrap().secret, "s3cr3t");
        assert_eq!(config.token.as_ref().unwrap().expiration, Some(3600));
        assert_eq!(config.postgres.as_ref().unwrap().database.as_deref(), Some("devroom"));
        assert_eq!(config.argon2.as_ref().unwrap().iterations, 1);
        assert_eq!(config.repair, Some(Repair { interval: 600 }));
        assert!(config.metrics);
    }

    #[test]
    fn test_normalize_urls() {
        let config = Configuration::default()
            .from_yaml(YAML)
            .unwrap()
            .finalize()
            .unwrap();

        assert_eq!(config.url, "https://devroom.example/");
        assert_eq!(config.default_avatar(), "https://cdn.example/placeholder.png");
        assert_eq!(config.version, VERSION);
    }

    #[test]
    fn test_defaults() {
        let config = Configuration::default();

        assert_eq!(config.port(), DEFAULT_PORT);
        assert_eq!(config.default_avatar(), DEFAULT_AVATAR);
        assert!(config.repair.is_none());
    }
}
