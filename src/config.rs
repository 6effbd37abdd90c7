//! Configuration and application file locations.
//!
//! Settings live in a TOML file under a single `.dataloom` directory in the
//! OS config root. `DATALOOM_CONFIG_HOME` overrides the root for tests and
//! portable setups.

use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the application directory that lives under the OS config root.
pub const APP_DIR_NAME: &str = ".dataloom";
/// Configuration file name inside the application directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";
/// File holding the persisted access token.
pub const TOKEN_FILE_NAME: &str = "access_token";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("No suitable base config directory available for application files")]
    NoBaseDir,
    #[error("Failed to read configuration at {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to create application directory at {path}: {source}")]
    CreateDir { path: PathBuf, source: io::Error },
}

type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Backend REST API.
    pub api: ApiConfig,
    /// Identity provider and object storage. Absent means auth is disabled
    /// and every view renders signed out.
    pub auth: Option<AuthConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Base URL of the identity provider, also serving object storage.
    pub url: String,
    /// Publishable API key sent with every identity and storage call.
    pub anon_key: String,
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string(self).expect("Cannot serialize configuration")
    }

    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Return the root `.dataloom` directory, creating it if needed.
pub fn app_root_dir() -> Result<PathBuf> {
    let base = config_base_dir().ok_or(ConfigError::NoBaseDir)?;
    let path = base.join(APP_DIR_NAME);
    fs::create_dir_all(&path).map_err(|source| ConfigError::CreateDir {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

pub fn default_config_file() -> Result<PathBuf> {
    Ok(app_root_dir()?.join(CONFIG_FILE_NAME))
}

pub fn default_token_file() -> Result<PathBuf> {
    Ok(app_root_dir()?.join(TOKEN_FILE_NAME))
}

fn config_base_dir() -> Option<PathBuf> {
    if let Ok(path) = env::var("DATALOOM_CONFIG_HOME") {
        return Some(PathBuf::from(path));
    }
    BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_sections_missing() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert!(config.auth.is_none());
    }

    #[test]
    fn parses_auth_section() {
        let config = Config::from_toml(
            r#"
[api]
base_url = "https://api.example.com"

[auth]
url = "https://id.example.com"
anon_key = "public-key"
"#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com");
        let auth = config.auth.unwrap();
        assert_eq!(auth.url, "https://id.example.com");
        assert_eq!(auth.anon_key, "public-key");
    }

    #[test]
    fn toml_round_trip_keeps_auth() {
        let config = Config {
            api: ApiConfig {
                base_url: "https://api.example.com".to_string(),
            },
            auth: Some(AuthConfig {
                url: "https://id.example.com".to_string(),
                anon_key: "public-key".to_string(),
            }),
        };
        let parsed = Config::from_toml(&config.to_toml()).unwrap();
        assert_eq!(parsed.api.base_url, config.api.base_url);
        assert_eq!(parsed.auth.unwrap().url, "https://id.example.com");
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.api.base_url, ApiConfig::default().base_url);
    }
}
