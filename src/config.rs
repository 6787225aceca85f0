use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Prefix used when the form leaves it blank.
pub const DEFAULT_PREFIX: &str = "/devil";

/// Errors that can occur when loading, validating or saving configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the config file.
    ReadFile { path: PathBuf, source: std::io::Error },
    /// Failed to write the config file.
    WriteFile { path: PathBuf, source: std::io::Error },
    /// Failed to parse JSON.
    ParseJson { path: PathBuf, source: serde_json::Error },
    /// Credential blob is not structured session data.
    InvalidCredentials(String),
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFile { path, source } => {
                write!(f, "failed to read config file '{}': {}", path.display(), source)
            }
            Self::WriteFile { path, source } => {
                write!(f, "failed to write config file '{}': {}", path.display(), source)
            }
            Self::ParseJson { path, source } => {
                write!(f, "failed to parse config file '{}': {}", path.display(), source)
            }
            Self::InvalidCredentials(msg) => write!(f, "invalid credentials: {}", msg),
            Self::Validation(msg) => write!(f, "config validation error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ReadFile { source, .. } => Some(source),
            Self::WriteFile { source, .. } => Some(source),
            Self::ParseJson { source, .. } => Some(source),
            Self::InvalidCredentials(_) | Self::Validation(_) => None,
        }
    }
}

/// On-disk layout, kept compatible with the field names the web form posts.
#[derive(Serialize, Deserialize)]
struct ConfigFile {
    cookies: serde_json::Value,
    #[serde(default)]
    prefix: String,
    #[serde(rename = "adminID")]
    admin_id: String,
}

/// Bot configuration: who the admin is, how commands start, and how to log in.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    /// Session credentials handed to the chat platform connector.
    pub credentials: serde_json::Value,
    pub prefix: String,
    /// The single user allowed to issue privileged commands.
    pub admin_id: String,
}

impl BotConfig {
    /// Build a configuration from raw form input.
    ///
    /// Nothing is applied unless every field validates.
    pub fn from_submission(
        credentials: &str,
        prefix: Option<&str>,
        admin_id: &str,
    ) -> Result<Self, ConfigError> {
        let credentials: serde_json::Value = serde_json::from_str(credentials)
            .map_err(|e| ConfigError::InvalidCredentials(e.to_string()))?;
        Self::new(credentials, prefix.unwrap_or(""), admin_id)
    }

    fn new(credentials: serde_json::Value, prefix: &str, admin_id: &str) -> Result<Self, ConfigError> {
        if !(credentials.is_object() || credentials.is_array()) {
            return Err(ConfigError::InvalidCredentials(
                "expected a JSON object or array of session data".into(),
            ));
        }

        let admin_id = admin_id.trim();
        if admin_id.is_empty() {
            return Err(ConfigError::Validation("adminID is required".into()));
        }

        let prefix = match prefix.trim() {
            "" => DEFAULT_PREFIX,
            p => p,
        };

        Ok(Self {
            credentials,
            prefix: prefix.to_string(),
            admin_id: admin_id.to_string(),
        })
    }
}

/// Durable storage for the bot configuration (a single JSON file).
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the previously saved configuration.
    ///
    /// Returns `Ok(None)` when nothing has been saved yet.
    pub fn load(&self) -> Result<Option<BotConfig>, ConfigError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConfigError::ReadFile { path: self.path.clone(), source: e }),
        };
        let file: ConfigFile = serde_json::from_str(&content)
            .map_err(|e| ConfigError::ParseJson { path: self.path.clone(), source: e })?;

        BotConfig::new(file.cookies, &file.prefix, &file.admin_id).map(Some)
    }

    pub fn save(&self, config: &BotConfig) -> Result<(), ConfigError> {
        let file = ConfigFile {
            cookies: config.credentials.clone(),
            prefix: config.prefix.clone(),
            admin_id: config.admin_id.clone(),
        };
        let content = serde_json::to_string_pretty(&file)
            .map_err(|e| ConfigError::ParseJson { path: self.path.clone(), source: e })?;
        std::fs::write(&self.path, content)
            .map_err(|e| ConfigError::WriteFile { path: self.path.clone(), source: e })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn assert_err<T>(result: Result<T, ConfigError>) -> ConfigError {
        match result {
            Ok(_) => panic!("expected error, got Ok"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_valid_submission() {
        let config = BotConfig::from_submission(r#"{"token": "1:abc"}"#, Some("/w"), "42").unwrap();
        assert_eq!(config.prefix, "/w");
        assert_eq!(config.admin_id, "42");
        assert_eq!(config.credentials["token"], "1:abc");
    }

    #[test]
    fn test_cookie_array_accepted() {
        let config = BotConfig::from_submission(r#"[{"key": "c_user", "value": "1"}]"#, None, "1").unwrap();
        assert!(config.credentials.is_array());
    }

    #[test]
    fn test_blank_prefix_uses_default() {
        let config = BotConfig::from_submission("{}", Some("   "), "1").unwrap();
        assert_eq!(config.prefix, DEFAULT_PREFIX);
        let config = BotConfig::from_submission("{}", None, "1").unwrap();
        assert_eq!(config.prefix, DEFAULT_PREFIX);
    }

    #[test]
    fn test_malformed_credentials() {
        let err = assert_err(BotConfig::from_submission("{ not json", Some("/w"), "1"));
        assert!(matches!(err, ConfigError::InvalidCredentials(_)));
    }

    #[test]
    fn test_scalar_credentials_rejected() {
        let err = assert_err(BotConfig::from_submission("\"just a string\"", Some("/w"), "1"));
        assert!(matches!(err, ConfigError::InvalidCredentials(_)));
    }

    #[test]
    fn test_empty_admin_id() {
        let err = assert_err(BotConfig::from_submission("{}", Some("/w"), "  "));
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("adminID"));
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_load_saved_file() {
        let file = write_config(r#"{
            "cookies": [{"key": "xs", "value": "abc"}],
            "prefix": "/bot",
            "adminID": "100"
        }"#);
        let config = ConfigStore::new(file.path()).load().unwrap().unwrap();
        assert_eq!(config.prefix, "/bot");
        assert_eq!(config.admin_id, "100");
    }

    #[test]
    fn test_load_ignores_unknown_fields() {
        let file = write_config(r#"{"cookies": {}, "prefix": "/x", "adminID": "7", "activeBots": {}}"#);
        let config = ConfigStore::new(file.path()).load().unwrap().unwrap();
        assert_eq!(config.admin_id, "7");
    }

    #[test]
    fn test_load_invalid_json() {
        let file = write_config("{ invalid json }");
        let err = assert_err(ConfigStore::new(file.path()).load());
        assert!(matches!(err, ConfigError::ParseJson { .. }));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        let config = BotConfig::from_submission(r#"{"token": "1:abc"}"#, Some("/w"), "9").unwrap();
        store.save(&config).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"adminID\""));
        assert_eq!(store.load().unwrap(), Some(config));
    }

    #[test]
    fn test_save_to_missing_dir() {
        let store = ConfigStore::new("/nonexistent/dir/config.json");
        let config = BotConfig::from_submission("{}", None, "1").unwrap();
        let err = assert_err(store.save(&config));
        assert!(matches!(err, ConfigError::WriteFile { .. }));
    }
}
