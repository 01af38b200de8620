//! Application configuration and file discovery.
//!
//! The discovery order is:
//! 1. `MAILPILOT_CONFIG` environment variable (explicit path).
//! 2. `~/.mailpilot/config.json`
//! 3. If neither exists, built-in defaults.
//!
//! Every section and field is optional in the file; serde defaults fill
//! the gaps so a minimal config only needs the credentials it actually
//! uses.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::secret::SecretString;

/// Errors from loading the configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON or has wrongly-typed fields.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server binding and CORS.
    pub server: ServerConfig,

    /// Gmail OAuth client and Pub/Sub topic.
    pub gmail: GmailConfig,

    /// Assistant model provider.
    pub llm: LlmConfig,

    /// Bearer-token signing.
    pub auth: AuthConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Allowed CORS origins. Empty means permissive (development).
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8480,
            cors_origins: Vec::new(),
        }
    }
}

/// Gmail provider settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GmailConfig {
    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: SecretString,

    /// Fully-qualified Pub/Sub topic watches publish to,
    /// e.g. `projects/my-project/topics/gmail-push`.
    pub pubsub_topic: String,

    /// Mailboxes this server operates; loaded into the identity store
    /// at startup.
    pub accounts: Vec<GmailAccount>,
}

/// One configured mailbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailAccount {
    /// The mailbox address, used as the identity key.
    pub email: String,

    /// Long-lived OAuth refresh token for this mailbox.
    pub refresh_token: SecretString,
}

/// Assistant model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI-compatible API base URL.
    pub base_url: String,

    /// Name of the environment variable holding the API key.
    pub api_key_env: String,

    /// Model identifier sent with chat requests.
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key_env: "OPENAI_API_KEY".into(),
            model: "gpt-4o-mini".into(),
        }
    }
}

/// Bearer-token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC signing secret for issued tokens.
    pub token_secret: SecretString,

    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: SecretString::default(),
            token_ttl_secs: 86_400,
        }
    }
}

/// Discover the config file path using the fallback chain.
///
/// Returns `None` when no candidate exists, which callers treat as
/// "use defaults".
pub fn discover_config_path() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("MAILPILOT_CONFIG") {
        return Some(PathBuf::from(explicit));
    }

    let home = dirs::home_dir()?;
    let path = home.join(".mailpilot").join("config.json");
    path.exists().then_some(path)
}

impl AppConfig {
    /// Load configuration via the discovery chain, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        match discover_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8480);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.auth.token_ttl_secs, 86_400);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server": {{"port": 9000}}, "gmail": {{"client_id": "cid"}}}}"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.gmail.client_id, "cid");
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn accounts_parse_with_redacted_tokens() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"gmail": {{"accounts": [{{"email": "a@example.com", "refresh_token": "rt-1"}}]}}}}"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.gmail.accounts.len(), 1);
        assert_eq!(config.gmail.accounts[0].email, "a@example.com");
        assert_eq!(config.gmail.accounts[0].refresh_token.expose(), "rt-1");
    }

    #[test]
    fn secret_fields_parse_from_plain_strings() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"auth": {{"token_secret": "signing-key", "token_ttl_secs": 60}}}}"#
        )
        .unwrap();

        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.auth.token_secret.expose(), "signing-key");
        assert_eq!(config.auth.token_ttl_secs, 60);
    }

    #[test]
    fn missing_file_is_an_error() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();
        let result = AppConfig::load_from(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
