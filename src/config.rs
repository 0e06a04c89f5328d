//! Configuration for the role mapping tools.
//!
//! Values come from an optional YAML/JSON/TOML file, overridden by
//! `ROLE_MAPPING__<SECTION>__<KEY>` environment variables.

use crate::rules::VISUAL_MAX_RULE_DEPTH;
use crate::Result;

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const ENV_PREFIX: &str = "ROLE_MAPPING";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rule editor settings
    #[serde(default)]
    pub editor: EditorConfig,
    /// Role mapping API settings
    #[serde(default)]
    pub api: ApiConfig,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        Self::load(None::<&Path>)
    }

    /// Load configuration from a file, with environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::load(Some(path))
    }

    /// Load configuration from an optional file, with environment overrides.
    pub fn load(path: Option<impl AsRef<Path>>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_ref()));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| crate::Error::config(e.to_string()))?;

        tracing::debug!(
            max_visual_depth = config.editor.max_visual_depth,
            api_configured = config.api.base_url.is_some(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.editor.max_visual_depth == 0 {
            return Err(crate::Error::config_key(
                "Visual editor depth must be at least 1",
                "editor.max_visual_depth",
            ));
        }

        if self.api.timeout_ms == 0 {
            return Err(crate::Error::config_key(
                "API timeout must be greater than zero",
                "api.timeout_ms",
            ));
        }

        if let Some(url) = &self.api.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(crate::Error::config_key(
                    "API base URL must start with http:// or https://",
                    "api.base_url",
                ));
            }
        }

        if self.api.password.is_some() && self.api.username.is_none() {
            return Err(crate::Error::config_key(
                "API password is set without a username",
                "api.username",
            ));
        }

        Ok(())
    }
}

/// Rule editor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Trees at least this deep must be edited as JSON
    #[serde(default = "default_max_visual_depth")]
    pub max_visual_depth: usize,
}

fn default_max_visual_depth() -> usize {
    VISUAL_MAX_RULE_DEPTH
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_visual_depth: default_max_visual_depth(),
        }
    }
}

/// Role mapping API settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the hosting application, e.g. `http://localhost:5601`
    #[serde(default)]
    pub base_url: Option<String>,
    /// Request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Basic auth username
    #[serde(default)]
    pub username: Option<String>,
    /// Basic auth password
    #[serde(default)]
    pub password: Option<String>,
    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl ApiConfig {
    /// Get the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_ms: default_timeout_ms(),
            username: None,
            password: None,
            user_agent: None,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level or filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.editor.max_visual_depth, VISUAL_MAX_RULE_DEPTH);
        assert_eq!(config.api.timeout(), Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "api:\n  base_url: http://localhost:5601\n  timeout_ms: 5000\nlogging:\n  json: true"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url.as_deref(), Some("http://localhost:5601"));
        assert_eq!(config.api.timeout(), Duration::from_millis(5000));
        assert!(config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = Config::from_file("/nonexistent/role-mapping.yaml");
        assert!(matches!(result, Err(crate::Error::Config { .. })));
    }

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("ROLE_MAPPING__EDITOR__MAX_VISUAL_DEPTH", "8");
        let config = Config::from_env().unwrap();
        std::env::remove_var("ROLE_MAPPING__EDITOR__MAX_VISUAL_DEPTH");

        assert_eq!(config.editor.max_visual_depth, 8);
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.editor.max_visual_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.base_url = Some("localhost:5601".to_string());
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.password = Some("secret".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = ApiConfig::default();
        config.password = Some("secret".to_string());
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
