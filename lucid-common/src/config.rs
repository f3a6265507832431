//! Configuration loading and root folder resolution
//!
//! Resolution priority for every setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable TOML file is never fatal: the services log a
//! warning and continue with defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LUCID_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE: &str = "lucid.db";

/// Default AI gateway endpoint (OpenAI-compatible chat completions)
pub const DEFAULT_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";

/// Default model requested from the gateway
pub const DEFAULT_GATEWAY_MODEL: &str = "google/gemini-2.5-flash";

/// Default gateway request timeout
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 60;

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[auth]` section: the identity provider that issues bearer tokens
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

/// `[gateway]` section: the LLM gateway used by the AI-assist service
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GatewayConfig {
    pub url: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Resolved auth provider settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub url: String,
    pub anon_key: String,
}

/// Resolved gateway settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Default config file location: `<config dir>/lucid/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lucid").join("config.toml"))
}

/// Outcome of [`load_toml_config`]
///
/// Loading runs before the tracing subscriber exists (the log level comes
/// from the file), so problems are returned for the caller to log.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    pub config: TomlConfig,
    /// File the config was read from, if any
    pub source: Option<PathBuf>,
    /// Why defaults were used instead of a file the user pointed at
    pub warning: Option<String>,
}

/// Load the TOML config, falling back to defaults on any problem
///
/// `explicit` is the `--config` argument; when absent the default location
/// is tried. A missing default file is expected and produces no warning.
pub fn load_toml_config(explicit: Option<&Path>) -> LoadedConfig {
    let path = match explicit.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => path,
        None => {
            return LoadedConfig {
                warning: Some("Could not determine config directory, using defaults".to_string()),
                ..Default::default()
            }
        }
    };

    if !path.exists() {
        let warning = explicit
            .is_some()
            .then(|| format!("Config file not found: {} (using defaults)", path.display()));
        return LoadedConfig {
            warning,
            ..Default::default()
        };
    }

    match read_toml_config(&path) {
        Ok(config) => LoadedConfig {
            config,
            source: Some(path),
            warning: None,
        },
        Err(e) => LoadedConfig {
            warning: Some(format!("{} (using defaults)", e)),
            ..Default::default()
        },
    }
}

/// Read and parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Root folder resolution (CLI → ENV → TOML → OS default)
pub struct RootFolderResolver {
    cli_arg: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(cli_arg: Option<PathBuf>) -> Self {
        Self { cli_arg }
    }

    pub fn resolve(&self, toml: &TomlConfig) -> PathBuf {
        if let Some(path) = &self.cli_arg {
            return path.clone();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = &toml.root_folder {
            return path.clone();
        }

        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lucid"))
        .unwrap_or_else(|| PathBuf::from("./lucid_data"))
}

/// Create the root folder if missing and return the database path inside it
pub fn prepare_root_folder(root: &Path) -> Result<PathBuf> {
    if !root.exists() {
        std::fs::create_dir_all(root)?;
        info!("Created root folder: {}", root.display());
    }
    Ok(root.join(DATABASE_FILE))
}

/// Environment value (non-blank) or the TOML value
fn env_or(name: &str, toml_value: Option<&String>) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| toml_value.filter(|v| !v.trim().is_empty()).cloned())
}

/// Resolve auth provider settings (ENV → TOML)
pub fn resolve_auth_settings(toml: &TomlConfig) -> Result<AuthSettings> {
    let url = env_or("LUCID_AUTH_URL", toml.auth.url.as_ref()).ok_or_else(|| {
        Error::Config(
            "Auth provider URL not configured. Set LUCID_AUTH_URL or [auth] url".to_string(),
        )
    })?;
    let anon_key = env_or("LUCID_AUTH_ANON_KEY", toml.auth.anon_key.as_ref()).unwrap_or_default();

    Ok(AuthSettings {
        url: url.trim_end_matches('/').to_string(),
        anon_key,
    })
}

/// Resolve gateway settings (ENV → TOML → defaults); the API key is required
pub fn resolve_gateway_settings(toml: &TomlConfig) -> Result<GatewaySettings> {
    let api_key = env_or("LUCID_GATEWAY_API_KEY", toml.gateway.api_key.as_ref()).ok_or_else(
        || {
            Error::Config(
                "AI gateway API key not configured. Set LUCID_GATEWAY_API_KEY or [gateway] api_key"
                    .to_string(),
            )
        },
    )?;

    let url = env_or("LUCID_GATEWAY_URL", toml.gateway.url.as_ref())
        .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());
    let model = env_or("LUCID_GATEWAY_MODEL", toml.gateway.model.as_ref())
        .unwrap_or_else(|| DEFAULT_GATEWAY_MODEL.to_string());
    let timeout_secs = toml
        .gateway
        .timeout_secs
        .unwrap_or(DEFAULT_GATEWAY_TIMEOUT_SECS);

    Ok(GatewaySettings {
        url,
        api_key,
        model,
        timeout_secs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
            root_folder = "/srv/lucid"

            [logging]
            level = "debug"

            [auth]
            url = "https://auth.example.test/"
            anon_key = "anon"

            [gateway]
            api_key = "secret"
            model = "test-model"
            timeout_secs = 5
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/lucid")));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.auth.anon_key.as_deref(), Some("anon"));
        assert_eq!(config.gateway.timeout_secs, Some(5));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: TomlConfig = toml::from_str("").unwrap();
        assert!(config.root_folder.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(config.gateway.api_key.is_none());
    }

    #[test]
    fn test_prepare_root_folder_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("nested").join("lucid");

        let db_path = prepare_root_folder(&root).unwrap();

        assert!(root.exists());
        assert_eq!(db_path, root.join(DATABASE_FILE));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();

        let loaded = load_toml_config(Some(&path));
        assert_eq!(loaded.config.logging.level, "warn");
        assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
        assert!(loaded.warning.is_none());
    }

    #[test]
    fn test_read_invalid_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "root_folder = [").unwrap();

        let result = read_toml_config(&path);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_missing_explicit_file_falls_back() {
        let loaded = load_toml_config(Some(Path::new("/nonexistent/lucid/config.toml")));
        assert!(loaded.config.root_folder.is_none());
        assert!(loaded.source.is_none());
        assert!(loaded.warning.is_some());
    }
}
