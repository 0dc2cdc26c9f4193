use std::fs;
use std::io;
use std::path::Path;

use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "coach-chat.toml";

/// Settings for the upstream completion API. The key itself never lives in
/// the config file, only the name of the environment variable holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub model: String,
    pub key_env: String,
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4".to_string(),
            key_env: "OPENAI_API_KEY".to_string(),
            connect_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatConfig {
    pub api: ApiConfig,
}

impl ChatConfig {
    /// Reads the config file if present. A missing file is normal (defaults
    /// apply); an unreadable or unparsable one falls back to defaults with a
    /// warning rather than blocking the UI.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path_ref = path.as_ref();
        match fs::read_to_string(path_ref) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!(
                        "Failed to parse config file '{}': {err}. Using defaults.",
                        path_ref.display()
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                eprintln!(
                    "Failed to read config file '{}': {err}. Using defaults.",
                    path_ref.display()
                );
                Self::default()
            }
        }
    }

    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let parsed: ChatConfigToml = toml::from_str(s)?;
        let defaults = ApiConfig::default();
        let api = parsed.api.unwrap_or_default();
        Ok(Self {
            api: ApiConfig {
                base_url: api.base_url.unwrap_or(defaults.base_url),
                model: api.model.unwrap_or(defaults.model),
                key_env: api.key_env.unwrap_or(defaults.key_env),
                connect_timeout_secs: api
                    .connect_timeout_secs
                    .unwrap_or(defaults.connect_timeout_secs),
            },
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChatConfigToml {
    api: Option<ApiConfigToml>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiConfigToml {
    base_url: Option<String>,
    model: Option<String>,
    key_env: Option<String>,
    connect_timeout_secs: Option<u64>,
}
