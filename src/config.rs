// config.rs

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Environment variable that overrides the configuration file path.
pub const CONFIG_PATH_VAR: &str = "FLOATCHAT_CONFIG";

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Represents the full configuration of the chat app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Where questions are answered.
    pub backend: BackendConfig,

    /// How places are found in questions.
    pub location: LocationConfig,

    /// First bot message of every session. `None` starts with an empty chat.
    #[serde(default)]
    pub greeting: Option<String>,

    /// Debug mode flag (forces debug-level logging).
    #[serde(default)]
    pub debug: bool,
}

/// Defines the ocean data answer service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendConfig {
    /// Full URL of the `POST /query` endpoint.
    pub query_url: String,
}

/// Defines the Ollama model used to spot place names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationConfig {
    /// Turns the map-follows-chat feature on or off.
    pub enabled: bool,

    /// Ollama host including scheme, e.g. `http://localhost`.
    pub ollama_host: String,

    pub ollama_port: u16,

    /// The Ollama model to use.
    pub model: String,
}

impl Default for Config {
    /// Returns a configuration pointing at local services.
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                query_url: "http://127.0.0.1:8000/query".to_string(),
            },
            location: LocationConfig {
                enabled: true,
                ollama_host: "http://localhost".to_string(),
                ollama_port: 11434,
                model: "llama3.2:latest".to_string(),
            },
            greeting: Some(
                "Hello! I'm FloatChat. Ask me anything about ocean data, ARGO floats, \
                 temperature, salinity, pressure, or trends."
                    .to_string(),
            ),
            debug: false,
        }
    }
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// # Arguments
    /// * `path` - The file path to load the configuration from.
    ///
    /// # Returns
    /// * `Ok(Config)` if the file is successfully read and parsed.
    /// * `Err(ConfigError)` if an error occurs.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    /// A file that exists and fails to parse is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Saves the current configuration to a JSON file.
    ///
    /// # Arguments
    /// * `path` - The file path to save the configuration to.
    ///
    /// # Returns
    /// * `Ok(())` if the file is successfully written.
    /// * `Err(ConfigError)` if an error occurs.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
