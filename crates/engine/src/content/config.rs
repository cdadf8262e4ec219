use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::sim::EntityTunables;

use super::atomic_io::write_atomic;

/// Top-level key this crate owns inside a shared configuration document.
pub const CONFIG_SECTION: &str = "game";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub tunables: EntityTunables,
    pub target_tps: u32,
    pub map: PathBuf,
    pub max_ticks: Option<u64>,
    pub metrics_log_interval_ms: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tunables: EntityTunables::default(),
            target_tps: 60,
            map: PathBuf::from("maps/default.json"),
            max_ticks: None,
            metrics_log_interval_ms: 1000,
        }
    }
}

impl GameConfig {
    pub fn metrics_log_interval(&self) -> Duration {
        Duration::from_millis(self.metrics_log_interval_ms)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write config '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode config: {0}")]
    Encode(#[source] serde_json::Error),
}

/// JSON-backed settings. Only the `game` section is interpreted; sibling
/// sections are carried through saves untouched.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    document: Map<String, Value>,
    config: GameConfig,
}

impl ConfigStore {
    /// Loads `path`, falling back to defaults for anything unusable, and
    /// writes the normalized result straight back.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let document = read_document(&path)?;
        let config = match document.get(CONFIG_SECTION) {
            Some(section) => parse_section(section).unwrap_or_else(|reason| {
                warn!(path = %path.display(), reason = %reason, "config_section_invalid");
                GameConfig::default()
            }),
            None => {
                info!(path = %path.display(), section = CONFIG_SECTION, "config_section_missing");
                GameConfig::default()
            }
        };

        let mut store = Self {
            path,
            document,
            config,
        };
        store.save()?;
        info!(
            path = %store.path.display(),
            target_tps = store.config.target_tps,
            map = %store.config.map.display(),
            "config_loaded"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut GameConfig {
        &mut self.config
    }

    pub fn save(&mut self) -> Result<(), ConfigError> {
        let section = serde_json::to_value(&self.config).map_err(ConfigError::Encode)?;
        self.document.insert(CONFIG_SECTION.to_string(), section);
        let mut text = serde_json::to_string_pretty(&self.document).map_err(ConfigError::Encode)?;
        text.push('\n');
        write_atomic(&self.path, &text).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

fn read_document(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            info!(path = %path.display(), "config_missing_using_defaults");
            return Ok(Map::new());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(other) => {
            warn!(
                path = %path.display(),
                found = json_type_name(&other),
                "config_not_an_object"
            );
            Ok(Map::new())
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "config_parse_failed");
            Ok(Map::new())
        }
    }
}

fn parse_section(section: &Value) -> Result<GameConfig, String> {
    match serde_path_to_error::deserialize::<_, GameConfig>(section) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse {CONFIG_SECTION} section: {source}"))
            } else {
                Err(format!("parse {CONFIG_SECTION} section at {path}: {source}"))
            }
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
