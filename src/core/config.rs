use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::shell::FailHandle;

/// Reserved entry holding poll loop parameters
pub const GLOBAL_KEY: &str = "global";

/// Configuration shipped with the binary
const SHIPPED_CONFIG: &str = include_str!("../../data/config.yml");

/// Signal name -> raw parameters, in file order
pub type RawConfig = IndexMap<String, Mapping>;

/// Parameters of one signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Display label, defaults to the signal name
    #[serde(default)]
    pub alert: Option<String>,
    pub min_warn: f64,
    pub probe: String,
    #[serde(default)]
    pub units: String,
    #[serde(default = "default_warn_res")]
    pub warn_res: f64,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub panic: Option<String>,
    #[serde(default)]
    pub alert_check: Option<String>,
    #[serde(default)]
    pub attempt_reset: Option<String>,
    #[serde(default)]
    pub fail_handle: FailHandle,
    /// Seconds to wait for probe/alert_check/attempt_reset commands
    #[serde(default)]
    pub timeout: Option<f64>,
    /// Seconds to wait for the panic command, negative to not wait
    #[serde(default)]
    pub panic_timeout: Option<f64>,
}

fn default_warn_res() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_persist() -> f64 {
    5.0
}

fn default_interval() -> f64 {
    10.0
}

fn default_python() -> String {
    "python3".to_string()
}

/// Poll loop parameters from the `global` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Notification timeout in seconds (0 keeps it)
    #[serde(default = "default_persist")]
    pub persist: f64,
    /// Seconds between ticks
    #[serde(default = "default_interval")]
    pub interval: f64,
    /// Extra directories searched for descriptor files
    #[serde(default)]
    pub search_path: Vec<PathBuf>,
    /// Interpreter for `py:` descriptors
    #[serde(default = "default_python")]
    pub python: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            persist: default_persist(),
            interval: default_interval(),
            search_path: Vec::new(),
            python: default_python(),
        }
    }
}

/// Merged configuration from every location
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub entries: RawConfig,
    /// Files that contributed, lowest priority first
    pub sources: Vec<PathBuf>,
}

impl Config {
    /// Shipped defaults, then the user file, then `custom`
    pub fn load(custom: Option<&Path>) -> Result<Self> {
        let mut config = Self::from_yaml_str(SHIPPED_CONFIG)
            .with_context(|| "Failed to parse shipped configuration")?;

        if let Some(user) = Self::user_config_path() {
            if user.is_file() {
                config.merge_file(&user)?;
            }
        }

        if let Some(custom) = custom {
            config.merge_file(custom)?;
        }

        Ok(config)
    }

    /// `<config_dir>/prudence/config.yml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("prudence").join("config.yml"))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let mut config = Config::default();
        config.merge(parse_raw(text)?);
        Ok(config)
    }

    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let raw = parse_raw(&text).with_context(|| format!("Failed to parse config file: {:?}", path))?;
        self.merge(raw);
        self.sources.push(path.to_path_buf());
        Ok(())
    }

    /// Field-wise update: later values override, new signals are appended
    pub fn merge(&mut self, other: RawConfig) {
        for (name, params) in other {
            match self.entries.get_mut(&name) {
                Some(existing) => {
                    for (key, value) in params {
                        existing.insert(key, value);
                    }
                }
                None => {
                    self.entries.insert(name, params);
                }
            }
        }
    }

    pub fn global(&self) -> Result<GlobalConfig> {
        match self.entries.get(GLOBAL_KEY) {
            Some(params) => serde_yaml::from_value(Value::Mapping(params.clone()))
                .with_context(|| "Invalid 'global' configuration"),
            None => Ok(GlobalConfig::default()),
        }
    }

    /// Signal names, excluding `global`
    pub fn signal_names(&self) -> impl Iterator<Item = &str> {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(|name| *name != GLOBAL_KEY)
    }
}

fn parse_raw(text: &str) -> Result<RawConfig> {
    let parsed: Option<IndexMap<String, Option<Mapping>>> = serde_yaml::from_str(text)?;
    Ok(parsed
        .unwrap_or_default()
        .into_iter()
        .map(|(name, params)| (name, params.unwrap_or_default()))
        .collect())
}
