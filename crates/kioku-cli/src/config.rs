//! Configuration management for Kioku CLI
//!
//! Stores engine thresholds and CLI defaults in ~/.config/kioku/config.toml

use anyhow::{bail, Context, Result};
use kioku::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

const CONFIG_DIR: &str = "kioku";
const CONFIG_FILE: &str = "config.toml";

/// CLI Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// User id stamped on records created from the command line
    #[serde(default = "default_user")]
    pub user: String,
    /// Record count `prune` cuts down to when no target is given
    #[serde(default = "default_prune_target")]
    pub prune_target: usize,
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_user() -> String {
    "default".to_string()
}

fn default_prune_target() -> usize {
    1000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: default_user(),
            prune_target: default_prune_target(),
            engine: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join(CONFIG_DIR);
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        Self::parse(&content)
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse config file")?;
        config.engine.validate()?;
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory {:?}", dir))?;

        let path = Self::config_path()?;
        let content = self.to_toml()?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }

    /// Set a value by dotted key, e.g. `engine.forgetting.decay_rate`.
    ///
    /// The value is read as TOML (numbers, booleans), falling back to a plain
    /// string. The result must still deserialize and validate.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<()> {
        let mut document = toml::Value::try_from(&*self).context("Failed to serialize config")?;

        let (path, leaf) = match key.rsplit_once('.') {
            Some((path, leaf)) => (path.split('.').collect::<Vec<_>>(), leaf),
            None => (Vec::new(), key),
        };

        let mut table = document
            .as_table_mut()
            .context("Config is not a table")?;
        for segment in path {
            table = table
                .entry(segment.to_string())
                .or_insert(toml::Value::Table(toml::map::Map::new()))
                .as_table_mut()
                .with_context(|| format!("'{}' is not a section", segment))?;
        }
        table.insert(leaf.to_string(), parse_value(raw));

        let updated: Config = document
            .try_into()
            .with_context(|| format!("Invalid value for '{}': {}", key, raw))?;
        updated.engine.validate()?;

        let before = toml::Value::try_from(&*self).context("Failed to serialize config")?;
        let after = toml::Value::try_from(&updated).context("Failed to serialize config")?;
        if before == after && !is_known_key(&after, key) {
            bail!("Unknown config key '{}'", key);
        }

        *self = updated;
        Ok(())
    }
}

fn parse_value(raw: &str) -> toml::Value {
    let trimmed = raw.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return toml::Value::Integer(v);
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return toml::Value::Float(v);
    }
    if let Ok(v) = trimmed.parse::<bool>() {
        return toml::Value::Boolean(v);
    }
    toml::Value::String(trimmed.to_string())
}

fn is_known_key(document: &toml::Value, key: &str) -> bool {
    key.split('.')
        .try_fold(document, |value, segment| value.get(segment))
        .is_some()
}
