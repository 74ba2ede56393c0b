//! `dbmorph.toml` configuration file
//!
//! Every section is optional. Command line flags are applied on top of the
//! loaded values, which in turn override the built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use dbmorph_driver_mysql::ExtractOptions;
use dbmorph_schema_tools::{CompareOptions, MigrationConfig};

#[cfg(test)]
mod tests;

pub const DEFAULT_CONFIG_FILE: &str = "dbmorph.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DbmorphConfig {
    pub compare: CompareSettings,
    pub migration: MigrationSettings,
    pub logging: LoggingSettings,
}

impl DbmorphConfig {
    /// Loads `path` when given, else `./dbmorph.toml` when present, else defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_file(path),
            None => {
                let path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_toml(&content).with_context(|| format!("Failed to parse config {:?}", path))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid dbmorph configuration")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompareSettings {
    pub include_tables: bool,
    pub include_views: bool,
    pub include_procedures: bool,
    pub include_triggers: bool,
    pub destructive: bool,
    pub case_sensitive: bool,
    /// Destination tables known to hold no rows
    pub empty_tables: Vec<String>,
}

impl Default for CompareSettings {
    fn default() -> Self {
        Self {
            include_tables: true,
            include_views: true,
            include_procedures: true,
            include_triggers: true,
            destructive: false,
            case_sensitive: true,
            empty_tables: Vec::new(),
        }
    }
}

impl CompareSettings {
    pub fn to_options(&self) -> CompareOptions {
        let mut options = CompareOptions::new();
        options.include_tables = self.include_tables;
        options.include_views = self.include_views;
        options.include_procedures = self.include_procedures;
        options.include_triggers = self.include_triggers;
        options.destructive = self.destructive;
        options.case_sensitive = self.case_sensitive;
        self.empty_tables
            .iter()
            .fold(options, |options, table| options.with_empty_table(table))
    }

    /// Extraction only needs the kinds that will be compared
    pub fn to_extract_options(&self) -> ExtractOptions {
        ExtractOptions {
            include_tables: self.include_tables,
            include_views: self.include_views,
            include_procedures: self.include_procedures,
            include_triggers: self.include_triggers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    pub use_if_exists: bool,
    pub include_comments: bool,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            use_if_exists: true,
            include_comments: true,
        }
    }
}

impl MigrationSettings {
    pub fn to_config(&self) -> MigrationConfig {
        MigrationConfig::new()
            .with_if_exists(self.use_if_exists)
            .with_comments(self.include_comments)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive used when RUST_LOG is unset
    pub filter: String,
    /// Emit log lines as JSON objects
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
            json: false,
        }
    }
}
