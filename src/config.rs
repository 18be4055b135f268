//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/bomtree/bomtree.toml`
//! 3. Local config: `<dir>/.bomtree.toml` (directory of the BOM file)
//! 4. Environment variables: `BOMTREE_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::fields;

/// CSV exchange format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CsvConfig {
    /// Field delimiter
    pub delimiter: char,
    /// Header of the level column
    pub level_header: String,
    /// Header of the path column
    pub path_header: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            level_header: "level".into(),
            path_header: "path".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCsvConfig {
    pub delimiter: Option<char>,
    pub level_header: Option<String>,
    pub path_header: Option<String>,
}

impl CsvConfig {
    fn merge(&self, overlay: &RawCsvConfig) -> Self {
        Self {
            delimiter: overlay.delimiter.unwrap_or(self.delimiter),
            level_header: overlay
                .level_header
                .clone()
                .unwrap_or_else(|| self.level_header.clone()),
            path_header: overlay
                .path_header
                .clone()
                .unwrap_or_else(|| self.path_header.clone()),
        }
    }
}

/// Raw settings for intermediate parsing (Option = "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub label_field: Option<String>,
    pub path_separator: Option<String>,
    pub expand_on_import: Option<bool>,
    pub hidden_columns: Option<Vec<String>>,
    pub csv: RawCsvConfig,
}

/// Unified configuration for bomtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Payload key used as the path label of exported rows
    pub label_field: String,
    /// Join string of the exported path cell
    pub path_separator: String,
    /// Expand every assembly after import
    pub expand_on_import: bool,
    /// Column keys not shown
    pub hidden_columns: Vec<String>,
    pub csv: CsvConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            label_field: fields::PART_NUMBER.into(),
            path_separator: " > ".into(),
            expand_on_import: true,
            hidden_columns: vec![],
            csv: CsvConfig::default(),
        }
    }
}

/// Get the XDG config directory for bomtree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "bomtree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("bomtree.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".bomtree.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["a", "b"], &["c"])       // → ["a", "b", "c"]
    /// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // Convert to sorted Vec for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            label_field: overlay
                .label_field
                .clone()
                .unwrap_or_else(|| self.label_field.clone()),
            path_separator: overlay
                .path_separator
                .clone()
                .unwrap_or_else(|| self.path_separator.clone()),
            expand_on_import: overlay.expand_on_import.unwrap_or(self.expand_on_import),
            hidden_columns: overlay
                .hidden_columns
                .as_ref()
                .map(|o| Self::merge_array(&self.hidden_columns, o))
                .unwrap_or_else(|| self.hidden_columns.clone()),
            csv: self.csv.merge(&overlay.csv),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    pub fn apply_global(&self, global: &RawSettings) -> Self {
        let mut merged = self.merge_with(global);
        if let Some(hidden) = &global.hidden_columns {
            merged.hidden_columns = hidden.clone();
        }
        merged
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.bomtree.toml`
    ///
    /// # Array Merge Semantics
    /// - Defaults → Global: REPLACE
    /// - Global → Local: UNION with `!item` negation
    /// - Any → Env vars: REPLACE
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        Self::load_layers(global_config_path().as_deref(), local_dir)
    }

    /// `load` with an explicit global file, which may not exist.
    pub fn load_layers(
        global_path: Option<&Path>,
        local_dir: Option<&Path>,
    ) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_path {
            if global_path.exists() {
                debug!("global config: {}", global_path.display());
                let raw = load_raw_settings(global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("local config: {}", local_path.display());
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        Self::apply_env_overrides(current)
    }

    /// Apply BOMTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("BOMTREE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("hidden_columns"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get_string("label_field") {
            settings.label_field = val;
        }
        if let Ok(val) = config.get_string("path_separator") {
            settings.path_separator = val;
        }
        if let Ok(val) = config.get_bool("expand_on_import") {
            settings.expand_on_import = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("hidden_columns") {
            settings.hidden_columns = val;
        }
        if let Ok(val) = config.get_string("csv.delimiter") {
            if let Some(c) = val.chars().next() {
                settings.csv.delimiter = c;
            }
        }
        if let Ok(val) = config.get_string("csv.level_header") {
            settings.csv.level_header = val;
        }
        if let Ok(val) = config.get_string("csv.path_header") {
            settings.csv.path_header = val;
        }

        Ok(settings)
    }

    /// Delimiter as the single byte the csv crate expects.
    pub fn csv_delimiter(&self) -> Result<u8, ApplicationError> {
        let c = self.csv.delimiter;
        if !c.is_ascii() {
            return Err(ApplicationError::Config {
                message: format!("csv delimiter must be ASCII: {:?}", c),
            });
        }
        Ok(c as u8)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# bomtree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/bomtree/bomtree.toml  (defines your baseline)
#   Local:  <bom_dir>/.bomtree.toml         (per-directory additions)
#   Env:    BOMTREE_* environment variables (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!item" in local config to REMOVE an inherited item:
#     hidden_columns = ["mfg3", "!remarks"]

# Payload field used to label rows in the exported path column
# label_field = "partNumber"

# Separator between labels in the path column
# path_separator = " > "

# Expand all assemblies after importing a file
# expand_on_import = true

# Columns not shown by `show`
# hidden_columns = ["mfg2", "mfg3"]

[csv]
# delimiter = ","
# level_header = "level"
# path_header = "path"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
