use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use toml::Table;

use super::platform::Platform;

const DEFAULTS: &str = include_str!("../../config/default.toml");

/// File name of the per-project config, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "adf-stage.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub component: ComponentConfig,
    pub target: TargetConfig,
    pub esp_adf: EspAdfConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub working_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentConfig {
    pub id: String,
    pub namespace: String,
    pub project_namespace: String,
    pub media_player: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub framework: String,
    #[serde(default)]
    pub board: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EspAdfConfig {
    #[serde(default)]
    pub board: Option<String>,
    #[serde(default)]
    pub platforms: Vec<Platform>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: bool,
}

/// Values supplied on the command line. They win over every file layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub working_dir: Option<PathBuf>,
    pub board: Option<String>,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config → project config → CLI.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let mut layers = vec![default_layer()?];

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "adf-stage") {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                tracing::debug!("loading user config {}", config_path.display());
                layers.push(read_table(&config_path)?);
            }
        }

        match overrides.config_file.as_ref() {
            Some(path) => {
                if !path.is_file() {
                    bail!("config file not found: {}", path.display());
                }
                layers.push(read_table(path)?);
            }
            None => {
                let working_dir = match overrides.working_dir.as_ref() {
                    Some(dir) => dir.clone(),
                    None => Self::from_layers(layers.clone())?.working_dir()?,
                };
                let project_path = working_dir.join(PROJECT_CONFIG_FILE);
                if project_path.is_file() {
                    tracing::debug!("loading project config {}", project_path.display());
                    layers.push(read_table(&project_path)?);
                }
            }
        }

        let mut config = Self::from_layers(layers)?;
        config.apply(overrides);
        Ok(config)
    }

    /// Deep-merge the given tables in order and deserialize the result.
    pub fn from_layers(layers: impl IntoIterator<Item = Table>) -> Result<Self> {
        let mut merged = Table::new();
        for layer in layers {
            merge_tables(&mut merged, layer);
        }

        toml::Value::Table(merged)
            .try_into()
            .context("invalid configuration")
    }

    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = overrides.working_dir.as_ref() {
            self.general.working_dir = dir.to_string_lossy().into_owned();
        }
        if let Some(board) = overrides.board.as_ref() {
            self.esp_adf.board = Some(board.clone());
        }
    }

    /// Working directory with `~` expanded. Relative paths stay relative to the process cwd.
    pub fn working_dir(&self) -> Result<PathBuf> {
        let raw = &self.general.working_dir;
        if !raw.starts_with('~') {
            return Ok(PathBuf::from(raw));
        }

        let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
        Ok(PathBuf::from(raw.replacen('~', &home.to_string_lossy(), 1)))
    }
}

/// The built-in `config/default.toml` as a raw table.
pub fn default_layer() -> Result<Table> {
    toml::from_str(DEFAULTS).context("parsing built-in defaults")
}

/// Recursively merge `overlay` into `base`. Nested tables merge, everything else replaces.
pub fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn read_table(path: &Path) -> Result<Table> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
