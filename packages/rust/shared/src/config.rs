//! Application configuration for casegraph.
//!
//! User config lives at `~/.casegraph/casegraph.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CaseGraphError, Result};
use crate::types::DEFAULT_REGISTRY_BASE;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "casegraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".casegraph";

// ---------------------------------------------------------------------------
// Config structs (matching casegraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Organizations attached to every generated entity.
    #[serde(default)]
    pub organizations: OrganizationsConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Registry resource namespace prefixed to every CTID.
    #[serde(default = "default_registry_base")]
    pub registry_base: String,

    /// Root directory all outputs are written under.
    #[serde(default = "default_output_root")]
    pub output_root: String,

    /// Course documents directory, relative to `output_root`.
    #[serde(default = "default_courses_dir")]
    pub courses_dir: String,

    /// Framework documents directory, relative to `output_root`.
    #[serde(default = "default_frameworks_dir")]
    pub frameworks_dir: String,

    /// Learning-program documents directory, relative to `output_root`.
    #[serde(default = "default_learning_programs_dir")]
    pub learning_programs_dir: String,

    /// Validation report file name, relative to `output_root`.
    #[serde(default = "default_validations_file")]
    pub validations_file: String,

    /// HTTP timeout when fetching a package.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            registry_base: default_registry_base(),
            output_root: default_output_root(),
            courses_dir: default_courses_dir(),
            frameworks_dir: default_frameworks_dir(),
            learning_programs_dir: default_learning_programs_dir(),
            validations_file: default_validations_file(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

fn default_registry_base() -> String {
    DEFAULT_REGISTRY_BASE.into()
}
fn default_output_root() -> String {
    ".".into()
}
fn default_courses_dir() -> String {
    "courses_out".into()
}
fn default_frameworks_dir() -> String {
    "frameworks_out".into()
}
fn default_learning_programs_dir() -> String {
    "learningprograms_out".into()
}
fn default_validations_file() -> String {
    "validations.json".into()
}
fn default_fetch_timeout() -> u64 {
    60
}

/// `[organizations]` section. Entries are CTIDs (`ce-…` or bare) or full
/// registry URIs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrganizationsConfig {
    /// Framework publishers. The first one also owns the publish wrapper.
    #[serde(default)]
    pub publisher: Vec<String>,

    /// Owners of courses and learning programs.
    #[serde(default)]
    pub owned_by: Vec<String>,

    /// Offerers of courses and learning programs. Only emitted when non-empty.
    #[serde(default)]
    pub offered_by: Vec<String>,
}

// ---------------------------------------------------------------------------
// Convert config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime conversion configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Registry resource namespace.
    pub registry_base: String,
    /// Raw publisher references.
    pub publisher: Vec<String>,
    /// Raw owner references.
    pub owned_by: Vec<String>,
    /// Raw offerer references; `None` when the caller did not opt in.
    pub offered_by: Option<Vec<String>>,
}

impl From<&AppConfig> for ConvertConfig {
    fn from(config: &AppConfig) -> Self {
        let offered_by = &config.organizations.offered_by;
        Self {
            registry_base: config.defaults.registry_base.clone(),
            publisher: config.organizations.publisher.clone(),
            owned_by: config.organizations.owned_by.clone(),
            offered_by: (!offered_by.is_empty()).then(|| offered_by.clone()),
        }
    }
}

impl ConvertConfig {
    /// Check the registry base is an absolute http(s) URL.
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.registry_base).map_err(|e| {
            CaseGraphError::config(format!(
                "registry base '{}' is not a valid URL: {e}",
                self.registry_base
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(CaseGraphError::config(format!(
                "registry base '{}' must use http or https",
                self.registry_base
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.casegraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CaseGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.casegraph/casegraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CaseGraphError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CaseGraphError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CaseGraphError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CaseGraphError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CaseGraphError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
