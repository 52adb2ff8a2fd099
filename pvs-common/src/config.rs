//! Configuration loading and path resolution
//!
//! Two layers, resolved once at startup:
//! 1. **TOML file**: every setting, all optional on disk
//! 2. **Overrides**: command-line arguments, then environment variables
//!
//! Path priority for each named root: command line → environment → TOML.
//! The resolved [`PipelineConfig`] is passed explicitly into every component;
//! nothing below the binary reads the environment.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the config file
pub const ENV_CONFIG: &str = "PVS_CONFIG";
/// Environment override for the per-subject project root
pub const ENV_PROJECT_ROOT: &str = "PVS_PROJECT_ROOT";
/// Environment override for the key file
pub const ENV_KEY_FILE: &str = "PVS_KEY_FILE";
/// Environment override for the clinical roster
pub const ENV_ROSTER: &str = "PVS_ROSTER";
/// Environment override for the report output directory
pub const ENV_OUTPUT_DIR: &str = "PVS_OUTPUT_DIR";

/// Settings as they appear in the TOML file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Directory holding one subdirectory per subject code
    #[serde(default)]
    pub project_root: Option<PathBuf>,

    /// Flat `<code>=<name>_<name>` key file
    #[serde(default)]
    pub key_file: Option<PathBuf>,

    /// Clinical roster (CSV export of the spreadsheet)
    #[serde(default)]
    pub roster_path: Option<PathBuf>,

    /// Report output directory (default `<project_root>/summary`)
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub raw_data: RawDataRoots,

    #[serde(default)]
    pub roster: RosterColumns,

    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub cohort: CohortConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Raw imaging data roots, searched in order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawDataRoots {
    /// Searched first; sessions live under `<name>/mri/mprage`
    #[serde(default)]
    pub primary: Option<PathBuf>,
    /// Searched second; sessions live under `<name>/mri`
    #[serde(default)]
    pub alternate: Option<PathBuf>,
}

/// Roster column names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterColumns {
    #[serde(default = "default_first_name_column")]
    pub first_name: String,
    #[serde(default = "default_last_name_column")]
    pub last_name: String,
    #[serde(default = "default_dob_column")]
    pub dob: String,
}

impl Default for RosterColumns {
    fn default() -> Self {
        Self {
            first_name: default_first_name_column(),
            last_name: default_last_name_column(),
            dob: default_dob_column(),
        }
    }
}

/// External imaging tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Overlap tool; invoked as `<overlap> <mask> <mask>`
    #[serde(default = "default_overlap_tool")]
    pub overlap: String,

    /// Cluster segmentation tool
    #[serde(default = "default_clusterize_tool")]
    pub clusterize: String,

    /// Arguments placed after `-inset <mask>`
    #[serde(default = "default_clusterize_args")]
    pub clusterize_args: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            overlap: default_overlap_tool(),
            clusterize: default_clusterize_tool(),
            clusterize_args: default_clusterize_args(),
        }
    }
}

/// Cohort conventions and filtering policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CohortConfig {
    /// Substring of a code marking a healthy volunteer
    #[serde(default = "default_hv_marker")]
    pub hv_marker: String,

    /// Largest plausible cluster, in voxels
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: u64,

    /// Preamble lines preceding the column header in cluster reports
    #[serde(default = "default_report_header_lines")]
    pub cluster_report_header_lines: usize,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            hv_marker: default_hv_marker(),
            volume_threshold: default_volume_threshold(),
            cluster_report_header_lines: default_report_header_lines(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_first_name_column() -> String {
    "First Name".to_string()
}

fn default_last_name_column() -> String {
    "Last Name".to_string()
}

fn default_dob_column() -> String {
    "Patient Profile ::DOB".to_string()
}

fn default_overlap_tool() -> String {
    "3dOverlap".to_string()
}

fn default_clusterize_tool() -> String {
    "3dClusterize".to_string()
}

fn default_clusterize_args() -> Vec<String> {
    ["-ithr", "0", "-idat", "0", "-NN", "1", "-bisided", "-0.5", "0.5"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_hv_marker() -> String {
    "hv".to_string()
}

fn default_volume_threshold() -> u64 {
    500
}

fn default_report_header_lines() -> usize {
    16
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Path overrides taken from the command line
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub project_root: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub roster_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
}

/// Fully resolved configuration handed to the pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub project_root: PathBuf,
    pub key_file: PathBuf,
    pub roster_path: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub raw_data: RawDataRoots,
    pub roster: RosterColumns,
    pub tools: ToolsConfig,
    pub cohort: CohortConfig,
    pub logging: LoggingConfig,
}

impl PipelineConfig {
    /// Merge overrides into the TOML layer
    ///
    /// Fails when the project root or key file is not named anywhere.
    pub fn resolve(toml: TomlConfig, overrides: PathOverrides) -> Result<Self> {
        let project_root = pick_path("project_root", overrides.project_root, ENV_PROJECT_ROOT, toml.project_root)
            .ok_or_else(|| missing_setting("project_root", ENV_PROJECT_ROOT))?;
        let key_file = pick_path("key_file", overrides.key_file, ENV_KEY_FILE, toml.key_file)
            .ok_or_else(|| missing_setting("key_file", ENV_KEY_FILE))?;
        let roster_path = pick_path("roster_path", overrides.roster_path, ENV_ROSTER, toml.roster_path);
        let output_dir = pick_path("output_dir", overrides.output_dir, ENV_OUTPUT_DIR, toml.output_dir)
            .unwrap_or_else(|| project_root.join("summary"));

        Ok(Self {
            project_root,
            key_file,
            roster_path,
            output_dir,
            raw_data: toml.raw_data,
            roster: toml.roster,
            tools: toml.tools,
            cohort: toml.cohort,
            logging: toml.logging,
        })
    }

    /// Check the roots a run cannot do without
    ///
    /// A missing project root aborts the run. Raw-data roots are
    /// optional: a missing one only means no acquisition dates from it.
    pub fn validate(&self) -> Result<()> {
        if !self.project_root.is_dir() {
            return Err(Error::Config(format!(
                "Project root is not a directory: {}",
                self.project_root.display()
            )));
        }
        for root in [&self.raw_data.primary, &self.raw_data.alternate]
            .into_iter()
            .flatten()
        {
            if !root.is_dir() {
                warn!("Raw data root does not exist: {}", root.display());
            }
        }
        Ok(())
    }

    /// Key file, required by the roster-driven commands
    pub fn require_key_file(&self) -> Result<&Path> {
        if !self.key_file.is_file() {
            return Err(Error::NotFound(self.key_file.clone()));
        }
        Ok(&self.key_file)
    }

    /// Roster path, required by the roster-driven commands
    pub fn require_roster(&self) -> Result<&Path> {
        self.roster_path.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "Roster path not configured (set roster_path, --roster or {})",
                ENV_ROSTER
            ))
        })
    }
}

fn pick_path(
    name: &str,
    cli: Option<PathBuf>,
    env_var: &str,
    toml: Option<PathBuf>,
) -> Option<PathBuf> {
    if let Some(path) = cli {
        debug!(setting = name, path = %path.display(), "Using command-line path");
        return Some(path);
    }
    if let Ok(value) = std::env::var(env_var) {
        if !value.trim().is_empty() {
            debug!(setting = name, path = %value, "Using path from {}", env_var);
            return Some(PathBuf::from(value));
        }
    }
    if let Some(path) = toml {
        debug!(setting = name, path = %path.display(), "Using TOML path");
        return Some(path);
    }
    None
}

fn missing_setting(name: &str, env_var: &str) -> Error {
    Error::Config(format!(
        "{} not configured. Set it in the TOML config, on the command line, or via {}",
        name, env_var
    ))
}

/// Locate the config file
///
/// Priority: explicit path → `PVS_CONFIG` → `~/.config/pvs/config.toml` →
/// `/etc/pvs/config.toml`. An explicit path is returned even if it does not
/// exist so the caller reports it; the fallbacks are only returned if present.
pub fn locate_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(ENV_CONFIG) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("pvs").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    let system_config = PathBuf::from("/etc/pvs/config.toml");
    if system_config.exists() {
        return Some(system_config);
    }
    None
}

/// Load a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        return Err(Error::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Load the config file if one can be located, defaults otherwise
pub fn load_or_default(explicit: Option<&Path>) -> Result<TomlConfig> {
    match locate_config_file(explicit) {
        Some(path) => {
            debug!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        None => {
            warn!("No config file found, relying on command line and environment");
            Ok(TomlConfig::default())
        }
    }
}

/// Write TOML config atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, target: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let temp = target.with_extension("toml.tmp");
    std::fs::write(&temp, content)?;
    std::fs::rename(&temp, target)?;
    Ok(())
}
