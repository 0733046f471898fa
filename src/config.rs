//! Configuration for curator paths and run settings.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CURATOR_HOME, CURATOR_LIBRARY)
//! 2. Config file (.curator/config.yaml)
//! 3. Defaults (~/.curator)
//!
//! Config file discovery:
//! - Searches current directory and parents for .curator/config.yaml
//! - `home` is relative to the .curator/ directory, every other path to the
//!   directory containing it

pub mod paths;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::adapters::ffprobe::DEFAULT_PROBE_TIMEOUT;
use crate::core::scan::default_workers;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub scan: Option<ScanConfig>,
    #[serde(default)]
    pub execute: Option<ExecuteConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .curator/)
    pub home: Option<String>,
    /// Library root (relative to the project directory)
    pub library: Option<String>,
    /// Recycle directory; deletes are permanent when unset
    pub recycle: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanConfig {
    pub workers: Option<usize>,
    pub probe_timeout_seconds: Option<u64>,
    pub ffprobe: Option<String>,
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteConfig {
    pub workers: Option<usize>,
    pub overwrite: Option<bool>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Curator state directory (library.json, actions.log)
    pub home: PathBuf,
    /// Root of the curated library
    pub library: PathBuf,
    /// Soft-delete directory
    pub recycle: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub scan: ScanSettings,
    pub execute: ExecuteSettings,
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub workers: usize,
    pub probe_timeout: Duration,
    pub ffprobe: String,
    pub ignore: Vec<String>,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            ffprobe: "ffprobe".to_string(),
            ignore: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecuteSettings {
    pub workers: usize,
    pub overwrite: bool,
}

impl Default for ExecuteSettings {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            overwrite: false,
        }
    }
}

impl ScanSettings {
    fn from_file(config: Option<ScanConfig>) -> Self {
        let defaults = Self::default();
        let Some(config) = config else {
            return defaults;
        };

        Self {
            workers: config.workers.unwrap_or(defaults.workers),
            probe_timeout: config
                .probe_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.probe_timeout),
            ffprobe: config.ffprobe.unwrap_or(defaults.ffprobe),
            ignore: config.ignore,
        }
    }
}

impl ExecuteSettings {
    fn from_file(config: Option<ExecuteConfig>) -> Self {
        let defaults = Self::default();
        let Some(config) = config else {
            return defaults;
        };

        Self {
            workers: config.workers.unwrap_or(defaults.workers),
            overwrite: config.overwrite.unwrap_or(defaults.overwrite),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".curator").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".curator");

    let config_file = find_config_file();
    let env_home = std::env::var("CURATOR_HOME").ok().map(PathBuf::from);
    let env_library = std::env::var("CURATOR_LIBRARY").ok().map(PathBuf::from);

    let Some(ref config_path) = config_file else {
        let home = env_home.unwrap_or(default_home);
        let library = env_library.unwrap_or_else(|| home.join("library"));
        return Ok(ResolvedConfig {
            home,
            library,
            recycle: None,
            config_file: None,
            scan: ScanSettings::default(),
            execute: ExecuteSettings::default(),
        });
    };

    let config = load_config_file(config_path)?;
    let curator_dir = config_path.parent().unwrap_or(Path::new("."));
    let base_dir = curator_dir.parent().unwrap_or(Path::new("."));

    let home = match (env_home, &config.paths.home) {
        (Some(home), _) => home,
        (None, Some(home)) => resolve_path(curator_dir, home),
        (None, None) => default_home,
    };

    let library = match (env_library, &config.paths.library) {
        (Some(library), _) => library,
        (None, Some(library)) => resolve_path(base_dir, library),
        (None, None) => home.join("library"),
    };

    let recycle = config
        .paths
        .recycle
        .as_deref()
        .map(|recycle| resolve_path(base_dir, recycle));

    Ok(ResolvedConfig {
        home,
        library,
        recycle,
        config_file: config_file.clone(),
        scan: ScanSettings::from_file(config.scan),
        execute: ExecuteSettings::from_file(config.execute),
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Get the curator home directory (state).
pub fn curator_home() -> Result<PathBuf> {
    Ok(config()?.home.clone())
}
