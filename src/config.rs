//! Configuration for msversion.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (MSVERSION_HOME, MSVERSION_LOGOS, MSVERSION_CERMINE_JAR)
//! 2. Config file (.msversion/config.yaml)
//! 3. Defaults (~/.msversion)
//!
//! Config file discovery:
//! - Searches current directory and parents for .msversion/config.yaml
//! - Paths in config file are relative to the .msversion/ directory

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::doi::{DEFAULT_DOI_BASE_URL, DEFAULT_USER_AGENT};
use crate::core::{Thresholds, Timeouts};

pub const ENV_HOME: &str = "MSVERSION_HOME";
pub const ENV_LOGOS: &str = "MSVERSION_LOGOS";
pub const ENV_CERMINE_JAR: &str = "MSVERSION_CERMINE_JAR";

/// Major schema version of `.msversion/config.yaml`
const SUPPORTED_CONFIG_MAJOR: &str = "1";

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Schema version; only 1.x is understood
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub catalogues: CataloguesConfig,
    #[serde(default)]
    pub cermine: CermineConfig,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub thresholds: Option<Thresholds>,
    #[serde(default)]
    pub timeouts: Option<Timeouts>,
}

fn default_version() -> String {
    "1.0".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory
    pub home: Option<String>,
    /// Audit log file
    pub audit_log: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CataloguesConfig {
    /// Publisher logo catalogue (YAML or JSON)
    pub logos: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CermineConfig {
    pub jar: Option<String>,
    pub java: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResolverConfig {
    pub base_url: Option<String>,
    pub user_agent: Option<String>,
}

/// DOI resolver settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverSettings {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_DOI_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Publisher logo catalogue
    pub logos: PathBuf,
    /// Audit log file
    pub audit_log: PathBuf,
    /// CERMINE jar; bibliographic extraction falls back to sidecars without it
    pub cermine_jar: Option<PathBuf>,
    /// Java launcher for CERMINE
    pub java: String,
    pub resolver: ResolverSettings,
    pub thresholds: Thresholds,
    pub timeouts: Timeouts,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".msversion").join("config.yaml");
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

    let config: ConfigFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    if config.version.split('.').next() != Some(SUPPORTED_CONFIG_MAJOR) {
        anyhow::bail!(
            "Unsupported config version '{}' in {} (expected {}.x)",
            config.version,
            path.display(),
            SUPPORTED_CONFIG_MAJOR
        );
    }
    Ok(config)
}

/// Resolve a path that may be relative to the config directory
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

/// Combine a config file (if any) with environment overrides
fn resolve(
    config_path: Option<&Path>,
    default_home: PathBuf,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig> {
    let config = match config_path {
        Some(path) => Some(load_config_file(path)?),
        None => None,
    };
    // Relative paths in the file are resolved against .msversion/
    let base_dir = config_path
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));
    let from_file = |value: Option<&String>| value.map(|v| resolve_path(base_dir, v));

    let home = env(ENV_HOME)
        .map(PathBuf::from)
        .or_else(|| from_file(config.as_ref().and_then(|c| c.paths.home.as_ref())))
        .unwrap_or(default_home);

    let logos = env(ENV_LOGOS)
        .map(PathBuf::from)
        .or_else(|| from_file(config.as_ref().and_then(|c| c.catalogues.logos.as_ref())))
        .unwrap_or_else(|| home.join("logos.yaml"));

    let audit_log = from_file(config.as_ref().and_then(|c| c.paths.audit_log.as_ref()))
        .unwrap_or_else(|| home.join("audit.jsonl"));

    let cermine_jar = env(ENV_CERMINE_JAR)
        .map(PathBuf::from)
        .or_else(|| from_file(config.as_ref().and_then(|c| c.cermine.jar.as_ref())));

    let Some(config) = config else {
        return Ok(ResolvedConfig {
            home,
            logos,
            audit_log,
            cermine_jar,
            java: "java".to_string(),
            resolver: ResolverSettings::default(),
            thresholds: Thresholds::default(),
            timeouts: Timeouts::default(),
            config_file: None,
        });
    };

    let defaults = ResolverSettings::default();
    Ok(ResolvedConfig {
        home,
        logos,
        audit_log,
        cermine_jar,
        java: config.cermine.java.unwrap_or_else(|| "java".to_string()),
        resolver: ResolverSettings {
            base_url: config.resolver.base_url.unwrap_or(defaults.base_url),
            user_agent: config.resolver.user_agent.unwrap_or(defaults.user_agent),
        },
        thresholds: config.thresholds.unwrap_or_default(),
        timeouts: config.timeouts.unwrap_or_default(),
        config_file: config_path.map(Path::to_path_buf),
    })
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".msversion");

    let config_file = find_config_file();
    resolve(config_file.as_deref(), default_home, &|key| std::env::var(key).ok())
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}
