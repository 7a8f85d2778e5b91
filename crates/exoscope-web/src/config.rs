//! Configuration loading for the Exoscope web server.
//! Reads exoscope.toml from the current directory or the path in EXOSCOPE_CONFIG.
//! A missing file means "all defaults".

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Context;
use exoscope_common::error::{ExoscopeError, Result};
use exoscope_lightcurve::{BlsConfig, FlattenConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Served under `/static`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
    /// Optional directory whose templates replace the built-in ones.
    #[serde(default)]
    pub templates_dir: Option<PathBuf>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind() -> SocketAddr { SocketAddr::from(([127, 0, 0, 1], 5000)) }
fn default_static_dir() -> PathBuf { PathBuf::from("exoplanet_webapp/static") }
fn default_max_upload_bytes() -> usize { 16 * 1024 * 1024 }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            static_dir: default_static_dir(),
            templates_dir: None,
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    /// Dataset that uploaded planets are appended to.
    #[serde(default = "default_dataset")]
    pub dataset: String,
}

fn default_catalog_path() -> PathBuf { PathBuf::from("exoplanet_webapp/static/data/exoplanets.json") }
fn default_dataset() -> String { "custom".to_string() }

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
            dataset: default_dataset(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// When false, uploads are acknowledged but never analysed.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Bytes reported in the preview message for files that cannot be analysed.
    #[serde(default = "default_preview_bytes")]
    pub preview_bytes: usize,
    #[serde(default)]
    pub bls: BlsConfig,
    #[serde(default)]
    pub flatten: FlattenConfig,
}

fn default_enabled() -> bool { true }
fn default_preview_bytes() -> usize { 1024 }

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            preview_bytes: default_preview_bytes(),
            bls: BlsConfig::default(),
            flatten: FlattenConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset.
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String { "info".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

impl Config {
    /// Load configuration from exoscope.toml (or EXOSCOPE_CONFIG), then apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("EXOSCOPE_CONFIG")
            .unwrap_or_else(|_| "exoscope.toml".to_string());

        let mut config = if Path::new(&path).exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            let config = Self::from_toml_str(&content)
                .with_context(|| format!("parsing config file {path}"))?;
            info!("Loaded configuration from {}", path);
            config
        } else {
            info!("No config file at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ExoscopeError::Config(e.to_string()))
    }

    /// EXOSCOPE_BIND, EXOSCOPE_CATALOG and EXOSCOPE_PERIOD_SEARCH take precedence over the file.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(bind) = std::env::var("EXOSCOPE_BIND") {
            self.server.bind = bind
                .parse()
                .map_err(|e| ExoscopeError::Config(format!("EXOSCOPE_BIND '{bind}': {e}")))?;
        }
        if let Ok(catalog) = std::env::var("EXOSCOPE_CATALOG") {
            self.catalog.path = PathBuf::from(catalog);
        }
        if let Ok(flag) = std::env::var("EXOSCOPE_PERIOD_SEARCH") {
            self.analysis.enabled = parse_flag(&flag).ok_or_else(|| {
                ExoscopeError::Config(format!("EXOSCOPE_PERIOD_SEARCH must be true/false, got '{flag}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.analysis.bls.validate()?;
        self.analysis.flatten.validate()?;
        if self.catalog.dataset.trim().is_empty() {
            return Err(ExoscopeError::Config("catalog.dataset must not be empty".to_string()));
        }
        if self.server.max_upload_bytes == 0 {
            return Err(ExoscopeError::Config("server.max_upload_bytes must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
