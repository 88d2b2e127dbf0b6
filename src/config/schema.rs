use crate::error::{PullError, Result};
use crate::registry::discovery::VersionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default = "default_listing_timeout_secs")]
    pub listing_timeout_secs: u64,
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MatchingConfig {
    #[serde(default)]
    pub version_policy: VersionPolicy,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_vendor_marker")]
    pub vendor_marker: String,
}

// Default value functions
fn default_base_url() -> String {
    "https://hpcsangrah-test.pune.cdac.in:8008/vault/OpenCHAI/hpcsuite_registry/container_img_reg"
        .to_string()
}
fn default_listing_timeout_secs() -> u64 {
    10
}
fn default_download_timeout_secs() -> u64 {
    30
}
fn default_root() -> PathBuf {
    PathBuf::from("hpcsuite_registry/container_img_reg")
}
fn default_true() -> bool {
    true
}
fn default_extensions() -> Vec<String> {
    ["tar", "img", "gz", "xz", "bz2", "tgz"]
        .iter()
        .map(ToString::to_string)
        .collect()
}
fn default_vendor_marker() -> String {
    "cdac_".to_string()
}
fn default_tools() -> Vec<String> {
    [
        "chakshu-front_reg",
        "ganglia_reg",
        "ldap_reg",
        "nagios_reg",
        "osticket_reg",
        "xCAT_reg",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            verify_tls: false,
            listing_timeout_secs: default_listing_timeout_secs(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            show_progress: default_true(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            version_policy: VersionPolicy::default(),
            extensions: default_extensions(),
            vendor_marker: default_vendor_marker(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tools: default_tools(),
            registry: RegistryConfig::default(),
            storage: StorageConfig::default(),
            matching: MatchingConfig::default(),
        }
    }
}

impl RegistryConfig {
    #[must_use]
    pub const fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    #[must_use]
    pub const fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load and validate config from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PullError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate config from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| PullError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PullError::Config(format!("Failed to serialize config: {e}")))
    }

    /// Check invariants the run depends on
    pub fn validate(&self) -> Result<()> {
        if self.tools.is_empty() {
            return Err(PullError::Config("No tools configured".to_string()));
        }

        let mut seen = HashSet::new();
        for tool in &self.tools {
            if !is_safe_component(tool) {
                return Err(PullError::Config(format!(
                    "Tool name '{tool}' must be a single directory name"
                )));
            }
            if !seen.insert(tool.as_str()) {
                return Err(PullError::Config(format!("Tool '{tool}' is listed twice")));
            }
        }

        if self.matching.extensions.is_empty() {
            return Err(PullError::Config(
                "matching.extensions must not be empty".to_string(),
            ));
        }

        if self.registry.listing_timeout_secs == 0 || self.registry.download_timeout_secs == 0 {
            return Err(PullError::Config("Timeouts must be at least 1 second".to_string()));
        }

        url::Url::parse(&self.registry.base_url).map_err(|e| {
            PullError::Config(format!("Invalid base_url '{}': {e}", self.registry.base_url))
        })?;

        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/regpull/config.toml`, or `~/.config/regpull/config.toml`
pub fn config_path() -> Result<PathBuf> {
    let config_dir = if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config)
    } else {
        dirs::home_dir()
            .ok_or_else(|| PullError::Config("HOME env var not set".to_string()))?
            .join(".config")
    };

    Ok(config_dir.join("regpull").join("config.toml"))
}

/// A single, non-navigating path component
pub(crate) fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
        && !name.chars().any(char::is_control)
}
