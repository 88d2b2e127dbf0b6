//! regpull configuration
//!
//! A single TOML file at `$XDG_CONFIG_HOME/regpull/config.toml`
//! (`~/.config/regpull/config.toml` when unset) describes where the registry
//! lives, where artifacts land, and which tools a run walks through. Keys
//! left out of the file keep their built-in values; a missing file means
//! "all defaults". Command-line flags are applied on top by the binary, then
//! the result is checked with [`Config::validate`].
//!
//! ```no_run
//! use regpull::config::Config;
//!
//! let mut config = Config::load().expect("Failed to load config");
//! config.tools = vec!["ganglia_reg".to_string()];
//! config.validate().expect("Invalid configuration");
//! println!("{} -> {}", config.registry.base_url, config.storage.root.display());
//! ```

pub mod schema;

pub use schema::{config_path, Config, MatchingConfig, RegistryConfig, StorageConfig};
