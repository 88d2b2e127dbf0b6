use std::path::PathBuf;
use thiserror::Error;

/// Main error type for regpull
#[derive(Error, Debug)]
pub enum PullError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("No usable entries found at {url}\n\nTroubleshooting:\n- Open the URL in a browser and check that it serves a directory index\n- Verify registry.base_url in config")]
    EmptyListing { url: String },

    #[error("Variant '{variant}' is not listed at {url}\n\nAvailable: {available}\n\nTroubleshooting:\n- Check the spelling of --variant\n- List variants with: regpull variants")]
    UnknownVariant {
        variant: String,
        url: String,
        available: String,
    },

    #[error("Invalid registry URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Cannot create directory {}: {source}\n\nTroubleshooting:\n- Check write permissions on the storage root\n- Set storage.root in config or pass --root", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config error: {0}\n\nTroubleshooting:\n- Check config file: ~/.config/regpull/config.toml\n- Print the effective config with: regpull config\n- Run with RUST_LOG=debug for more details")]
    Config(String),

    #[error("Run aborted: {0}")]
    Aborted(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PullError {
    /// Whether this error must stop the whole run.
    ///
    /// Per-tool and per-artifact failures are downgraded to skips by the
    /// session; only storage, configuration and aborted prompts are terminal
    /// on their own. Top-level discovery failures are escalated by the caller.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Filesystem { .. }
                | Self::Config(_)
                | Self::Aborted(_)
                | Self::InvalidUrl { .. }
                | Self::UnknownVariant { .. }
        )
    }
}

/// Failures talking to the registry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} timed out\n\nTroubleshooting:\n- Check that the registry host is reachable\n- Try increasing registry.listing_timeout_secs or registry.download_timeout_secs")]
    Timeout { url: String },

    #[error("request to {url} failed: {detail}\n\nTroubleshooting:\n- Check network connectivity and DNS\n- For self-signed registries, run with --insecure")]
    Transport { url: String, detail: String },
}

impl NetworkError {
    /// Classify a reqwest failure for `url`
    pub(crate) fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Transport {
                url: url.to_string(),
                detail: err.to_string(),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PullError>;
