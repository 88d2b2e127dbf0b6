use crate::config::schema::is_safe_component;
use crate::error::{PullError, Result};
use url::Url;

/// Base location of a registry plus its TLS policy.
///
/// Set once after the top-level choice and passed by reference into every
/// discovery, locate and download call for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEndpoint {
    base: Url,
    verify_tls: bool,
}

impl RegistryEndpoint {
    /// Parse a base location. Trailing slashes are ignored.
    pub fn new(base: &str, verify_tls: bool) -> Result<Self> {
        let trimmed = base.trim().trim_end_matches('/');
        let base = Url::parse(trimmed).map_err(|e| PullError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;

        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(PullError::InvalidUrl {
                url: base.to_string(),
                reason: "expected an http(s) location".to_string(),
            });
        }

        Ok(Self { base, verify_tls })
    }

    /// Endpoint for a top-level variant directory (e.g. `rocky9`)
    pub fn variant(&self, name: &str) -> Result<Self> {
        if !is_safe_component(name) {
            return Err(PullError::InvalidUrl {
                url: format!("{self}/{name}"),
                reason: "variant must be a single directory name".to_string(),
            });
        }
        Self::new(self.join(&[name])?.as_str(), self.verify_tls)
    }

    #[must_use]
    pub const fn verify_tls(&self) -> bool {
        self.verify_tls
    }

    /// The endpoint itself, as a directory URL
    pub fn root_url(&self) -> Result<Url> {
        self.dir_url(&[])
    }

    /// `<endpoint>/<tool>/`
    pub fn tool_url(&self, tool: &str) -> Result<Url> {
        self.dir_url(&[tool])
    }

    /// `<endpoint>/<tool>/<version>/`
    pub fn version_url(&self, tool: &str, version: &str) -> Result<Url> {
        self.dir_url(&[tool, version])
    }

    /// `<endpoint>/<tool>/<version>/<subdir>/`
    pub fn subdir_url(&self, tool: &str, version: &str, subdir: &str) -> Result<Url> {
        self.dir_url(&[tool, version, subdir])
    }

    /// `<endpoint>/<tool>/<version>/<relative artifact path>`
    pub fn artifact_url(&self, tool: &str, version: &str, artifact: &str) -> Result<Url> {
        self.join(&[tool, version, artifact])
    }

    fn dir_url(&self, segments: &[&str]) -> Result<Url> {
        let url = self.join(segments)?;
        Self::parse(&format!("{url}/"))
    }

    // String joining rather than `Url::join`, since names like `image:tag`
    // would otherwise be read as a URL scheme.
    fn join(&self, segments: &[&str]) -> Result<Url> {
        let mut joined = self.base.as_str().trim_end_matches('/').to_string();
        for segment in segments {
            let segment = segment.trim_matches('/');
            if segment.is_empty() {
                continue;
            }
            joined.push('/');
            joined.push_str(segment);
        }
        Self::parse(&joined)
    }

    fn parse(raw: &str) -> Result<Url> {
        Url::parse(raw).map_err(|e| PullError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Display for RegistryEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.base.as_str().trim_end_matches('/'))
    }
}
