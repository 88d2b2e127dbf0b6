use crate::error::Result;
use crate::registry::client::ListingSource;
use crate::registry::endpoint::RegistryEndpoint;
use crate::registry::listing::Listing;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Rule deciding which directory names count as versions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// `latest` (any case) or `v1.2.3`-style numeric versions
    Strict,
    /// Any filesystem-safe directory name
    #[default]
    Permissive,
}

impl VersionPolicy {
    /// Whether `name` is accepted as a version under this policy
    #[must_use]
    pub fn matches(self, name: &str) -> bool {
        if name == "." || name == ".." {
            return false;
        }
        match self {
            Self::Strict => name.eq_ignore_ascii_case("latest") || strict_pattern().is_match(name),
            Self::Permissive => permissive_pattern().is_match(name),
        }
    }
}

impl std::fmt::Display for VersionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::Permissive => f.write_str("permissive"),
        }
    }
}

fn strict_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[vV]?[0-9]+(\.[0-9]+)*$").expect("strict version pattern is a valid regex")
    })
}

fn permissive_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._-]+$").expect("permissive version pattern is a valid regex")
    })
}

/// Deduplicated, lexicographically sorted directory names accepted by `policy`
#[must_use]
pub fn classify_directories(listing: &Listing, policy: VersionPolicy) -> Vec<String> {
    listing
        .directories()
        .filter(|entry| policy.matches(&entry.name))
        .map(|entry| entry.name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Version candidates for `tool` under `endpoint`
pub async fn discover_versions(
    source: &dyn ListingSource,
    endpoint: &RegistryEndpoint,
    tool: &str,
    policy: VersionPolicy,
) -> Result<Vec<String>> {
    let url = endpoint.tool_url(tool)?;
    let listing = source.fetch_listing(&url).await?;
    let versions = classify_directories(&listing, policy);
    tracing::debug!(
        "{tool}: {} of {} entries accepted as versions ({policy})",
        versions.len(),
        listing.entries.len()
    );
    Ok(versions)
}

/// Top-level variants (e.g. OS directories) directly under `endpoint`.
///
/// Always uses the permissive rule since variant names are not versions.
pub async fn discover_variants(
    source: &dyn ListingSource,
    endpoint: &RegistryEndpoint,
) -> Result<Vec<String>> {
    let url = endpoint.root_url()?;
    let listing = source.fetch_listing(&url).await?;
    Ok(classify_directories(&listing, VersionPolicy::Permissive))
}
