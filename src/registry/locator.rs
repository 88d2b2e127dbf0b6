use crate::config::MatchingConfig;
use crate::error::Result;
use crate::registry::client::ListingSource;
use crate::registry::endpoint::RegistryEndpoint;
use crate::registry::listing::ListingNode;
use std::path::Path;

/// Which naming rule accepted an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactMatch {
    /// Known archive/image extension
    Extension,
    /// Vendor marker substring in the name
    VendorMarker,
    /// `image:tag` style name
    ImageTag,
}

/// An artifact path relative to its version directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactCandidate {
    /// `file` or `subdir/file`
    pub path: String,
    pub matched_by: ArtifactMatch,
}

impl ArtifactCandidate {
    /// Final path component, used as the local file name
    #[must_use]
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

impl std::fmt::Display for ArtifactCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.path)
    }
}

/// Artifact naming rules, tested in order: extension, vendor marker, colon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRules {
    extensions: Vec<String>,
    vendor_marker: String,
}

impl ArtifactRules {
    #[must_use]
    pub fn new(extensions: &[String], vendor_marker: &str) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            vendor_marker: vendor_marker.to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(&config.extensions, &config.vendor_marker)
    }

    /// First rule accepting `name`, if any
    #[must_use]
    pub fn classify(&self, name: &str) -> Option<ArtifactMatch> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        if extension.is_some_and(|ext| self.extensions.contains(&ext)) {
            Some(ArtifactMatch::Extension)
        } else if !self.vendor_marker.is_empty() && name.contains(&self.vendor_marker) {
            Some(ArtifactMatch::VendorMarker)
        } else if name.contains(':') {
            Some(ArtifactMatch::ImageTag)
        } else {
            None
        }
    }
}

impl Default for ArtifactRules {
    fn default() -> Self {
        Self::from_config(&MatchingConfig::default())
    }
}

/// Walk a version tree: direct files first, then the files of each
/// subdirectory. Directories below the first level are ignored.
#[must_use]
pub fn collect_artifacts(version: &ListingNode, rules: &ArtifactRules) -> Vec<ArtifactCandidate> {
    let direct = version.files().filter_map(|file| {
        rules.classify(&file.name).map(|matched_by| ArtifactCandidate {
            path: file.name.clone(),
            matched_by,
        })
    });

    let nested = version.directories().flat_map(|dir| {
        dir.files().filter_map(move |file| {
            rules.classify(&file.name).map(|matched_by| ArtifactCandidate {
                path: format!("{}/{}", dir.name, file.name),
                matched_by,
            })
        })
    });

    direct.chain(nested).collect()
}

/// Fetch `<endpoint>/<tool>/<version>/` plus one level of subdirectories
pub async fn fetch_version_tree(
    source: &dyn ListingSource,
    endpoint: &RegistryEndpoint,
    tool: &str,
    version: &str,
) -> Result<ListingNode> {
    let listing = source
        .fetch_listing(&endpoint.version_url(tool, version)?)
        .await?;
    let mut tree = ListingNode::from_listing(version, &listing);

    for child in tree.children.iter_mut().filter(|c| c.is_dir) {
        let url = endpoint.subdir_url(tool, version, &child.name)?;
        match source.fetch_listing(&url).await {
            Ok(sub) => {
                // Grandchildren stay unexpanded
                *child = ListingNode::from_listing(child.name.clone(), &sub);
            }
            Err(e) => {
                tracing::warn!("Skipping subdirectory {url}: {e}");
            }
        }
    }

    Ok(tree)
}

/// Artifact candidates for `tool` at `version`, in discovery order.
///
/// An empty result means "no artifacts", not an error.
pub async fn locate_artifacts(
    source: &dyn ListingSource,
    endpoint: &RegistryEndpoint,
    tool: &str,
    version: &str,
    rules: &ArtifactRules,
) -> Result<Vec<ArtifactCandidate>> {
    let tree = fetch_version_tree(source, endpoint, tool, version).await?;
    let artifacts = collect_artifacts(&tree, rules);
    tracing::debug!("{tool}:{version}: {} artifact(s) found", artifacts.len());
    Ok(artifacts)
}
