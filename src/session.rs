use crate::config::Config;
use crate::download::{DownloadOutcome, DownloadTask, Downloader};
use crate::error::{PullError, Result};
use crate::provision::ensure_layout;
use crate::registry::{
    discover_variants, discover_versions, locate_artifacts, ArtifactRules, ListingSource,
    RegistryEndpoint,
};
use crate::select::{Prompter, Selection, Selector};
use std::fmt;

/// What happened to one tool during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolReport {
    pub tool: String,
    pub version: Option<String>,
    pub status: ToolStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    /// Nothing downloaded, with a short reason
    Skipped(String),
    /// One outcome per selected artifact
    Processed(Vec<DownloadOutcome>),
}

/// Per-tool results of a complete run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub endpoint: String,
    pub tools: Vec<ToolReport>,
}

impl RunSummary {
    fn outcomes(&self) -> impl Iterator<Item = &DownloadOutcome> {
        self.tools.iter().flat_map(|report| match &report.status {
            ToolStatus::Processed(outcomes) => outcomes.as_slice(),
            ToolStatus::Skipped(_) => &[][..],
        })
    }

    #[must_use]
    pub fn downloaded(&self) -> usize {
        self.outcomes().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes().filter(|o| !o.is_success()).count()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Summary for {}", self.endpoint)?;
        for report in &self.tools {
            let label = match &report.version {
                Some(version) => format!("{}:{version}", report.tool),
                None => report.tool.clone(),
            };
            match &report.status {
                ToolStatus::Skipped(reason) => writeln!(f, "  {label}: skipped ({reason})")?,
                ToolStatus::Processed(outcomes) => {
                    writeln!(f, "  {label}:")?;
                    for outcome in outcomes {
                        match outcome {
                            DownloadOutcome::Completed { path, bytes } => writeln!(
                                f,
                                "    ✓ {} ({})",
                                path.display(),
                                crate::download::format_bytes(*bytes)
                            )?,
                            DownloadOutcome::Failed { path, reason } => {
                                writeln!(f, "    ✗ {} ({reason})", path.display())?;
                            }
                        }
                    }
                }
            }
        }
        write!(
            f,
            "{} downloaded, {} failed",
            self.downloaded(),
            self.failed()
        )
    }
}

/// One interactive run: provision, pick a variant, then walk every tool
pub struct Session<S, P> {
    config: Config,
    source: S,
    downloader: Downloader,
    selector: Selector<P>,
    rules: ArtifactRules,
}

impl<S: ListingSource, P: Prompter> Session<S, P> {
    #[must_use]
    pub fn new(config: Config, source: S, downloader: Downloader, prompter: P) -> Self {
        let rules = ArtifactRules::from_config(&config.matching);
        Self {
            config,
            source,
            downloader,
            selector: Selector::new(prompter),
            rules,
        }
    }

    pub fn into_prompter(self) -> P {
        self.selector.into_prompter()
    }

    /// Run to completion.
    ///
    /// Errors only for storage provisioning, top-level discovery, and
    /// operator I/O; everything per tool is reported in the summary.
    pub async fn run(&mut self, variant: Option<&str>) -> Result<RunSummary> {
        ensure_layout(&self.config.storage.root, &self.config.tools)?;

        let endpoint = self.select_endpoint(variant).await?;
        tracing::info!("Using registry endpoint {endpoint}");

        let tools = self.config.tools.clone();
        let mut reports = Vec::with_capacity(tools.len());
        for tool in &tools {
            reports.push(self.process_tool(&endpoint, tool).await?);
        }

        Ok(RunSummary {
            endpoint: endpoint.to_string(),
            tools: reports,
        })
    }

    /// Resolve the active endpoint from the base URL and the top-level choice
    pub async fn select_endpoint(&mut self, variant: Option<&str>) -> Result<RegistryEndpoint> {
        let root = RegistryEndpoint::new(
            &self.config.registry.base_url,
            self.config.registry.verify_tls,
        )?;

        let variants = discover_variants(&self.source, &root).await?;
        if variants.is_empty() {
            return Err(PullError::EmptyListing {
                url: root.root_url()?.to_string(),
            });
        }

        if let Some(variant) = variant {
            if !variants.iter().any(|v| v == variant) {
                return Err(PullError::UnknownVariant {
                    variant: variant.to_string(),
                    url: root.root_url()?.to_string(),
                    available: variants.join(", "),
                });
            }
            return root.variant(variant);
        }

        let selected = self
            .selector
            .choose_required("Available OS Versions:", "Select OS Version", &variants)?
            .clone();
        self.selector
            .notify(&format!("Selected OS Version: {selected}"))?;
        root.variant(&selected)
    }

    async fn process_tool(&mut self, endpoint: &RegistryEndpoint, tool: &str) -> Result<ToolReport> {
        self.selector.notify(&format!("\nChecking {tool}..."))?;

        let discovered = discover_versions(
            &self.source,
            endpoint,
            tool,
            self.config.matching.version_policy,
        )
        .await;
        let versions = match discovered {
            Ok(versions) if versions.is_empty() => {
                return self.skip(tool, None, "no versions found".to_string());
            }
            Ok(versions) => versions,
            Err(e) => return self.skip(tool, None, format!("version listing failed: {e}")),
        };

        let (choice, selection) = self.selector.choose_one(
            &format!("Versions available for: {tool}"),
            &format!("Select version for {tool} (blank=skip)"),
            &versions,
        )?;
        let Some(version) = choice.cloned() else {
            return self.skip(tool, None, skip_reason(&selection));
        };

        let located = locate_artifacts(&self.source, endpoint, tool, &version, &self.rules).await;
        let artifacts = match located {
            Ok(artifacts) if artifacts.is_empty() => {
                return self.skip(tool, Some(version), "no image files found".to_string());
            }
            Ok(artifacts) => artifacts,
            Err(e) => {
                return self.skip(tool, Some(version), format!("artifact listing failed: {e}"));
            }
        };

        let (picked, selection) = self.selector.choose_many(
            &format!("Available images for {tool}:{version}"),
            "Select image(s) to download (comma-separated, blank=skip)",
            &artifacts,
        )?;
        if picked.is_empty() {
            return self.skip(tool, Some(version), skip_reason(&selection));
        }

        let mut outcomes = Vec::with_capacity(picked.len());
        for artifact in picked {
            let task = match DownloadTask::for_artifact(
                endpoint,
                &self.config.storage.root,
                tool,
                &version,
                artifact,
            ) {
                Ok(task) => task,
                Err(e) => {
                    tracing::warn!("Skipping {artifact}: {e}");
                    self.selector
                        .notify(&format!("Skipping {artifact}: {e}"))?;
                    continue;
                }
            };

            self.selector
                .notify(&format!("Downloading: {tool}:{version} -> {artifact}"))?;
            let outcome = self.downloader.download(&task).await;
            match &outcome {
                DownloadOutcome::Completed { path, .. } => {
                    self.selector
                        .notify(&format!("✓ Saved: {}", path.display()))?;
                }
                DownloadOutcome::Failed { reason, .. } => {
                    self.selector
                        .notify(&format!("✗ Failed {artifact} ({reason})"))?;
                }
            }
            outcomes.push(outcome);
        }

        Ok(ToolReport {
            tool: tool.to_string(),
            version: Some(version),
            status: ToolStatus::Processed(outcomes),
        })
    }

    fn skip(&mut self, tool: &str, version: Option<String>, reason: String) -> Result<ToolReport> {
        tracing::warn!("Skipping {tool}: {reason}");
        self.selector
            .notify(&format!("Skipping {tool}: {reason}"))?;
        Ok(ToolReport {
            tool: tool.to_string(),
            version,
            status: ToolStatus::Skipped(reason),
        })
    }
}

fn skip_reason(selection: &Selection) -> String {
    match selection {
        Selection::Skipped(reason) => reason.to_string(),
        Selection::Chosen(_) => "no selection".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::testing::FakeSource;
    use crate::registry::Entry;
    use crate::select::ScriptedPrompter;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    fn config(root: PathBuf, tools: &[&str]) -> Config {
        let mut config = Config::default();
        config.registry.base_url = "http://reg.test/base".to_string();
        config.storage.root = root;
        config.storage.show_progress = false;
        config.tools = tools.iter().map(ToString::to_string).collect();
        config
    }

    fn downloader() -> Downloader {
        Downloader::new(reqwest::Client::new(), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_top_level_listing_failure_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = Session::new(
            config(temp_dir.path().join("reg"), &["ganglia_reg"]),
            FakeSource::new(),
            downloader(),
            ScriptedPrompter::new(["1"]),
        );

        let err = session.run(None).await.unwrap_err();
        assert!(matches!(err, PullError::Network(_)));
        // Storage was prepared before any network call
        assert!(temp_dir.path().join("reg/ganglia_reg").is_dir());
    }

    #[tokio::test]
    async fn test_unlisted_variant_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new().with("http://reg.test/base/", vec![Entry::dir("rocky9")]);
        let mut session = Session::new(
            config(temp_dir.path().to_path_buf(), &["ganglia_reg"]),
            source,
            downloader(),
            ScriptedPrompter::new(Vec::<String>::new()),
        );

        let err = session.run(Some("rocky99")).await.unwrap_err();
        assert!(err.is_fatal());
        match err {
            PullError::UnknownVariant {
                variant, available, ..
            } => {
                assert_eq!(variant, "rocky99");
                assert_eq!(available, "rocky9");
            }
            other => panic!("Expected UnknownVariant, got {other:?}"),
        }

        let err = session.run(Some("../x")).await.unwrap_err();
        assert!(matches!(err, PullError::UnknownVariant { .. }));
    }

    #[tokio::test]
    async fn test_listed_variant_skips_prompt() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new()
            .with("http://reg.test/base/", vec![Entry::dir("alma9"), Entry::dir("rocky9")]);
        let mut session = Session::new(
            config(temp_dir.path().to_path_buf(), &["ganglia_reg"]),
            source,
            downloader(),
            ScriptedPrompter::new(Vec::<String>::new()),
        );

        let endpoint = session.select_endpoint(Some("rocky9")).await.unwrap();
        assert_eq!(endpoint.to_string(), "http://reg.test/base/rocky9");
        assert!(session.into_prompter().shown.is_empty());
    }

    #[tokio::test]
    async fn test_empty_top_level_listing_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new().with("http://reg.test/base/", vec![Entry::file("x")]);
        let mut session = Session::new(
            config(temp_dir.path().to_path_buf(), &["ganglia_reg"]),
            source,
            downloader(),
            ScriptedPrompter::new(["1"]),
        );

        let err = session.run(None).await.unwrap_err();
        assert!(matches!(err, PullError::EmptyListing { .. }));
    }

    #[tokio::test]
    async fn test_per_tool_failures_continue() {
        let temp_dir = TempDir::new().unwrap();
        let source = FakeSource::new()
            .with("http://reg.test/base/", vec![Entry::dir("rocky9")])
            .with("http://reg.test/base/rocky9/nagios_reg/", vec![Entry::dir("4.5")])
            .with(
                "http://reg.test/base/rocky9/nagios_reg/4.5/",
                vec![Entry::file("README")],
            )
            .with(
                "http://reg.test/base/rocky9/ldap_reg/",
                vec![Entry::dir("1.0"), Entry::dir("2.0")],
            );
        let mut session = Session::new(
            config(
                temp_dir.path().to_path_buf(),
                &["ganglia_reg", "nagios_reg", "ldap_reg"],
            ),
            source,
            downloader(),
            // nagios picks 4.5 (no artifacts), ldap is left blank
            ScriptedPrompter::new(["1", ""]),
        );

        let summary = session.run(Some("rocky9")).await.unwrap();
        let statuses: Vec<(&str, &ToolStatus)> = summary
            .tools
            .iter()
            .map(|r| (r.tool.as_str(), &r.status))
            .collect();

        assert!(matches!(statuses[0], ("ganglia_reg", ToolStatus::Skipped(r)) if r.contains("404")));
        assert!(matches!(statuses[1], ("nagios_reg", ToolStatus::Skipped(r)) if r == "no image files found"));
        assert!(matches!(statuses[2], ("ldap_reg", ToolStatus::Skipped(r)) if r == "no selection"));
        assert_eq!(summary.downloaded(), 0);

        let prompter = session.into_prompter();
        assert_eq!(prompter.remaining(), 0);
        assert!(prompter
            .messages
            .iter()
            .any(|m| m.starts_with("Skipping ldap_reg")));
    }

    #[test]
    fn test_summary_counts_and_render() {
        let summary = RunSummary {
            endpoint: "http://reg.test/base/rocky9".to_string(),
            tools: vec![
                ToolReport {
                    tool: "ganglia_reg".to_string(),
                    version: Some("latest".to_string()),
                    status: ToolStatus::Processed(vec![
                        DownloadOutcome::Completed {
                            path: PathBuf::from("/r/ganglia_reg/a.tar"),
                            bytes: 2048,
                        },
                        DownloadOutcome::Failed {
                            path: PathBuf::from("/r/ganglia_reg/b.tar"),
                            reason: crate::download::DownloadFailure::Status(500),
                        },
                    ]),
                },
                ToolReport {
                    tool: "ldap_reg".to_string(),
                    version: None,
                    status: ToolStatus::Skipped("no versions found".to_string()),
                },
            ],
        };

        assert_eq!(summary.downloaded(), 1);
        assert_eq!(summary.failed(), 1);
        let text = summary.to_string();
        assert!(text.contains("ganglia_reg:latest:"));
        assert!(text.contains("✓ /r/ganglia_reg/a.tar (2.00 KB)"));
        assert!(text.contains("✗ /r/ganglia_reg/b.tar (HTTP 500)"));
        assert!(text.contains("ldap_reg: skipped (no versions found)"));
        assert!(text.ends_with("1 downloaded, 1 failed"));
    }
}
