use crate::error::Result;
use crate::registry::{ArtifactCandidate, RegistryEndpoint};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

/// Bytes written to disk per write call
pub const CHUNK_SIZE: usize = 8 * 1024;

/// A fully resolved transfer: where from, where to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub url: Url,
    pub dest: PathBuf,
}

impl DownloadTask {
    /// `<endpoint>/<tool>/<version>/<artifact>` to `<root>/<tool>/<basename>`
    pub fn for_artifact(
        endpoint: &RegistryEndpoint,
        root: &Path,
        tool: &str,
        version: &str,
        artifact: &ArtifactCandidate,
    ) -> Result<Self> {
        Ok(Self {
            url: endpoint.artifact_url(tool, version, &artifact.path)?,
            dest: root.join(tool).join(artifact.basename()),
        })
    }
}

/// Why a transfer did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadFailure {
    Status(u16),
    Timeout,
    Transport(String),
    Write(String),
}

impl std::fmt::Display for DownloadFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Timeout => f.write_str("timed out"),
            Self::Transport(detail) => write!(f, "transfer error: {detail}"),
            Self::Write(detail) => write!(f, "write error: {detail}"),
        }
    }
}

/// Result of one transfer; failures are values so siblings keep going
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Completed { path: PathBuf, bytes: u64 },
    Failed { path: PathBuf, reason: DownloadFailure },
}

impl DownloadOutcome {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Completed { path, .. } | Self::Failed { path, .. } => path,
        }
    }
}

/// Streams artifacts to local files
#[derive(Debug, Clone)]
pub struct Downloader {
    http: reqwest::Client,
    timeout: Duration,
    show_progress: bool,
}

impl Downloader {
    /// `timeout` bounds the request and each body chunk, not the whole transfer
    #[must_use]
    pub fn new(http: reqwest::Client, timeout: Duration) -> Self {
        Self {
            http,
            timeout,
            show_progress: false,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Download `task.url` to `task.dest`, overwriting any existing file.
    ///
    /// A non-success status is detected before the destination is opened.
    /// A failure after the destination was created removes the partial file.
    pub async fn download(&self, task: &DownloadTask) -> DownloadOutcome {
        tracing::info!("Downloading {} -> {}", task.url, task.dest.display());

        let response = match self.request(&task.url).await {
            Ok(response) => response,
            Err(reason) => return Self::failed(task, reason),
        };

        let file = match tokio::fs::File::create(&task.dest).await {
            Ok(file) => file,
            Err(e) => return Self::failed(task, DownloadFailure::Write(e.to_string())),
        };

        let progress = self.progress_bar(response.content_length(), &task.dest);
        let written = self.write_body(response, file, &progress).await;
        progress.finish_and_clear();

        match written {
            Ok(bytes) => {
                tracing::info!("Saved {} ({})", task.dest.display(), format_bytes(bytes));
                DownloadOutcome::Completed {
                    path: task.dest.clone(),
                    bytes,
                }
            }
            Err(reason) => {
                if let Err(e) = tokio::fs::remove_file(&task.dest).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!("Could not remove partial file {}: {e}", task.dest.display());
                    }
                }
                Self::failed(task, reason)
            }
        }
    }

    fn failed(task: &DownloadTask, reason: DownloadFailure) -> DownloadOutcome {
        tracing::warn!("Download of {} failed: {reason}", task.url);
        DownloadOutcome::Failed {
            path: task.dest.clone(),
            reason,
        }
    }

    async fn request(&self, url: &Url) -> std::result::Result<reqwest::Response, DownloadFailure> {
        let response = tokio::time::timeout(self.timeout, self.http.get(url.clone()).send())
            .await
            .map_err(|_| DownloadFailure::Timeout)?
            .map_err(|e| failure_from_reqwest(&e))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(DownloadFailure::Status(status.as_u16()))
        }
    }

    async fn write_body(
        &self,
        response: reqwest::Response,
        file: tokio::fs::File,
        progress: &ProgressBar,
    ) -> std::result::Result<u64, DownloadFailure> {
        let expected = response.content_length();
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        loop {
            let next = tokio::time::timeout(self.timeout, stream.next())
                .await
                .map_err(|_| DownloadFailure::Timeout)?;
            let Some(chunk) = next else { break };
            let chunk = chunk.map_err(|e| failure_from_reqwest(&e))?;

            for piece in chunk.chunks(CHUNK_SIZE) {
                writer
                    .write_all(piece)
                    .await
                    .map_err(|e| DownloadFailure::Write(e.to_string()))?;
            }
            written += chunk.len() as u64;
            progress.set_position(written);
        }

        writer
            .flush()
            .await
            .map_err(|e| DownloadFailure::Write(e.to_string()))?;

        if let Some(expected) = expected {
            if written != expected {
                return Err(DownloadFailure::Transport(format!(
                    "expected {expected} bytes, received {written}"
                )));
            }
        }

        Ok(written)
    }

    fn progress_bar(&self, total: Option<u64>, dest: &Path) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let name = dest
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());

        match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::with_template(
                        "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=> "),
                );
                bar.set_message(name);
                bar
            }
            None => {
                let spinner = ProgressBar::new_spinner();
                spinner.set_message(name);
                spinner
            }
        }
    }
}

fn failure_from_reqwest(err: &reqwest::Error) -> DownloadFailure {
    if err.is_timeout() {
        DownloadFailure::Timeout
    } else {
        DownloadFailure::Transport(err.to_string())
    }
}

/// Format bytes as human-readable string
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
