//! Download of a backup set from the exporting host.
//!
//! Artifacts are fetched one after another in set order. The first failure
//! stops the whole fetch; later artifacts are never requested.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::artifact::{parse_base_url, Artifact, ArtifactKind, BackupSet, Secret};
use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::progress::{NoopProgress, ProgressEvent, ProgressSink, TransferEvent};

/// Outcome of one artifact transfer.
#[derive(Debug)]
pub struct TransferResult {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Every successful transfer of one fetch, in fetch order.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub results: Vec<TransferResult>,
}

impl FetchReport {
    pub fn get(&self, kind: ArtifactKind) -> Option<&TransferResult> {
        self.results.iter().find(|r| r.kind == kind)
    }

    /// Fail unless every required artifact of `set` was transferred.
    pub fn ensure_complete(&self, set: &BackupSet) -> Result<()> {
        let missing: Vec<ArtifactKind> = set
            .artifacts()
            .iter()
            .filter(|a| a.required && self.get(a.kind).is_none())
            .map(|a| a.kind)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::PartialDownload { missing })
        }
    }
}

pub struct RemoteFetcher {
    client: reqwest::Client,
    work_dir: PathBuf,
    progress: Arc<dyn ProgressSink>,
}

impl RemoteFetcher {
    pub fn new(client: reqwest::Client, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            client,
            work_dir: std::path::absolute(&work_dir).unwrap_or(work_dir),
            progress: Arc::new(NoopProgress),
        }
    }

    /// Build a fetcher with a client configured from `[transfer]`.
    pub fn from_config(config: &TransferConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self::new(client, config.work_dir()))
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The set `fetch_all` would download for these arguments.
    pub fn plan(&self, base_url: &str, secret: &Secret, include_assets: bool) -> Result<BackupSet> {
        let base = parse_base_url(base_url)?;
        BackupSet::for_import(secret, &base, &self.work_dir, include_assets)
    }

    /// Download the content dump, database dump and (optionally) asset archive.
    pub async fn fetch_all(
        &self,
        base_url: &str,
        secret: &Secret,
        include_assets: bool,
    ) -> Result<(BackupSet, FetchReport)> {
        let set = self.plan(base_url, secret, include_assets)?;
        let report = self.fetch_set(&set).await?;
        Ok((set, report))
    }

    /// Download every artifact of `set`, stopping at the first failure.
    pub async fn fetch_set(&self, set: &BackupSet) -> Result<FetchReport> {
        tokio::fs::create_dir_all(&self.work_dir).await?;

        let mut report = FetchReport::default();
        for artifact in set.artifacts() {
            tracing::info!("Downloading {} from {}", artifact.kind, artifact.source);
            match self.fetch_one(artifact).await {
                Ok(bytes) => {
                    tracing::debug!(
                        "Stored {} ({} bytes) at {}",
                        artifact.kind,
                        bytes,
                        artifact.destination.display()
                    );
                    report.results.push(TransferResult {
                        kind: artifact.kind,
                        path: artifact.destination.clone(),
                        bytes,
                    });
                    self.progress.on_event(&ProgressEvent::Advance);
                }
                Err(reason) => {
                    tracing::warn!("Download of {} failed: {}", artifact.kind, reason);
                    discard_partial(&artifact.destination).await;
                    return Err(Error::Fetch {
                        artifact: artifact.kind,
                        url: artifact.source.clone(),
                        reason,
                    });
                }
            }
        }

        report.ensure_complete(set)?;
        Ok(report)
    }

    async fn fetch_one(&self, artifact: &Artifact) -> std::result::Result<u64, String> {
        let kind = artifact.kind;
        let url = Url::parse(&artifact.source).map_err(|e| e.to_string())?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if response.url() != &url {
            self.emit(TransferEvent::Redirected {
                kind,
                location: response.url().to_string(),
            });
        }

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        let expected = response.content_length();
        if let Some(total) = expected {
            self.emit(TransferEvent::SizeKnown { kind, total });
        }

        let mut file = File::create(&artifact.destination)
            .await
            .map_err(|e| format!("cannot create {}: {}", artifact.destination.display(), e))?;

        let mut transferred = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| format!("transfer interrupted: {}", e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| format!("write failed: {}", e))?;
            transferred += chunk.len() as u64;
            self.emit(TransferEvent::Progress { kind, transferred });
        }

        file.flush().await.map_err(|e| format!("write failed: {}", e))?;

        if let Some(total) = expected {
            if transferred != total {
                return Err(format!(
                    "transfer interrupted after {} of {} bytes",
                    transferred, total
                ));
            }
        }

        self.emit(TransferEvent::Completed {
            kind,
            total: transferred,
        });
        Ok(transferred)
    }

    fn emit(&self, event: TransferEvent) {
        self.progress.on_event(&ProgressEvent::Transfer(event));
    }
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed incomplete download {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("Cannot remove incomplete download {}: {}", path.display(), e),
    }
}
