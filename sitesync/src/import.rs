//! Import of a remote snapshot into the local installation.
//!
//! Every required artifact is downloaded before anything local is touched.
//! Only then, in order:
//! 1. the content tree is purged and replaced from the content dump
//! 2. the database is replayed from the SQL dump
//! 3. unless assets are skipped, the asset archive is extracted without
//!    overwriting directories that already exist
//!
//! There is no rollback. A failure after the purge leaves the installation
//! without a content tree until the import is re-run.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::artifact::{ArtifactKind, Secret};
use crate::config::{DatabaseConfig, InstallPaths};
use crate::error::{Error, Result};
use crate::fetch::{FetchReport, RemoteFetcher};
use crate::process::ProcessRunner;
use crate::progress::{import_steps, messages, NoopProgress, ProgressSink, Steps};
use crate::tools::{archive, content, database, Toolchain};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Neither download nor extract the asset archive.
    pub skip_assets: bool,
}

pub struct Importer {
    fetcher: RemoteFetcher,
    runner: Arc<dyn ProcessRunner>,
    tools: Toolchain,
    progress: Arc<dyn ProgressSink>,
    cancel: Option<CancellationToken>,
}

impl Importer {
    pub fn new(fetcher: RemoteFetcher, runner: Arc<dyn ProcessRunner>, tools: Toolchain) -> Self {
        Self {
            fetcher,
            runner,
            tools,
            progress: Arc::new(NoopProgress),
            cancel: None,
        }
    }

    /// Route progress of both the download and the apply steps to `progress`.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.fetcher = self.fetcher.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub async fn import(
        &self,
        secret: &Secret,
        db: &DatabaseConfig,
        remote_host: &str,
        paths: &InstallPaths,
        options: ImportOptions,
    ) -> Result<()> {
        let steps = Steps::new(self.progress.as_ref(), self.cancel.as_ref());
        steps.begin(import_steps(options.skip_assets));

        steps.start(messages::DOWNLOAD)?;
        let (_, report) = self
            .fetcher
            .fetch_all(remote_host, secret, !options.skip_assets)
            .await?;

        steps.start(messages::IMPORT_CONTENT)?;
        let dump = staged(&report, ArtifactKind::ContentDump)?;
        ensure_staged(dump, ArtifactKind::ContentDump).await?;
        self.runner.run(&content::purge(&self.tools, paths.root())).await?;
        self.runner
            .run(&content::import(&self.tools, paths.root(), dump))
            .await?;
        steps.advance();

        steps.start(messages::IMPORT_DATABASE)?;
        let dump = staged(&report, ArtifactKind::DatabaseDump)?;
        self.runner.run(&database::load(&self.tools, db, dump)).await?;
        steps.advance();

        if !options.skip_assets {
            steps.start(messages::IMPORT_ASSETS)?;
            let archive_file = staged(&report, ArtifactKind::AssetArchive)?;
            let assets = paths.resolve_assets();
            tracing::debug!("Extracting assets into {}", assets.absolute.display());
            self.runner
                .run(&archive::extract(
                    &self.tools,
                    archive_file,
                    paths.root(),
                    &assets.relative,
                ))
                .await?;
            steps.advance();
        }

        steps.finish(messages::IMPORT_DONE);
        Ok(())
    }
}

fn staged(report: &FetchReport, kind: ArtifactKind) -> Result<&Path> {
    report
        .get(kind)
        .map(|r| r.path.as_path())
        .ok_or_else(|| Error::PartialDownload {
            missing: vec![kind],
        })
}

/// Refuse to purge when the replacement dump is not usable.
async fn ensure_staged(path: &Path, kind: ArtifactKind) -> Result<()> {
    let len = match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };
    if len == 0 {
        tracing::warn!("Staged {} at {} is missing or empty", kind, path.display());
        return Err(Error::PartialDownload {
            missing: vec![kind],
        });
    }
    Ok(())
}
