//! Export of the local installation into the publish directory.
//!
//! Produces, in this order:
//! 1. `<secret>.phpcr` via the content repository console
//! 2. `<secret>.sql` via the database dump tool
//! 3. `<secret>.tar.gz` via the archive tool
//!
//! A failing step stops the export. Artifacts written by earlier steps stay in
//! place; the export is not atomic across its three files.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::artifact::{local_path, ArtifactKind, BackupSet, Secret};
use crate::config::{DatabaseConfig, InstallPaths};
use crate::error::Result;
use crate::process::ProcessRunner;
use crate::progress::{export_steps, messages, NoopProgress, ProgressSink, Steps};
use crate::tools::{archive, content, database, Toolchain};

pub struct Exporter {
    runner: Arc<dyn ProcessRunner>,
    tools: Toolchain,
    progress: Arc<dyn ProgressSink>,
    cancel: Option<CancellationToken>,
}

impl Exporter {
    pub fn new(runner: Arc<dyn ProcessRunner>, tools: Toolchain) -> Self {
        Self {
            runner,
            tools,
            progress: Arc::new(NoopProgress),
            cancel: None,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Write all three artifacts for `secret` into the publish directory.
    pub async fn export(
        &self,
        secret: &Secret,
        db: &DatabaseConfig,
        paths: &InstallPaths,
    ) -> Result<BackupSet> {
        let set = BackupSet::for_export(secret, paths.publish_dir());
        let target = |kind: ArtifactKind| local_path(paths.publish_dir(), secret, kind);

        let steps = Steps::new(self.progress.as_ref(), self.cancel.as_ref());
        steps.begin(export_steps());

        tokio::fs::create_dir_all(paths.publish_dir()).await?;

        steps.start(messages::EXPORT_CONTENT)?;
        let file = target(ArtifactKind::ContentDump);
        self.runner
            .run(&content::export(&self.tools, paths.root(), &file))
            .await?;
        steps.advance();

        steps.start(messages::EXPORT_DATABASE)?;
        let file = target(ArtifactKind::DatabaseDump);
        self.runner.run(&database::dump(&self.tools, db, &file)).await?;
        steps.advance();

        steps.start(messages::EXPORT_ASSETS)?;
        let assets = paths.resolve_assets();
        if assets.legacy {
            tracing::debug!("Using legacy asset directory {}", assets.absolute.display());
        }
        let file = target(ArtifactKind::AssetArchive);
        self.runner
            .run(&archive::create(&self.tools, paths.root(), &assets.relative, &file))
            .await?;
        steps.advance();

        steps.finish(messages::EXPORT_DONE);
        Ok(set)
    }
}
