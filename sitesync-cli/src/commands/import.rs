//! Import command implementation.

use anyhow::Result;
use sitesync::{Config, ImportOptions, Importer, RemoteFetcher, SystemRunner, Toolchain};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::progress::ConsoleProgress;

/// Run the import command against the exporting host.
pub async fn run_import(
    config: &Config,
    host: &str,
    skip_assets: bool,
    no_progress: bool,
    cancel: CancellationToken,
) -> Result<()> {
    let secret = config.secret()?;
    let paths = config.install_paths();
    let fetcher = RemoteFetcher::from_config(&config.transfer)?;

    tracing::info!(
        "Importing snapshot '{}' from {} into {} (staging in {})",
        secret,
        host,
        paths.root().display(),
        fetcher.work_dir().display()
    );
    if skip_assets {
        tracing::info!("Skipping assets");
    }

    let mut importer = Importer::new(
        fetcher,
        Arc::new(SystemRunner::new()),
        Toolchain::from_config(config),
    )
    .with_cancellation(cancel);
    if !no_progress {
        importer = importer.with_progress(Arc::new(ConsoleProgress::new()));
    }

    importer
        .import(
            &secret,
            &config.database,
            host,
            &paths,
            ImportOptions { skip_assets },
        )
        .await?;

    println!();
    println!("Successfully imported contents. You're good to go!");

    Ok(())
}
