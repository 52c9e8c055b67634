//! Export command implementation.

use anyhow::Result;
use sitesync::{Config, Exporter, SystemRunner, Toolchain};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::progress::ConsoleProgress;

/// Run the export command.
pub async fn run_export(config: &Config, no_progress: bool, cancel: CancellationToken) -> Result<()> {
    let secret = config.secret()?;
    let paths = config.install_paths();

    tracing::info!(
        "Exporting snapshot '{}' to {}",
        secret,
        paths.publish_dir().display()
    );

    let mut exporter = Exporter::new(Arc::new(SystemRunner::new()), Toolchain::from_config(config))
        .with_cancellation(cancel);
    if !no_progress {
        exporter = exporter.with_progress(Arc::new(ConsoleProgress::new()));
    }

    let set = exporter.export(&secret, &config.database, &paths).await?;

    println!();
    println!("Successfully exported contents.");
    for artifact in set.artifacts() {
        println!("  {}", artifact.destination.display());
    }

    Ok(())
}
