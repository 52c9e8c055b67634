//! Progress events emitted by the exporter, fetcher and importer.
//!
//! The core only emits events. Rendering (progress bars, log lines) is done
//! by whoever implements [`ProgressSink`].

use tokio_util::sync::CancellationToken;

use crate::artifact::ArtifactKind;
use crate::error::{Error, Result};

/// Byte-level events for a single artifact download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    /// The response announced its total size.
    SizeKnown { kind: ArtifactKind, total: u64 },
    /// Bytes written to the destination so far.
    Progress { kind: ArtifactKind, transferred: u64 },
    /// The artifact is fully written.
    Completed { kind: ArtifactKind, total: u64 },
    /// The server redirected the request.
    Redirected { kind: ArtifactKind, location: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Start of an operation with a fixed number of steps.
    Begin { total_steps: u64 },
    /// A new step message; does not advance the counter.
    Step { message: String },
    /// One step finished.
    Advance,
    Transfer(TransferEvent),
    /// The whole operation succeeded.
    Finish { message: String },
}

/// Receiver of progress events.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &ProgressEvent);
}

/// Discards every event.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn on_event(&self, _event: &ProgressEvent) {}
}

/// Number of counted steps for an export.
pub fn export_steps() -> u64 {
    3
}

/// Number of counted steps for an import: one per download and one per apply.
pub fn import_steps(skip_assets: bool) -> u64 {
    if skip_assets {
        4
    } else {
        6
    }
}

/// Step accounting shared by the exporter and importer.
///
/// Cancellation is only observed when a new step starts.
pub(crate) struct Steps<'a> {
    progress: &'a dyn ProgressSink,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Steps<'a> {
    pub(crate) fn new(progress: &'a dyn ProgressSink, cancel: Option<&'a CancellationToken>) -> Self {
        Self { progress, cancel }
    }

    pub(crate) fn begin(&self, total_steps: u64) {
        self.progress.on_event(&ProgressEvent::Begin { total_steps });
    }

    pub(crate) fn start(&self, message: &str) -> Result<()> {
        if self.cancel.is_some_and(|t| t.is_cancelled()) {
            tracing::warn!("Cancelled before: {}", message);
            return Err(Error::Cancelled(message.trim_end_matches('.').to_string()));
        }
        tracing::info!("{}", message);
        self.progress.on_event(&ProgressEvent::Step {
            message: message.to_string(),
        });
        Ok(())
    }

    pub(crate) fn advance(&self) {
        self.progress.on_event(&ProgressEvent::Advance);
    }

    pub(crate) fn finish(&self, message: &str) {
        tracing::debug!("{}", message);
        self.progress.on_event(&ProgressEvent::Finish {
            message: message.to_string(),
        });
    }
}

pub(crate) mod messages {
    pub const EXPORT_CONTENT: &str = "Exporting content repository...";
    pub const EXPORT_DATABASE: &str = "Exporting database...";
    pub const EXPORT_ASSETS: &str = "Exporting assets...";
    pub const EXPORT_DONE: &str = "Successfully exported contents.";

    pub const DOWNLOAD: &str = "Downloading files...";
    pub const IMPORT_CONTENT: &str = "Importing content repository...";
    pub const IMPORT_DATABASE: &str = "Importing database...";
    pub const IMPORT_ASSETS: &str = "Importing assets...";
    pub const IMPORT_DONE: &str = "Successfully imported contents. You're good to go!";
}
