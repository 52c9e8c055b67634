use std::time::Duration;

use thiserror::Error;

use crate::artifact::ArtifactKind;

const EXPORT_HINT: &str = "Please make sure you have executed 'sitesync export' on the remote host \
                           before and that you use the same secret.";

#[derive(Error, Debug)]
pub enum Error {
    #[error("Command `{command}` failed with {status}{}", stderr_suffix(.stderr))]
    ExternalTool {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Command `{command}` timed out after {}s", .after.as_secs_f64())]
    Timeout { command: String, after: Duration },

    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot redirect `{program}` {direction} {}: {source}", .path.display())]
    Redirect {
        program: String,
        direction: &'static str,
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not download the {artifact} from {url}: {reason}. {}", EXPORT_HINT)]
    Fetch {
        artifact: ArtifactKind,
        url: String,
        reason: String,
    },

    #[error("Some of the backup files could not be downloaded ({}). {}", join_kinds(.missing), EXPORT_HINT)]
    PartialDownload { missing: Vec<ArtifactKind> },

    #[error("Invalid secret: {0}")]
    InvalidSecret(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Operation cancelled before: {0}")]
    Cancelled(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// True for both non-zero exits and timeouts of an external tool.
    pub fn is_external_tool_failure(&self) -> bool {
        matches!(
            self,
            Error::ExternalTool { .. }
                | Error::Timeout { .. }
                | Error::Spawn { .. }
                | Error::Redirect { .. }
        )
    }

    /// True for errors raised before any artifact was applied locally.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Error::Fetch { .. } | Error::PartialDownload { .. })
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

fn join_kinds(kinds: &[ArtifactKind]) -> String {
    kinds
        .iter()
        .map(|k| k.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, Error>;
