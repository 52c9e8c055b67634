//! sitesync: full-site export/import between two installations
//!
//! The exporting side writes three artifacts named after a shared secret into
//! its publish directory. The importing side downloads them over HTTP and
//! replaces its content tree, database and (optionally) assets.

pub mod artifact;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod import;
pub mod process;
pub mod progress;
pub mod tools;

pub use artifact::{ArtifactKind, BackupSet, Secret};
pub use config::Config;
pub use error::{Error, Result};
pub use export::Exporter;
pub use fetch::{FetchReport, RemoteFetcher, TransferResult};
pub use import::{ImportOptions, Importer};
pub use process::{CommandSpec, ProcessRunner, SystemRunner};
pub use progress::{NoopProgress, ProgressEvent, ProgressSink, TransferEvent};
pub use tools::Toolchain;
