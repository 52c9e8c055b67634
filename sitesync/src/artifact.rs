//! Artifact naming and addressing.
//!
//! One snapshot consists of up to three files, all named after the shared
//! secret:
//! - `<secret>.phpcr`: content-tree dump
//! - `<secret>.sql`: relational database dump
//! - `<secret>.tar.gz`: asset archive
//!
//! The same names are used in the publish directory on the exporting host,
//! in the remote URLs, and in the local work directory on the importing host.

use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{Error, Result};

/// Correlation token naming one export/import transaction.
///
/// Not a cryptographic secret. It only has to be usable as a single file name
/// and URL path segment.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(Error::InvalidSecret("secret must not be empty".to_string()));
        }
        if value == "." || value == ".." {
            return Err(Error::InvalidSecret(format!("'{}' is not a usable name", value)));
        }
        if value.contains(['/', '\\', '\0']) {
            return Err(Error::InvalidSecret(
                "secret must not contain path separators or NUL".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Secret").field(&self.0).finish()
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Secret {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Secret::new(s)
    }
}

/// The three artifact kinds, in fetch and apply order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKind {
    ContentDump,
    DatabaseDump,
    AssetArchive,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::ContentDump,
        ArtifactKind::DatabaseDump,
        ArtifactKind::AssetArchive,
    ];

    /// On-disk extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::ContentDump => "phpcr",
            ArtifactKind::DatabaseDump => "sql",
            ArtifactKind::AssetArchive => "tar.gz",
        }
    }

    /// `<secret>.<ext>`
    pub fn file_name(self, secret: &Secret) -> String {
        format!("{}.{}", secret.as_str(), self.extension())
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::ContentDump => write!(f, "content dump"),
            ArtifactKind::DatabaseDump => write!(f, "database dump"),
            ArtifactKind::AssetArchive => write!(f, "asset archive"),
        }
    }
}

/// Path of an artifact inside a local directory (publish dir or work dir).
pub fn local_path(dir: &Path, secret: &Secret, kind: ArtifactKind) -> PathBuf {
    dir.join(kind.file_name(secret))
}

/// Parse the operator-supplied host into a base URL.
///
/// A missing scheme defaults to `http://`.
pub fn parse_base_url(host: &str) -> Result<Url> {
    let host = host.trim();
    if host.is_empty() {
        return Err(Error::InvalidUrl("remote host must not be empty".to_string()));
    }
    let candidate = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };
    let url = Url::parse(&candidate).map_err(|e| Error::InvalidUrl(format!("{}: {}", host, e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::InvalidUrl(format!("{} cannot be used as a base URL", host)));
    }
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidUrl(format!("unsupported scheme '{}'", other))),
    }
}

/// `<base>/<secret>.<ext>`, appending to any path already present on the base.
pub fn remote_url(base: &Url, secret: &Secret, kind: ArtifactKind) -> Result<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| Error::InvalidUrl(format!("{} cannot be used as a base URL", base)))?
        .pop_if_empty()
        .push(&kind.file_name(secret));
    Ok(url)
}

/// One artifact of a backup set.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub file_name: String,
    /// Remote URL on the import side, publish path on the export side.
    pub source: String,
    /// Local path the artifact is written to.
    pub destination: PathBuf,
    pub required: bool,
}

/// The ordered artifacts belonging to one secret.
#[derive(Debug, Clone)]
pub struct BackupSet {
    secret: Secret,
    artifacts: Vec<Artifact>,
}

impl BackupSet {
    /// Artifacts written by an export into `publish_dir`.
    pub fn for_export(secret: &Secret, publish_dir: &Path) -> Self {
        let artifacts = ArtifactKind::ALL
            .iter()
            .map(|&kind| {
                let destination = local_path(publish_dir, secret, kind);
                Artifact {
                    kind,
                    file_name: kind.file_name(secret),
                    source: destination.display().to_string(),
                    destination,
                    required: true,
                }
            })
            .collect();

        Self {
            secret: secret.clone(),
            artifacts,
        }
    }

    /// Artifacts fetched from `base` into `work_dir` by an import.
    ///
    /// The asset archive is left out entirely when `include_assets` is false.
    pub fn for_import(
        secret: &Secret,
        base: &Url,
        work_dir: &Path,
        include_assets: bool,
    ) -> Result<Self> {
        let mut artifacts = Vec::with_capacity(3);
        for kind in ArtifactKind::ALL {
            if kind == ArtifactKind::AssetArchive && !include_assets {
                continue;
            }
            artifacts.push(Artifact {
                kind,
                file_name: kind.file_name(secret),
                source: remote_url(base, secret, kind)?.to_string(),
                destination: local_path(work_dir, secret, kind),
                required: true,
            });
        }

        Ok(Self {
            secret: secret.clone(),
            artifacts,
        })
    }

    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    pub fn get(&self, kind: ArtifactKind) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}
