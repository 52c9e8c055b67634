use std::path::{Path, PathBuf};

/// Resolved locations inside one installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPaths {
    root: PathBuf,
    publish_dir: PathBuf,
    assets_dir: PathBuf,
    legacy_assets_dir: PathBuf,
}

/// The asset directory chosen for this installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDir {
    /// Path relative to the install root, as stored in the archive.
    pub relative: PathBuf,
    pub absolute: PathBuf,
    pub legacy: bool,
}

impl InstallPaths {
    pub fn new(
        root: impl Into<PathBuf>,
        publish_dir: impl AsRef<Path>,
        assets_dir: impl AsRef<Path>,
        legacy_assets_dir: impl AsRef<Path>,
    ) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self {
            publish_dir: root.join(publish_dir),
            assets_dir: assets_dir.as_ref().to_path_buf(),
            legacy_assets_dir: legacy_assets_dir.as_ref().to_path_buf(),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn publish_dir(&self) -> &Path {
        &self.publish_dir
    }

    /// Current layout if it exists on disk, legacy layout otherwise.
    pub fn resolve_assets(&self) -> AssetDir {
        let current = self.root.join(&self.assets_dir);
        if current.exists() {
            AssetDir {
                relative: self.assets_dir.clone(),
                absolute: current,
                legacy: false,
            }
        } else {
            AssetDir {
                relative: self.legacy_assets_dir.clone(),
                absolute: self.root.join(&self.legacy_assets_dir),
                legacy: true,
            }
        }
    }
}
