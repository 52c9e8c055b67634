//! Asset archive creation and extraction via `tar`.
//!
//! Entries are stored relative to the install root, so the archive contains
//! e.g. `var/uploads/...` and extracts back into the same place.

use std::path::Path;

use super::Toolchain;
use crate::process::CommandSpec;

/// Archive `install_root/relative` into the gzip-compressed `dest`.
pub fn create(tools: &Toolchain, install_root: &Path, relative: &Path, dest: &Path) -> CommandSpec {
    CommandSpec::new(tools.archive.as_str())
        .arg("-czf")
        .path_arg(dest)
        .arg("-C")
        .path_arg(install_root)
        .path_arg(relative)
        .timeout(tools.timeouts.archive)
}

/// Extract `relative` from `archive` into `install_root`.
///
/// `--no-overwrite-dir` keeps the metadata of directories that already exist.
pub fn extract(
    tools: &Toolchain,
    archive: &Path,
    install_root: &Path,
    relative: &Path,
) -> CommandSpec {
    CommandSpec::new(tools.archive.as_str())
        .arg("-xzf")
        .path_arg(archive)
        .arg("-C")
        .path_arg(install_root)
        .arg("--no-overwrite-dir")
        .path_arg(relative)
        .timeout(tools.timeouts.archive)
}
