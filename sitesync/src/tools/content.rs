//! Content repository console sub-commands.

use std::path::Path;

use super::Toolchain;
use crate::process::CommandSpec;

/// Dump the content tree below the configured root node into `file`.
pub fn export(tools: &Toolchain, install_root: &Path, file: &Path) -> CommandSpec {
    tools
        .console_command()
        .args(["doctrine:phpcr:workspace:export", "-p"])
        .arg(tools.content_root.as_str())
        .path_arg(file)
        .current_dir(install_root)
        .timeout(tools.timeouts.content)
}

/// Remove the whole content tree without asking for confirmation.
pub fn purge(tools: &Toolchain, install_root: &Path) -> CommandSpec {
    tools
        .console_command()
        .args(["doctrine:phpcr:workspace:purge", "--force"])
        .current_dir(install_root)
        .timeout(tools.timeouts.content)
}

/// Load a content tree dump into the (purged) repository.
pub fn import(tools: &Toolchain, install_root: &Path, file: &Path) -> CommandSpec {
    tools
        .console_command()
        .arg("doctrine:phpcr:workspace:import")
        .path_arg(file)
        .current_dir(install_root)
        .timeout(tools.timeouts.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_scoped_to_content_root() {
        let spec = export(
            &Toolchain::default(),
            Path::new("/srv/site"),
            Path::new("/srv/site/web/abc123.phpcr"),
        );
        assert_eq!(spec.program, "php");
        assert_eq!(
            spec.arg_values(),
            vec![
                "bin/console",
                "doctrine:phpcr:workspace:export",
                "-p",
                "/cmf",
                "/srv/site/web/abc123.phpcr"
            ]
        );
        assert_eq!(spec.cwd.as_deref(), Some(Path::new("/srv/site")));
    }

    #[test]
    fn test_purge_is_forced() {
        let spec = purge(&Toolchain::default(), Path::new("/srv/site"));
        assert_eq!(
            spec.arg_values(),
            vec!["bin/console", "doctrine:phpcr:workspace:purge", "--force"]
        );
    }

    #[test]
    fn test_custom_console() {
        let tools = Toolchain {
            console: vec!["bin/adminconsole".to_string()],
            ..Toolchain::default()
        };
        let spec = import(&tools, Path::new("/srv/site"), Path::new("/tmp/abc123.phpcr"));
        assert_eq!(spec.program, "bin/adminconsole");
        assert_eq!(
            spec.arg_values(),
            vec!["doctrine:phpcr:workspace:import", "/tmp/abc123.phpcr"]
        );
    }
}
