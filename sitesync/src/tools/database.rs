//! Relational database dump and load.
//!
//! Both tools take the same connection arguments. The password is attached to
//! `-p` in a single argv entry and marked sensitive so it never shows up in
//! logs.

use std::path::Path;

use super::Toolchain;
use crate::config::DatabaseConfig;
use crate::process::CommandSpec;

fn with_connection(spec: CommandSpec, db: &DatabaseConfig) -> CommandSpec {
    let spec = spec
        .arg("-h")
        .arg(db.host.as_str())
        .arg("-P")
        .arg(db.port.to_string())
        .arg("-u")
        .arg(db.user.as_str());

    let spec = match db.password() {
        Some(password) => spec.sensitive_arg(format!("-p{}", password)),
        None => spec,
    };

    spec.arg(db.name.as_str())
}

/// Dump the database into `file`.
pub fn dump(tools: &Toolchain, db: &DatabaseConfig, file: &Path) -> CommandSpec {
    with_connection(CommandSpec::new(tools.dump.as_str()), db)
        .stdout_file(file)
        .timeout(tools.timeouts.dump)
}

/// Replay `file` into the database.
pub fn load(tools: &Toolchain, db: &DatabaseConfig, file: &Path) -> CommandSpec {
    with_connection(CommandSpec::new(tools.load.as_str()), db)
        .stdin_file(file)
        .timeout(tools.timeouts.load)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn db(password: Option<&str>) -> DatabaseConfig {
        DatabaseConfig {
            host: "db.internal".to_string(),
            port: 3307,
            name: "site".to_string(),
            user: "site_user".to_string(),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_dump_arguments() {
        let spec = dump(&Toolchain::default(), &db(None), Path::new("/srv/site/web/abc123.sql"));
        assert_eq!(spec.program, "mysqldump");
        assert_eq!(
            spec.arg_values(),
            vec!["-h", "db.internal", "-P", "3307", "-u", "site_user", "site"]
        );
        assert_eq!(spec.stdout, Some(PathBuf::from("/srv/site/web/abc123.sql")));
        assert!(spec.stdin.is_none());
    }

    #[test]
    fn test_password_is_one_argument() {
        let spec = load(&Toolchain::default(), &db(Some("p@ss;rm")), Path::new("/tmp/abc123.sql"));
        assert_eq!(spec.program, "mysql");
        assert_eq!(
            spec.arg_values(),
            vec!["-h", "db.internal", "-P", "3307", "-u", "site_user", "-pp@ss;rm", "site"]
        );
        assert!(spec.shell_line().contains(" '-pp@ss;rm' "));
        assert!(!spec.to_string().contains("p@ss"));
        assert_eq!(spec.stdin, Some(PathBuf::from("/tmp/abc123.sql")));
    }

    #[test]
    fn test_hostile_names_stay_in_position() {
        let mut config = db(None);
        config.name = "site; DROP DATABASE x".to_string();
        config.user = "me && rm -rf /".to_string();

        let spec = dump(&Toolchain::default(), &config, Path::new("/tmp/out.sql"));
        let args = spec.arg_values();
        assert_eq!(args[5], "me && rm -rf /");
        assert_eq!(args[6], "site; DROP DATABASE x");
        assert_eq!(args.len(), 7);
    }
}
