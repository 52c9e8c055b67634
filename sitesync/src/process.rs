//! External process execution.
//!
//! Commands are described by a [`CommandSpec`] and executed through a
//! [`ProcessRunner`]. Arguments are passed to the child as separate argv
//! entries; no shell ever sees them.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Maximum number of stderr bytes kept in an error.
const STDERR_TAIL: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub value: String,
    pub sensitive: bool,
}

/// Description of one external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<Arg>,
    pub cwd: Option<PathBuf>,
    pub stdin: Option<PathBuf>,
    pub stdout: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            stdin: None,
            stdout: None,
            timeout: None,
        }
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg {
            value: value.into(),
            sensitive: false,
        });
        self
    }

    pub fn args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for value in values {
            self = self.arg(value);
        }
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.display().to_string())
    }

    /// An argument masked in logs and error messages.
    pub fn sensitive_arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg {
            value: value.into(),
            sensitive: true,
        });
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn stdin_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdin = Some(path.into());
        self
    }

    pub fn stdout_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.stdout = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn arg_values(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.value.as_str()).collect()
    }

    /// Shell-equivalent rendering of the invocation, every word quoted.
    ///
    /// Sensitive arguments are included verbatim; use `Display` for logs.
    pub fn shell_line(&self) -> String {
        self.render(false)
    }

    fn render(&self, redact: bool) -> String {
        let mut line = shell_quote(&self.program);
        for arg in &self.args {
            line.push(' ');
            if redact && arg.sensitive {
                line.push_str("'****'");
            } else {
                line.push_str(&shell_quote(&arg.value));
            }
        }
        if let Some(ref stdin) = self.stdin {
            line.push_str(" < ");
            line.push_str(&shell_quote(&stdin.display().to_string()));
        }
        if let Some(ref stdout) = self.stdout {
            line.push_str(" > ");
            line.push_str(&shell_quote(&stdout.display().to_string()));
        }
        line
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(true))
    }
}

/// Quote a word for a POSIX shell. Plain words are left alone.
pub fn shell_quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', "'\\''"))
    }
}

/// Runs external commands to completion.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the command, failing on spawn errors, non-zero exit or timeout.
    async fn run(&self, spec: &CommandSpec) -> Result<()>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<()> {
        let mut command = Command::new(&spec.program);
        command
            .args(spec.args.iter().map(|a| a.value.as_str()))
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref cwd) = spec.cwd {
            command.current_dir(cwd);
        }

        match spec.stdin {
            Some(ref path) => {
                let file = File::open(path).map_err(|e| Error::Redirect {
                    program: spec.program.clone(),
                    direction: "stdin from",
                    path: path.clone(),
                    source: e,
                })?;
                command.stdin(Stdio::from(file));
            }
            None => {
                command.stdin(Stdio::null());
            }
        }

        match spec.stdout {
            Some(ref path) => {
                let file = File::create(path).map_err(|e| Error::Redirect {
                    program: spec.program.clone(),
                    direction: "stdout to",
                    path: path.clone(),
                    source: e,
                })?;
                command.stdout(Stdio::from(file));
            }
            None => {
                command.stdout(Stdio::null());
            }
        }

        tracing::debug!("Running command: {}", spec);

        let child = command.spawn().map_err(|e| Error::Spawn {
            program: spec.program.clone(),
            source: e,
        })?;

        let output = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output?,
                Err(_) => {
                    // The child future was dropped, kill_on_drop reaps the process.
                    tracing::warn!("Command timed out after {:?}: {}", limit, spec);
                    return Err(Error::Timeout {
                        command: spec.to_string(),
                        after: limit,
                    });
                }
            },
            None => child.wait_with_output().await?,
        };

        if output.status.success() {
            Ok(())
        } else {
            let stderr = stderr_tail(&output.stderr);
            tracing::debug!("Command failed ({}): {}", output.status, stderr);
            Err(Error::ExternalTool {
                command: spec.to_string(),
                status: output.status.to_string(),
                stderr,
            })
        }
    }
}

fn stderr_tail(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.len() <= STDERR_TAIL {
        return text.to_string();
    }
    let mut start = text.len() - STDERR_TAIL;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    format!("...{}", &text[start..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("mysqldump"), "mysqldump");
        assert_eq!(shell_quote("/tmp/abc123.sql"), "/tmp/abc123.sql");
        assert_eq!(shell_quote("p@ss;rm"), "'p@ss;rm'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("a b"), "'a b'");
    }

    #[test]
    fn test_display_redacts_sensitive_args() {
        let spec = CommandSpec::new("mysql")
            .args(["-u", "root"])
            .sensitive_arg("-pp@ss;rm")
            .arg("site")
            .stdin_file("/tmp/abc123.sql");

        assert_eq!(spec.to_string(), "mysql -u root '****' site < /tmp/abc123.sql");
        assert_eq!(spec.shell_line(), "mysql -u root '-pp@ss;rm' site < /tmp/abc123.sql");
    }

    #[tokio::test]
    async fn test_successful_command() {
        let runner = SystemRunner::new();
        runner.run(&CommandSpec::new("true")).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_external_tool_failure() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("sh").args(["-c", "echo broken >&2; exit 3"]);
        let err = runner.run(&spec).await.unwrap_err();

        match err {
            Error::ExternalTool {
                ref command,
                ref status,
                ref stderr,
            } => {
                assert!(command.starts_with("sh -c"));
                assert!(status.contains('3'));
                assert_eq!(stderr, "broken");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_is_reported_distinctly() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("sleep")
            .arg("5")
            .timeout(Some(Duration::from_millis(100)));

        let started = std::time::Instant::now();
        let err = runner.run(&spec).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { .. }));
        assert!(err.is_external_tool_failure());
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_no_timeout_runs_to_completion() {
        let runner = SystemRunner::new();
        let spec = CommandSpec::new("sleep").arg("0.3");
        runner.run(&spec).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = SystemRunner::new();
        let err = runner
            .run(&CommandSpec::new("definitely-not-an-installed-tool"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_stdin_and_stdout_redirection() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("in.sql");
        let output = temp.path().join("out.sql");
        std::fs::write(&input, "CREATE TABLE t (id INT);\n").unwrap();

        let spec = CommandSpec::new("cat").stdin_file(&input).stdout_file(&output);
        SystemRunner::new().run(&spec).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "CREATE TABLE t (id INT);\n"
        );
    }

    #[tokio::test]
    async fn test_missing_stdin_file_names_tool_and_path() {
        let temp = TempDir::new().unwrap();
        let input = temp.path().join("absent.sql");

        let spec = CommandSpec::new("mysql").stdin_file(&input);
        let err = SystemRunner::new().run(&spec).await.unwrap_err();

        match err {
            Error::Redirect {
                ref program,
                ref path,
                ..
            } => {
                assert_eq!(program, "mysql");
                assert_eq!(path, &input);
            }
            ref other => panic!("unexpected error: {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("mysql"));
        assert!(msg.contains("absent.sql"));
    }

    #[tokio::test]
    async fn test_unwritable_stdout_file_names_tool() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("missing-dir").join("dump.sql");

        let spec = CommandSpec::new("mysqldump").stdout_file(&output);
        let err = SystemRunner::new().run(&spec).await.unwrap_err();

        assert!(matches!(err, Error::Redirect { ref program, .. } if program == "mysqldump"));
        assert!(err.to_string().contains("dump.sql"));
    }

    #[tokio::test]
    async fn test_metacharacters_stay_in_one_argument() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("args.txt");
        let marker = temp.path().join("injected");

        let payload = format!("p@ss;touch {}", marker.display());
        let spec = CommandSpec::new("printf")
            .arg("%s\\n")
            .sensitive_arg(payload.clone())
            .stdout_file(&output);
        SystemRunner::new().run(&spec).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            format!("{}\n", payload)
        );
        assert!(!marker.exists());
    }
}
