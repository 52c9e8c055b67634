//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use sitesync::config::{DatabaseConfig, InstallPaths};
use sitesync::{CommandSpec, Error, ProcessRunner, ProgressEvent, ProgressSink, Result, SystemRunner};
use std::path::Path;
use std::sync::Mutex;

/// Records every command and fakes the files real tools would write.
///
/// With `real_archive` set, archive commands are executed for real.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<CommandSpec>>,
    fail_on: Option<String>,
    real_archive: bool,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every command whose shell line contains `pattern`.
    pub fn failing_on(pattern: &str) -> Self {
        Self {
            fail_on: Some(pattern.to_string()),
            ..Self::default()
        }
    }

    pub fn with_real_archive() -> Self {
        Self {
            real_archive: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// First sub-command word of each call (console sub-command or program).
    pub fn operations(&self) -> Vec<String> {
        self.calls()
            .iter()
            .map(|spec| {
                spec.arg_values()
                    .iter()
                    .find(|a| a.starts_with("doctrine:"))
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| spec.program.clone())
            })
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for RecordingRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<()> {
        self.calls.lock().unwrap().push(spec.clone());

        if let Some(ref pattern) = self.fail_on {
            if spec.shell_line().contains(pattern.as_str()) {
                return Err(Error::ExternalTool {
                    command: spec.to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: String::new(),
                });
            }
        }

        if self.real_archive && spec.program == "tar" {
            return SystemRunner::new().run(spec).await;
        }

        fake_outputs(spec)
    }
}

fn fake_outputs(spec: &CommandSpec) -> Result<()> {
    let args = spec.arg_values();

    if let Some(ref out) = spec.stdout {
        std::fs::write(out, "-- MySQL dump\nCREATE TABLE page (id INT);\n")?;
    }

    if args.contains(&"doctrine:phpcr:workspace:export") {
        if let Some(file) = args.last() {
            std::fs::write(file, "<sv:node sv:name=\"cmf\"/>\n")?;
        }
    }

    if args.first() == Some(&"-czf") {
        std::fs::write(args[1], b"\x1f\x8bfake-archive")?;
    }

    Ok(())
}

/// Collects progress events in order.
#[derive(Default)]
pub struct CollectProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectProgress {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn advances(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::Advance))
            .count()
    }
}

impl ProgressSink for CollectProgress {
    fn on_event(&self, event: &ProgressEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

pub fn database(password: Option<&str>) -> DatabaseConfig {
    DatabaseConfig {
        host: "127.0.0.1".to_string(),
        port: 3306,
        name: "site".to_string(),
        user: "site".to_string(),
        password: password.map(str::to_string),
    }
}

pub fn install(root: &Path) -> InstallPaths {
    InstallPaths::new(root, "web", "var/uploads", "uploads")
}

/// GNU tar is needed for `--no-overwrite-dir`.
pub fn gnu_tar_available() -> bool {
    std::process::Command::new("tar")
        .arg("--version")
        .output()
        .map(|o| String::from_utf8_lossy(&o.stdout).contains("GNU tar"))
        .unwrap_or(false)
}
