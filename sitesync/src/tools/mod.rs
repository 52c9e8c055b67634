//! Command builders for the external tools.
//!
//! Each function returns a [`CommandSpec`] ready for a
//! [`ProcessRunner`](crate::process::ProcessRunner). The tools themselves and
//! their file formats stay opaque.

pub mod archive;
pub mod content;
pub mod database;

use crate::config::{Config, Timeouts, TimeoutsConfig, ToolsConfig};
use crate::process::CommandSpec;

/// Programs and timeouts used for one run.
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub console: Vec<String>,
    pub content_root: String,
    pub dump: String,
    pub load: String,
    pub archive: String,
    pub timeouts: Timeouts,
}

impl Toolchain {
    pub fn new(tools: &ToolsConfig, timeouts: Timeouts) -> Self {
        Self {
            console: tools.console.clone(),
            content_root: tools.content_root.clone(),
            dump: tools.dump.clone(),
            load: tools.load.clone(),
            archive: tools.archive.clone(),
            timeouts,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.tools, config.timeouts.resolve())
    }

    /// The console program with its leading arguments.
    fn console_command(&self) -> CommandSpec {
        let mut parts = self.console.iter();
        let program = parts.next().map(String::as_str).unwrap_or("php");
        CommandSpec::new(program).args(parts.cloned())
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::new(&ToolsConfig::default(), TimeoutsConfig::default().resolve())
    }
}
