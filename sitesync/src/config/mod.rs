//! Configuration management for sitesync
//!
//! Default config location: ./sitesync.toml

mod install;

pub use install::{AssetDir, InstallPaths};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::artifact::Secret;

pub const DEFAULT_CONFIG_FILE: &str = "sitesync.toml";

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Shared correlation token; export and import must agree on it.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub install: InstallConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user: String,
    /// Empty or missing means no password argument is passed.
    #[serde(default)]
    pub password: Option<String>,
}

fn default_db_host() -> String {
    "127.0.0.1".to_string()
}

fn default_db_port() -> u16 {
    3306
}

impl DatabaseConfig {
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            name: String::new(),
            user: String::new(),
            password: None,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password().map(|_| "****"))
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstallConfig {
    /// Installation root. Relative paths below are resolved against it.
    #[serde(default = "default_install_root")]
    pub root: PathBuf,
    /// Web-reachable directory the export writes into.
    #[serde(default = "default_publish_dir")]
    pub publish_dir: PathBuf,
    /// Asset directory in the current layout.
    #[serde(default = "default_assets_dir")]
    pub assets_dir: PathBuf,
    /// Asset directory in the legacy layout, used when `assets_dir` is absent.
    #[serde(default = "default_legacy_assets_dir")]
    pub legacy_assets_dir: PathBuf,
}

fn default_install_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_publish_dir() -> PathBuf {
    PathBuf::from("web")
}

fn default_assets_dir() -> PathBuf {
    PathBuf::from("var/uploads")
}

fn default_legacy_assets_dir() -> PathBuf {
    PathBuf::from("uploads")
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            root: default_install_root(),
            publish_dir: default_publish_dir(),
            assets_dir: default_assets_dir(),
            legacy_assets_dir: default_legacy_assets_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Console command of the content repository, program first.
    #[serde(default = "default_console")]
    pub console: Vec<String>,
    /// Root node of the exported content tree.
    #[serde(default = "default_content_root")]
    pub content_root: String,
    #[serde(default = "default_dump")]
    pub dump: String,
    #[serde(default = "default_load")]
    pub load: String,
    #[serde(default = "default_archive")]
    pub archive: String,
}

fn default_console() -> Vec<String> {
    vec!["php".to_string(), "bin/console".to_string()]
}

fn default_content_root() -> String {
    "/cmf".to_string()
}

fn default_dump() -> String {
    "mysqldump".to_string()
}

fn default_load() -> String {
    "mysql".to_string()
}

fn default_archive() -> String {
    "tar".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            console: default_console(),
            content_root: default_content_root(),
            dump: default_dump(),
            load: default_load(),
            archive: default_archive(),
        }
    }
}

/// Per-tool timeouts in seconds. Missing or 0 means unbounded.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutsConfig {
    #[serde(default)]
    pub content: Option<u64>,
    #[serde(default)]
    pub dump: Option<u64>,
    #[serde(default)]
    pub load: Option<u64>,
    #[serde(default = "default_archive_timeout")]
    pub archive: Option<u64>,
}

fn default_archive_timeout() -> Option<u64> {
    Some(300)
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            content: None,
            dump: None,
            load: None,
            archive: default_archive_timeout(),
        }
    }
}

/// Resolved timeouts handed to the command builders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub content: Option<Duration>,
    pub dump: Option<Duration>,
    pub load: Option<Duration>,
    pub archive: Option<Duration>,
}

fn seconds(value: Option<u64>) -> Option<Duration> {
    value.filter(|s| *s > 0).map(Duration::from_secs)
}

impl TimeoutsConfig {
    pub fn resolve(&self) -> Timeouts {
        Timeouts {
            content: seconds(self.content),
            dump: seconds(self.dump),
            load: seconds(self.load),
            archive: seconds(self.archive),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransferConfig {
    /// Where downloaded artifacts are staged. Defaults to the system temp dir.
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("sitesync/{}", env!("CARGO_PKG_VERSION"))
}

impl TransferConfig {
    pub fn work_dir(&self) -> PathBuf {
        self.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            work_dir: None,
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter string
    /// Override with RUST_LOG env var
    #[serde(default = "default_level")]
    pub level: String,
    /// Log output format: "pretty" or "json"
    /// Override with LOG_FORMAT env var
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Config {
    /// Load config from a file; the file must exist.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.expand_paths()?;
        Ok(config)
    }

    /// Load config from a file, falling back to defaults when it is missing.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            let mut config = Config::default();
            config.expand_paths()?;
            Ok(config)
        }
    }

    /// Check the settings both export and import depend on.
    pub fn validate(&self) -> Result<()> {
        self.secret()?;
        if self.database.name.is_empty() {
            bail!("database.name must be set");
        }
        if self.database.user.is_empty() {
            bail!("database.user must be set");
        }
        if self.tools.console.is_empty() {
            bail!("tools.console must name at least the program to run");
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => bail!("logging.format must be 'pretty' or 'json', got '{}'", other),
        }
        Ok(())
    }

    pub fn secret(&self) -> Result<Secret> {
        let raw = self
            .secret
            .as_deref()
            .ok_or_else(|| anyhow!("No secret configured (set `secret` or SITESYNC_SECRET)"))?;
        Ok(Secret::new(raw)?)
    }

    pub fn install_paths(&self) -> InstallPaths {
        InstallPaths::new(
            &self.install.root,
            &self.install.publish_dir,
            &self.install.assets_dir,
            &self.install.legacy_assets_dir,
        )
    }

    /// Expand ~ in all paths and anchor relative ones at the working directory.
    ///
    /// Tools run with the install root as their working directory, so every
    /// path handed to them must be absolute.
    pub fn expand_paths(&mut self) -> Result<()> {
        self.install.root = absolute(&expand_tilde(&self.install.root)?)?;
        if let Some(ref dir) = self.transfer.work_dir {
            self.transfer.work_dir = Some(absolute(&expand_tilde(dir)?)?);
        }
        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Cannot resolve path {}", path.display()))
}
