use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_DIR_VAR: &str = "APART_GTK_CONFIG_DIR";
pub const CORE_CMD_VAR: &str = "APART_GTK_CORE_CMD";
pub const SUDO_VAR: &str = "APART_GTK_SUDO";

const DEFAULT_CORE_CMD: &str = "apart-core";
const DEFAULT_ELEVATION_HELPER: &str = "pkexec";
const HISTORY_FILE: &str = "history.yaml";
const LOG_FILE: &str = "apart.log";

/// How the worker is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Elevation {
    /// Run the worker binary as-is.
    Direct,
    /// Prefix the worker with a privilege escalation helper such as `pkexec`.
    Helper(String),
}

/// The worker binary plus fixed arguments; the channel address is appended
/// as the final argument at spawn time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSpec {
    pub program: String,
    pub args: Vec<String>,
    pub elevation: Elevation,
}

impl WorkerSpec {
    pub fn direct(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            elevation: Elevation::Direct,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub worker: WorkerSpec,
    /// Receive timeout; also bounds how quickly worker death is noticed.
    pub poll_interval: Duration,
    /// How long the worker may take to exit once the loop stops.
    pub exit_grace: Duration,
    /// Directory holding the channel's socket file.
    pub socket_dir: PathBuf,
}

impl TransportConfig {
    pub fn new(worker: WorkerSpec) -> Self {
        Self {
            worker,
            poll_interval: Duration::from_millis(100),
            exit_grace: Duration::from_secs(3),
            socket_dir: PathBuf::from("/tmp"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    config_dir: PathBuf,
    core_command: String,
    elevation: Elevation,
}

impl Settings {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok(), running_as_root())
    }

    /// Resolves settings from `lookup`; `as_root` picks the default
    /// elevation when the helper variable is unset.
    pub fn resolve(lookup: impl Fn(&str) -> Option<String>, as_root: bool) -> Self {
        let config_dir = lookup(CONFIG_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map(|dir| {
                let trimmed = dir.trim_end_matches('/');
                PathBuf::from(if trimmed.is_empty() { "/" } else { trimmed })
            })
            .unwrap_or_else(default_config_dir);

        let core_command = lookup(CORE_CMD_VAR)
            .filter(|cmd| !cmd.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CORE_CMD.to_owned());

        let elevation = match lookup(SUDO_VAR) {
            None if as_root => Elevation::Direct,
            None => Elevation::Helper(DEFAULT_ELEVATION_HELPER.to_owned()),
            Some(helper) if helper.trim().is_empty() || helper.trim() == "none" => {
                Elevation::Direct
            }
            Some(helper) => Elevation::Helper(helper.trim().to_owned()),
        };

        Self {
            config_dir,
            core_command,
            elevation,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Creates the configuration directory and its parents if missing.
    pub fn ensure_config_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.config_dir)
    }

    pub fn history_path(&self) -> PathBuf {
        self.config_dir.join(HISTORY_FILE)
    }

    pub fn log_path(&self) -> PathBuf {
        self.config_dir.join(LOG_FILE)
    }

    pub fn core_command(&self) -> &str {
        &self.core_command
    }

    pub fn elevation(&self) -> &Elevation {
        &self.elevation
    }

    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig::new(WorkerSpec {
            program: self.core_command.clone(),
            args: Vec::new(),
            elevation: self.elevation.clone(),
        })
    }
}

fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("apart-gtk")
}

fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}
