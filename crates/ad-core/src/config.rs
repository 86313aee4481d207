//! Configuration structures for autodock.
//!
//! This module provides configuration types for all components of the agent:
//!
//! - [`AgentConfig`] - Coordinator settings (workload, cooldown, queue bounds)
//! - [`WatchConfig`] - File watcher settings (recursion, channel capacity)
//! - [`RedeployConfig`] - The external redeploy action and how it is launched
//! - [`Config`] - Root configuration combining all settings
//!
//! All configuration types implement [`Default`] with the values the agent
//! ships with, and every field may be omitted from a configuration file.

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::error::ConfigError;

/// Argument list for an external command.
pub type CommandArgs = SmallVec<[String; 4]>;

/// How the long-running half of a redeploy is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LauncherKind {
    /// Pick a terminal strategy for the current operating system.
    #[default]
    Auto,
    /// Open an `xterm` window that stays open after the command exits.
    Xterm,
    /// Ask macOS Terminal.app to run the command in a new window.
    TerminalApp,
    /// Run the command in the background with its output discarded.
    Detached,
}

impl LauncherKind {
    /// Returns the configuration spelling of this launcher.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Xterm => "xterm",
            Self::TerminalApp => "terminal_app",
            Self::Detached => "detached",
        }
    }
}

/// Configuration for the state coordinator and its producers.
///
/// # Examples
///
/// ```
/// use ad_core::AgentConfig;
/// use std::time::Duration;
///
/// let config = AgentConfig::default();
/// assert_eq!(config.cooldown, Duration::from_secs(60));
/// assert_eq!(config.workload_id, "my_container");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Identifier of the workload being redeployed.
    pub workload_id: String,

    /// Minimum spacing between automatic redeploys.
    #[serde(with = "crate::duration::serde_go")]
    pub cooldown: Duration,

    /// Capacity of the operator command queue.
    ///
    /// Commands that arrive while the queue is full are dropped.
    pub command_queue_capacity: usize,

    /// Capacity of the queue carrying file changes and timer fires.
    ///
    /// Producers wait for room, so nothing on this queue is dropped.
    pub change_queue_capacity: usize,

    /// Capacity of the output buffer between the agent and the terminal.
    pub output_buffer: usize,

    /// Directories registered with the watcher at startup.
    pub watch_dirs: Vec<Utf8PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            workload_id: "my_container".to_owned(),
            cooldown: Duration::from_secs(60),
            command_queue_capacity: 10,
            change_queue_capacity: 100,
            output_buffer: 100,
            watch_dirs: Vec::new(),
        }
    }
}

/// Configuration for the file watcher.
///
/// # Examples
///
/// ```
/// use ad_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert!(!config.recursive);
/// assert_eq!(config.channel_capacity, 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Whether registered directories are watched recursively.
    pub recursive: bool,

    /// Capacity of the channel between the watcher backend and the agent.
    pub channel_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            channel_capacity: 100,
        }
    }
}

/// Configuration for the external redeploy action.
///
/// A redeploy runs `program down_args` to completion, then launches
/// `program up_args` through the configured [`LauncherKind`].
///
/// # Examples
///
/// ```
/// use ad_core::{LauncherKind, RedeployConfig};
///
/// let config = RedeployConfig::default();
/// assert_eq!(config.program, "docker");
/// assert_eq!(config.up_command_line(), "docker compose up --build");
/// assert_eq!(config.launcher, LauncherKind::Auto);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedeployConfig {
    /// The external tool that performs the redeploy.
    pub program: String,

    /// Arguments that stop the running workload.
    pub down_args: CommandArgs,

    /// Arguments that rebuild and start the workload.
    pub up_args: CommandArgs,

    /// Prefix the start command with `sudo`.
    pub sudo: bool,

    /// How the start command is launched.
    pub launcher: LauncherKind,

    /// Directory the commands run in. `None` means the agent's working directory.
    pub working_dir: Option<Utf8PathBuf>,
}

impl Default for RedeployConfig {
    fn default() -> Self {
        Self {
            program: "docker".to_owned(),
            down_args: smallvec!["compose".to_owned(), "down".to_owned()],
            up_args: smallvec!["compose".to_owned(), "up".to_owned(), "--build".to_owned()],
            sudo: false,
            launcher: LauncherKind::Auto,
            working_dir: None,
        }
    }
}

impl RedeployConfig {
    /// Returns the start command as a single shell line.
    #[must_use]
    pub fn up_command_line(&self) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(self.up_args.len() + 2);
        if self.sudo {
            parts.push("sudo");
        }
        parts.push(&self.program);
        parts.extend(self.up_args.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// Root configuration for autodock.
///
/// # Examples
///
/// ```
/// use ad_core::Config;
///
/// let config = Config::default();
/// assert!(config.validate().is_ok());
///
/// let json = serde_json::to_string_pretty(&config).unwrap();
/// assert!(json.contains("\"cooldown\": \"1m0s\""));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Coordinator configuration.
    pub agent: AgentConfig,

    /// File watcher configuration.
    pub watch: WatchConfig,

    /// Redeploy action configuration.
    pub redeploy: RedeployConfig,
}

impl Config {
    /// Loads and validates a configuration file in JSON format.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingFile`] if the file does not exist,
    /// [`ConfigError::Parse`] if it is not valid JSON for this structure, and
    /// [`ConfigError::InvalidOption`] if a value fails validation.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::MissingFile(path.to_owned()));
        }

        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks that every option holds a usable value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] naming the first bad option.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.workload_id.trim().is_empty() {
            return Err(ConfigError::invalid_option("agent.workload_id", "must not be empty"));
        }
        if self.agent.cooldown.is_zero() {
            return Err(ConfigError::invalid_option("agent.cooldown", "must be positive"));
        }
        if self.agent.command_queue_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "agent.command_queue_capacity",
                "must be at least 1",
            ));
        }
        if self.agent.change_queue_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "agent.change_queue_capacity",
                "must be at least 1",
            ));
        }
        if self.agent.output_buffer == 0 {
            return Err(ConfigError::invalid_option("agent.output_buffer", "must be at least 1"));
        }
        if self.watch.channel_capacity == 0 {
            return Err(ConfigError::invalid_option(
                "watch.channel_capacity",
                "must be at least 1",
            ));
        }
        if self.redeploy.program.trim().is_empty() {
            return Err(ConfigError::invalid_option("redeploy.program", "must not be empty"));
        }
        Ok(())
    }
}
