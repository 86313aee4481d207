//! Starting the long-running half of a redeploy.
//!
//! `compose up` stays attached to its output, so it is handed to a
//! [`TerminalLauncher`] that starts it somewhere other than the agent's own
//! terminal: a new xterm, a new Terminal.app window, or a detached background
//! process. The strategy is picked once at startup from [`LauncherKind`].

use std::io;
use std::process::Stdio;

use ad_core::LauncherKind;
use camino::Utf8Path;
use tokio::process::Command;
use tracing::info;

/// Errors from launching the interactive command.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    /// No terminal strategy exists for this operating system.
    #[error("Unsupported OS for terminal separation")]
    UnsupportedPlatform,

    /// The launcher process could not be started.
    #[error("Error starting terminal: {0}")]
    Spawn(#[source] io::Error),
}

/// Where the interactive command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalLauncher {
    /// `xterm -hold -e sh -c "cd <dir> && <cmd>"`.
    Xterm,
    /// `osascript` telling Terminal.app to run the command.
    TerminalApp,
    /// `sh -c <cmd>` in the background with output discarded.
    Detached,
}

impl TerminalLauncher {
    /// Resolves a configured launcher kind.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::UnsupportedPlatform`] when `kind` is
    /// [`LauncherKind::Auto`] and the current OS has no terminal strategy.
    pub fn select(kind: LauncherKind) -> Result<Self, LaunchError> {
        match kind {
            LauncherKind::Auto => Self::for_os(std::env::consts::OS),
            LauncherKind::Xterm => Ok(Self::Xterm),
            LauncherKind::TerminalApp => Ok(Self::TerminalApp),
            LauncherKind::Detached => Ok(Self::Detached),
        }
    }

    /// Returns the terminal strategy for an OS name as in
    /// [`std::env::consts::OS`].
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::UnsupportedPlatform`] for anything but Linux and macOS.
    pub fn for_os(os: &str) -> Result<Self, LaunchError> {
        match os {
            "linux" => Ok(Self::Xterm),
            "macos" => Ok(Self::TerminalApp),
            _ => Err(LaunchError::UnsupportedPlatform),
        }
    }

    /// Describes where the command ends up, for the success message.
    #[must_use]
    pub const fn destination(self) -> &'static str {
        match self {
            Self::Xterm | Self::TerminalApp => "new terminal window",
            Self::Detached => "background",
        }
    }

    /// Builds the process that runs `command_line` inside `dir`.
    #[must_use]
    pub fn command(self, dir: &Utf8Path, command_line: &str) -> Command {
        let script = format!("cd {} && {command_line}", shell_quote(dir.as_str()));
        match self {
            Self::Xterm => {
                let mut cmd = Command::new("xterm");
                cmd.args(["-hold", "-e", "sh", "-c", &script]);
                cmd
            }
            Self::TerminalApp => {
                let mut cmd = Command::new("osascript");
                cmd.arg("-e").arg(format!(
                    "tell application \"Terminal\" to do script \"{}\"",
                    applescript_escape(&script)
                ));
                cmd
            }
            Self::Detached => {
                let mut cmd = Command::new("sh");
                cmd.arg("-c")
                    .arg(command_line)
                    .current_dir(dir)
                    .stdout(Stdio::null())
                    .stderr(Stdio::null());
                cmd
            }
        }
    }

    /// Starts `command_line` inside `dir` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError::Spawn`] if the launcher process fails to start.
    pub fn launch(self, dir: &Utf8Path, command_line: &str) -> Result<(), LaunchError> {
        let mut cmd = self.command(dir, command_line);
        cmd.stdin(Stdio::null());
        let child = cmd.spawn().map_err(LaunchError::Spawn)?;
        info!(launcher = ?self, pid = child.id(), dir = %dir, "Launched interactive command");
        Ok(())
    }
}

/// Quotes `s` for a POSIX shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', r"\\").replace('"', "\\\"")
}
