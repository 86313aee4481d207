//! CLI entry point for autodock.
//!
//! Watches directories and redeploys a docker compose workload when files in
//! them are written, while accepting live commands on stdin.
//!
//! # Usage
//!
//! ```bash
//! autodock [OPTIONS]
//!
//! # Watch two folders from the start, with a 30 second cooldown
//! autodock --watch ./api --watch ./web --cooldown 30s
//!
//! # Load settings from a file and show the effective configuration
//! autodock --config autodock.json --print-config
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::sync::Arc;

use ad_agent::ComposeRedeployer;
use ad_core::{Config, LauncherKind, parse_positive_duration};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, ValueEnum};
use color_eyre::eyre::{WrapErr, eyre};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Redeploys a docker compose workload whenever watched folders change.
///
/// Type `help` at the prompt for the list of live commands.
#[derive(Parser)]
#[command(name = "autodock", version, about, long_about = None)]
struct Cli {
    /// Path to a JSON configuration file.
    #[arg(short, long, env = "AUTODOCK_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Identifier of the workload shown in messages.
    #[arg(short, long, env = "AUTODOCK_WORKLOAD")]
    workload: Option<String>,

    /// Cooldown between automatic redeploys, e.g. `60s`, `2m`, `1h30m`.
    #[arg(long, value_name = "DURATION")]
    cooldown: Option<String>,

    /// Folder to watch from startup. Repeatable.
    #[arg(long = "watch", value_name = "DIR")]
    watch: Vec<Utf8PathBuf>,

    /// Where `compose up` runs.
    #[arg(long, value_enum)]
    launcher: Option<LauncherArg>,

    /// Run `compose up` through sudo.
    #[arg(long)]
    sudo: bool,

    /// Directory the compose commands run in.
    ///
    /// Defaults to the current directory.
    #[arg(long, value_name = "DIR")]
    working_dir: Option<Utf8PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
}

/// Terminal launcher choice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LauncherArg {
    /// Pick by operating system.
    Auto,
    /// A new xterm window.
    Xterm,
    /// A new macOS Terminal.app window.
    TerminalApp,
    /// A background process with output discarded.
    Detached,
}

impl From<LauncherArg> for LauncherKind {
    fn from(arg: LauncherArg) -> Self {
        match arg {
            LauncherArg::Auto => Self::Auto,
            LauncherArg::Xterm => Self::Xterm,
            LauncherArg::TerminalApp => Self::TerminalApp,
            LauncherArg::Detached => Self::Detached,
        }
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects `RUST_LOG` if set. Otherwise logs at `warn`, or `debug` with
/// `--verbose`. Logs go to stderr; stdout belongs to the operator console.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "warn" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the config file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the config file can't be loaded, `--cooldown` isn't a
/// positive duration, or the result fails validation.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .wrap_err_with(|| format!("Failed to load config from {path}"))?,
        None => Config::default(),
    };

    if let Some(workload) = &cli.workload {
        config.agent.workload_id.clone_from(workload);
    }
    if let Some(cooldown) = &cli.cooldown {
        config.agent.cooldown =
            parse_positive_duration(cooldown).wrap_err("Invalid --cooldown")?;
    }
    config.agent.watch_dirs.extend(cli.watch.iter().cloned());
    if let Some(launcher) = cli.launcher {
        config.redeploy.launcher = launcher.into();
    }
    if cli.sudo {
        config.redeploy.sudo = true;
    }
    if let Some(dir) = &cli.working_dir {
        config.redeploy.working_dir = Some(dir.clone());
    }

    config.validate()?;
    Ok(config)
}

/// Resolves the directory compose commands run in.
fn working_dir(config: &Config) -> color_eyre::Result<Utf8PathBuf> {
    if let Some(dir) = &config.redeploy.working_dir {
        return Ok(dir.clone());
    }
    let cwd = std::env::current_dir().wrap_err("Failed to read the current directory")?;
    Utf8PathBuf::try_from(cwd).wrap_err("Current directory is not valid UTF-8")
}

/// Name to show in the install hint.
fn tool_name(program: &str) -> &str {
    match Utf8Path::new(program).file_name() {
        Some("docker") => "Docker",
        Some(name) => name,
        None => program,
    }
}

/// Cancels `shutdown` on Ctrl-C or SIGTERM.
fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("Received shutdown signal");
        shutdown.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to listen for Ctrl-C");
                        std::future::pending::<()>().await;
                    }
                }
                _ = sigterm.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to listen for SIGTERM");
            wait_for_ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

// =============================================================================
// COMMAND HANDLERS
// =============================================================================

/// Checks the tool, then runs the agent until shutdown.
async fn run_agent(config: Config) -> color_eyre::Result<()> {
    let program = &config.redeploy.program;
    if let Err(e) = ad_agent::ensure_available(program).await {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "Install {} to use this program!", tool_name(program))?;
        return Err(e).wrap_err_with(|| format!("{program} is not available"));
    }

    let redeployer = ComposeRedeployer::new(config.redeploy.clone(), working_dir(&config)?);
    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    ad_agent::run(&config, Arc::new(redeployer), shutdown)
        .await
        .map_err(|e| eyre!("Agent error: {e}"))
}

fn print_config(config: &Config) -> color_eyre::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, config)?;
    writeln!(stdout)?;
    Ok(())
}

// =============================================================================
// MAIN
// =============================================================================

fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Assemble configuration
    let config = build_config(&cli)?;
    if cli.print_config {
        return print_config(&config);
    }

    // 5. Run the agent
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(run_agent(config));

    // The stdin reader may be parked in a blocking read that never returns.
    runtime.shutdown_background();
    result
}
