//! Command-driven redeploy agent.
//!
//! Watches directories for writes and redeploys a compose workload when they
//! change, while an operator steers it from the terminal.
//!
//! # Architecture
//!
//! ```text
//!   stdin ──► InputReader ──Command────► command queue ──┐
//!                                                        ├──► run_dispatch ──► Coordinator
//!   notify ─► FileWatcher ──relay──────► change queue ───┘                         │
//!                                          ▲                                       │ fire()
//!             TimerSlot ───TimerFired──────┘                                       ▼
//!   stdout ◄── run_printer ◄── OutputSender ◄───────────────────────── RedeployTrigger task
//! ```
//!
//! Commands have their own queue so that a burst of file changes never
//! crowds them out.
//!
//! The [`Coordinator`] owns all mutable state and is only ever driven by the
//! dispatch loop, so transitions are serialized by construction.
//!
//! # Modules
//!
//! ```text
//! crates/ad-agent/src/
//!   lib.rs          # run() and public exports
//!   command.rs      # Line parsing and verb recognition
//!   event.rs        # Event sum type fed to the dispatch loop
//!   coordinator.rs  # State and transitions
//!   dispatch.rs     # Dispatch loop and watcher relay
//!   input.rs        # Operator input with load shedding
//!   output.rs       # Output channel and printer
//!   timer.rs        # Single-slot debounce timer
//!   watch_set.rs    # Mirror of watcher registrations
//!   gate.rs         # Input suspension during redeploys
//!   redeploy.rs     # Redeployer trait, compose redeploy, trigger
//!   launch.rs       # Terminal launcher strategies
//!   help.rs         # Banner and help text
//!   error.rs        # AgentError
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ad_agent::ComposeRedeployer;
//! use ad_core::Config;
//! use camino::Utf8PathBuf;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), ad_agent::AgentError> {
//! let config = Config::default();
//! let redeployer = ComposeRedeployer::new(config.redeploy.clone(), Utf8PathBuf::from("."));
//!
//! ad_agent::run(&config, Arc::new(redeployer), CancellationToken::new()).await
//! # }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod gate;
pub mod help;
pub mod input;
pub mod launch;
pub mod output;
pub mod redeploy;
pub mod timer;
pub mod watch_set;

use std::sync::Arc;

use ad_core::Config;
use ad_watcher::{FileWatcher, WriteFilter};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

// Public re-exports
pub use command::{Command, Verb};
pub use coordinator::{Coordinator, CoordinatorState};
pub use dispatch::{EventQueues, EventSenders};
pub use error::AgentError;
pub use event::Event;
pub use gate::{InputGate, SuspendGuard};
pub use input::InputReader;
pub use launch::{LaunchError, TerminalLauncher};
pub use output::{Output, OutputSender};
pub use redeploy::{
    ComposeRedeployer, RedeployError, RedeployFuture, RedeployTrigger, Redeployer,
    ensure_available,
};
pub use timer::{TimerError, TimerId, TimerSlot};
pub use watch_set::{PathRegistry, WatchSet, WatchSetError};

/// Runs the agent on the process's stdin and stdout until shutdown.
///
/// Shutdown happens when `shutdown` is cancelled or stdin reaches end of
/// input.
///
/// # Errors
///
/// Returns [`AgentError`] if the watcher can't be created, the console can't
/// be written, or a background task panics.
pub async fn run(
    config: &Config,
    redeployer: Arc<dyn Redeployer>,
    shutdown: CancellationToken,
) -> Result<(), AgentError> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run_with_io(config, redeployer, stdin, tokio::io::stdout(), shutdown).await?;
    Ok(())
}

/// Runs the agent on the given input and output.
///
/// Returns the writer once everything emitted before shutdown has been
/// written to it.
///
/// # Errors
///
/// See [`run`].
pub async fn run_with_io<I, W>(
    config: &Config,
    redeployer: Arc<dyn Redeployer>,
    input: I,
    writer: W,
    shutdown: CancellationToken,
) -> Result<W, AgentError>
where
    I: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (output, output_rx) = OutputSender::channel(config.agent.output_buffer);
    let printer_stop = CancellationToken::new();
    let printer = tokio::spawn(output::run_printer(
        output_rx,
        writer,
        printer_stop.clone(),
    ));

    let result = serve(config, redeployer, input, output, &shutdown).await;

    // Redeploy tasks may still hold senders; stop the printer explicitly.
    printer_stop.cancel();
    let writer = printer.await??;
    result?;
    Ok(writer)
}

async fn serve<I>(
    config: &Config,
    redeployer: Arc<dyn Redeployer>,
    input: I,
    output: OutputSender,
    shutdown: &CancellationToken,
) -> Result<(), AgentError>
where
    I: AsyncBufRead + Unpin + Send + 'static,
{
    output.line(help::BANNER);

    let (watcher, watch_rx) = FileWatcher::new(&config.watch, WriteFilter)?;
    let (senders, queues) = EventQueues::new(&config.agent);
    let gate = InputGate::new();

    let trigger = RedeployTrigger::new(redeployer, gate.clone(), output.clone());
    let mut coordinator = Coordinator::new(
        &config.agent,
        watcher,
        trigger,
        output.clone(),
        senders.changes.clone(),
    );
    coordinator.watch_initial(config.agent.watch_dirs.iter().map(|dir| dir.as_str()));
    output.prompt();

    info!(
        workload = %config.agent.workload_id,
        watched = coordinator.state().watch_set.len(),
        "Agent started"
    );

    let relay = tokio::spawn(dispatch::relay_watch_events(
        watch_rx,
        senders.changes,
        shutdown.clone(),
    ));
    let reader = InputReader::new(senders.commands, output, gate);
    let input_task = tokio::spawn(reader.run(input, shutdown.clone()));

    let coordinator = dispatch::run_dispatch(coordinator, queues, shutdown).await;

    // Dropping the coordinator drops the watcher, which closes the relay's source.
    drop(coordinator);
    shutdown.cancel();
    relay.await?;
    input_task.await?;

    debug!("Agent stopped");
    Ok(())
}
