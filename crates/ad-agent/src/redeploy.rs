//! The redeploy action and its asynchronous trigger.
//!
//! # Architecture
//!
//! ```text
//! Coordinator ──fire()──► RedeployTrigger ──spawn──► task
//!                             │                        │
//!                         InputGate::suspend      Redeployer::redeploy
//!                                                      │
//!                                          ComposeRedeployer
//!                                           1. <program> compose down   (captured)
//!                                           2. TerminalLauncher::launch (up --build)
//! ```
//!
//! The coordinator never waits on a redeploy. The spawned task reports the
//! outcome through the output sink, waiting for room rather than dropping
//! anything, re-emits the prompt, and drops its
//! [`SuspendGuard`](crate::gate::SuspendGuard) on every exit path.

use std::io;
use std::process::{ExitStatus, Output as ProcessOutput, Stdio};
use std::sync::Arc;

use ad_core::RedeployConfig;
use camino::Utf8PathBuf;
use futures_util::future::BoxFuture;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gate::InputGate;
use crate::launch::{LaunchError, TerminalLauncher};
use crate::output::{Output, OutputSender};

/// Errors from a redeploy attempt.
#[derive(Debug, thiserror::Error)]
pub enum RedeployError {
    /// The external program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The external program exited unsuccessfully.
    #[error("{program} {status}\nOutput: {output}")]
    Failed {
        /// Program that failed.
        program: String,
        /// Its exit status.
        status: ExitStatus,
        /// Combined stdout and stderr.
        output: String,
    },

    /// The interactive half could not be launched.
    #[error(transparent)]
    Launch(#[from] LaunchError),
}

/// The asynchronous outcome of [`Redeployer::redeploy`].
pub type RedeployFuture = BoxFuture<'static, Result<String, RedeployError>>;

/// Performs the redeploy of a workload.
///
/// The returned future must not borrow `self`; it is moved into its own task.
pub trait Redeployer: Send + Sync + 'static {
    /// Starts redeploying `workload_id`. On success yields text for the operator.
    fn redeploy(&self, workload_id: &str) -> RedeployFuture;
}

/// Redeploys with `docker compose down` followed by `docker compose up --build`
/// in a separate terminal.
#[derive(Debug, Clone)]
pub struct ComposeRedeployer {
    config: RedeployConfig,
    launcher: Option<TerminalLauncher>,
    working_dir: Utf8PathBuf,
}

impl ComposeRedeployer {
    /// Creates a redeployer running in `working_dir`.
    ///
    /// The launcher is resolved now. If none fits this platform, every
    /// redeploy stops the workload and then reports
    /// [`LaunchError::UnsupportedPlatform`].
    #[must_use]
    pub fn new(config: RedeployConfig, working_dir: Utf8PathBuf) -> Self {
        let launcher = match TerminalLauncher::select(config.launcher) {
            Ok(launcher) => Some(launcher),
            Err(e) => {
                warn!(launcher = config.launcher.label(), error = %e, "No terminal launcher available");
                None
            }
        };

        Self {
            config,
            launcher,
            working_dir,
        }
    }

    /// Returns the resolved launcher.
    #[must_use]
    pub fn launcher(&self) -> Option<TerminalLauncher> {
        self.launcher
    }
}

impl ComposeRedeployer {
    async fn stop_then_launch(&self, workload: &str) -> Result<String, RedeployError> {
        let program = &self.config.program;
        let dir = &self.working_dir;

        info!(workload, dir = %dir, "Stopping workload");
        let output = Command::new(program)
            .args(self.config.down_args.iter())
            .current_dir(dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| RedeployError::Spawn {
                program: program.clone(),
                source,
            })?;

        let combined = combined_output(&output);
        if !output.status.success() {
            return Err(RedeployError::Failed {
                program: program.clone(),
                status: output.status,
                output: combined,
            });
        }
        debug!(workload, "Workload stopped");

        let launcher = self.launcher.ok_or(LaunchError::UnsupportedPlatform)?;
        launcher.launch(dir, &self.config.up_command_line())?;

        Ok(format!(
            "{combined}Redeploy running in {}",
            launcher.destination()
        ))
    }
}

impl Redeployer for ComposeRedeployer {
    fn redeploy(&self, workload_id: &str) -> RedeployFuture {
        let this = self.clone();
        let workload = workload_id.to_owned();
        Box::pin(async move { this.stop_then_launch(&workload).await })
    }
}

/// Stdout followed by stderr, lossily decoded.
fn combined_output(output: &ProcessOutput) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

/// Checks that `program --version` runs successfully.
///
/// # Errors
///
/// Returns [`RedeployError::Spawn`] if the program can't be started, or
/// [`RedeployError::Failed`] if it exits unsuccessfully.
pub async fn ensure_available(program: &str) -> Result<(), RedeployError> {
    let output = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| RedeployError::Spawn {
            program: program.to_owned(),
            source,
        })?;

    if output.status.success() {
        let version = String::from_utf8_lossy(&output.stdout);
        debug!(program, version = %version.trim(), "Tool available");
        Ok(())
    } else {
        Err(RedeployError::Failed {
            program: program.to_owned(),
            status: output.status,
            output: combined_output(&output),
        })
    }
}

/// Fires redeploys without blocking the caller.
#[derive(Clone)]
pub struct RedeployTrigger {
    redeployer: Arc<dyn Redeployer>,
    gate: InputGate,
    output: OutputSender,
}

impl std::fmt::Debug for RedeployTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedeployTrigger")
            .field("in_flight", &self.in_flight())
            .finish_non_exhaustive()
    }
}

impl RedeployTrigger {
    /// Creates a trigger.
    #[must_use]
    pub fn new(redeployer: Arc<dyn Redeployer>, gate: InputGate, output: OutputSender) -> Self {
        Self {
            redeployer,
            gate,
            output,
        }
    }

    /// Returns `true` while any redeploy is running.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        self.gate.is_suspended()
    }

    /// Starts a redeploy in its own task and returns immediately.
    ///
    /// Input stays suspended until the task finishes, whether it succeeds,
    /// fails, or panics.
    pub fn fire(&self, workload_id: &str) -> JoinHandle<()> {
        let guard = self.gate.suspend();
        let redeploy = self.redeployer.redeploy(workload_id);
        let output = self.output.clone();
        let workload = workload_id.to_owned();

        tokio::spawn(async move {
            let _guard = guard;
            output.send(Output::Line("Beginning Redeploy".into())).await;
            let report = match redeploy.await {
                Ok(report) => {
                    info!(workload = %workload, "Redeploy started");
                    report
                }
                Err(e) => {
                    warn!(workload = %workload, error = %e, "Redeploy failed");
                    format!("Error: {e}")
                }
            };
            output.send(Output::Line(report)).await;
            output.send(Output::Prompt).await;
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::output::Output;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    /// Records calls and answers with a canned result.
    #[derive(Debug, Default)]
    pub(crate) struct FakeRedeployer {
        pub(crate) calls: Mutex<Vec<String>>,
        pub(crate) fail: bool,
    }

    impl FakeRedeployer {
        pub(crate) fn call_count(&self) -> usize {
            self.calls.lock().map(|calls| calls.len()).unwrap_or_default()
        }
    }

    impl Redeployer for FakeRedeployer {
        fn redeploy(&self, workload_id: &str) -> RedeployFuture {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push(workload_id.to_owned());
            }
            let fail = self.fail;
            let workload = workload_id.to_owned();
            Box::pin(async move {
                if fail {
                    Err(RedeployError::Launch(LaunchError::UnsupportedPlatform))
                } else {
                    Ok(format!("redeployed {workload}"))
                }
            })
        }
    }

    fn drain(rx: &mut mpsc::Receiver<Output>) -> Vec<Output> {
        std::iter::from_fn(|| rx.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn test_fire_reports_success_and_prompts() {
        let fake = Arc::new(FakeRedeployer::default());
        let (output, mut rx) = OutputSender::channel(16);
        let trigger = RedeployTrigger::new(
            Arc::clone(&fake) as Arc<dyn Redeployer>,
            InputGate::new(),
            output,
        );

        trigger.fire("web").await.expect("task completes");

        assert_eq!(
            drain(&mut rx),
            [
                Output::Line("Beginning Redeploy".into()),
                Output::Line("redeployed web".into()),
                Output::Prompt,
            ]
        );
        assert_eq!(fake.call_count(), 1);
        assert!(!trigger.in_flight());
    }

    #[tokio::test]
    async fn test_fire_reports_failure() {
        let fake = Arc::new(FakeRedeployer {
            fail: true,
            ..FakeRedeployer::default()
        });
        let (output, mut rx) = OutputSender::channel(16);
        let trigger = RedeployTrigger::new(fake, InputGate::new(), output);

        trigger.fire("web").await.expect("task completes");

        let outputs = drain(&mut rx);
        assert_eq!(
            outputs.get(1),
            Some(&Output::Line(
                "Error: Unsupported OS for terminal separation".into()
            ))
        );
        assert_eq!(outputs.last(), Some(&Output::Prompt));
    }

    #[tokio::test]
    async fn test_fire_reports_everything_through_a_full_buffer() {
        let (output, mut rx) = OutputSender::channel(1);
        output.line("Change detected");
        let trigger = RedeployTrigger::new(
            Arc::new(FakeRedeployer::default()),
            InputGate::new(),
            output,
        );

        let handle = trigger.fire("web");
        let mut received = Vec::new();
        for _ in 0..4 {
            received.push(rx.recv().await.expect("output open"));
        }
        handle.await.expect("task completes");

        assert_eq!(
            received,
            [
                Output::Line("Change detected".into()),
                Output::Line("Beginning Redeploy".into()),
                Output::Line("redeployed web".into()),
                Output::Prompt,
            ]
        );
    }

    #[tokio::test]
    async fn test_fire_suspends_input_until_done() {
        let gate = InputGate::new();
        let (output, _rx) = OutputSender::channel(16);
        let trigger = RedeployTrigger::new(
            Arc::new(FakeRedeployer::default()),
            gate.clone(),
            output,
        );

        let handle = trigger.fire("web");
        assert!(gate.is_suspended());
        handle.await.expect("task completes");
        assert!(!gate.is_suspended());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ensure_available() {
        assert!(ensure_available("true").await.is_ok());
        let missing = ensure_available("autodock-no-such-program").await;
        assert!(matches!(missing, Err(RedeployError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compose_redeployer_reports_failed_stop() {
        let config = RedeployConfig {
            program: "false".to_owned(),
            launcher: ad_core::LauncherKind::Detached,
            ..RedeployConfig::default()
        };
        let redeployer = ComposeRedeployer::new(config, Utf8PathBuf::from("/"));

        let err = redeployer.redeploy("web").await.expect_err("false exits 1");
        assert!(matches!(err, RedeployError::Failed { .. }));
        assert!(err.to_string().starts_with("false exit status: 1"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_compose_redeployer_launches_detached() {
        let config = RedeployConfig {
            program: "true".to_owned(),
            up_args: ["--version".to_owned()].into_iter().collect(),
            launcher: ad_core::LauncherKind::Detached,
            ..RedeployConfig::default()
        };
        let redeployer = ComposeRedeployer::new(config, Utf8PathBuf::from("/"));
        assert_eq!(redeployer.launcher(), Some(TerminalLauncher::Detached));

        let report = redeployer.redeploy("web").await.expect("true succeeds");
        assert_eq!(report, "Redeploy running in background");
    }
}
