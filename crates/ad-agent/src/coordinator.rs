//! The state coordinator.
//!
//! [`Coordinator`] is the only owner of [`CoordinatorState`]. The dispatch
//! loop hands it one [`Event`] at a time, so every transition below runs to
//! completion before the next begins and no lock is needed.
//!
//! # State Machine
//!
//! ```text
//!              change (outside cooldown)           TimerFired(id)
//!   ┌──────┐ ─────────────────────────► ┌────────────┐ ──────────► ┌─────────────┐
//!   │ Idle │                            │ Debouncing │             │ Redeploying │
//!   └──────┘ ◄───────── pause ───────── └────────────┘             └─────────────┘
//!      ▲        redeploy (cancel + fire)                                  │
//!      └──────────────────────── trigger task completes ─────────────────┘
//! ```
//!
//! While `Debouncing`, further changes are ignored: a burst of writes
//! collapses into the one pending timer. The cooldown window then spaces
//! automatically triggered redeploys apart.

use std::ops::ControlFlow;
use std::time::Duration;

use ad_core::{AgentConfig, format_duration, parse_positive_duration};
use ad_watcher::FileEvent;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::command::{Command, Verb};
use crate::event::Event;
use crate::help::HELP_TEXT;
use crate::output::OutputSender;
use crate::redeploy::RedeployTrigger;
use crate::timer::{TimerId, TimerSlot};
use crate::watch_set::{PathRegistry, WatchSet, WatchSetError};

/// Everything the coordinator mutates.
#[derive(Debug)]
pub struct CoordinatorState {
    /// Minimum spacing between automatic redeploys.
    pub cooldown: Duration,

    /// The workload being redeployed.
    pub workload_id: String,

    /// When `true`, change events are ignored.
    pub paused: bool,

    /// When the last automatic redeploy fired. `None` until the first one.
    pub last_change_at: Option<Instant>,

    /// Directories registered with the watcher.
    pub watch_set: WatchSet,

    /// The debounce timer slot.
    pub timer: TimerSlot,
}

impl CoordinatorState {
    /// Creates the startup state.
    #[must_use]
    pub fn new(config: &AgentConfig, events: mpsc::Sender<Event>) -> Self {
        Self {
            cooldown: config.cooldown,
            workload_id: config.workload_id.clone(),
            paused: false,
            last_change_at: None,
            watch_set: WatchSet::new(),
            timer: TimerSlot::new(events),
        }
    }

    /// Returns `true` if a change at `now` is far enough from the last
    /// automatic redeploy to schedule another.
    #[must_use]
    pub fn outside_cooldown(&self, now: Instant) -> bool {
        self.last_change_at
            .is_none_or(|last| now.saturating_duration_since(last) > self.cooldown)
    }
}

/// Applies commands, file changes and timer fires to [`CoordinatorState`].
#[derive(Debug)]
pub struct Coordinator<R> {
    state: CoordinatorState,
    registry: R,
    trigger: RedeployTrigger,
    output: OutputSender,
}

impl<R: PathRegistry> Coordinator<R> {
    /// Creates a coordinator.
    ///
    /// Timer fires are delivered into `events`, the change queue the dispatch
    /// loop reads.
    #[must_use]
    pub fn new(
        config: &AgentConfig,
        registry: R,
        trigger: RedeployTrigger,
        output: OutputSender,
        events: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            state: CoordinatorState::new(config, events),
            registry,
            trigger,
            output,
        }
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    /// Handles one event. Returns [`ControlFlow::Break`] on shutdown.
    pub fn handle(&mut self, event: Event) -> ControlFlow<()> {
        trace!(event = event.name(), "Dispatching event");
        match event {
            Event::Command(command) => self.handle_command(&command),
            Event::FileChanged(change) => self.handle_change(&change),
            Event::TimerFired(id) => self.handle_timer_fired(id),
            Event::WatcherFailed(message) => {
                warn!(error = %message, "Watcher reported an error");
                self.output.line(format!("Watcher Error: {message}"));
            }
            Event::Shutdown => {
                self.shutdown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Registers the startup directories, reporting each outcome.
    pub fn watch_initial<'a>(&mut self, dirs: impl IntoIterator<Item = &'a str>) {
        for dir in dirs {
            self.watch(dir);
        }
    }

    /// Applies an operator command and, except for `redeploy`, re-prompts.
    pub fn handle_command(&mut self, command: &Command) {
        debug!(command = %command, "Handling command");
        let arg = command.argument.as_str();

        match command.verb() {
            Verb::Redeploy => {
                self.redeploy_now();
                // The trigger task prompts when it finishes.
                return;
            }
            Verb::Pause => self.pause(),
            Verb::Resume => self.resume(),
            Verb::Cooldown => self.set_cooldown(arg),
            Verb::Status => self.output.line(self.status_report()),
            Verb::Watch => self.watch(arg),
            Verb::WatchRemove => self.unwatch(arg),
            Verb::WatchList => self.output.line(self.watch_list()),
            Verb::Reset => self.reset(),
            Verb::Help => self.output.line(HELP_TEXT),
            Verb::Unknown => self
                .output
                .line(format!("Unknown Command: {}", command.verb)),
        }

        self.output.prompt();
    }

    /// Debounces a file change into at most one pending redeploy.
    pub fn handle_change(&mut self, change: &FileEvent) {
        if self.state.paused {
            trace!(path = %change.path, "Paused, ignoring change");
            return;
        }
        if self.state.timer.is_pending() {
            trace!(path = %change.path, "Redeploy already scheduled, collapsing change");
            return;
        }

        self.output.line(format!("Change in {}", change.path));

        if !self.state.outside_cooldown(Instant::now()) {
            debug!(path = %change.path, "Change within cooldown");
            self.output
                .line("Change detected within cooldown, please wait");
            self.output.prompt();
            return;
        }

        match self.state.timer.arm(self.state.cooldown) {
            Ok(id) => {
                info!(path = %change.path, timer = %id, "Change detected, redeploy scheduled");
                self.output
                    .line("[!] Change detected, starting redeployment");
            }
            Err(e) => warn!(error = %e, "Failed to schedule redeploy"),
        }
    }

    /// Redeploys when the pending debounce timer elapses.
    ///
    /// Fires from cancelled or replaced timers are ignored. The slot is freed
    /// even if the coordinator was paused while the timer ran.
    pub fn handle_timer_fired(&mut self, id: TimerId) {
        if !self.state.timer.complete(id) {
            debug!(timer = %id, "Ignoring stale timer");
            return;
        }
        if self.state.paused {
            debug!(timer = %id, "Paused while debouncing, skipping redeploy");
            return;
        }

        self.output.line("[!] Redeploying Container");
        self.trigger.fire(&self.state.workload_id);
        self.state.last_change_at = Some(Instant::now());
    }

    /// Announces shutdown and drops any pending timer.
    pub fn shutdown(&mut self) {
        self.state.timer.cancel();
        info!("Shutting down");
        self.output.line("\nShutting Down");
    }

    fn redeploy_now(&mut self) {
        self.output.line(format!(
            "[!] Redeploying container: {}",
            self.state.workload_id
        ));
        self.state.timer.cancel();
        self.trigger.fire(&self.state.workload_id);
    }

    fn pause(&mut self) {
        self.state.paused = true;
        self.state.timer.cancel();
        info!(workload = %self.state.workload_id, "Auto-redeploy paused");
        self.output.line(format!(
            "[!] Auto-Redeployment Paused for Container: {}",
            self.state.workload_id
        ));
    }

    fn resume(&mut self) {
        self.state.paused = false;
        info!(workload = %self.state.workload_id, "Auto-redeploy resumed");
        self.output.line(format!(
            "[!] Auto-Redeployment Enabled for Container: {}",
            self.state.workload_id
        ));
    }

    fn set_cooldown(&mut self, arg: &str) {
        if arg.is_empty() {
            self.output
                .line("Please specify a duration ie 'cooldown 60s'");
            return;
        }

        match parse_positive_duration(arg) {
            Ok(cooldown) => {
                self.state.cooldown = cooldown;
                info!(cooldown = %format_duration(cooldown), "Cooldown updated");
                self.output.line(format!(
                    "[!] Cooldown set to {}",
                    format_duration(cooldown)
                ));
            }
            Err(e) => self.output.line(format!("Invalid duration: {e}")),
        }
    }

    fn watch(&mut self, arg: &str) {
        match self.state.watch_set.add(&mut self.registry, arg) {
            Ok(path) => self.output.line(format!("Watching folder: {path}")),
            Err(WatchSetError::EmptyPath) => self
                .output
                .line("Please specify a folder ie 'watch ./testFolder1'"),
            Err(WatchSetError::Registry(e)) => {
                warn!(path = arg, error = %e, "Failed to watch folder");
                self.output.line(format!("Error adding directory: {e}"));
            }
        }
    }

    fn unwatch(&mut self, arg: &str) {
        match self.state.watch_set.remove(&mut self.registry, arg) {
            Ok(path) => self
                .output
                .line(format!("Removed {path} from watch list")),
            Err(WatchSetError::EmptyPath) => self
                .output
                .line("Please specify a folder to remove ie 'watchRemove ./testFolder1'"),
            Err(WatchSetError::Registry(e)) => {
                warn!(path = arg, error = %e, "Failed to unwatch folder");
                self.output.line(format!("Error removing folder: {e}"));
            }
        }
    }

    fn reset(&mut self) {
        let cleared = self.state.watch_set.reset(&mut self.registry);
        info!(cleared, "Watch set reset");
        self.output.line("Successfully reset watched folders");
    }

    fn watch_list(&self) -> String {
        let mut report = String::from("--- Watched Folders ---");
        for path in self.state.watch_set.list() {
            report.push('\n');
            report.push_str(path.as_str());
        }
        report
    }

    fn status_report(&self) -> String {
        let state = &self.state;
        let last_change = match state.last_change_at {
            Some(at) => format!(
                "{} ago",
                format_duration(Duration::from_secs(at.elapsed().as_secs()))
            ),
            None => "never".to_owned(),
        };

        format!(
            "--- Current Status ---\n\
             Container ID: {}\n\
             Auto-Redeployment: {}\n\
             Last Change: {last_change}\n\
             Cooldown: {}\n\
             Watched Folders: {}\n\
             Redeploy Scheduled: {}\n\
             Redeploy In Flight: {}",
            state.workload_id,
            !state.paused,
            format_duration(state.cooldown),
            state.watch_set.len(),
            yes_no(state.timer.is_pending()),
            yes_no(self.trigger.in_flight()),
        )
    }
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::InputGate;
    use crate::output::Output;
    use crate::redeploy::Redeployer;
    use crate::redeploy::tests::FakeRedeployer;
    use crate::watch_set::tests::FakeRegistry;
    use std::sync::Arc;

    struct Harness {
        coordinator: Coordinator<FakeRegistry>,
        outputs: mpsc::Receiver<Output>,
        events: mpsc::Receiver<Event>,
        redeployer: Arc<FakeRedeployer>,
    }

    impl Harness {
        fn new() -> Self {
            let (output, outputs) = OutputSender::channel(64);
            let (events_tx, events) = mpsc::channel(16);
            let redeployer = Arc::new(FakeRedeployer::default());
            let trigger = RedeployTrigger::new(
                Arc::clone(&redeployer) as Arc<dyn Redeployer>,
                InputGate::new(),
                output.clone(),
            );
            let coordinator = Coordinator::new(
                &AgentConfig::default(),
                FakeRegistry::default(),
                trigger,
                output,
                events_tx,
            );
            Self {
                coordinator,
                outputs,
                events,
                redeployer,
            }
        }

        fn command(&mut self, line: &str) {
            let command = Command::parse(line).expect("non-blank command");
            self.coordinator.handle_command(&command);
        }

        fn change(&mut self, path: &str) {
            self.coordinator.handle_change(&FileEvent::write(path));
        }

        /// Everything emitted so far, prompts included.
        fn drain(&mut self) -> Vec<Output> {
            std::iter::from_fn(|| self.outputs.try_recv().ok()).collect()
        }

        /// Emitted lines only.
        fn lines(&mut self) -> Vec<String> {
            self.drain()
                .into_iter()
                .filter_map(|output| match output {
                    Output::Line(text) => Some(text),
                    Output::Prompt => None,
                })
                .collect()
        }

        /// Waits for the next timer fire and hands it to the coordinator.
        async fn deliver_timer(&mut self) -> TimerId {
            match self.events.recv().await {
                Some(Event::TimerFired(id)) => {
                    self.coordinator.handle_timer_fired(id);
                    id
                }
                other => panic!("expected a timer fire, got {other:?}"),
            }
        }

        /// Waits until a redeploy task re-emits the prompt.
        async fn wait_for_prompt(&mut self) -> Vec<Output> {
            let mut seen = Vec::new();
            while let Some(output) = self.outputs.recv().await {
                let done = output == Output::Prompt;
                seen.push(output);
                if done {
                    break;
                }
            }
            seen
        }
    }

    fn line(text: &str) -> Output {
        Output::Line(text.to_owned())
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_timer() {
        let mut h = Harness::new();

        for _ in 0..3 {
            h.change("src/app.py");
            tokio::time::advance(Duration::from_millis(10)).await;
        }

        assert_eq!(
            h.lines(),
            ["Change in src/app.py", "[!] Change detected, starting redeployment"]
        );
        assert!(h.coordinator.state().timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_fire_redeploys_and_frees_slot() {
        let mut h = Harness::new();
        h.change("src/app.py");
        h.drain();

        h.deliver_timer().await;
        assert!(!h.coordinator.state().timer.is_pending());
        assert!(h.coordinator.state().last_change_at.is_some());

        let outputs = h.wait_for_prompt().await;
        assert_eq!(
            outputs,
            [
                line("[!] Redeploying Container"),
                line("Beginning Redeploy"),
                line("redeployed my_container"),
                Output::Prompt,
            ]
        );
        assert_eq!(h.redeployer.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_spaces_automatic_redeploys() {
        let mut h = Harness::new();
        h.change("a");
        h.deliver_timer().await;
        h.wait_for_prompt().await;
        h.drain();

        // Right after a redeploy the window is still closed.
        h.change("a");
        assert_eq!(
            h.drain(),
            [
                line("Change in a"),
                line("Change detected within cooldown, please wait"),
                Output::Prompt,
            ]
        );
        assert!(!h.coordinator.state().timer.is_pending());

        tokio::time::advance(Duration::from_secs(61)).await;
        h.change("a");
        assert!(h.coordinator.state().timer.is_pending());
        assert_eq!(
            h.lines(),
            ["Change in a", "[!] Change detected, starting redeployment"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_and_suppresses() {
        let mut h = Harness::new();
        h.change("a");
        h.command("pause");
        assert!(h.coordinator.state().paused);
        assert!(!h.coordinator.state().timer.is_pending());
        h.drain();

        h.change("a");
        h.change("b");
        assert!(h.drain().is_empty());
        assert!(!h.coordinator.state().timer.is_pending());

        tokio::time::advance(Duration::from_secs(120)).await;
        tokio::task::yield_now().await;
        assert!(h.events.try_recv().is_err());
        assert_eq!(h.redeployer.call_count(), 0);

        h.command("resume");
        assert_eq!(
            h.lines(),
            ["[!] Auto-Redeployment Enabled for Container: my_container"]
        );
        h.change("a");
        assert!(h.coordinator.state().timer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_while_fire_queued_still_frees_slot() {
        let mut h = Harness::new();
        h.change("a");

        // Paused without cancelling, as if the fire was already in the queue.
        h.coordinator.state.paused = true;
        h.deliver_timer().await;

        assert!(!h.coordinator.state().timer.is_pending());
        assert!(h.coordinator.state().last_change_at.is_none());
        assert_eq!(h.redeployer.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redeploy_command_bypasses_debounce() {
        let mut h = Harness::new();
        h.change("a");
        let pending = h.coordinator.state().timer.pending_id().expect("armed");
        h.drain();

        h.command("redeploy");
        assert!(!h.coordinator.state().timer.is_pending());
        assert_eq!(h.drain(), [line("[!] Redeploying container: my_container")]);

        let outputs = h.wait_for_prompt().await;
        assert_eq!(outputs.first(), Some(&line("Beginning Redeploy")));
        assert_eq!(h.redeployer.call_count(), 1);

        // A fire from the cancelled timer must not redeploy again.
        h.coordinator.handle_timer_fired(pending);
        assert!(h.drain().is_empty());
        assert_eq!(h.redeployer.call_count(), 1);
        assert!(h.coordinator.state().last_change_at.is_none());
    }

    #[tokio::test]
    async fn test_cooldown_command() {
        let mut h = Harness::new();

        h.command("cooldown 2m");
        assert_eq!(h.coordinator.state().cooldown, Duration::from_secs(120));
        assert_eq!(
            h.drain(),
            [line("[!] Cooldown set to 2m0s"), Output::Prompt]
        );

        h.command("cooldown notaduration");
        assert_eq!(h.coordinator.state().cooldown, Duration::from_secs(120));
        let lines = h.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Invalid duration: "), "{lines:?}");

        h.command("cooldown 0s");
        assert_eq!(
            h.lines(),
            ["Invalid duration: duration \"0s\" must be positive"]
        );

        h.command("cooldown");
        assert_eq!(h.lines(), ["Please specify a duration ie 'cooldown 60s'"]);
        assert_eq!(h.coordinator.state().cooldown, Duration::from_secs(120));
    }

    #[tokio::test]
    async fn test_watch_commands() {
        let mut h = Harness::new();

        h.command("watch");
        assert_eq!(
            h.drain(),
            [
                line("Please specify a folder ie 'watch ./testFolder1'"),
                Output::Prompt
            ]
        );
        assert!(h.coordinator.state().watch_set.is_empty());

        h.command("watch missing/dir");
        assert_eq!(
            h.lines(),
            ["Error adding directory: path does not exist: missing/dir"]
        );
        assert!(h.coordinator.state().watch_set.is_empty());

        h.command("watch services/web");
        h.command("watch services/api");
        assert_eq!(
            h.lines(),
            [
                "Watching folder: services/web",
                "Watching folder: services/api"
            ]
        );

        h.command("watchList");
        insta::assert_snapshot!(h.lines().join("\n"), @r"
        --- Watched Folders ---
        services/api
        services/web
        ");

        h.command("watchRemove services/web");
        h.command("watchRemove services/web");
        h.command("watchRemove");
        let lines = h.lines();
        assert_eq!(lines[0], "Removed services/web from watch list");
        assert!(lines[1].starts_with("Error removing folder: "));
        assert_eq!(
            lines[2],
            "Please specify a folder to remove ie 'watchRemove ./testFolder1'"
        );
        assert_eq!(h.coordinator.state().watch_set.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_watch_set() {
        let mut h = Harness::new();
        h.command("watch a");
        h.command("watch b");
        h.command("reset");
        h.drain();

        h.command("watchList");
        assert_eq!(
            h.drain(),
            [line("--- Watched Folders ---"), Output::Prompt]
        );
    }

    #[tokio::test]
    async fn test_initial_watch_dirs_report_each_outcome() {
        let mut h = Harness::new();
        h.coordinator.watch_initial(["web", "missing", ""]);

        assert_eq!(
            h.lines(),
            [
                "Watching folder: web",
                "Error adding directory: path does not exist: missing",
                "Please specify a folder ie 'watch ./testFolder1'",
            ]
        );
    }

    #[tokio::test]
    async fn test_status_report() {
        let mut h = Harness::new();
        h.command("watch web");
        h.command("pause");
        h.drain();

        h.command("status");
        insta::assert_snapshot!(h.lines().join("\n"), @r"
        --- Current Status ---
        Container ID: my_container
        Auto-Redeployment: false
        Last Change: never
        Cooldown: 1m0s
        Watched Folders: 1
        Redeploy Scheduled: no
        Redeploy In Flight: no
        ");
    }

    #[tokio::test]
    async fn test_help_and_unknown() {
        let mut h = Harness::new();

        h.command("help");
        assert_eq!(h.drain(), [line(HELP_TEXT), Output::Prompt]);

        h.command("frobnicate now");
        assert_eq!(
            h.drain(),
            [line("Unknown Command: frobnicate"), Output::Prompt]
        );
    }

    #[tokio::test]
    async fn test_handle_watcher_error_and_shutdown() {
        let mut h = Harness::new();

        let flow = h.coordinator.handle(Event::WatcherFailed("inotify limit".into()));
        assert!(flow.is_continue());
        assert_eq!(h.lines(), ["Watcher Error: inotify limit"]);

        h.change("a");
        h.drain();
        let flow = h.coordinator.handle(Event::Shutdown);
        assert!(flow.is_break());
        assert!(!h.coordinator.state().timer.is_pending());
        assert_eq!(h.lines(), ["\nShutting Down"]);
    }
}
