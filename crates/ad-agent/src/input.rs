//! Reading operator commands.
//!
//! The reader turns each line into an [`Event::Command`] on the command
//! queue, which is separate from file-change and timer events. Commands are
//! submitted without waiting: when the queue is full the command is dropped
//! and the operator is told to resend it. While a redeploy holds the
//! [`InputGate`], the reader stops reading, even if it was already waiting
//! on a line when the redeploy began.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::command::Command;
use crate::event::Event;
use crate::gate::InputGate;
use crate::output::OutputSender;

/// Feeds operator input into the dispatch loop.
#[derive(Debug, Clone)]
pub struct InputReader {
    commands: mpsc::Sender<Event>,
    output: OutputSender,
    gate: InputGate,
}

impl InputReader {
    /// Creates a reader that submits to the `commands` queue.
    #[must_use]
    pub fn new(commands: mpsc::Sender<Event>, output: OutputSender, gate: InputGate) -> Self {
        Self {
            commands,
            output,
            gate,
        }
    }

    /// Reads lines until end of input, a read error, or `shutdown`.
    ///
    /// End of input requests shutdown of the whole agent.
    pub async fn run<R: AsyncBufRead + Unpin>(self, reader: R, shutdown: CancellationToken) {
        let mut lines = reader.lines();

        loop {
            if self.gate.is_suspended() {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    () = self.gate.resumed() => continue,
                }
            }

            // `next_line` is cancel-safe: a partly read line stays buffered.
            // Suspension wins over a line that is already available.
            let line = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = self.gate.suspended() => continue,
                line = lines.next_line() => line,
            };

            match line {
                Ok(Some(line)) => self.submit(&line),
                Ok(None) => {
                    debug!("Input closed, requesting shutdown");
                    if self.commands.send(Event::Shutdown).await.is_err() {
                        debug!("Dispatch loop already stopped");
                    }
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    self.output.line(format!("Error reading input: {e}"));
                    break;
                }
            }
        }

        debug!("Input reader stopped");
    }

    /// Parses `line` and queues it without blocking.
    ///
    /// A blank line only re-prompts.
    pub fn submit(&self, line: &str) {
        let Some(command) = Command::parse(line) else {
            self.output.prompt();
            return;
        };

        match self.commands.try_send(Event::Command(command)) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(event = ?dropped, "Command queue full, dropping command");
                self.output.line("Command queue full");
                self.output.prompt();
            }
            Err(TrySendError::Closed(_)) => debug!("Dispatch loop stopped, dropping command"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Output;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    struct Harness {
        reader: InputReader,
        events: mpsc::Receiver<Event>,
        outputs: mpsc::Receiver<Output>,
        gate: InputGate,
    }

    fn harness(capacity: usize) -> Harness {
        let (events_tx, events) = mpsc::channel(capacity);
        let (output, outputs) = OutputSender::channel(16);
        let gate = InputGate::new();
        let reader = InputReader::new(events_tx, output, gate.clone());
        Harness {
            reader,
            events,
            outputs,
            gate,
        }
    }

    fn command(line: &str) -> Event {
        Event::Command(Command::parse(line).expect("non-blank"))
    }

    #[tokio::test]
    async fn test_lines_become_commands_then_shutdown() {
        let mut h = harness(8);
        let input: &[u8] = b"status\n\n   \nwatch ./api\n";

        h.reader.run(input, CancellationToken::new()).await;

        assert_eq!(h.events.recv().await, Some(command("status")));
        assert_eq!(h.events.recv().await, Some(command("watch ./api")));
        assert_eq!(h.events.recv().await, Some(Event::Shutdown));

        // Two blank lines, two prompts.
        assert_eq!(h.outputs.try_recv(), Ok(Output::Prompt));
        assert_eq!(h.outputs.try_recv(), Ok(Output::Prompt));
        assert!(h.outputs.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_sheds_command() {
        let mut h = harness(1);

        h.reader.submit("pause");
        h.reader.submit("resume");

        assert_eq!(h.events.try_recv(), Ok(command("pause")));
        assert!(h.events.try_recv().is_err());
        assert_eq!(
            h.outputs.try_recv(),
            Ok(Output::Line("Command queue full".into()))
        );
        assert_eq!(h.outputs.try_recv(), Ok(Output::Prompt));
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspended_gate_holds_input() {
        let mut h = harness(8);
        let guard = h.gate.suspend();
        let input: &'static [u8] = b"status\n";
        let task = tokio::spawn(h.reader.run(input, CancellationToken::new()));

        tokio::time::sleep(Duration::from_millis(550)).await;
        assert!(h.events.try_recv().is_err());

        drop(guard);
        assert_eq!(h.events.recv().await, Some(command("status")));
        assert_eq!(h.events.recv().await, Some(Event::Shutdown));
        task.await.expect("reader finishes");
    }

    #[tokio::test(start_paused = true)]
    async fn test_suspend_while_waiting_for_a_line() {
        let mut h = harness(8);
        let (mut stdin, reader) = tokio::io::duplex(64);
        let gate = h.gate.clone();
        let task = tokio::spawn(
            h.reader
                .run(tokio::io::BufReader::new(reader), CancellationToken::new()),
        );

        // Let the reader park on the empty input first.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let guard = gate.suspend();
        stdin.write_all(b"status\n").await.expect("write input");
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(h.events.try_recv().is_err());

        drop(guard);
        assert_eq!(h.events.recv().await, Some(command("status")));

        drop(stdin);
        assert_eq!(h.events.recv().await, Some(Event::Shutdown));
        task.await.expect("reader finishes");
    }

    #[tokio::test]
    async fn test_shutdown_stops_blocked_reader() {
        let h = harness(8);
        let (_writer, reader) = tokio::io::duplex(64);
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(
            h.reader
                .run(tokio::io::BufReader::new(reader), shutdown.clone()),
        );
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("reader stops promptly")
            .expect("reader task");
    }
}
