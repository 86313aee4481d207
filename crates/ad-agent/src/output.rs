//! Operator-facing output.
//!
//! Every producer writes through an [`OutputSender`]; a single printer task
//! owns the terminal and renders messages in arrival order.
//!
//! ```text
//! coordinator ──┐
//! trigger task ─┼──► bounded channel ──► run_printer ──► stdout
//! input reader ─┘
//! ```
//!
//! The channel is bounded. Synchronous producers never stall on it: when it
//! is full a line is dropped with a warning, while a prompt is handed to a
//! task that waits for room. Async producers use [`OutputSender::send`] and
//! wait themselves.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// What the prompt signal renders as.
pub const PROMPT: &str = "> ";

/// A message for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Text printed followed by a newline. May span several lines.
    Line(String),

    /// The "ready for input" signal, printed without a newline.
    Prompt,
}

/// Cloneable handle for emitting [`Output`].
#[derive(Debug, Clone)]
pub struct OutputSender {
    tx: mpsc::Sender<Output>,
}

impl OutputSender {
    /// Wraps an existing channel sender.
    #[must_use]
    pub fn new(tx: mpsc::Sender<Output>) -> Self {
        Self { tx }
    }

    /// Creates a bounded output channel.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Output>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Emits a line of text.
    pub fn line(&self, text: impl Into<String>) {
        self.emit(Output::Line(text.into()));
    }

    /// Emits the prompt signal.
    pub fn prompt(&self) {
        self.emit(Output::Prompt);
    }

    /// Queues `output`, waiting for room in the buffer.
    ///
    /// Dropped silently once the printer has stopped.
    pub async fn send(&self, output: Output) {
        if self.tx.send(output).await.is_err() {
            trace!("Output closed, dropping message");
        }
    }

    fn emit(&self, output: Output) {
        match self.tx.try_send(output) {
            Ok(()) => {}
            Err(TrySendError::Full(Output::Prompt)) => self.defer_prompt(),
            Err(TrySendError::Full(dropped)) => {
                warn!(?dropped, "Output buffer full, dropping message");
            }
            Err(TrySendError::Closed(_)) => {
                trace!("Output closed, dropping message");
            }
        }
    }

    fn defer_prompt(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("Output buffer full outside the runtime, dropping prompt");
            return;
        };
        trace!("Output buffer full, deferring prompt");
        let sender = self.clone();
        runtime.spawn(async move { sender.send(Output::Prompt).await });
    }
}

/// Renders output until the channel closes or `stop` is cancelled.
///
/// On cancellation, messages already queued are still written so nothing
/// emitted before shutdown is lost. The writer is returned when done.
///
/// # Errors
///
/// Returns any I/O error from `writer`.
pub async fn run_printer<W: AsyncWrite + Unpin>(
    mut rx: mpsc::Receiver<Output>,
    mut writer: W,
    stop: CancellationToken,
) -> io::Result<W> {
    loop {
        tokio::select! {
            output = rx.recv() => match output {
                Some(output) => write_output(&mut writer, &output).await?,
                None => break,
            },
            () = stop.cancelled() => {
                while let Ok(output) = rx.try_recv() {
                    write_output(&mut writer, &output).await?;
                }
                break;
            }
        }
    }

    writer.flush().await?;
    Ok(writer)
}

async fn write_output<W: AsyncWrite + Unpin>(writer: &mut W, output: &Output) -> io::Result<()> {
    match output {
        Output::Line(text) => {
            writer.write_all(text.as_bytes()).await?;
            writer.write_all(b"\n").await?;
        }
        Output::Prompt => writer.write_all(PROMPT.as_bytes()).await?,
    }
    writer.flush().await
}
