//! Command dispatching.
//!
//! Two activities share one FIFO queue:
//! - the producer reads lines from an input source and enqueues them
//! - the consumer waits on the queue and runs one pipeline per `set` command
//!
//! The consumer is a single task, so pipelines never overlap.

pub mod command;

use std::future::Future;
use std::io::{self, BufRead, Write};
use std::thread;

use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::afc::PortalTransport;
use crate::coordinator::{Coordinator, PipelineOutcome};

pub use command::{Command, CommandError};

/// Prompt printed before each interactive read.
pub const PROMPT: &str = "openwifi-afc> ";

pub type CommandSender = mpsc::UnboundedSender<String>;
pub type CommandReceiver = mpsc::UnboundedReceiver<String>;

/// Create the command queue.
pub fn command_queue() -> (CommandSender, CommandReceiver) {
    mpsc::unbounded_channel()
}

/// Read lines until EOF and enqueue each one.
///
/// Returns the number of lines enqueued. Stops early if the consumer is
/// gone.
pub fn run_producer<R: BufRead>(mut reader: R, tx: CommandSender, prompt: Option<&str>) -> usize {
    let mut enqueued = 0;
    let mut line = String::new();

    loop {
        if let Some(prompt) = prompt {
            print!("{}", prompt);
            let _ = io::stdout().flush();
        }

        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => {
                debug!("Command input closed");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                error!("Failed to read command: {}", e);
                break;
            }
        }

        if tx.send(line.trim_end().to_string()).is_err() {
            debug!("Command queue closed, stopping input");
            break;
        }
        enqueued += 1;
    }

    enqueued
}

/// Spawn the producer on a dedicated thread reading stdin.
///
/// Blocking reads stay off the runtime; the thread is abandoned at exit.
pub fn spawn_stdin_producer(tx: CommandSender) -> io::Result<thread::JoinHandle<usize>> {
    thread::Builder::new()
        .name("command-input".to_string())
        .spawn(move || run_producer(io::stdin().lock(), tx, Some(PROMPT)))
}

/// Process queued commands until every sender is dropped.
///
/// Returns the number of pipelines run.
pub async fn run_consumer<T: PortalTransport>(
    mut rx: CommandReceiver,
    coordinator: &mut Coordinator<T>,
) -> usize {
    let mut pipelines = 0;

    while let Some(line) = rx.recv().await {
        match Command::parse(&line) {
            Ok(Command::SetChannel(cfi)) => {
                info!("Setting channel to {}", cfi);
                let outcome = coordinator.run_set_channel(cfi).await;
                pipelines += 1;
                log_outcome(&outcome);
            }
            Err(CommandError::Empty) => {}
            Err(e) => warn!("Ignoring command '{}': {}", line, e),
        }
    }

    info!("Command queue closed after {} pipeline run(s)", pipelines);
    pipelines
}

/// Keep the agent running until `shutdown` resolves.
///
/// The consumer ending (stdin closed) does not end the agent: the access
/// point keeps the channel it was given and the process waits for
/// `shutdown`. The consumer is aborted if `shutdown` comes first.
pub async fn run_until_shutdown<F>(mut consumer: JoinHandle<usize>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    tokio::select! {
        _ = &mut shutdown => {
            consumer.abort();
            return;
        }
        result = &mut consumer => match result {
            Ok(_) => info!("Command input closed, running until interrupted"),
            Err(e) => error!("Command consumer stopped: {}", e),
        },
    }

    shutdown.await;
}

fn log_outcome(outcome: &PipelineOutcome) {
    match outcome {
        PipelineOutcome::Applied { cfi, channel } => {
            info!("Channel {} (CFI {}) applied", channel, cfi)
        }
        PipelineOutcome::FellBack(reason) => info!("Running on legacy band: {}", reason),
        PipelineOutcome::Rejected(reason) => warn!("Command rejected: {}", reason),
        PipelineOutcome::ControllerFailed(reason) => {
            error!("Access point reconfiguration failed: {}", reason)
        }
    }
}
