use std::io::{self, BufRead};
use std::thread;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info};

use crate::error::EmitError;

/// Receives the outcome of a single line read
pub type LineReceiver = oneshot::Receiver<io::Result<usize>>;

/// Read one line from `reader` on a detached OS thread.
///
/// A blocking read cannot be cancelled, so it must not live on the runtime's
/// blocking pool: runtime shutdown would wait for it. A detached thread is
/// simply abandoned when the process exits.
pub fn spawn_line_reader<R>(mut reader: R) -> io::Result<LineReceiver>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    thread::Builder::new()
        .name("stdin-prompt".to_string())
        .spawn(move || {
            let mut line = String::new();
            let _ = tx.send(reader.read_line(&mut line));
        })?;
    Ok(rx)
}

/// Line reader over the process's stdin
pub fn stdin_line() -> Result<LineReceiver, EmitError> {
    spawn_line_reader(io::BufReader::new(io::stdin())).map_err(EmitError::Prompt)
}

/// Block until the operator presses Enter.
///
/// Returns `Ok(false)` if shutdown was requested while waiting. End of input
/// counts as Enter so the tool can run with stdin redirected.
pub async fn wait_for_enter(
    mut line: LineReceiver,
    shutdown: &mut watch::Receiver<bool>,
) -> Result<bool, EmitError> {
    info!(target: "emitter", "Press Enter when ready to send test data...");

    if *shutdown.borrow() {
        return Ok(false);
    }

    loop {
        tokio::select! {
            read = &mut line => {
                return match read {
                    Ok(Ok(_)) => Ok(true),
                    Ok(Err(e)) => Err(EmitError::Prompt(e)),
                    // Reader thread died without answering
                    Err(_) => Err(EmitError::Prompt(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "stdin reader exited",
                    ))),
                };
            }
            changed = shutdown.changed() => match changed {
                Ok(()) => {
                    if *shutdown.borrow_and_update() {
                        debug!(target: "emitter", "Abandoning pending stdin read");
                        return Ok(false);
                    }
                }
                Err(_) => {
                    return match line.await {
                        Ok(Ok(_)) => Ok(true),
                        Ok(Err(e)) => Err(EmitError::Prompt(e)),
                        Err(_) => Ok(true),
                    };
                }
            }
        }
    }
}
