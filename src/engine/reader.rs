//! Deadline-bounded line reading.
//!
//! A background thread drains the engine's stdout into a channel, so the
//! caller can wait for a line with a deadline instead of blocking on the
//! pipe. The thread ends when the stream closes, which disconnects the
//! channel.

use std::io::{self, BufRead, BufReader, Read};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use tracing::{debug, trace};

use crate::error::{Result, XiangqiError};

pub struct LineReader {
    lines: Receiver<String>,
    _thread: JoinHandle<()>,
}

impl LineReader {
    pub fn spawn<R: Read + Send + 'static>(source: R) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let handle = thread::Builder::new()
            .name("engine-stdout".to_string())
            .spawn(move || {
                let reader = BufReader::new(source);
                for line in reader.lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                debug!("engine output closed");
            })?;
        Ok(LineReader {
            lines: rx,
            _thread: handle,
        })
    }

    /// Collects lines into `seen` until `done` accepts one (that line is
    /// included) or `deadline` passes.
    ///
    /// Fails with `EngineTimeout` at the deadline and with
    /// `EngineUnavailable` once the engine's output has closed.
    pub fn read_until(
        &self,
        deadline: Instant,
        waiting_for: &'static str,
        mut done: impl FnMut(&str) -> bool,
        seen: &mut Vec<String>,
    ) -> Result<()> {
        let started = Instant::now();
        loop {
            match self.lines.recv_deadline(deadline) {
                Ok(line) => {
                    trace!(%line, "engine >");
                    let finished = done(&line);
                    seen.push(line);
                    if finished {
                        return Ok(());
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    return Err(XiangqiError::EngineTimeout {
                        waiting_for,
                        timeout: started.elapsed(),
                    })
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(XiangqiError::EngineUnavailable(format!(
                        "engine output closed while waiting for '{waiting_for}'"
                    )))
                }
            }
        }
    }

    /// Discards lines that are already buffered.
    pub fn discard_pending(&self) -> usize {
        self.lines.try_iter().count()
    }
}
