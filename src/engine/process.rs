//! The external engine process and its pipes.

use std::io::{BufWriter, Write};
use std::env;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command as ProcessCommand, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::reader::LineReader;
use crate::error::{Result, XiangqiError};
use crate::protocol::uci::Command;

const EXIT_POLL: Duration = Duration::from_millis(20);

pub(crate) struct EngineProcess {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    pub(crate) output: LineReader,
    exited: bool,
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

/// A bare program name that is not a file in the working directory is
/// looked up on `PATH`.
fn locate(path: &Path) -> Option<PathBuf> {
    if path.is_file() {
        return Some(path.to_path_buf());
    }
    if path.components().count() != 1 {
        return None;
    }
    let dirs = env::var_os("PATH")?;
    env::split_paths(&dirs)
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.is_file())
}

impl EngineProcess {
    /// Starts the engine binary with piped stdin and stdout.
    pub(crate) fn spawn(path: &Path, args: &[String]) -> Result<Self> {
        let Some(found) = locate(path) else {
            return Err(XiangqiError::EngineUnavailable(format!(
                "engine binary not found at {}",
                path.display()
            )));
        };
        let path = found.as_path();
        if !is_executable(path) {
            return Err(XiangqiError::EngineUnavailable(format!(
                "engine binary at {} is not executable",
                path.display()
            )));
        }

        // Engines look for their network files next to the binary.
        let path = path.canonicalize().map_err(|e| {
            XiangqiError::EngineUnavailable(format!("cannot resolve {}: {e}", path.display()))
        })?;
        let mut command = ProcessCommand::new(&path);
        command.args(args);
        if let Some(dir) = path.parent() {
            command.current_dir(dir);
        }
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                XiangqiError::EngineUnavailable(format!("cannot start {}: {e}", path.display()))
            })?;

        let pipes = child.stdin.take().zip(child.stdout.take());
        let Some((stdin, stdout)) = pipes else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(XiangqiError::EngineUnavailable("engine pipes unavailable".to_string()));
        };
        let output = match LineReader::spawn(stdout) {
            Ok(output) => output,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(XiangqiError::EngineUnavailable(format!(
                    "cannot start output reader: {e}"
                )));
            }
        };
        info!(path = %path.display(), pid = child.id(), "engine started");

        Ok(EngineProcess {
            child,
            stdin: Some(BufWriter::new(stdin)),
            output,
            exited: false,
        })
    }

    /// Writes one command line and flushes it.
    pub(crate) fn send(&mut self, command: &Command) -> Result<()> {
        debug!(%command, "engine <");
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| XiangqiError::EngineUnavailable("engine input closed".to_string()))?;
        writeln!(stdin, "{command}")
            .and_then(|()| stdin.flush())
            .map_err(|e| XiangqiError::EngineUnavailable(format!("write to engine failed: {e}")))
    }

    /// Asks the engine to quit, waits up to `grace` for it to exit, then
    /// kills it. Failures are logged only. Safe to call more than once.
    pub(crate) fn shutdown(&mut self, grace: Duration) {
        if self.exited {
            return;
        }
        if let Err(e) = self.send(&Command::Quit) {
            debug!(error = %e, "quit not delivered");
        }
        // Closing stdin lets engines that wait on EOF exit too.
        self.stdin = None;

        let deadline = Instant::now() + grace;
        loop {
            match self.child.try_wait() {
                Ok(Some(status)) => {
                    info!(%status, "engine exited");
                    self.exited = true;
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(EXIT_POLL),
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "cannot poll engine process");
                    break;
                }
            }
        }
        self.kill();
    }

    /// Terminates the process without asking.
    pub(crate) fn kill(&mut self) {
        if self.exited {
            return;
        }
        self.stdin = None;
        if let Err(e) = self.child.kill() {
            warn!(error = %e, "cannot kill engine process");
        }
        match self.child.wait() {
            Ok(status) => info!(%status, "engine killed"),
            Err(e) => warn!(error = %e, "cannot reap engine process"),
        }
        self.exited = true;
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        self.kill();
    }
}
