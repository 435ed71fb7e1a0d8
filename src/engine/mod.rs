//! Analysis-engine session.
//!
//! Owns one external UCI engine process and drives it through a fixed
//! lifecycle:
//!
//! ```text
//! Uninitialized -> Handshake -> Ready <-> Busy -> Terminated
//!                      \
//!                       -> Degraded
//! ```
//!
//! Requests and answers are matched only by strict alternation on the two
//! pipes, so every operation holds the session lock for its whole duration.
//! Engine failures never reach the caller: a degraded session answers every
//! request with [`FALLBACK_MOVE`]. A hung engine can only be recovered by
//! killing it, which `close` does after its grace period.

pub mod config;
pub mod params;
mod process;
pub mod reader;

use std::fmt;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

pub use config::{EngineConfig, DEFAULT_ENGINE};
pub use params::{ParamsError, SearchMode, SearchParams};

use crate::board::Color;
use crate::error::{Result, XiangqiError};
use crate::protocol::coords;
use crate::protocol::fen::START_BOARD;
use crate::protocol::uci::{latest_score, parse_engine_line, Command, EngineLine};
use process::EngineProcess;

/// Move returned whenever the engine cannot answer.
pub const FALLBACK_MOVE: &str = "a1a2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Handshake,
    Ready,
    Busy,
    Degraded,
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Handshake => "handshake",
            SessionState::Ready => "ready",
            SessionState::Busy => "busy",
            SessionState::Degraded => "degraded",
            SessionState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Where a best move came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MoveSource {
    Engine,
    Fallback,
    /// The cloud book; never produced by the session itself.
    Cloud,
}

/// Answer to a best-move request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestMove {
    /// Coordinate move, or [`FALLBACK_MOVE`].
    pub mv: String,
    /// Last `info` line carrying a score, if any.
    pub evaluation: Option<String>,
    /// Score of `evaluation` in centipawns; mate in n is n * 1000.
    pub score: Option<i32>,
    /// Encoding that was sent to the engine (board plus side token).
    pub position: String,
    pub source: MoveSource,
}

impl BestMove {
    fn fallback(position: String, scored: Option<(String, i32)>) -> Self {
        let (evaluation, score) = scored.unzip();
        BestMove {
            mv: FALLBACK_MOVE.to_string(),
            evaluation,
            score,
            position,
            source: MoveSource::Fallback,
        }
    }
}

struct SessionInner {
    state: SessionState,
    process: Option<EngineProcess>,
    params: SearchParams,
    last_lines: Vec<String>,
    degraded_reason: Option<String>,
}

impl SessionInner {
    fn degrade(&mut self, reason: String) {
        warn!(%reason, "engine session degraded");
        if let Some(mut process) = self.process.take() {
            process.kill();
        }
        self.state = SessionState::Degraded;
        self.degraded_reason = Some(reason);
    }
}

pub struct EngineSession {
    config: EngineConfig,
    inner: Mutex<SessionInner>,
}

impl EngineSession {
    /// Starts the engine and performs the handshake. Never fails: when the
    /// binary is missing or the handshake does not complete, the session is
    /// returned in the `Degraded` state.
    pub fn spawn(config: EngineConfig) -> Self {
        let session = EngineSession::unstarted(config);
        session.start();
        session
    }

    /// A session that never starts a process, for running without an engine.
    pub fn offline(config: EngineConfig, reason: impl Into<String>) -> Self {
        let session = EngineSession::unstarted(config);
        session.inner.lock().degrade(reason.into());
        session
    }

    fn unstarted(config: EngineConfig) -> Self {
        let params = match &config.params_file {
            Some(path) => SearchParams::load(path),
            None => SearchParams::default(),
        };
        EngineSession {
            config,
            inner: Mutex::new(SessionInner {
                state: SessionState::Uninitialized,
                process: None,
                params,
                last_lines: Vec::new(),
                degraded_reason: None,
            }),
        }
    }

    fn start(&self) {
        let mut inner = self.inner.lock();
        inner.state = SessionState::Handshake;
        let started = EngineProcess::spawn(&self.config.path, &self.config.args).and_then(|mut process| {
            self.handshake(&mut process)?;
            Ok(process)
        });
        match started {
            Ok(process) => {
                info!(path = %self.config.path.display(), "engine ready");
                inner.process = Some(process);
                inner.state = SessionState::Ready;
            }
            Err(e) => inner.degrade(e.to_string()),
        }
    }

    /// `uci`/`uciok`, options, then `isready`/`readyok`. A missing `uciok`
    /// is tolerated; a missing `readyok` is not.
    fn handshake(&self, process: &mut EngineProcess) -> Result<()> {
        let mut seen = Vec::new();
        process.send(&Command::Uci)?;
        let deadline = Instant::now() + self.config.uci_timeout;
        match process
            .output
            .read_until(deadline, "uciok", |l| l.trim() == "uciok", &mut seen)
        {
            Ok(()) => {}
            Err(e @ XiangqiError::EngineTimeout { .. }) => warn!(error = %e, "continuing without uciok"),
            Err(e) => return Err(e),
        }
        for line in seen.iter().filter(|l| l.starts_with("id ")) {
            debug!(%line, "engine identity");
        }

        for (name, value) in &self.config.options {
            process.send(&Command::SetOption {
                name: name.clone(),
                value: Some(value.clone()),
            })?;
        }

        process.send(&Command::IsReady)?;
        let deadline = Instant::now() + self.config.ready_timeout;
        process
            .output
            .read_until(deadline, "readyok", |l| l.trim() == "readyok", &mut seen)
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Whether requests currently reach a live engine.
    pub fn is_available(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Why the session degraded, if it did.
    pub fn degraded_reason(&self) -> Option<String> {
        self.inner.lock().degraded_reason.clone()
    }

    pub fn params(&self) -> SearchParams {
        self.inner.lock().params
    }

    /// Replaces the search parameters and persists them if a params file
    /// is configured. Persistence failures are logged only.
    pub fn set_params(&self, params: SearchParams) {
        let mut inner = self.inner.lock();
        inner.params = params;
        self.persist(&inner.params);
    }

    /// Updates one search parameter by name and persists the result.
    pub fn set_param(&self, name: &str, value: &str) -> std::result::Result<SearchParams, ParamsError> {
        let mut inner = self.inner.lock();
        let mut params = inner.params;
        params.set(name, value)?;
        inner.params = params;
        self.persist(&params);
        Ok(params)
    }

    fn persist(&self, params: &SearchParams) {
        if let Some(path) = &self.config.params_file {
            if let Err(e) = params.save(path) {
                warn!(path = %path.display(), error = %e, "cannot save search parameters");
            }
        }
    }

    /// Raw output lines of the most recent search.
    pub fn last_analysis_lines(&self) -> Vec<String> {
        self.inner.lock().last_lines.clone()
    }

    /// Tells the engine a new game starts and waits until it is ready.
    pub fn new_game(&self) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.state != SessionState::Ready {
            return;
        }
        let Some(process) = inner.process.as_mut() else {
            return;
        };
        let deadline = Instant::now() + self.config.ready_timeout;
        let mut seen = Vec::new();
        let synced = process.send(&Command::NewGame).and_then(|()| {
            process.send(&Command::IsReady)?;
            process
                .output
                .read_until(deadline, "readyok", |l| l.trim() == "readyok", &mut seen)
        });
        if let Err(e) = synced {
            inner.degrade(e.to_string());
        }
    }

    /// Asks the engine for the best move in `board` (the board portion of an
    /// encoding) with `side` to move.
    ///
    /// Always returns an answer. When the session is degraded, the engine
    /// misbehaves, or no `bestmove` arrives in time, the answer is
    /// [`FALLBACK_MOVE`] with `source` set to `Fallback`.
    ///
    /// The call returns within `analysis_timeout`: the search gets
    /// [`EngineConfig::search_budget`] and the rest is left for sending
    /// `stop` and draining the late `bestmove`.
    pub fn get_best_move(&self, board: &str, side: Color) -> BestMove {
        let position = format!("{} {}", board.trim(), side.side_token());
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if inner.state != SessionState::Ready {
            warn!(state = %inner.state, "engine not ready, using fallback move");
            return BestMove::fallback(position, None);
        }
        let Some(process) = inner.process.as_mut() else {
            warn!("engine process missing, using fallback move");
            return BestMove::fallback(position, None);
        };

        inner.state = SessionState::Busy;
        let started = Instant::now();
        let deadline = started + self.config.search_budget();
        let mut lines = Vec::new();
        let outcome = search(process, board.trim(), side, &position, &inner.params, deadline, &mut lines);
        let scored = latest_score(&lines).map(|(line, score)| (line.to_string(), score.centipawns()));

        let answer = match outcome {
            Ok(Some(mv)) => {
                inner.state = SessionState::Ready;
                info!(%position, %mv, "engine best move");
                let (evaluation, score) = scored.unzip();
                BestMove {
                    mv,
                    evaluation,
                    score,
                    position,
                    source: MoveSource::Engine,
                }
            }
            Ok(None) => {
                inner.state = SessionState::Ready;
                warn!(%position, "engine returned no usable move, using fallback");
                BestMove::fallback(position, scored)
            }
            Err(e @ XiangqiError::EngineTimeout { .. }) => {
                warn!(error = %e, %position, "search timed out, using fallback move");
                match resync(process, started + self.config.analysis_timeout) {
                    Ok(()) => inner.state = SessionState::Ready,
                    Err(e) => inner.degrade(format!("engine ignored stop: {e}")),
                }
                BestMove::fallback(position, scored)
            }
            Err(e) => {
                inner.degrade(e.to_string());
                BestMove::fallback(position, scored)
            }
        };
        inner.last_lines = lines;
        answer
    }

    /// Sends `quit`, waits for the process to exit and kills it if needed.
    /// Idempotent; failures are logged only.
    pub fn close(&self) {
        let mut inner = self.inner.lock();
        if let Some(mut process) = inner.process.take() {
            process.shutdown(self.config.close_timeout);
            info!("engine session closed");
        }
        inner.state = SessionState::Terminated;
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for EngineSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineSession")
            .field("path", &self.config.path)
            .field("state", &self.state())
            .finish()
    }
}

/// One request/response exchange. Returns `Ok(None)` when the engine
/// answered with something that is not a coordinate move, e.g.
/// `bestmove (none)` in a mated position.
fn search(
    process: &mut EngineProcess,
    board: &str,
    side: Color,
    position: &str,
    params: &SearchParams,
    deadline: Instant,
    lines: &mut Vec<String>,
) -> Result<Option<String>> {
    // Stray output from an earlier exchange must not be taken as this answer.
    let stale = process.output.discard_pending();
    if stale > 0 {
        debug!(stale, "discarded stale engine output");
    }

    if board == START_BOARD && side == Color::Red {
        process.send(&Command::NewGame)?;
        process.send(&Command::IsReady)?;
        let mut ready = Vec::new();
        process
            .output
            .read_until(deadline, "readyok", |l| l.trim() == "readyok", &mut ready)?;
        process.send(&Command::position_startpos())?;
    } else {
        process.send(&Command::position_fen(position))?;
    }
    process.send(&Command::Go(params.go_params()))?;
    process.output.read_until(
        deadline,
        "bestmove",
        |l| matches!(parse_engine_line(l), EngineLine::BestMove { .. }),
        lines,
    )?;

    let Some(EngineLine::BestMove { mv, .. }) = lines.last().map(|l| parse_engine_line(l)) else {
        return Ok(None);
    };
    Ok(coords::parse_move(&mv).is_ok().then_some(mv))
}

/// After a timeout: interrupt the search and swallow its late `bestmove`
/// before `deadline`.
fn resync(process: &mut EngineProcess, deadline: Instant) -> Result<()> {
    process.send(&Command::Stop)?;
    let mut late = Vec::new();
    process.output.read_until(
        deadline,
        "bestmove",
        |l| matches!(parse_engine_line(l), EngineLine::BestMove { .. }),
        &mut late,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_degrades() {
        let session = EngineSession::spawn(EngineConfig::new("/nonexistent/engine/pikafish"));
        assert_eq!(session.state(), SessionState::Degraded);
        assert!(!session.is_available());
        assert!(session
            .degraded_reason()
            .is_some_and(|r| r.contains("not found")));

        let answer = session.get_best_move(START_BOARD, Color::Red);
        assert_eq!(answer.mv, FALLBACK_MOVE);
        assert_eq!(answer.source, MoveSource::Fallback);
        assert_eq!(answer.position, format!("{START_BOARD} w"));
        assert_eq!(answer.evaluation, None);
        assert_eq!(answer.score, None);
    }

    #[test]
    fn offline_session_keeps_params_in_memory() {
        let session = EngineSession::offline(EngineConfig::new("pikafish"), "disabled");
        assert_eq!(session.state(), SessionState::Degraded);
        let params = session.set_param("depth", "12").unwrap();
        assert_eq!(params.depth, 12);
        assert_eq!(session.params().depth, 12);
        assert!(session.set_param("depth", "zero").is_err());
        assert_eq!(session.params().depth, 12);
    }

    #[test]
    fn close_is_idempotent() {
        let session = EngineSession::offline(EngineConfig::new("pikafish"), "disabled");
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(
            session.get_best_move(START_BOARD, Color::Black).mv,
            FALLBACK_MOVE
        );
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_degrades() {
        let path = std::env::temp_dir().join(format!("xq-not-exec-{}", std::process::id()));
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        let session = EngineSession::spawn(EngineConfig::new(&path));
        assert_eq!(session.state(), SessionState::Degraded);
        assert!(session
            .degraded_reason()
            .is_some_and(|r| r.contains("not executable")));
        let _ = std::fs::remove_file(&path);
    }
}
