//! Engine session configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Engine executable looked up when no path is configured.
pub const DEFAULT_ENGINE: &str = "pikafish";
/// How long to wait for `uciok` after `uci`.
pub const DEFAULT_UCI_TIMEOUT: Duration = Duration::from_secs(1);
/// How long to wait for `readyok` after `isready`.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(2);
/// Wall-clock budget for one best-move request.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(50);
/// Share of the analysis budget a timed-out search gets to answer `stop`.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_millis(500);
/// How long to wait for the process to exit after `quit`.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Engine executable.
    pub path: PathBuf,
    /// Extra command-line arguments for the executable.
    pub args: Vec<String>,
    /// JSON record holding the search parameters. When `None` the defaults
    /// are used and changes are kept in memory only.
    pub params_file: Option<PathBuf>,
    pub uci_timeout: Duration,
    pub ready_timeout: Duration,
    /// Covers the whole best-move call, `stop` resync included.
    pub analysis_timeout: Duration,
    /// Held back from `analysis_timeout` for the resync after a timeout.
    pub stop_grace: Duration,
    pub close_timeout: Duration,
    /// `setoption` pairs sent during the handshake, in order.
    pub options: Vec<(String, String)>,
}

impl EngineConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        EngineConfig {
            path: path.into(),
            args: Vec::new(),
            params_file: None,
            uci_timeout: DEFAULT_UCI_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
            stop_grace: DEFAULT_STOP_GRACE,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            options: vec![
                ("Threads".to_string(), "2".to_string()),
                ("Hash".to_string(), "256".to_string()),
            ],
        }
    }

    pub fn with_params_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.params_file = Some(path.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_analysis_timeout(mut self, timeout: Duration) -> Self {
        self.analysis_timeout = timeout;
        self
    }

    /// How long the search itself may run before `stop` is sent. The grace
    /// never takes more than half the budget.
    pub fn search_budget(&self) -> Duration {
        self.analysis_timeout - self.stop_grace.min(self.analysis_timeout / 2)
    }

    /// Adds or replaces a handshake option.
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.options.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.options.push((name, value)),
        }
        self
    }
}
