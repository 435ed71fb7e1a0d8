//! Xiangqi console.
//!
//! Reads one command per line from stdin and writes replies to stdout.
//! Logs go to stderr; set `RUST_LOG` to change the level.

use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use xiangqi_bridge::cli::{parse_console_command, Console, Flow};
use xiangqi_bridge::cloud::{ChessDb, DEFAULT_CLOUD_TIMEOUT};
use xiangqi_bridge::engine::{EngineConfig, EngineSession, DEFAULT_ENGINE};
use xiangqi_bridge::game::{GameSink, JsonLinesSink, NullSink};

#[derive(Debug, Parser)]
#[command(name = "xiangqi", version, about = "Xiangqi console with an analysis-engine bridge")]
struct Args {
    /// Path to the UCI engine binary.
    #[arg(long, env = "XIANGQI_ENGINE", default_value = DEFAULT_ENGINE)]
    engine: PathBuf,

    /// Run without starting the engine; `best` answers with the fallback move.
    #[arg(long)]
    no_engine: bool,

    /// JSON file holding the search parameters.
    #[arg(long, env = "XIANGQI_PARAMS")]
    params: Option<PathBuf>,

    /// Deadline for one best-move request, in milliseconds.
    #[arg(long, default_value_t = 50_000)]
    analysis_timeout_ms: u64,

    /// Look positions up in the chessdb.cn cloud book before asking the engine.
    #[arg(long, env = "XIANGQI_CLOUD")]
    cloud: bool,

    /// Timeout for one cloud lookup, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_CLOUD_TIMEOUT.as_millis() as u64)]
    cloud_timeout_ms: u64,

    /// Append game and move records to this file as JSON lines.
    #[arg(long)]
    record: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "console failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> io::Result<()> {
    let mut config = EngineConfig::new(&args.engine)
        .with_analysis_timeout(Duration::from_millis(args.analysis_timeout_ms));
    if let Some(path) = &args.params {
        config = config.with_params_file(path);
    }
    let engine = if args.no_engine {
        EngineSession::offline(config, "engine disabled")
    } else {
        EngineSession::spawn(config)
    };
    info!(state = %engine.state(), "engine session");
    let engine = Arc::new(engine);

    let sink: Arc<dyn GameSink> = match &args.record {
        Some(path) => {
            let file = File::options().create(true).append(true).open(path)?;
            Arc::new(JsonLinesSink::new(BufWriter::new(file)))
        }
        None => Arc::new(NullSink),
    };

    let mut console = Console::new(Arc::clone(&engine), sink);
    if args.cloud {
        match ChessDb::new(Duration::from_millis(args.cloud_timeout_ms)) {
            Ok(book) => console = console.with_cloud(Arc::new(book)),
            Err(e) => warn!(error = %e, "cloud book disabled"),
        }
    }
    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());

    for line in stdin.lock().lines() {
        let line = line?;
        let Some(cmd) = parse_console_command(&line) else {
            continue;
        };
        if console.execute(cmd, &mut out)? == Flow::Quit {
            break;
        }
    }
    out.flush()?;
    engine.close();
    Ok(())
}
