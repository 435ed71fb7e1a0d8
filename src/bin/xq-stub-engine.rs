//! Minimal UCI engine for exercising the session coordinator.
//!
//! Answers `go` with the first legal move of the side to move, found with
//! the crate's own move generator, or `bestmove (none)` when there is none.
//! Failure modes:
//!   --silent   never answers `isready`
//!   --stall    ignores `go` until `stop` arrives
//!   --hang     ignores `go` and `stop`

use std::io::{self, BufRead, BufWriter, Write};

use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use xiangqi_bridge::board::{Board, PieceKind};
use xiangqi_bridge::movegen::safe_moves;
use xiangqi_bridge::protocol::coords;
use xiangqi_bridge::protocol::uci::{parse_command, Command, EngineLine, Score};

#[derive(Debug, Parser)]
#[command(name = "xq-stub-engine", about = "Minimal UCI engine for tests")]
struct Args {
    #[arg(long)]
    silent: bool,
    #[arg(long)]
    stall: bool,
    #[arg(long)]
    hang: bool,
}

struct StubEngine {
    args: Args,
    board: Board,
    searching: bool,
}

fn value(kind: PieceKind) -> i32 {
    match kind {
        PieceKind::Chariot => 900,
        PieceKind::Cannon => 450,
        PieceKind::Horse => 400,
        PieceKind::Elephant | PieceKind::Advisor => 200,
        PieceKind::Soldier => 100,
        PieceKind::General => 0,
    }
}

impl StubEngine {
    fn handle_uci<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "id name xq-stub-engine")?;
        writeln!(out, "id author xiangqi-bridge")?;
        writeln!(out, "{}", EngineLine::UciOk)
    }

    fn set_position(&mut self, fen: Option<String>, moves: &[String]) {
        let board = match fen {
            Some(fen) => Board::from_fen(&fen),
            None => Ok(Board::new()),
        };
        match board {
            Ok(board) => self.board = board,
            Err(e) => {
                warn!(error = %e, "bad position");
                return;
            }
        }
        for mv in moves {
            if let Err(e) = self.board.apply_coordinate_move(mv) {
                warn!(%mv, error = %e, "bad move in position");
                return;
            }
        }
    }

    fn material(&self) -> i32 {
        let turn = self.board.turn();
        self.board
            .pieces()
            .map(|(_, p)| if p.color == turn { value(p.kind) } else { -value(p.kind) })
            .sum()
    }

    fn answer<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        self.searching = false;
        let best = safe_moves(&self.board, self.board.turn())
            .first()
            .map(|&(from, to)| coords::format_move(from, to));
        let Some(mv) = best else {
            return writeln!(out, "bestmove (none)");
        };
        let info = EngineLine::Info {
            depth: Some(1),
            score: Some(Score::Centipawns(self.material())),
            pv: vec![mv.clone()],
        };
        writeln!(out, "{info}")?;
        writeln!(out, "{}", EngineLine::BestMove { mv, ponder: None })
    }

    /// Returns `false` once the loop should end.
    fn handle<W: Write>(&mut self, cmd: Command, out: &mut W) -> io::Result<bool> {
        match cmd {
            Command::Uci => self.handle_uci(out)?,
            Command::IsReady if self.args.silent => debug!("withholding readyok"),
            Command::IsReady => writeln!(out, "{}", EngineLine::ReadyOk)?,
            Command::SetOption { name, value } => debug!(%name, ?value, "option"),
            Command::NewGame => self.board = Board::new(),
            Command::Position { fen, moves } => self.set_position(fen, &moves),
            Command::Go(_) if self.args.stall || self.args.hang => self.searching = true,
            Command::Go(_) => self.answer(out)?,
            Command::Stop if self.searching && !self.args.hang => self.answer(out)?,
            Command::Stop => {}
            Command::Quit => return Ok(false),
        }
        out.flush()?;
        Ok(true)
    }
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let mut engine = StubEngine {
        args: Args::parse(),
        board: Board::new(),
        searching: false,
    };
    let stdin = io::stdin();
    let mut out = BufWriter::new(io::stdout().lock());

    for line in stdin.lock().lines() {
        let line = line?;
        let Some(cmd) = parse_command(&line) else {
            continue;
        };
        if !engine.handle(cmd, &mut out)? {
            break;
        }
    }
    Ok(())
}
