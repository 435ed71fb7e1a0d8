//! Interactive console.
//!
//! One command per line. The console keeps a current game in a
//! [`GameRepository`]; every move goes through it, so records reach the
//! configured sink.

use std::io::{self, Write};
use std::sync::Arc;

use tracing::debug;

use crate::analysis::Analysis;
use crate::board::{Board, Position};
use crate::cloud::CloudBook;
use crate::engine::{EngineSession, MoveSource};
use crate::game::{Game, GameRepository, GameSink, MoveRecord, Player};
use crate::protocol::coords;

const HELP: &str = "\
commands:
  new                    start a new game
  fen <encoding>         load a position
  state                  show the board and its encoding
  move <c1> <r1> <c2> <r2>
                         move by raw coordinates
  pos <c> <r>            show the piece on a square
  notation <text>        play a move in algebraic notation, e.g. 炮二平五
  mv <move>              play a coordinate move, e.g. h2e2
  mtc <text>             convert algebraic notation to a coordinate move
  ctm <c1> <r1> <c2> <r2>
                         convert raw coordinates to algebraic notation
  cc <move>              convert a coordinate move to algebraic notation
  check                  tell whether the side to move is in check
  best                   ask the engine for a move
  param [<name> <value>] show or set search parameters
  help                   show this text
  quit                   leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Quit,
    New,
    Fen(String),
    State,
    Move { from: (i32, i32), to: (i32, i32) },
    Pos(i32, i32),
    Notation(String),
    Mv(String),
    Mtc(String),
    Ctm { from: (i32, i32), to: (i32, i32) },
    Cc(String),
    Check,
    Best,
    Param(Option<(String, String)>),
    /// Known command with bad arguments; carries the usage line.
    Usage(&'static str),
    Unknown(String),
}

/// Parses one console line. Blank lines yield `None`.
pub fn parse_console_command(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (keyword, rest) = match line.split_once(char::is_whitespace) {
        Some((k, r)) => (k, r.trim()),
        None => (line, ""),
    };

    let cmd = match keyword {
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "new" => ConsoleCommand::New,
        "state" => ConsoleCommand::State,
        "check" => ConsoleCommand::Check,
        "best" => ConsoleCommand::Best,
        "fen" => with_text(rest, "fen <encoding>", ConsoleCommand::Fen),
        "notation" => with_text(rest, "notation <text>", ConsoleCommand::Notation),
        "mv" => with_text(rest, "mv <move>", ConsoleCommand::Mv),
        "mtc" => with_text(rest, "mtc <text>", ConsoleCommand::Mtc),
        "cc" => with_text(rest, "cc <move>", ConsoleCommand::Cc),
        "move" => match numbers::<4>(rest) {
            Some([a, b, c, d]) => ConsoleCommand::Move {
                from: (a, b),
                to: (c, d),
            },
            None => ConsoleCommand::Usage("move <c1> <r1> <c2> <r2>"),
        },
        "ctm" => match numbers::<4>(rest) {
            Some([a, b, c, d]) => ConsoleCommand::Ctm {
                from: (a, b),
                to: (c, d),
            },
            None => ConsoleCommand::Usage("ctm <c1> <r1> <c2> <r2>"),
        },
        "pos" => match numbers::<2>(rest) {
            Some([c, r]) => ConsoleCommand::Pos(c, r),
            None => ConsoleCommand::Usage("pos <c> <r>"),
        },
        "param" => {
            let tokens: Vec<&str> = rest.split_whitespace().collect();
            match tokens.as_slice() {
                [] => ConsoleCommand::Param(None),
                [name, value] => ConsoleCommand::Param(Some((name.to_string(), value.to_string()))),
                _ => ConsoleCommand::Usage("param [<name> <value>]"),
            }
        }
        other => ConsoleCommand::Unknown(other.to_string()),
    };
    Some(cmd)
}

fn with_text(rest: &str, usage: &'static str, make: fn(String) -> ConsoleCommand) -> ConsoleCommand {
    if rest.is_empty() {
        ConsoleCommand::Usage(usage)
    } else {
        make(rest.to_string())
    }
}

fn numbers<const N: usize>(rest: &str) -> Option<[i32; N]> {
    let mut out = [0; N];
    let mut tokens = rest.split_whitespace();
    for slot in out.iter_mut() {
        *slot = tokens.next()?.parse().ok()?;
    }
    tokens.next().is_none().then_some(out)
}

/// Whether the loop should keep reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console {
    games: GameRepository,
    engine: Arc<EngineSession>,
    cloud: Option<Arc<dyn CloudBook>>,
    current: String,
}

impl Console {
    pub fn new(engine: Arc<EngineSession>, sink: Arc<dyn GameSink>) -> Self {
        let mut console = Console {
            games: GameRepository::new(sink),
            engine,
            cloud: None,
            current: String::new(),
        };
        console.begin(Board::new());
        console
    }

    /// Looks positions up in `cloud` before asking the engine, starting
    /// with the game already open.
    pub fn with_cloud(mut self, cloud: Arc<dyn CloudBook>) -> Self {
        if let Some(game) = self.games.get_mut(&self.current) {
            game.set_cloud(Arc::clone(&cloud));
        }
        self.cloud = Some(cloud);
        self
    }

    fn begin(&mut self, board: Board) {
        let id = self.games.next_id();
        let mut game = Game::new(id, Player::new(1, "red"), Player::new(2, "black"))
            .with_board(board)
            .with_engine(Arc::clone(&self.engine));
        if let Some(cloud) = &self.cloud {
            game.set_cloud(Arc::clone(cloud));
        }
        self.current = self.games.insert(game);
        if let Err(e) = self.games.start(&self.current) {
            debug!(error = %e, "console game not started");
        }
        self.engine.new_game();
    }

    /// The game the console is playing.
    pub fn game(&self) -> Option<&Game> {
        self.games.get(&self.current)
    }

    pub fn board(&self) -> Board {
        self.game().map(|g| g.board().clone()).unwrap_or_default()
    }

    pub fn execute<W: Write>(&mut self, cmd: ConsoleCommand, out: &mut W) -> io::Result<Flow> {
        match cmd {
            ConsoleCommand::Help => writeln!(out, "{HELP}")?,
            ConsoleCommand::Quit => return Ok(Flow::Quit),
            ConsoleCommand::New => {
                self.begin(Board::new());
                writeln!(out, "new game {}", self.current)?;
                writeln!(out, "{}", self.board())?;
            }
            ConsoleCommand::Fen(text) => match Board::from_fen(&text) {
                Ok(board) => {
                    self.begin(board);
                    writeln!(out, "position loaded")?;
                    writeln!(out, "{}", self.board())?;
                }
                Err(e) => writeln!(out, "error: {e}")?,
            },
            ConsoleCommand::State => {
                let board = self.board();
                writeln!(out, "{board}")?;
                writeln!(out, "fen: {}", board.to_fen())?;
            }
            ConsoleCommand::Move { from, to } => match squares(from, to) {
                Some((from, to)) => {
                    let played = self.games.make_move(&self.current, from, to);
                    self.report(played, out)?;
                }
                None => writeln!(out, "error: square off the board")?,
            },
            ConsoleCommand::Pos(col, row) => match Position::from_signed(col, row) {
                Some(pos) => match self.board().piece_at(pos) {
                    Some(piece) => writeln!(out, "{pos}: {} ({})", piece.name(), piece.color)?,
                    None => writeln!(out, "{pos}: empty")?,
                },
                None => writeln!(out, "error: square off the board")?,
            },
            ConsoleCommand::Notation(text) => match self.board().locate_notation(&text) {
                Ok((from, to)) => {
                    let played = self.games.make_move(&self.current, from, to);
                    self.report(played, out)?;
                }
                Err(e) => writeln!(out, "error: {e}")?,
            },
            ConsoleCommand::Mv(text) => {
                let played = self.games.make_coordinate_move(&self.current, &text);
                self.report(played, out)?;
            }
            ConsoleCommand::Mtc(text) => match self.board().locate_notation(&text) {
                Ok((from, to)) => writeln!(out, "{text} -> {}", coords::format_move(from, to))?,
                Err(e) => writeln!(out, "error: {e}")?,
            },
            ConsoleCommand::Ctm { from, to } => {
                let described = coords::coords_to_move(from, to)
                    .and_then(|mv| self.board().describe_coordinate_move(&mv));
                match described {
                    Ok(text) => writeln!(out, "({}, {}) -> ({}, {}): {text}", from.0, from.1, to.0, to.1)?,
                    Err(e) => writeln!(out, "error: {e}")?,
                }
            }
            ConsoleCommand::Cc(mv) => match self.board().describe_coordinate_move(&mv) {
                Ok(text) => writeln!(out, "{mv} -> {text}")?,
                Err(e) => writeln!(out, "error: {e}")?,
            },
            ConsoleCommand::Check => {
                let board = self.board();
                let side = board.turn();
                if board.is_in_check(side) {
                    writeln!(out, "{side} is in check")?;
                } else {
                    writeln!(out, "{side} is not in check")?;
                }
            }
            ConsoleCommand::Best => match self.game().and_then(Game::suggest_move) {
                Some(analysis) => write_analysis(&analysis, out)?,
                None => writeln!(out, "error: no engine attached")?,
            },
            ConsoleCommand::Param(None) => writeln!(out, "{}", self.engine.params())?,
            ConsoleCommand::Param(Some((name, value))) => match self.engine.set_param(&name, &value) {
                Ok(params) => writeln!(out, "{params}")?,
                Err(e) => writeln!(out, "error: {e}")?,
            },
            ConsoleCommand::Usage(usage) => writeln!(out, "usage: {usage}")?,
            ConsoleCommand::Unknown(word) => {
                writeln!(out, "unknown command '{word}', type 'help' for the list")?
            }
        }
        out.flush()?;
        Ok(Flow::Continue)
    }

    fn report<W: Write, E: std::fmt::Display>(
        &self,
        played: Result<MoveRecord, E>,
        out: &mut W,
    ) -> io::Result<()> {
        match played {
            Ok(record) => {
                writeln!(
                    out,
                    "{} {} {} -> {} ({})",
                    record.side, record.notation, record.from, record.to, record.coordinate
                )?;
                let board = self.board();
                writeln!(out, "{board}")?;
                writeln!(out, "fen: {}", board.to_fen())?;
                if let Some(game) = self.game().filter(|g| g.is_game_over()) {
                    writeln!(out, "game over: {}", game.result())?;
                }
            }
            Err(e) => writeln!(out, "error: {e}")?,
        }
        Ok(())
    }
}

fn squares(from: (i32, i32), to: (i32, i32)) -> Option<(Position, Position)> {
    Some((
        Position::from_signed(from.0, from.1)?,
        Position::from_signed(to.0, to.1)?,
    ))
}

fn write_analysis<W: Write>(analysis: &Analysis, out: &mut W) -> io::Result<()> {
    let notation = analysis.notation.as_deref().unwrap_or("-");
    match analysis.source {
        MoveSource::Engine => writeln!(
            out,
            "bestmove {} {notation} score {}",
            analysis.mv, analysis.score
        ),
        MoveSource::Cloud => writeln!(
            out,
            "bestmove {} {notation} score {} win {:.2}% (cloud)",
            analysis.mv,
            analysis.score,
            analysis.win_rate.unwrap_or(0.0)
        ),
        MoveSource::Fallback => writeln!(out, "bestmove {} (fallback)", analysis.mv),
    }
}
