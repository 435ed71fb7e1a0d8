//! A single game: board, players, clock and move list.

use std::fmt;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::info;

use super::record::{Classification, MoveRecord};
use super::GameError;
use crate::analysis::{analyze_board, Analysis};
use crate::board::{Board, Color, PieceKind, Position};
use crate::cloud::CloudBook;
use crate::engine::EngineSession;
use crate::protocol::coords;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Player {
    pub user_id: i64,
    pub username: String,
    pub rating: Option<u32>,
}

impl Player {
    pub fn new(user_id: i64, username: impl Into<String>) -> Self {
        Player {
            user_id,
            username: username.into(),
            rating: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Finished,
    Paused,
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Playing => "playing",
            GameStatus::Finished => "finished",
            GameStatus::Paused => "paused",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameResult {
    RedWin,
    BlackWin,
    Draw,
    Unknown,
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GameResult::RedWin => "red wins",
            GameResult::BlackWin => "black wins",
            GameResult::Draw => "draw",
            GameResult::Unknown => "unknown",
        })
    }
}

/// Serializable status view of a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSnapshot {
    pub game_id: String,
    pub match_id: Option<i64>,
    pub status: GameStatus,
    pub result: GameResult,
    pub red_player: Player,
    pub black_player: Player,
    pub move_count: u32,
    pub fen: String,
    pub next_player: Color,
    pub red_time_ms: u64,
    pub black_time_ms: u64,
    /// Unix milliseconds.
    pub started_at: Option<u64>,
    pub ended_at: Option<u64>,
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

pub struct Game {
    id: String,
    match_id: Option<i64>,
    red: Player,
    black: Player,
    status: GameStatus,
    result: GameResult,
    board: Board,
    moves: Vec<MoveRecord>,
    red_time_ms: u64,
    black_time_ms: u64,
    started_at: Option<u64>,
    ended_at: Option<u64>,
    last_move_at: Option<Instant>,
    engine: Option<Arc<EngineSession>>,
    cloud: Option<Arc<dyn CloudBook>>,
}

impl Game {
    pub fn new(id: impl Into<String>, red: Player, black: Player) -> Self {
        Game {
            id: id.into(),
            match_id: None,
            red,
            black,
            status: GameStatus::Waiting,
            result: GameResult::Unknown,
            board: Board::new(),
            moves: Vec::new(),
            red_time_ms: 0,
            black_time_ms: 0,
            started_at: None,
            ended_at: None,
            last_move_at: None,
            engine: None,
            cloud: None,
        }
    }

    pub fn with_match_id(mut self, match_id: i64) -> Self {
        self.match_id = Some(match_id);
        self
    }

    /// Starts from `board` instead of the standard opening.
    pub fn with_board(mut self, board: Board) -> Self {
        self.board = board;
        self
    }

    pub fn with_engine(mut self, engine: Arc<EngineSession>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Consults `cloud` before the engine when suggesting moves.
    pub fn set_cloud(&mut self, cloud: Arc<dyn CloudBook>) {
        self.cloud = Some(cloud);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn moves(&self) -> &[MoveRecord] {
        &self.moves
    }

    pub fn start(&mut self) -> Result<(), GameError> {
        if self.status != GameStatus::Waiting {
            return Err(GameError::NotWaiting {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.status = GameStatus::Playing;
        self.started_at = Some(unix_millis());
        self.last_move_at = Some(Instant::now());
        info!(game = %self.id, "game started");
        Ok(())
    }

    /// Plays a move for the side to move and records it.
    ///
    /// The capture is determined before the board changes, the check after.
    /// When a general has been taken the game ends.
    pub fn make_move(&mut self, from: Position, to: Position) -> Result<MoveRecord, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotPlaying {
                id: self.id.clone(),
                status: self.status,
            });
        }
        let piece = self.board.check_mover(from)?;
        let captured = self.board.piece_at(to);
        let notation = self.board.apply_move(from, to)?;

        let now = Instant::now();
        let move_time_ms = self
            .last_move_at
            .map(|t| now.duration_since(t).as_millis() as u64)
            .unwrap_or(0);
        self.last_move_at = Some(now);
        match piece.color {
            Color::Red => self.red_time_ms += move_time_ms,
            Color::Black => self.black_time_ms += move_time_ms,
        }

        let gives_check = self.board.is_in_check(self.board.turn());
        let record = MoveRecord {
            move_number: self.moves.len() as u32 + 1,
            side: piece.color,
            seat: piece.color.seat(),
            piece: piece.kind,
            from,
            to,
            classification: Classification::of(captured, gives_check),
            captured,
            move_time_ms,
            coordinate: coords::format_move(from, to),
            notation,
            fen: self.board.to_fen(),
            fen_side: self.board.turn().side_token(),
        };
        self.moves.push(record.clone());
        info!(game = %self.id, number = record.move_number, notation = %record.notation, "move played");

        if self.is_game_over() {
            self.end(None);
        }
        Ok(record)
    }

    pub fn make_coordinate_move(&mut self, text: &str) -> Result<MoveRecord, GameError> {
        let (from, to) = coords::parse_move(text)?;
        self.make_move(from, to)
    }

    /// Plays a move written in algebraic notation, resolved against the
    /// current position.
    pub fn make_notation_move(&mut self, text: &str) -> Result<MoveRecord, GameError> {
        let (from, to) = self.board.locate_notation(text)?;
        self.make_move(from, to)
    }

    /// Asks the cloud book, then the attached engine, for a move in the
    /// current position without playing it. `None` when no engine is
    /// attached.
    pub fn suggest_move(&self) -> Option<Analysis> {
        self.engine
            .as_deref()
            .map(|engine| analyze_board(engine, self.cloud.as_deref(), &self.board))
    }

    /// A game is over once either general has been captured.
    pub fn is_game_over(&self) -> bool {
        self.board.king_position(Color::Red).is_none()
            || self.board.king_position(Color::Black).is_none()
    }

    /// Finishes the game. Without an explicit result, a game with a missing
    /// general is won by the side whose general survives.
    pub fn end(&mut self, result: Option<GameResult>) {
        self.status = GameStatus::Finished;
        self.ended_at = Some(unix_millis());
        self.result = match result {
            Some(r) => r,
            None if self.is_game_over() => {
                let red = self.board.king_position(Color::Red).is_some();
                let black = self.board.king_position(Color::Black).is_some();
                match (red, black) {
                    (true, false) => GameResult::RedWin,
                    (false, true) => GameResult::BlackWin,
                    _ => GameResult::Draw,
                }
            }
            None => self.result,
        };
        info!(game = %self.id, result = %self.result, "game finished");
    }

    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game_id: self.id.clone(),
            match_id: self.match_id,
            status: self.status,
            result: self.result,
            red_player: self.red.clone(),
            black_player: self.black.clone(),
            move_count: self.moves.len() as u32,
            fen: self.board.to_fen(),
            next_player: self.board.turn(),
            red_time_ms: self.red_time_ms,
            black_time_ms: self.black_time_ms,
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    /// Kinds captured so far by `color`.
    pub fn captures_by(&self, color: Color) -> Vec<PieceKind> {
        self.moves
            .iter()
            .filter(|m| m.side == color)
            .filter_map(|m| m.captured.map(|p| p.kind))
            .collect()
    }
}

impl fmt::Debug for Game {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Game")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("result", &self.result)
            .field("moves", &self.moves.len())
            .field("fen", &self.board.to_fen())
            .finish()
    }
}
