//! Board state.
//!
//! Squares are stored in a fixed `[row][col]` array so a board is cheap to
//! clone and compare. Internally red always occupies rows 0-4; the
//! orientation the board was read in is remembered only for re-encoding.

use std::fmt;

use super::piece::{Color, Piece, PieceKind, Position, COLS, ROWS};
use crate::error::{Result, XiangqiError};
use crate::movegen;
use crate::protocol::{coords, fen, notation};

/// Back rank layout from column 0 to 8.
const BACK_RANK: [PieceKind; 9] = [
    PieceKind::Chariot,
    PieceKind::Horse,
    PieceKind::Elephant,
    PieceKind::Advisor,
    PieceKind::General,
    PieceKind::Advisor,
    PieceKind::Elephant,
    PieceKind::Horse,
    PieceKind::Chariot,
];

/// Complete position: piece placement, side to move and orientation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    squares: [[Option<Piece>; COLS as usize]; ROWS as usize],
    turn: Color,
    red_at_top: bool,
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl Board {
    /// Standard 32-piece starting position, red to move.
    pub fn new() -> Self {
        let mut board = Board::empty(Color::Red);
        for color in [Color::Red, Color::Black] {
            let (back, cannons, soldiers) = match color {
                Color::Red => (0, 2, 3),
                Color::Black => (9, 7, 6),
            };
            for (col, kind) in BACK_RANK.iter().enumerate() {
                board.put(col as u8, back, Piece::new(*kind, color));
            }
            for col in [1, 7] {
                board.put(col, cannons, Piece::new(PieceKind::Cannon, color));
            }
            for col in [0, 2, 4, 6, 8] {
                board.put(col, soldiers, Piece::new(PieceKind::Soldier, color));
            }
        }
        board
    }

    /// A board with no pieces.
    pub fn empty(turn: Color) -> Self {
        Board {
            squares: [[None; COLS as usize]; ROWS as usize],
            turn,
            red_at_top: false,
        }
    }

    /// Parses a position encoding. See [`fen::parse_fen`].
    pub fn from_fen(text: &str) -> Result<Self> {
        fen::parse_fen(text)
    }

    fn put(&mut self, col: u8, row: u8, piece: Piece) {
        if let Some(pos) = Position::new(col, row) {
            self.place(pos, Some(piece));
        }
    }

    pub fn piece_at(&self, pos: Position) -> Option<Piece> {
        self.squares[pos.row() as usize][pos.col() as usize]
    }

    /// Sets or clears a square. Used for setting up positions.
    pub fn place(&mut self, pos: Position, piece: Option<Piece>) {
        self.squares[pos.row() as usize][pos.col() as usize] = piece;
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.piece_at(pos).is_some()
    }

    /// Iterates occupied squares, row by row from red's back rank.
    pub fn pieces(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        Position::all().filter_map(move |pos| self.piece_at(pos).map(|p| (pos, p)))
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn set_turn(&mut self, turn: Color) {
        self.turn = turn;
    }

    /// Whether the board was read with red's pieces at the top.
    pub fn red_at_top(&self) -> bool {
        self.red_at_top
    }

    pub(crate) fn set_red_at_top(&mut self, red_at_top: bool) {
        self.red_at_top = red_at_top;
    }

    pub fn king_position(&self, color: Color) -> Option<Position> {
        self.pieces()
            .find(|(_, p)| p.kind == PieceKind::General && p.color == color)
            .map(|(pos, _)| pos)
    }

    /// Whether `color`'s general is attacked.
    ///
    /// A missing general counts as check.
    pub fn is_in_check(&self, color: Color) -> bool {
        match self.king_position(color) {
            None => true,
            Some(king) => movegen::is_attacked(self, king, color.opposite()),
        }
    }

    /// Moves the piece on `from` to `to`, capturing whatever stands there,
    /// and passes the turn. Returns the move in algebraic notation, rendered
    /// against the position before the move.
    ///
    /// Destination legality is not checked.
    pub fn apply_move(&mut self, from: Position, to: Position) -> Result<String> {
        let piece = self
            .piece_at(from)
            .ok_or(XiangqiError::NoPieceAtSource { position: from })?;
        let text = notation::render_move(self, from, to)?;
        self.place(to, Some(piece));
        self.place(from, None);
        self.turn = self.turn.opposite();
        Ok(text)
    }

    /// Applies a 4-character coordinate move such as `h2e2`, checking that the
    /// moving piece belongs to the side to move.
    pub fn apply_coordinate_move(&mut self, text: &str) -> Result<String> {
        let (from, to) = coords::parse_move(text)?;
        self.check_mover(from)?;
        self.apply_move(from, to)
    }

    /// Fails unless `from` holds a piece of the side to move.
    pub fn check_mover(&self, from: Position) -> Result<Piece> {
        let piece = self
            .piece_at(from)
            .ok_or(XiangqiError::NoPieceAtSource { position: from })?;
        if piece.color != self.turn {
            return Err(XiangqiError::WrongSideToMove {
                position: from,
                expected: self.turn,
                found: piece.color,
            });
        }
        Ok(piece)
    }

    /// Renders a coordinate move in algebraic notation without applying it.
    pub fn describe_coordinate_move(&self, text: &str) -> Result<String> {
        let (from, to) = coords::parse_move(text)?;
        notation::render_move(self, from, to)
    }

    /// Algebraic notation for moving the piece on `from` to `to`.
    pub fn render_notation(&self, from: Position, to: Position) -> Result<String> {
        notation::render_move(self, from, to)
    }

    /// Resolves algebraic notation against this position.
    pub fn locate_notation(&self, text: &str) -> Result<(Position, Position)> {
        notation::resolve(self, text)
    }

    /// Full encoding in the board's own orientation.
    pub fn to_fen(&self) -> String {
        fen::encode_fen(self)
    }

    /// Board portion with red at the bottom.
    pub fn to_canonical_fen(&self) -> String {
        fen::encode_canonical(self)
    }

    /// Cell grid in encoding row order.
    pub fn to_cells(&self) -> fen::Cells {
        fen::board_cells(self, self.red_at_top)
    }
}

/// Red file labels, right to left from red's seat.
const RED_FILES: [char; 9] = ['九', '八', '七', '六', '五', '四', '三', '二', '一'];

impl fmt::Display for Board {
    /// Text diagram with black's files on top and red's below.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  ")?;
        for file in 1..=COLS {
            write!(f, " {file}")?;
        }
        writeln!(f)?;
        for row in (0..ROWS).rev() {
            write!(f, "{row} ")?;
            for col in 0..COLS {
                let cell = Position::new(col, row)
                    .and_then(|pos| self.piece_at(pos))
                    .map(|p| p.name())
                    .unwrap_or('・');
                write!(f, "{cell}")?;
            }
            writeln!(f)?;
        }
        write!(f, "  ")?;
        for label in RED_FILES {
            write!(f, "{label}")?;
        }
        writeln!(f)?;
        write!(f, "{} to move", self.turn)
    }
}
