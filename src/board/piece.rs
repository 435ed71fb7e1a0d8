//! Pieces, sides and board squares.
//!
//! Kind identity is kept separate from the display text: the encoding letter
//! and the localized name are both derived from `PieceKind` and `Color`.

use std::fmt;

use serde::Serialize;

/// Number of files (columns) on the board.
pub const COLS: u8 = 9;
/// Number of ranks (rows) on the board.
pub const ROWS: u8 = 10;

/// One of the two sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub const fn opposite(self) -> Color {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }

    /// Returns the side token used in the position encoding.
    pub const fn side_token(self) -> char {
        match self {
            Color::Red => 'w',
            Color::Black => 'b',
        }
    }

    /// Parses a side token. `r` is accepted as an alias for red.
    pub fn from_side_token(c: char) -> Option<Color> {
        match c {
            'w' | 'r' => Some(Color::Red),
            'b' => Some(Color::Black),
            _ => None,
        }
    }

    /// Row delta of one step towards the opponent.
    pub const fn forward(self) -> i8 {
        match self {
            Color::Red => 1,
            Color::Black => -1,
        }
    }

    /// Seat index used in move records (0 red, 1 black).
    pub const fn seat(self) -> u8 {
        match self {
            Color::Red => 0,
            Color::Black => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => f.write_str("red"),
            Color::Black => f.write_str("black"),
        }
    }
}

/// The seven piece kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Chariot,
    Horse,
    Elephant,
    Advisor,
    General,
    Cannon,
    Soldier,
}

pub const ALL_KINDS: [PieceKind; 7] = [
    PieceKind::Chariot,
    PieceKind::Horse,
    PieceKind::Elephant,
    PieceKind::Advisor,
    PieceKind::General,
    PieceKind::Cannon,
    PieceKind::Soldier,
];

impl PieceKind {
    /// Returns the uppercase encoding letter.
    pub const fn letter(self) -> char {
        match self {
            PieceKind::Chariot => 'R',
            PieceKind::Horse => 'N',
            PieceKind::Elephant => 'B',
            PieceKind::Advisor => 'A',
            PieceKind::General => 'K',
            PieceKind::Cannon => 'C',
            PieceKind::Soldier => 'P',
        }
    }

    /// Parses an encoding letter, case-insensitively. `H` and `E` are
    /// accepted for horse and elephant.
    pub fn from_letter(c: char) -> Option<PieceKind> {
        match c.to_ascii_uppercase() {
            'R' => Some(PieceKind::Chariot),
            'N' | 'H' => Some(PieceKind::Horse),
            'B' | 'E' => Some(PieceKind::Elephant),
            'A' => Some(PieceKind::Advisor),
            'K' => Some(PieceKind::General),
            'C' => Some(PieceKind::Cannon),
            'P' => Some(PieceKind::Soldier),
            _ => None,
        }
    }

    /// Returns the localized name for the given side.
    pub const fn name(self, color: Color) -> char {
        match (self, color) {
            (PieceKind::Chariot, _) => '车',
            (PieceKind::Horse, _) => '马',
            (PieceKind::Cannon, _) => '炮',
            (PieceKind::Elephant, Color::Red) => '相',
            (PieceKind::Elephant, Color::Black) => '象',
            (PieceKind::Advisor, Color::Red) => '仕',
            (PieceKind::Advisor, Color::Black) => '士',
            (PieceKind::General, Color::Red) => '帅',
            (PieceKind::General, Color::Black) => '将',
            (PieceKind::Soldier, Color::Red) => '兵',
            (PieceKind::Soldier, Color::Black) => '卒',
        }
    }

    /// Parses a localized name. The color is returned only when the glyph
    /// belongs to one side. Traditional glyphs are accepted.
    pub fn from_name(c: char) -> Option<(PieceKind, Option<Color>)> {
        let parsed = match c {
            '车' | '車' | '俥' => (PieceKind::Chariot, None),
            '马' | '馬' | '傌' => (PieceKind::Horse, None),
            '炮' | '砲' => (PieceKind::Cannon, None),
            '包' => (PieceKind::Cannon, Some(Color::Black)),
            '相' => (PieceKind::Elephant, Some(Color::Red)),
            '象' => (PieceKind::Elephant, Some(Color::Black)),
            '仕' => (PieceKind::Advisor, Some(Color::Red)),
            '士' => (PieceKind::Advisor, Some(Color::Black)),
            '帅' | '帥' => (PieceKind::General, Some(Color::Red)),
            '将' | '將' => (PieceKind::General, Some(Color::Black)),
            '兵' => (PieceKind::Soldier, Some(Color::Red)),
            '卒' => (PieceKind::Soldier, Some(Color::Black)),
            _ => return None,
        };
        Some(parsed)
    }

    /// Diagonal movers name their destination file in notation; the others
    /// name the distance travelled.
    pub const fn moves_diagonally(self) -> bool {
        matches!(
            self,
            PieceKind::Horse | PieceKind::Elephant | PieceKind::Advisor
        )
    }
}

/// A piece: kind plus owner. Its square is the key it is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Piece { kind, color }
    }

    /// Encoding character: uppercase for red, lowercase for black.
    pub fn fen_char(self) -> char {
        match self.color {
            Color::Red => self.kind.letter(),
            Color::Black => self.kind.letter().to_ascii_lowercase(),
        }
    }

    pub fn from_fen_char(c: char) -> Option<Piece> {
        let kind = PieceKind::from_letter(c)?;
        let color = if c.is_ascii_uppercase() {
            Color::Red
        } else {
            Color::Black
        };
        Some(Piece { kind, color })
    }

    pub const fn name(self) -> char {
        self.kind.name(self.color)
    }
}

/// A square on the 9x10 board. Row 0 is red's back rank.
///
/// Only constructible through checked constructors, so every value is on
/// the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    col: u8,
    row: u8,
}

impl Position {
    pub const fn new(col: u8, row: u8) -> Option<Position> {
        if col < COLS && row < ROWS {
            Some(Position { col, row })
        } else {
            None
        }
    }

    /// Checked constructor from signed coordinates.
    pub fn from_signed(col: i32, row: i32) -> Option<Position> {
        let col = u8::try_from(col).ok()?;
        let row = u8::try_from(row).ok()?;
        Position::new(col, row)
    }

    pub const fn col(self) -> u8 {
        self.col
    }

    pub const fn row(self) -> u8 {
        self.row
    }

    /// Returns the square `(dc, dr)` away, if it is on the board.
    pub fn offset(self, dc: i32, dr: i32) -> Option<Position> {
        Position::from_signed(self.col as i32 + dc, self.row as i32 + dr)
    }

    /// Whether the square is on `color`'s side of the river.
    pub const fn on_home_side(self, color: Color) -> bool {
        match color {
            Color::Red => self.row <= 4,
            Color::Black => self.row >= 5,
        }
    }

    pub const fn in_palace(self, color: Color) -> bool {
        let files = self.col >= 3 && self.col <= 5;
        match color {
            Color::Red => files && self.row <= 2,
            Color::Black => files && self.row >= 7,
        }
    }

    /// The square seen from the other side of the board.
    pub const fn rotated(self) -> Position {
        Position {
            col: COLS - 1 - self.col,
            row: ROWS - 1 - self.row,
        }
    }

    /// Iterates every square, row by row from row 0.
    pub fn all() -> impl Iterator<Item = Position> {
        (0..ROWS).flat_map(|row| (0..COLS).map(move |col| Position { col, row }))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}
