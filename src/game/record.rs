//! Move records handed to persistence.

use serde::Serialize;

use crate::board::{Color, Piece, PieceKind, Position};

/// What a move did. A move that both captures and checks is `Check`;
/// the capture is still visible in [`MoveRecord::captured`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Normal,
    Capture,
    Check,
}

impl Classification {
    pub fn of(captured: Option<Piece>, gives_check: bool) -> Self {
        match (captured, gives_check) {
            (_, true) => Classification::Check,
            (Some(_), false) => Classification::Capture,
            (None, false) => Classification::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveRecord {
    /// 1-based ply number within the game.
    pub move_number: u32,
    pub side: Color,
    /// 0 for red, 1 for black.
    pub seat: u8,
    pub piece: PieceKind,
    pub from: Position,
    pub to: Position,
    pub classification: Classification,
    pub captured: Option<Piece>,
    /// Time since the previous move (or the game start), in milliseconds.
    pub move_time_ms: u64,
    /// Coordinate form, e.g. `h2e2`.
    pub coordinate: String,
    /// Algebraic form, e.g. `炮二平五`.
    pub notation: String,
    /// Encoding after the move.
    pub fen: String,
    /// Side token of `fen`.
    pub fen_side: char,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_takes_precedence() {
        let rook = Piece::new(PieceKind::Chariot, Color::Black);
        assert_eq!(Classification::of(None, false), Classification::Normal);
        assert_eq!(Classification::of(Some(rook), false), Classification::Capture);
        assert_eq!(Classification::of(Some(rook), true), Classification::Check);
        assert_eq!(Classification::of(None, true), Classification::Check);
    }
}
