//! Destination generation.
//!
//! One pure function per piece kind, selected by matching on the kind.
//! The generators cover the movement rules only: a destination may still
//! leave the mover's own general in check. Enumeration is used for check
//! detection, notation validation and the stub engine.

pub mod leaper;
pub mod line;
pub mod palace;
pub mod soldier;

use crate::board::{Board, Color, Piece, PieceKind, Position};

/// The four orthogonal directions.
pub(crate) const ORTHOGONAL: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];

/// The four diagonal directions.
pub(crate) const DIAGONAL: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Whether a piece of `color` may end its move on `pos`: the square is empty
/// or holds an enemy.
pub(crate) fn can_land(board: &Board, pos: Position, color: Color) -> bool {
    board.piece_at(pos).map_or(true, |p| p.color != color)
}

/// Returns every square the piece on `from` can move to or capture on.
/// An empty square yields no destinations.
pub fn destinations(board: &Board, from: Position) -> Vec<Position> {
    match board.piece_at(from) {
        Some(piece) => piece_destinations(board, from, piece),
        None => Vec::new(),
    }
}

/// Destinations for `piece` standing on `from`.
pub fn piece_destinations(board: &Board, from: Position, piece: Piece) -> Vec<Position> {
    let color = piece.color;
    match piece.kind {
        PieceKind::Chariot => line::chariot(board, from, color),
        PieceKind::Cannon => line::cannon(board, from, color),
        PieceKind::Horse => leaper::horse(board, from, color),
        PieceKind::Elephant => leaper::elephant(board, from, color),
        PieceKind::Advisor => palace::advisor(board, from, color),
        PieceKind::General => palace::general(board, from, color),
        PieceKind::Soldier => soldier::soldier(board, from, color),
    }
}

/// Whether any piece of `by` reaches `target`.
pub fn is_attacked(board: &Board, target: Position, by: Color) -> bool {
    board
        .pieces()
        .filter(|(_, p)| p.color == by)
        .any(|(from, piece)| piece_destinations(board, from, piece).contains(&target))
}

/// Every `(from, to)` pair available to `color`, in square order.
pub fn all_moves(board: &Board, color: Color) -> Vec<(Position, Position)> {
    board
        .pieces()
        .filter(|(_, p)| p.color == color)
        .flat_map(|(from, piece)| {
            piece_destinations(board, from, piece)
                .into_iter()
                .map(move |to| (from, to))
        })
        .collect()
}

/// Moves for `color` after which its own general is neither missing nor
/// attacked.
pub fn safe_moves(board: &Board, color: Color) -> Vec<(Position, Position)> {
    all_moves(board, color)
        .into_iter()
        .filter(|&(from, to)| {
            let mut next = board.clone();
            if next.apply_move(from, to).is_err() {
                return false;
            }
            !next.is_in_check(color)
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn sorted(mut squares: Vec<Position>) -> Vec<Position> {
    squares.sort();
    squares
}

#[cfg(test)]
pub(crate) fn sq(col: u8, row: u8) -> Position {
    Position::new(col, row).unwrap()
}
