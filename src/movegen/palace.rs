//! Palace pieces: advisor and general.

use super::{can_land, DIAGONAL, ORTHOGONAL};
use crate::board::{Board, Color, PieceKind, Position};

pub fn advisor(board: &Board, from: Position, color: Color) -> Vec<Position> {
    DIAGONAL
        .iter()
        .filter_map(|&(dc, dr)| from.offset(dc, dr))
        .filter(|&to| to.in_palace(color) && can_land(board, to, color))
        .collect()
}

/// General: one orthogonal step inside the palace. When the two generals
/// face each other on an open file, the opposing general's square is
/// included as well; this only matters for check detection.
pub fn general(board: &Board, from: Position, color: Color) -> Vec<Position> {
    let mut out: Vec<Position> = ORTHOGONAL
        .iter()
        .filter_map(|&(dc, dr)| from.offset(dc, dr))
        .filter(|&to| to.in_palace(color) && can_land(board, to, color))
        .collect();
    if let Some(target) = facing_general(board, from, color) {
        out.push(target);
    }
    out
}

/// Scans along the file towards the enemy; returns the enemy general's
/// square if it is the first piece met.
fn facing_general(board: &Board, from: Position, color: Color) -> Option<Position> {
    let dr = i32::from(color.forward());
    let mut cur = from;
    while let Some(next) = cur.offset(0, dr) {
        if let Some(piece) = board.piece_at(next) {
            return (piece.kind == PieceKind::General && piece.color != color).then_some(next);
        }
        cur = next;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::{sorted, sq};

    #[test]
    fn advisor_stays_in_palace() {
        let board = Board::from_fen("4k4/9/9/9/9/9/9/9/9/3AK4 w").unwrap();
        assert_eq!(advisor(&board, sq(3, 0), Color::Red), vec![sq(4, 1)]);

        let board = Board::from_fen("4k4/9/9/9/9/9/9/9/4A4/3K5 w").unwrap();
        assert_eq!(
            sorted(advisor(&board, sq(4, 1), Color::Red)),
            vec![sq(3, 2), sq(5, 0), sq(5, 2)]
        );
    }

    #[test]
    fn general_stays_in_palace() {
        let board = Board::from_fen("5k3/9/9/9/9/9/9/9/9/3K5 w").unwrap();
        assert_eq!(
            sorted(general(&board, sq(3, 0), Color::Red)),
            vec![sq(3, 1), sq(4, 0)]
        );
    }

    #[test]
    fn flying_general_on_open_file() {
        let board = Board::from_fen("4k4/9/9/9/9/9/9/9/9/4K4 w").unwrap();
        assert!(general(&board, sq(4, 0), Color::Red).contains(&sq(4, 9)));
        assert!(general(&board, sq(4, 9), Color::Black).contains(&sq(4, 0)));
        assert!(board.is_in_check(Color::Red));
        assert!(board.is_in_check(Color::Black));
    }

    #[test]
    fn blocked_file_stops_flying_general() {
        let board = Board::from_fen("4k4/9/9/9/4p4/9/9/9/9/4K4 w").unwrap();
        assert!(!general(&board, sq(4, 0), Color::Red).contains(&sq(4, 9)));
        assert!(!board.is_in_check(Color::Red));
    }
}
