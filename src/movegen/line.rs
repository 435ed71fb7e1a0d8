//! Sliding pieces: chariot and cannon.

use super::{can_land, ORTHOGONAL};
use crate::board::{Board, Color, Position};

/// Chariot: slides along each ray until the first occupied square, which it
/// may capture if it holds an enemy.
pub fn chariot(board: &Board, from: Position, color: Color) -> Vec<Position> {
    let mut out = Vec::with_capacity(17);
    for (dc, dr) in ORTHOGONAL {
        let mut cur = from;
        while let Some(next) = cur.offset(dc, dr) {
            if board.is_occupied(next) {
                if can_land(board, next, color) {
                    out.push(next);
                }
                break;
            }
            out.push(next);
            cur = next;
        }
    }
    out
}

/// Cannon: slides like a chariot over empty squares but captures only by
/// jumping exactly one screen. The screen itself is never a destination.
pub fn cannon(board: &Board, from: Position, color: Color) -> Vec<Position> {
    let mut out = Vec::with_capacity(17);
    for (dc, dr) in ORTHOGONAL {
        let mut cur = from;
        let mut screened = false;
        while let Some(next) = cur.offset(dc, dr) {
            cur = next;
            match (board.piece_at(next), screened) {
                (None, false) => out.push(next),
                (None, true) => {}
                (Some(_), false) => screened = true,
                (Some(target), true) => {
                    if target.color != color {
                        out.push(next);
                    }
                    break;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::{sorted, sq};

    #[test]
    fn chariot_open_board() {
        let board = Board::from_fen("4k4/9/9/9/9/9/9/9/9/R3K4 w").unwrap();
        let dests = chariot(&board, sq(0, 0), Color::Red);
        // 9 up the file, 3 along the rank before the general.
        assert_eq!(dests.len(), 12);
        assert!(!dests.contains(&sq(4, 0)));
    }

    #[test]
    fn chariot_captures_first_enemy_only() {
        let board = Board::from_fen("4k4/9/9/9/r8/9/9/9/9/R3K4 w").unwrap();
        let dests = chariot(&board, sq(0, 0), Color::Red);
        assert!(dests.contains(&sq(0, 5)));
        assert!(!dests.contains(&sq(0, 6)));
    }

    #[test]
    fn cannon_needs_a_screen_to_capture() {
        // Cannon a0, enemy chariot a5, nothing between.
        let board = Board::from_fen("4k4/9/9/9/r8/9/9/9/9/C3K4 w").unwrap();
        let dests = cannon(&board, sq(0, 0), Color::Red);
        assert!(!dests.contains(&sq(0, 5)));
        assert!(dests.contains(&sq(0, 4)));
    }

    #[test]
    fn cannon_captures_beyond_exactly_one_screen() {
        // Cannon a0, screen a3 (own soldier), enemy chariot a7.
        let board = Board::from_fen("4k4/9/r8/9/9/9/P8/9/9/C3K4 w").unwrap();
        let dests = sorted(cannon(&board, sq(0, 0), Color::Red));
        assert!(!dests.contains(&sq(0, 3)));
        assert!(dests.contains(&sq(0, 7)));
        assert!(!dests.contains(&sq(0, 4)));
        assert!(!dests.contains(&sq(0, 8)));
        assert_eq!(
            dests.iter().filter(|p| p.col() == 0).copied().collect::<Vec<_>>(),
            vec![sq(0, 1), sq(0, 2), sq(0, 7)]
        );
    }

    #[test]
    fn cannon_cannot_capture_over_two_screens() {
        let board = Board::from_fen("4k4/r8/P8/9/9/9/P8/9/9/C3K4 w").unwrap();
        let dests = cannon(&board, sq(0, 0), Color::Red);
        assert!(!dests.contains(&sq(0, 8)));
    }

    #[test]
    fn cannon_does_not_capture_own_piece() {
        let board = Board::from_fen("4k4/9/R8/9/9/9/P8/9/9/C3K4 w").unwrap();
        let dests = cannon(&board, sq(0, 0), Color::Red);
        assert!(!dests.contains(&sq(0, 7)));
    }
}
