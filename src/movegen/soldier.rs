//! Soldier movement.

use super::can_land;
use crate::board::{Board, Color, Position};

/// One step forward; once across the river also one step sideways.
pub fn soldier(board: &Board, from: Position, color: Color) -> Vec<Position> {
    let mut steps = vec![(0, i32::from(color.forward()))];
    if !from.on_home_side(color) {
        steps.push((1, 0));
        steps.push((-1, 0));
    }
    steps
        .into_iter()
        .filter_map(|(dc, dr)| from.offset(dc, dr))
        .filter(|&to| can_land(board, to, color))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movegen::{sorted, sq};

    #[test]
    fn forward_only_before_river() {
        let board = Board::new();
        assert_eq!(soldier(&board, sq(4, 3), Color::Red), vec![sq(4, 4)]);
        assert_eq!(soldier(&board, sq(4, 6), Color::Black), vec![sq(4, 5)]);
    }

    #[test]
    fn sideways_after_crossing() {
        let board = Board::from_fen("4k4/9/9/9/4P4/9/9/9/9/3K5 w").unwrap();
        assert_eq!(
            sorted(soldier(&board, sq(4, 5), Color::Red)),
            vec![sq(3, 5), sq(4, 6), sq(5, 5)]
        );
    }

    #[test]
    fn last_rank_soldier_moves_sideways_only() {
        let board = Board::from_fen("P3k4/9/9/9/9/9/9/9/9/3K5 w").unwrap();
        assert_eq!(soldier(&board, sq(0, 9), Color::Red), vec![sq(1, 9)]);
    }

    #[test]
    fn soldier_never_lands_on_own_piece() {
        let board = Board::from_fen("4k4/9/9/9/3RPr3/9/9/9/9/3K5 w").unwrap();
        assert_eq!(
            sorted(soldier(&board, sq(4, 5), Color::Red)),
            vec![sq(4, 6), sq(5, 5)]
        );
    }
}
