//! Horse and elephant: fixed jumps that can be blocked.

use super::{can_land, DIAGONAL};
use crate::board::{Board, Color, Position};

/// Knight offsets paired with the orthogonal leg square that blocks them.
const HORSE_JUMPS: [((i32, i32), (i32, i32)); 8] = [
    ((1, 2), (0, 1)),
    ((-1, 2), (0, 1)),
    ((1, -2), (0, -1)),
    ((-1, -2), (0, -1)),
    ((2, 1), (1, 0)),
    ((2, -1), (1, 0)),
    ((-2, 1), (-1, 0)),
    ((-2, -1), (-1, 0)),
];

pub fn horse(board: &Board, from: Position, color: Color) -> Vec<Position> {
    HORSE_JUMPS
        .iter()
        .filter_map(|&((dc, dr), (lc, lr))| {
            let leg = from.offset(lc, lr)?;
            if board.is_occupied(leg) {
                return None;
            }
            let to = from.offset(dc, dr)?;
            can_land(board, to, color).then_some(to)
        })
        .collect()
}

/// Elephant: two diagonal steps, blocked by a piece on the eye square, and
/// never across the river.
pub fn elephant(board: &Board, from: Position, color: Color) -> Vec<Position> {
    DIAGONAL
        .iter()
        .filter_map(|&(dc, dr)| {
            let eye = from.offset(dc, dr)?;
            if board.is_occupied(eye) {
                return None;
            }
            let to = from.offset(2 * dc, 2 * dr)?;
            (to.on_home_side(color) && can_land(board, to, color)).then_some(to)
        })
        .collect()
}
