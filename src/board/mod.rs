//! Board representation.
//!
//! Pieces, sides, squares and the position itself.

pub mod piece;
pub mod state;

pub use piece::{Color, Piece, PieceKind, Position, ALL_KINDS, COLS, ROWS};
pub use state::Board;
