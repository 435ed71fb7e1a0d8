//! Text formats.
//!
//! Position encoding, coordinate moves, algebraic notation and the UCI
//! line protocol spoken with analysis engines.

pub mod coords;
pub mod fen;
pub mod notation;
pub mod uci;

pub use coords::{coords_to_move, format_move, parse_move};
pub use fen::{encode_cells, encode_fen, parse_fen, split_side, Cells, START_BOARD};
pub use notation::{parse_notation, render_move, resolve};
pub use uci::{parse_command, parse_engine_line, Command, EngineLine, GoParams, Score};
