//! Four-character coordinate moves such as `h2e2`.
//!
//! Files `a`-`i` map to columns 0-8 and rank digits map to rows directly,
//! so row 0 is red's back rank.

use crate::board::{Position, COLS, ROWS};
use crate::error::{Result, XiangqiError};

fn parse_square(token: &str, file: char, rank: char) -> Result<Position> {
    if !('a'..='i').contains(&file) {
        return Err(XiangqiError::invalid_move(token, format!("bad file '{file}'")));
    }
    let row = rank
        .to_digit(10)
        .ok_or_else(|| XiangqiError::invalid_move(token, format!("bad rank '{rank}'")))?;
    let col = file as u8 - b'a';
    Position::new(col, row as u8)
        .ok_or_else(|| XiangqiError::invalid_move(token, "square outside the board"))
}

/// Parses a coordinate move into `(from, to)`.
pub fn parse_move(token: &str) -> Result<(Position, Position)> {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() != 4 {
        return Err(XiangqiError::invalid_move(
            token,
            format!("expected 4 characters, got {}", chars.len()),
        ));
    }
    let from = parse_square(token, chars[0], chars[1])?;
    let to = parse_square(token, chars[2], chars[3])?;
    Ok((from, to))
}

/// Builds a coordinate move from integer coordinates, rejecting anything
/// outside the 9x10 board.
pub fn coords_to_move(from: (i32, i32), to: (i32, i32)) -> Result<String> {
    let check = |(col, row): (i32, i32)| {
        Position::from_signed(col, row).ok_or_else(|| {
            XiangqiError::invalid_move(
                &format!("{col},{row}"),
                format!("coordinates must be within 0-{} and 0-{}", COLS - 1, ROWS - 1),
            )
        })
    };
    Ok(format_move(check(from)?, check(to)?))
}

pub fn format_square(pos: Position) -> String {
    format!("{}{}", (b'a' + pos.col()) as char, pos.row())
}

pub fn format_move(from: Position, to: Position) -> String {
    format!("{}{}", format_square(from), format_square(to))
}
