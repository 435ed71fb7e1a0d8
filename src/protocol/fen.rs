//! Position encoding and decoding.
//!
//! The encoding lists ten rows separated by `/`, top row first, followed by a
//! side token:
//!
//! `rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w`
//!
//! Uppercase letters are red pieces, lowercase black, digits 1-9 are runs of
//! empty squares. Engines always receive red at the bottom; boards that were
//! parsed with red at the top are written back the same way.

use crate::board::{Board, Color, Piece, Position, COLS, ROWS};
use crate::error::{Result, XiangqiError};

/// Board portion of the standard starting position.
pub const START_BOARD: &str = "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR";

/// A 10x9 grid of encoding letters in text order, `-` for empty squares.
pub type Cells = [[char; COLS as usize]; ROWS as usize];

/// Marker for an empty cell.
pub const EMPTY_CELL: char = '-';

/// Splits an encoding into its board portion and side to move.
///
/// A missing side token means red to move. Trailing fields some engines
/// append (`- - 0 1`) are ignored.
pub fn split_side(text: &str) -> Result<(&str, Color)> {
    let mut fields = text.split_whitespace();
    let board = fields
        .next()
        .ok_or_else(|| XiangqiError::invalid_encoding("empty encoding"))?;
    let side = match fields.next() {
        None => Color::Red,
        Some(token) => parse_side(token)?,
    };
    Ok((board, side))
}

fn parse_side(token: &str) -> Result<Color> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Color::from_side_token(c)
            .ok_or_else(|| XiangqiError::invalid_encoding(format!("unknown side token '{token}'"))),
        _ => Err(XiangqiError::invalid_encoding(format!(
            "unknown side token '{token}'"
        ))),
    }
}

/// Expands one encoded row into nine cells.
fn parse_row(index: usize, row: &str) -> Result<[char; COLS as usize]> {
    let mut cells = [EMPTY_CELL; COLS as usize];
    let mut width = 0usize;
    for c in row.chars() {
        if let Some(run) = c.to_digit(10) {
            if run == 0 {
                return Err(XiangqiError::invalid_encoding(format!(
                    "row {index}: zero-length gap"
                )));
            }
            width += run as usize;
        } else if Piece::from_fen_char(c).is_some() {
            if width < COLS as usize {
                cells[width] = c;
            }
            width += 1;
        } else {
            return Err(XiangqiError::invalid_encoding(format!(
                "row {index}: unknown piece letter '{c}'"
            )));
        }
    }
    if width != COLS as usize {
        return Err(XiangqiError::invalid_encoding(format!(
            "row {index} has {width} columns, expected {COLS}"
        )));
    }
    Ok(cells)
}

/// Expands the board portion of an encoding into a cell grid.
pub fn parse_cells(board: &str) -> Result<Cells> {
    let rows: Vec<&str> = board.split('/').collect();
    if rows.len() != ROWS as usize {
        return Err(XiangqiError::invalid_encoding(format!(
            "expected {ROWS} rows, got {}",
            rows.len()
        )));
    }
    let mut cells = [[EMPTY_CELL; COLS as usize]; ROWS as usize];
    for (i, row) in rows.iter().enumerate() {
        cells[i] = parse_row(i, row)?;
    }
    Ok(cells)
}

/// Run-length encodes a cell grid, top row first.
fn encode_grid(cells: &Cells) -> String {
    let mut out = String::with_capacity(90);
    for (i, row) in cells.iter().enumerate() {
        if i > 0 {
            out.push('/');
        }
        let mut gap = 0u32;
        for &c in row {
            if c == EMPTY_CELL {
                gap += 1;
                continue;
            }
            if gap > 0 {
                out.push(char::from_digit(gap, 10).unwrap_or('9'));
                gap = 0;
            }
            out.push(c);
        }
        if gap > 0 {
            out.push(char::from_digit(gap, 10).unwrap_or('9'));
        }
    }
    out
}

/// Encodes a raw cell grid as supplied by a board recognizer.
///
/// The grid is read from `perspective`'s side of the table; a black-side
/// grid is rotated 180 degrees first so the result has red at the bottom.
/// Spaces and `.` are treated as empty.
pub fn encode_cells(cells: &Cells, perspective: Color) -> Result<String> {
    let mut grid = [[EMPTY_CELL; COLS as usize]; ROWS as usize];
    for (r, row) in cells.iter().enumerate() {
        for (c, &cell) in row.iter().enumerate() {
            let normalized = match cell {
                EMPTY_CELL | ' ' | '.' => EMPTY_CELL,
                other => Piece::from_fen_char(other)
                    .map(Piece::fen_char)
                    .ok_or_else(|| {
                        XiangqiError::invalid_encoding(format!(
                            "cell ({r}, {c}): unknown piece letter '{other}'"
                        ))
                    })?,
            };
            match perspective {
                Color::Red => grid[r][c] = normalized,
                Color::Black => {
                    grid[ROWS as usize - 1 - r][COLS as usize - 1 - c] = normalized
                }
            }
        }
    }
    Ok(encode_grid(&grid))
}

/// Maps a text cell to an internal square.
fn cell_position(text_row: usize, col: usize, red_at_top: bool) -> Option<Position> {
    let standard = Position::new(col as u8, (ROWS as usize - 1 - text_row) as u8)?;
    Some(if red_at_top { standard.rotated() } else { standard })
}

/// Red sits at the top when its general is found in the upper five text rows.
/// Without a red general, the black general decides.
fn detect_red_at_top(cells: &Cells) -> bool {
    let find = |letter: char| {
        cells
            .iter()
            .position(|row| row.iter().any(|&c| c == letter))
    };
    match (find('K'), find('k')) {
        (Some(row), _) => row < 5,
        (None, Some(row)) => row >= 5,
        (None, None) => false,
    }
}

/// Parses a full encoding into a board.
pub fn parse_fen(text: &str) -> Result<Board> {
    let (board_part, side) = split_side(text)?;
    let cells = parse_cells(board_part)?;
    let red_at_top = detect_red_at_top(&cells);

    let mut board = Board::empty(side);
    board.set_red_at_top(red_at_top);
    for (r, row) in cells.iter().enumerate() {
        for (c, &cell) in row.iter().enumerate() {
            if cell == EMPTY_CELL {
                continue;
            }
            let piece = Piece::from_fen_char(cell)
                .ok_or_else(|| XiangqiError::invalid_encoding(format!("unknown piece letter '{cell}'")))?;
            let pos = cell_position(r, c, red_at_top)
                .ok_or_else(|| XiangqiError::invalid_encoding("cell outside the board"))?;
            board.place(pos, Some(piece));
        }
    }
    Ok(board)
}

/// Cell grid of the board in text order, honouring `red_at_top`.
pub fn board_cells(board: &Board, red_at_top: bool) -> Cells {
    let mut cells = [[EMPTY_CELL; COLS as usize]; ROWS as usize];
    for (pos, piece) in board.pieces() {
        let shown = if red_at_top { pos.rotated() } else { pos };
        let text_row = ROWS as usize - 1 - shown.row() as usize;
        cells[text_row][shown.col() as usize] = piece.fen_char();
    }
    cells
}

/// Board portion in the orientation the board was created with.
pub fn encode_board(board: &Board) -> String {
    encode_grid(&board_cells(board, board.red_at_top()))
}

/// Board portion with red at the bottom, as engines expect.
pub fn encode_canonical(board: &Board) -> String {
    encode_grid(&board_cells(board, false))
}

/// Full encoding including the side token.
pub fn encode_fen(board: &Board) -> String {
    format!("{} {}", encode_board(board), board.turn().side_token())
}
