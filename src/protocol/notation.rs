//! Algebraic move notation.
//!
//! A move reads as four glyphs: piece, origin file, action, target, e.g.
//! `炮二平五` or `马8进7`. Red numbers files right to left with Chinese
//! numerals, black left to right with Arabic digits. The action is `进`
//! (advance), `退` (retreat) or `平` (sideways). Horses, elephants and
//! advisors name the destination file as target; the other pieces name the
//! number of rows travelled when moving along a file.
//!
//! When two pieces of the same kind and side share a file, a `前`/`后`
//! (front/back) prefix goes before the piece and the origin file stays:
//! `前车九进一`. The shorter `前车进一` is read too, as long as only one file
//! holds a doubled pair of that piece.

use crate::board::{Board, Color, Piece, PieceKind, Position, COLS, ROWS};
use crate::error::{Result, XiangqiError};
use crate::movegen;
use crate::protocol::coords::format_move;

const RED_NUMERALS: [char; 9] = ['一', '二', '三', '四', '五', '六', '七', '八', '九'];
const BLACK_NUMERALS: [char; 9] = ['1', '2', '3', '4', '5', '6', '7', '8', '9'];

const ADVANCE: char = '进';
const RETREAT: char = '退';
const SIDEWAYS: char = '平';
const FRONT: char = '前';
const BACK: char = '后';

/// The direction of a move relative to the mover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Advance,
    Retreat,
    Sideways,
}

impl Action {
    pub const fn glyph(self) -> char {
        match self {
            Action::Advance => ADVANCE,
            Action::Retreat => RETREAT,
            Action::Sideways => SIDEWAYS,
        }
    }

    pub fn from_glyph(c: char) -> Option<Action> {
        match c {
            '进' | '進' => Some(Action::Advance),
            '退' => Some(Action::Retreat),
            '平' => Some(Action::Sideways),
            _ => None,
        }
    }
}

/// Numeral in `color`'s own system. `n` is 1-9.
fn numeral(color: Color, n: u8) -> char {
    let idx = usize::from(n.clamp(1, 9) - 1);
    match color {
        Color::Red => RED_NUMERALS[idx],
        Color::Black => BLACK_NUMERALS[idx],
    }
}

/// Parses a numeral from either system. The side is implied by the system:
/// Chinese numerals are red's, Arabic (ASCII or fullwidth) digits black's.
fn parse_numeral(c: char) -> Option<(u8, Color)> {
    if let Some(i) = RED_NUMERALS.iter().position(|&n| n == c) {
        return Some((i as u8 + 1, Color::Red));
    }
    let digit = match c {
        '1'..='9' => c as u32 - '0' as u32,
        '１'..='９' => c as u32 - '１' as u32 + 1,
        _ => return None,
    };
    Some((digit as u8, Color::Black))
}

/// File number (1-9) of a column as seen by `color`.
fn file_number(color: Color, col: u8) -> u8 {
    match color {
        Color::Red => COLS - col,
        Color::Black => col + 1,
    }
}

/// Column of a file number (1-9) as seen by `color`.
fn file_column(color: Color, file: u8) -> u8 {
    match color {
        Color::Red => COLS - file,
        Color::Black => file - 1,
    }
}

/// Whether `a` is further up the board than `b` from `color`'s side.
fn ahead_of(color: Color, a: Position, b: Position) -> bool {
    match color {
        Color::Red => a.row() > b.row(),
        Color::Black => a.row() < b.row(),
    }
}

/// Same-kind, same-side pieces on `from`'s file, excluding `from` itself.
fn file_mates(board: &Board, from: Position, piece: Piece) -> Vec<Position> {
    (0..ROWS)
        .filter_map(|row| Position::new(from.col(), row))
        .filter(|&pos| pos != from && board.piece_at(pos) == Some(piece))
        .collect()
}

/// Renders the move of the piece on `from` to `to` against the current
/// layout. Must be called before the move is applied.
pub fn render_move(board: &Board, from: Position, to: Position) -> Result<String> {
    let piece = board
        .piece_at(from)
        .ok_or(XiangqiError::NoPieceAtSource { position: from })?;
    let color = piece.color;
    let token = || format_move(from, to);

    let mates = file_mates(board, from, piece);
    let mut out = String::with_capacity(16);
    if !mates.is_empty() {
        let is_front = mates.iter().all(|&other| !ahead_of(color, other, from));
        out.push(if is_front { FRONT } else { BACK });
    }
    out.push(piece.name());
    out.push(numeral(color, file_number(color, from.col())));

    if from.row() == to.row() {
        if from.col() == to.col() {
            return Err(XiangqiError::invalid_move(&token(), "source equals destination"));
        }
        if piece.kind.moves_diagonally() {
            return Err(XiangqiError::invalid_move(&token(), "piece cannot move sideways"));
        }
        out.push(SIDEWAYS);
        out.push(numeral(color, file_number(color, to.col())));
        return Ok(out);
    }

    let action = if ahead_of(color, to, from) {
        Action::Advance
    } else {
        Action::Retreat
    };
    out.push(action.glyph());

    if piece.kind.moves_diagonally() {
        if from.col() == to.col() {
            return Err(XiangqiError::invalid_move(&token(), "piece must change file"));
        }
        out.push(numeral(color, file_number(color, to.col())));
    } else {
        if from.col() != to.col() {
            return Err(XiangqiError::invalid_move(&token(), "piece must stay on its file"));
        }
        out.push(numeral(color, from.row().abs_diff(to.row())));
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rank {
    Front,
    Back,
}

/// Where the moving piece starts, as written in the notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Column(u8),
    /// One of a doubled pair, on the given column when the file is written.
    Stacked(Rank, Option<u8>),
}

/// The notation split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Parsed {
    piece: Piece,
    origin: Origin,
    action: Action,
    target: u8,
}

fn tokenize(text: &str) -> Result<Parsed> {
    let chars: Vec<char> = text.trim().chars().collect();
    let rank = match chars.first() {
        Some(&FRONT) => Some(Rank::Front),
        Some(&BACK) | Some(&'後') => Some(Rank::Back),
        _ => None,
    };
    // Piece, file, action, target; a rank prefix may stand in for the file
    // or go in front of the whole thing.
    let (body, with_file) = match (rank, chars.len()) {
        (None, 4) => (&chars[..], true),
        (Some(_), 4) => (&chars[1..], false),
        (Some(_), 5) => (&chars[1..], true),
        (_, n) => {
            let expected = if rank.is_some() { "4 or 5" } else { "4" };
            return Err(XiangqiError::invalid_move(
                text,
                format!("expected {expected} glyphs, got {n}"),
            ));
        }
    };

    let name = body[0];
    let (kind, named_color) = PieceKind::from_name(name)
        .ok_or_else(|| XiangqiError::invalid_move(text, format!("unknown piece '{name}'")))?;

    let rest = if with_file { &body[2..] } else { &body[1..] };
    let action = Action::from_glyph(rest[0])
        .ok_or_else(|| XiangqiError::invalid_move(text, format!("unknown action '{}'", rest[0])))?;
    let (target, target_color) = parse_numeral(rest[1])
        .ok_or_else(|| XiangqiError::invalid_move(text, format!("bad numeral '{}'", rest[1])))?;

    let file = if with_file {
        let (file, file_color) = parse_numeral(body[1])
            .ok_or_else(|| XiangqiError::invalid_move(text, format!("bad file '{}'", body[1])))?;
        Some((file, file_color))
    } else {
        None
    };

    let color = named_color
        .or(file.map(|(_, c)| c))
        .unwrap_or(target_color);
    let column = file.map(|(file, _)| file_column(color, file));
    let origin = match (rank, column) {
        (Some(rank), column) => Origin::Stacked(rank, column),
        (None, Some(col)) => Origin::Column(col),
        (None, None) => return Err(XiangqiError::invalid_move(text, "missing origin file")),
    };

    Ok(Parsed {
        piece: Piece::new(kind, color),
        origin,
        action,
        target,
    })
}

/// Applies the action and target to a known origin square.
fn destination(text: &str, parsed: &Parsed, from: Position) -> Result<Position> {
    let color = parsed.piece.color;
    let kind = parsed.piece.kind;
    let off_board = || XiangqiError::invalid_move(text, "destination is off the board");

    if parsed.action == Action::Sideways {
        if kind.moves_diagonally() {
            return Err(XiangqiError::invalid_move(text, "piece cannot move sideways"));
        }
        return Position::new(file_column(color, parsed.target), from.row()).ok_or_else(off_board);
    }

    let sign = match parsed.action {
        Action::Advance => i32::from(color.forward()),
        _ => -i32::from(color.forward()),
    };

    if !kind.moves_diagonally() {
        return from
            .offset(0, sign * i32::from(parsed.target))
            .ok_or_else(off_board);
    }

    let to_col = file_column(color, parsed.target);
    let dc = to_col.abs_diff(from.col());
    let dr = match (kind, dc) {
        (PieceKind::Horse, 1) => 2,
        (PieceKind::Horse, 2) => 1,
        (PieceKind::Elephant, 2) => 2,
        (PieceKind::Advisor, 1) => 1,
        _ => {
            return Err(XiangqiError::invalid_move(
                text,
                format!("{} cannot reach that file", parsed.piece.name()),
            ))
        }
    };
    Position::from_signed(i32::from(to_col), i32::from(from.row()) + sign * dr).ok_or_else(off_board)
}

/// Home row used when no board is available to locate the piece.
fn home_row(piece: Piece) -> u8 {
    let red_row = match piece.kind {
        PieceKind::Soldier => 3,
        PieceKind::Cannon => 2,
        _ => 0,
    };
    match piece.color {
        Color::Red => red_row,
        Color::Black => ROWS - 1 - red_row,
    }
}

/// Parses notation without a board, assuming the piece still stands on its
/// starting row. Front/back forms need a board and are rejected here; use
/// [`resolve`] for positions after the opening.
pub fn parse_notation(text: &str) -> Result<(Position, Position)> {
    let parsed = tokenize(text)?;
    let col = match parsed.origin {
        Origin::Column(col) => col,
        Origin::Stacked(..) => {
            return Err(XiangqiError::invalid_move(
                text,
                "front/back notation needs a board",
            ))
        }
    };
    let from = Position::new(col, home_row(parsed.piece))
        .ok_or_else(|| XiangqiError::invalid_move(text, "origin is off the board"))?;
    let to = destination(text, &parsed, from)?;
    Ok((from, to))
}

/// Resolves notation against `board`: finds the moving piece, computes the
/// destination and checks that the piece can actually go there.
///
/// Front/back prefixes assume at most two such pieces share a file; with
/// three, `前` picks the most advanced and `后` the least.
pub fn resolve(board: &Board, text: &str) -> Result<(Position, Position)> {
    let parsed = tokenize(text)?;
    let piece = parsed.piece;
    let name = piece.name();

    let legal = |from: Position| -> Option<Position> {
        let to = destination(text, &parsed, from).ok()?;
        movegen::destinations(board, from).contains(&to).then_some(to)
    };

    match parsed.origin {
        Origin::Column(col) => {
            let on_file: Vec<Position> = (0..ROWS)
                .filter_map(|row| Position::new(col, row))
                .filter(|&pos| board.piece_at(pos) == Some(piece))
                .collect();
            if on_file.is_empty() {
                return Err(XiangqiError::invalid_move(
                    text,
                    format!("no {name} on that file"),
                ));
            }
            let candidates: Vec<(Position, Position)> = on_file
                .iter()
                .filter_map(|&from| legal(from).map(|to| (from, to)))
                .collect();
            match candidates.as_slice() {
                [only] => Ok(*only),
                [] => Err(XiangqiError::invalid_move(text, "illegal move")),
                _ => Err(XiangqiError::invalid_move(text, "ambiguous move")),
            }
        }
        Origin::Stacked(rank, column) => {
            let doubled_on = |col: u8| -> Vec<Position> {
                let mut on_file: Vec<Position> = (0..ROWS)
                    .filter_map(|row| Position::new(col, row))
                    .filter(|&pos| board.piece_at(pos) == Some(piece))
                    .collect();
                // Most advanced first.
                on_file.sort_by_key(|p| p.row());
                if piece.color == Color::Red {
                    on_file.reverse();
                }
                on_file
            };

            let stacked = match column {
                Some(col) => {
                    let on_file = doubled_on(col);
                    if on_file.len() < 2 {
                        return Err(XiangqiError::invalid_move(
                            text,
                            format!("no two {name} share that file"),
                        ));
                    }
                    on_file
                }
                None => {
                    let mut doubled = (0..COLS).map(&doubled_on).filter(|f| f.len() >= 2);
                    let first = doubled.next().ok_or_else(|| {
                        XiangqiError::invalid_move(text, format!("no two {name} share a file"))
                    })?;
                    if doubled.next().is_some() {
                        return Err(XiangqiError::invalid_move(
                            text,
                            format!("{name} doubled on more than one file, name the file"),
                        ));
                    }
                    first
                }
            };

            let from = match rank {
                Rank::Front => stacked.first(),
                Rank::Back => stacked.last(),
            }
            .copied()
            .ok_or_else(|| XiangqiError::invalid_move(text, "no piece to move"))?;
            let to = legal(from).ok_or_else(|| XiangqiError::invalid_move(text, "illegal move"))?;
            Ok((from, to))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(col: u8, row: u8) -> Position {
        Position::new(col, row).unwrap()
    }

    fn render(board: &Board, mv: &str) -> String {
        let (from, to) = crate::protocol::coords::parse_move(mv).unwrap();
        render_move(board, from, to).unwrap()
    }

    #[test]
    fn render_opening_moves() {
        let board = Board::new();
        assert_eq!(render_move(&board, sq(7, 2), sq(4, 2)).unwrap(), "炮二平五");
        assert_eq!(render_move(&board, sq(7, 7), sq(4, 7)).unwrap(), "炮8平5");
        assert_eq!(render_move(&board, sq(7, 9), sq(6, 7)).unwrap(), "马8进7");
        assert_eq!(render_move(&board, sq(6, 0), sq(8, 2)).unwrap(), "相三进一");
        assert_eq!(render_move(&board, sq(8, 9), sq(8, 8)).unwrap(), "车9进1");
        assert_eq!(render(&board, "e3e4"), "兵五进一");
        assert_eq!(render(&board, "d0e1"), "仕六进五");
        assert_eq!(render(&board, "e9e8"), "将5进1");
    }

    #[test]
    fn render_retreat() {
        let board = Board::from_fen("4k4/9/9/9/9/9/9/2N6/9/4K4 w").unwrap();
        // Horse c2 back to b0.
        assert_eq!(render(&board, "c2b0"), "马七退八");
    }

    #[test]
    fn render_front_and_back() {
        let board = Board::from_fen("4k4/9/9/9/9/R8/9/R8/9/4K4 w").unwrap();
        assert_eq!(render(&board, "a4a5"), "前车九进一");
        assert_eq!(render(&board, "a2a3"), "后车九进一");
        assert_eq!(render(&board, "a2b2"), "后车九平八");

        // Black's front piece is the one with the lower row.
        let board = Board::from_fen("4k4/9/r8/9/r8/9/9/9/9/4K4 b").unwrap();
        assert_eq!(render(&board, "a5a4"), "前车1进1");
        assert_eq!(render(&board, "a7a8"), "后车1退1");
    }

    #[test]
    fn render_rejects_inconsistent_moves() {
        let board = Board::new();
        assert!(render_move(&board, sq(4, 4), sq(4, 5)).is_err());
        assert!(render_move(&board, sq(0, 0), sq(1, 1)).is_err());
        assert!(render_move(&board, sq(1, 0), sq(1, 2)).is_err());
        assert!(render_move(&board, sq(0, 0), sq(0, 0)).is_err());
    }

    #[test]
    fn parse_without_board() {
        assert_eq!(parse_notation("炮二平五").unwrap(), (sq(7, 2), sq(4, 2)));
        assert_eq!(parse_notation("马8进7").unwrap(), (sq(7, 9), sq(6, 7)));
        assert_eq!(parse_notation("相三进一").unwrap(), (sq(6, 0), sq(8, 2)));
        assert_eq!(parse_notation("车9进1").unwrap(), (sq(8, 9), sq(8, 8)));
        assert_eq!(parse_notation("兵七进一").unwrap(), (sq(2, 3), sq(2, 4)));
        assert_eq!(parse_notation("马二进三").unwrap(), (sq(7, 0), sq(6, 2)));
        assert_eq!(parse_notation("士4进5").unwrap(), (sq(3, 9), sq(4, 8)));
    }

    #[test]
    fn parse_accepts_either_numeral_system_and_traditional_glyphs() {
        assert_eq!(parse_notation("砲2平5").unwrap(), (sq(1, 7), sq(4, 7)));
        assert_eq!(parse_notation("帥五進一").unwrap(), (sq(4, 0), sq(4, 1)));
        // The glyph fixes the side; the numerals are read by value.
        assert_eq!(parse_notation("兵3进1").unwrap(), (sq(6, 3), sq(6, 4)));
        assert_eq!(parse_notation("卒３进１").unwrap(), (sq(2, 6), sq(2, 5)));
    }

    #[test]
    fn parse_rejects_malformed_text() {
        for bad in ["", "炮二平", "炮二平五五", "X二平五", "炮二走五", "炮二平x", "马二平三", "相三进二"] {
            let err = parse_notation(bad).unwrap_err();
            assert!(
                matches!(err, XiangqiError::InvalidMoveFormat { ref token, .. } if token == bad),
                "{bad}: {err}"
            );
        }
        assert!(parse_notation("前车进一").is_err());
        assert!(parse_notation("前车九进一").is_err());
        // A file without the rank prefix is one glyph too many.
        assert!(parse_notation("车九九进一").is_err());
    }

    #[test]
    fn resolve_on_board() {
        let mut board = Board::new();
        board.apply_move(sq(7, 2), sq(4, 2)).unwrap();
        board.apply_move(sq(7, 7), sq(4, 7)).unwrap();
        // Cannon now on file five, not its home row.
        assert_eq!(resolve(&board, "炮五进四").unwrap(), (sq(4, 2), sq(4, 6)));
        assert!(resolve(&board, "炮二进四").is_err());
    }

    #[test]
    fn resolve_front_and_back() {
        let board = Board::from_fen("4k4/9/9/9/9/R8/9/R8/9/4K4 w").unwrap();
        assert_eq!(resolve(&board, "前车九进一").unwrap(), (sq(0, 4), sq(0, 5)));
        assert_eq!(resolve(&board, "后车九进一").unwrap(), (sq(0, 2), sq(0, 3)));
        assert_eq!(resolve(&board, "后車九退二").unwrap(), (sq(0, 2), sq(0, 0)));
        // The back chariot cannot pass the front one.
        assert!(resolve(&board, "后车九进三").is_err());
        // The short form still reads when only one file is doubled.
        assert_eq!(resolve(&board, "前车进一").unwrap(), (sq(0, 4), sq(0, 5)));
        assert_eq!(resolve(&board, "後车进一").unwrap(), (sq(0, 2), sq(0, 3)));
        // Naming a file without a doubled pair.
        assert!(resolve(&board, "前车八进一").is_err());
    }

    /// Two soldier pairs, one on file nine and one on file seven.
    const TWO_SOLDIER_FILES: &str = "4k4/9/9/P1P6/P1P6/9/9/9/9/4K4 w";

    #[test]
    fn doubled_soldier_files_render_apart() {
        let board = Board::from_fen(TWO_SOLDIER_FILES).unwrap();
        let front_nine = render(&board, "a6a7");
        let front_seven = render(&board, "c6c7");
        assert_eq!(front_nine, "前兵九进一");
        assert_eq!(front_seven, "前兵七进一");
        assert_eq!(render(&board, "a5b5"), "后兵九平八");
        assert_eq!(render(&board, "c5d5"), "后兵七平六");

        for mv in ["a6a7", "c6c7", "a5b5", "c5d5", "a6b6", "c6b6"] {
            let (from, to) = crate::protocol::coords::parse_move(mv).unwrap();
            let text = render_move(&board, from, to).unwrap();
            assert_eq!(resolve(&board, &text).unwrap(), (from, to), "{mv} {text}");
        }
    }

    #[test]
    fn short_form_is_ambiguous_with_two_doubled_files() {
        let board = Board::from_fen(TWO_SOLDIER_FILES).unwrap();
        let err = resolve(&board, "前兵进一").unwrap_err();
        assert!(err.to_string().contains("more than one file"), "{err}");
    }

    #[test]
    fn three_on_a_file_reads_front_as_most_advanced() {
        // Red soldiers on rows 5, 6 and 7 of file nine.
        let board = Board::from_fen("4k4/9/P8/P8/P8/9/9/9/9/4K4 w").unwrap();
        assert_eq!(render(&board, "a7a8"), "前兵九进一");
        assert_eq!(render(&board, "a5b5"), "后兵九平八");
        assert_eq!(resolve(&board, "前兵九进一").unwrap(), (sq(0, 7), sq(0, 8)));
        assert_eq!(resolve(&board, "后兵九平八").unwrap(), (sq(0, 5), sq(1, 5)));
        // Only two ranks exist, so the middle soldier renders as a back piece
        // yet resolves to the rearmost one.
        assert_eq!(render(&board, "a6b6"), "后兵九平八");
        assert_ne!(resolve(&board, "后兵九平八").unwrap(), (sq(0, 6), sq(1, 6)));
    }

    #[test]
    fn resolve_rejects_illegal_destination() {
        let board = Board::new();
        assert!(resolve(&board, "车一进三").is_err());
        assert!(resolve(&board, "马二进四").is_err());
    }

    #[test]
    fn render_and_resolve_agree_from_start() {
        let board = Board::new();
        for color in [Color::Red, Color::Black] {
            for (from, to) in movegen::all_moves(&board, color) {
                let text = render_move(&board, from, to).unwrap();
                assert_eq!(resolve(&board, &text).unwrap(), (from, to), "{text}");
            }
        }
    }
}
