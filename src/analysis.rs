//! Position analysis.
//!
//! Looks the position up in the cloud book first when one is configured and
//! otherwise asks the engine session for the best move. The answer carries
//! its algebraic notation and score, ready to hand to callers that serialize
//! it.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::board::{Board, Color};
use crate::cloud::{cloud_moves, CloudBook};
use crate::engine::{EngineSession, MoveSource};
use crate::error::Result;
use crate::movegen::safe_moves;
use crate::protocol::coords;
use crate::protocol::fen::{encode_cells, parse_fen, Cells};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// Encoding sent to the engine, red at the bottom, with side token.
    pub fen: String,
    pub side: Color,
    /// Coordinate move, or the fallback move.
    #[serde(rename = "move")]
    pub mv: String,
    /// Algebraic notation of `mv`; absent for fallback answers.
    pub notation: Option<String>,
    /// Centipawns from the side to move; mate in n is n * 1000.
    pub score: i32,
    /// Winning chance in percent, known only for cloud answers.
    pub win_rate: Option<f64>,
    pub evaluation: Option<String>,
    pub source: MoveSource,
}

/// Analyzes a full encoding. Fails only when the encoding is malformed.
pub fn analyze(
    session: &EngineSession,
    cloud: Option<&dyn CloudBook>,
    encoding: &str,
) -> Result<Analysis> {
    let board = parse_fen(encoding)?;
    Ok(analyze_board(session, cloud, &board))
}

/// Analyzes a recognized cell grid seen from `perspective`, with `side` to
/// move.
pub fn analyze_cells(
    session: &EngineSession,
    cloud: Option<&dyn CloudBook>,
    cells: &Cells,
    perspective: Color,
    side: Color,
) -> Result<Analysis> {
    let encoding = format!("{} {}", encode_cells(cells, perspective)?, side.side_token());
    analyze(session, cloud, &encoding)
}

pub fn analyze_board(
    session: &EngineSession,
    cloud: Option<&dyn CloudBook>,
    board: &Board,
) -> Analysis {
    if let Some(found) = cloud.and_then(|book| from_cloud(book, board)) {
        return found;
    }

    let best = session.get_best_move(&board.to_canonical_fen(), board.turn());
    let notation = match best.source {
        MoveSource::Fallback => None,
        _ => match board.describe_coordinate_move(&best.mv) {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(mv = %best.mv, error = %e, "cannot render engine move");
                None
            }
        },
    };
    Analysis {
        fen: best.position,
        side: board.turn(),
        mv: best.mv,
        notation,
        score: best.score.unwrap_or(0),
        win_rate: None,
        evaluation: best.evaluation,
        source: best.source,
    }
}

/// The best cloud move that is legal here, if the book knows the position.
fn from_cloud(book: &dyn CloudBook, board: &Board) -> Option<Analysis> {
    let side = board.turn();
    let fen = format!("{} {}", board.to_canonical_fen(), side.side_token());
    let legal = safe_moves(board, side);

    for candidate in cloud_moves(book, &fen) {
        let Ok(squares) = coords::parse_move(&candidate.mv) else {
            continue;
        };
        if !legal.contains(&squares) {
            debug!(mv = %candidate.mv, "cloud move is not legal here");
            continue;
        }
        let Ok(notation) = board.describe_coordinate_move(&candidate.mv) else {
            continue;
        };
        info!(mv = %candidate.mv, score = candidate.score, win_rate = candidate.win_rate, "cloud move");
        return Some(Analysis {
            fen,
            side,
            mv: candidate.mv,
            notation: Some(notation),
            score: candidate.score,
            win_rate: Some(candidate.win_rate),
            evaluation: Some(candidate.note),
            source: MoveSource::Cloud,
        });
    }
    None
}
