//! Cloud opening book lookup.
//!
//! The chessdb.cn `queryall` endpoint returns every known move for a
//! position as `|`-separated entries of `key:value` pairs:
//!
//! ```text
//! move:h2e2,score:1,rank:2,note:! (10-01),winrate:50.08|move:b0c2,score:0,...
//! ```
//!
//! Entries come best first. Positions the database has never seen get a bare
//! word (`unknown`, `invalid board`) instead of entries.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Url;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Result, XiangqiError};
use crate::protocol::coords;

pub const CHESSDB_URL: &str = "https://www.chessdb.cn/chessdb.php";

pub const DEFAULT_CLOUD_TIMEOUT: Duration = Duration::from_secs(10);

/// A source of `queryall` replies for canonical encodings with side token.
pub trait CloudBook: Send + Sync {
    fn query_all(&self, fen: &str) -> Result<String>;
}

/// The chessdb.cn HTTP service.
#[derive(Debug, Clone)]
pub struct ChessDb {
    client: Client,
    url: String,
}

impl ChessDb {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| XiangqiError::Cloud(e.to_string()))?;
        Ok(ChessDb {
            client,
            url: CHESSDB_URL.to_string(),
        })
    }

    /// Points the client at a mirror of the service.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

impl CloudBook for ChessDb {
    fn query_all(&self, fen: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.url,
            &[("action", "queryall"), ("learn", "1"), ("showall", "1"), ("board", fen)],
        )
        .map_err(|e| XiangqiError::Cloud(format!("bad url {}: {e}", self.url)))?;

        debug!(%url, "cloud query");
        self.client
            .get(url)
            .send()
            .and_then(|reply| reply.error_for_status())
            .and_then(|reply| reply.text())
            .map_err(|e| XiangqiError::Cloud(e.to_string()))
    }
}

/// One scored move from the cloud.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloudMove {
    #[serde(rename = "move")]
    pub mv: String,
    pub score: i32,
    pub rank: i32,
    pub note: String,
    /// Percent, two decimals.
    pub win_rate: f64,
}

/// Reads a `winrate` field. Fractions (`0.51`), percentages (`51`, `51%`)
/// and unknowns (`??`) are all seen in the wild; anything unreadable is 0.
pub fn parse_win_rate(text: &str) -> f64 {
    let Ok(value) = text.trim().trim_end_matches('%').trim().parse::<f64>() else {
        return 0.0;
    };
    let hundredths = if (0.0..=1.0).contains(&value) {
        value * 10_000.0
    } else if (0.0..=100.0).contains(&value) {
        value * 100.0
    } else {
        return 0.0;
    };
    hundredths.round() / 100.0
}

fn parse_entry(entry: &str) -> Option<CloudMove> {
    let mut mv = None;
    let mut score = None;
    let mut rank = 0;
    let mut note = String::new();
    let mut win_rate = 0.0;
    for field in entry.split(',') {
        let Some((key, value)) = field.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "move" => mv = Some(value),
            // `??` marks a move the database has not scored.
            "score" => score = Some(value.parse::<i32>().ok()?),
            "rank" => rank = value.parse().unwrap_or(0),
            "note" => note = value.to_string(),
            "winrate" => win_rate = parse_win_rate(value),
            _ => {}
        }
    }
    let mv = mv?;
    coords::parse_move(mv).ok()?;
    Some(CloudMove {
        mv: mv.to_string(),
        score: score.unwrap_or(0),
        rank,
        note,
        win_rate,
    })
}

/// Parses a `queryall` reply, best move first. Unscored entries and entries
/// without a readable coordinate move are dropped.
pub fn parse_query_all(reply: &str) -> Vec<CloudMove> {
    reply
        .trim()
        .trim_end_matches('\0')
        .split('|')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| {
            let parsed = parse_entry(entry);
            if parsed.is_none() {
                debug!(entry, "skipping cloud entry");
            }
            parsed
        })
        .collect()
}

/// Every move the cloud knows for `fen`. Lookup failures are logged and read
/// as an empty book.
pub fn cloud_moves(book: &dyn CloudBook, fen: &str) -> Vec<CloudMove> {
    match book.query_all(fen) {
        Ok(reply) => parse_query_all(&reply),
        Err(e) => {
            warn!(fen, error = %e, "cloud lookup failed");
            Vec::new()
        }
    }
}
