//! UCI line protocol.
//!
//! Both directions of the text protocol spoken with an analysis engine:
//! commands sent to the engine (`Command`, rendered with `Display`, parsed
//! by the stub engine) and the lines it answers with (`EngineLine`).

use std::fmt;

use tracing::debug;

/// Search constraints passed with the `go` command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoParams {
    pub movetime: Option<u64>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
    pub infinite: bool,
}

/// A command sent from the coordinator to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start the handshake; the engine answers `uciok`.
    Uci,

    /// Synchronization ping; engine must reply `readyok`.
    IsReady,

    /// `setoption name <id> [value <x>]`.
    SetOption { name: String, value: Option<String> },

    /// Forget everything about the previous game.
    NewGame,

    /// `position startpos` when `fen` is `None`, else `position fen <fen>`,
    /// optionally followed by `moves ...`.
    Position { fen: Option<String>, moves: Vec<String> },

    /// Begin searching with optional constraints.
    Go(GoParams),

    /// Interrupt the current search; the engine still answers `bestmove`.
    Stop,

    /// Terminate the engine process.
    Quit,
}

impl Command {
    /// `position` command for a full encoding (board plus side token).
    pub fn position_fen(fen: impl Into<String>) -> Command {
        Command::Position {
            fen: Some(fen.into()),
            moves: Vec::new(),
        }
    }

    pub fn position_startpos() -> Command {
        Command::Position {
            fen: None,
            moves: Vec::new(),
        }
    }
}

impl fmt::Display for GoParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("go")?;
        if let Some(depth) = self.depth {
            write!(f, " depth {depth}")?;
        }
        if let Some(movetime) = self.movetime {
            write!(f, " movetime {movetime}")?;
        }
        if let Some(nodes) = self.nodes {
            write!(f, " nodes {nodes}")?;
        }
        if self.infinite {
            f.write_str(" infinite")?;
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Uci => f.write_str("uci"),
            Command::IsReady => f.write_str("isready"),
            Command::SetOption { name, value: Some(v) } => {
                write!(f, "setoption name {name} value {v}")
            }
            Command::SetOption { name, value: None } => write!(f, "setoption name {name}"),
            Command::NewGame => f.write_str("ucinewgame"),
            Command::Position { fen, moves } => {
                match fen {
                    Some(fen) => write!(f, "position fen {fen}")?,
                    None => f.write_str("position startpos")?,
                }
                if !moves.is_empty() {
                    write!(f, " moves {}", moves.join(" "))?;
                }
                Ok(())
            }
            Command::Go(params) => fmt::Display::fmt(params, f),
            Command::Stop => f.write_str("stop"),
            Command::Quit => f.write_str("quit"),
        }
    }
}

/// Parses a single line of input into a `Command`.
///
/// Returns `None` for empty lines or unrecognized commands. Malformed
/// arguments for known commands also return `None`.
pub fn parse_command(line: &str) -> Option<Command> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let first = *tokens.first()?;

    match first {
        "uci" => Some(Command::Uci),
        "isready" => Some(Command::IsReady),
        "ucinewgame" => Some(Command::NewGame),
        "stop" => Some(Command::Stop),
        "quit" => Some(Command::Quit),
        "setoption" => parse_setoption(&tokens),
        "position" => parse_position(&tokens),
        "go" => Some(parse_go(&tokens)),
        other => {
            debug!(command = other, "ignoring unknown command");
            None
        }
    }
}

/// Parses `setoption name <id> [value <x>]`. Names may span several tokens.
fn parse_setoption(tokens: &[&str]) -> Option<Command> {
    if tokens.len() < 3 || tokens[1] != "name" {
        debug!("malformed setoption");
        return None;
    }
    let value_idx = tokens.iter().position(|&t| t == "value");
    let (name_parts, value) = match value_idx {
        Some(vi) => {
            let value = &tokens[vi + 1..];
            (&tokens[2..vi], (!value.is_empty()).then(|| value.join(" ")))
        }
        None => (&tokens[2..], None),
    };
    if name_parts.is_empty() {
        debug!("malformed setoption: empty name");
        return None;
    }
    Some(Command::SetOption {
        name: name_parts.join(" "),
        value,
    })
}

/// Parses `position startpos|fen <fields...> [moves <m>...]`.
fn parse_position(tokens: &[&str]) -> Option<Command> {
    let moves_idx = tokens.iter().position(|&t| t == "moves");
    let spec_end = moves_idx.unwrap_or(tokens.len());
    let moves = moves_idx
        .map(|i| tokens[i + 1..].iter().map(|m| m.to_string()).collect())
        .unwrap_or_default();

    match tokens.get(1).copied() {
        Some("startpos") => Some(Command::Position { fen: None, moves }),
        Some("fen") if spec_end > 2 => Some(Command::Position {
            fen: Some(tokens[2..spec_end].join(" ")),
            moves,
        }),
        _ => {
            debug!("malformed position");
            None
        }
    }
}

/// Parses `go [movetime <ms>] [depth <n>] [nodes <n>] [infinite]`.
/// Unparseable values are skipped.
fn parse_go(tokens: &[&str]) -> Command {
    let mut params = GoParams::default();
    let mut iter = tokens.iter().skip(1);
    while let Some(&token) = iter.next() {
        match token {
            "movetime" => params.movetime = iter.next().and_then(|v| v.parse().ok()),
            "depth" => params.depth = iter.next().and_then(|v| v.parse().ok()),
            "nodes" => params.nodes = iter.next().and_then(|v| v.parse().ok()),
            "infinite" => params.infinite = true,
            other => debug!(param = other, "unknown go parameter"),
        }
    }
    Command::Go(params)
}

/// Multiplier applied to mate distances when a single centipawn figure is
/// needed.
pub const MATE_SCALE: i32 = 1000;

/// An evaluation reported in an `info` line, from the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Centipawns(i32),
    Mate(i32),
}

impl Score {
    /// Collapses the score to centipawns, scaling mate distances by 1000.
    pub fn centipawns(self) -> i32 {
        match self {
            Score::Centipawns(cp) => cp,
            Score::Mate(n) => n.saturating_mul(MATE_SCALE),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Score::Centipawns(cp) => write!(f, "score cp {cp}"),
            Score::Mate(n) => write!(f, "score mate {n}"),
        }
    }
}

/// A line written by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLine {
    Id { key: String, value: String },
    UciOk,
    ReadyOk,
    Info {
        depth: Option<u32>,
        score: Option<Score>,
        pv: Vec<String>,
    },
    BestMove { mv: String, ponder: Option<String> },
    Other(String),
}

/// Finds `score cp <n>` or `score mate <n>` anywhere in a line.
pub fn parse_score(line: &str) -> Option<Score> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    tokens.windows(3).find_map(|w| match w {
        ["score", "cp", n] => n.parse().ok().map(Score::Centipawns),
        ["score", "mate", n] => n.parse().ok().map(Score::Mate),
        _ => None,
    })
}

/// Classifies a line from the engine. Unknown lines are kept verbatim.
pub fn parse_engine_line(line: &str) -> EngineLine {
    let trimmed = line.trim();
    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    match tokens.as_slice() {
        ["uciok"] => EngineLine::UciOk,
        ["readyok"] => EngineLine::ReadyOk,
        ["id", key, rest @ ..] => EngineLine::Id {
            key: key.to_string(),
            value: rest.join(" "),
        },
        ["bestmove", mv, rest @ ..] => EngineLine::BestMove {
            mv: mv.to_string(),
            ponder: match rest {
                ["ponder", p, ..] => Some(p.to_string()),
                _ => None,
            },
        },
        ["info", rest @ ..] => {
            let depth = rest
                .windows(2)
                .find(|w| w[0] == "depth")
                .and_then(|w| w[1].parse().ok());
            let pv = rest
                .iter()
                .position(|&t| t == "pv")
                .map(|i| rest[i + 1..].iter().map(|m| m.to_string()).collect())
                .unwrap_or_default();
            EngineLine::Info {
                depth,
                score: parse_score(trimmed),
                pv,
            }
        }
        _ => EngineLine::Other(trimmed.to_string()),
    }
}

impl fmt::Display for EngineLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineLine::Id { key, value } => write!(f, "id {key} {value}"),
            EngineLine::UciOk => f.write_str("uciok"),
            EngineLine::ReadyOk => f.write_str("readyok"),
            EngineLine::Info { depth, score, pv } => {
                f.write_str("info")?;
                if let Some(depth) = depth {
                    write!(f, " depth {depth}")?;
                }
                if let Some(score) = score {
                    write!(f, " {score}")?;
                }
                if !pv.is_empty() {
                    write!(f, " pv {}", pv.join(" "))?;
                }
                Ok(())
            }
            EngineLine::BestMove { mv, ponder: Some(p) } => write!(f, "bestmove {mv} ponder {p}"),
            EngineLine::BestMove { mv, ponder: None } => write!(f, "bestmove {mv}"),
            EngineLine::Other(raw) => f.write_str(raw),
        }
    }
}

/// Most recent scored line among `lines` with its score, scanning from the
/// end.
pub fn latest_score<S: AsRef<str>>(lines: &[S]) -> Option<(&str, Score)> {
    lines.iter().rev().find_map(|l| {
        let line = l.as_ref();
        parse_score(line).map(|score| (line, score))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_commands() {
        assert_eq!(parse_command("uci"), Some(Command::Uci));
        assert_eq!(parse_command("isready"), Some(Command::IsReady));
        assert_eq!(parse_command("ucinewgame"), Some(Command::NewGame));
        assert_eq!(parse_command("stop"), Some(Command::Stop));
        assert_eq!(parse_command("  quit  "), Some(Command::Quit));
    }

    #[test]
    fn parse_empty_and_unknown_lines() {
        assert_eq!(parse_command(""), None);
        assert_eq!(parse_command("\t"), None);
        assert_eq!(parse_command("foobar"), None);
    }

    #[test]
    fn parse_setoption_forms() {
        assert_eq!(
            parse_command("setoption name Threads value 2"),
            Some(Command::SetOption {
                name: "Threads".to_string(),
                value: Some("2".to_string()),
            })
        );
        assert_eq!(
            parse_command("setoption name Clear Hash"),
            Some(Command::SetOption {
                name: "Clear Hash".to_string(),
                value: None,
            })
        );
        assert_eq!(parse_command("setoption"), None);
        assert_eq!(parse_command("setoption foo"), None);
        assert_eq!(parse_command("setoption name value 3"), None);
    }

    #[test]
    fn parse_position_forms() {
        assert_eq!(
            parse_command("position startpos moves h2e2 h7e7"),
            Some(Command::Position {
                fen: None,
                moves: vec!["h2e2".to_string(), "h7e7".to_string()],
            })
        );
        let fen = "rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C2C4/9/RNBAKABNR b";
        assert_eq!(
            parse_command(&format!("position fen {fen}")),
            Some(Command::position_fen(fen))
        );
        assert_eq!(parse_command("position"), None);
        assert_eq!(parse_command("position fen"), None);
    }

    #[test]
    fn parse_go_params() {
        assert_eq!(parse_command("go"), Some(Command::Go(GoParams::default())));
        assert_eq!(
            parse_command("go depth 20 movetime 3000 nodes 5 infinite"),
            Some(Command::Go(GoParams {
                movetime: Some(3000),
                depth: Some(20),
                nodes: Some(5),
                infinite: true,
            }))
        );
        assert_eq!(
            parse_command("go depth x"),
            Some(Command::Go(GoParams::default()))
        );
    }

    #[test]
    fn commands_render_as_protocol_text() {
        assert_eq!(Command::NewGame.to_string(), "ucinewgame");
        assert_eq!(Command::position_startpos().to_string(), "position startpos");
        assert_eq!(
            Command::position_fen("9/9 w").to_string(),
            "position fen 9/9 w"
        );
        assert_eq!(
            Command::SetOption {
                name: "Hash".to_string(),
                value: Some("256".to_string())
            }
            .to_string(),
            "setoption name Hash value 256"
        );
        let go = GoParams {
            depth: Some(20),
            ..GoParams::default()
        };
        assert_eq!(Command::Go(go).to_string(), "go depth 20");
    }

    #[test]
    fn rendered_commands_parse_back() {
        let commands = [
            Command::Uci,
            Command::position_fen("rnbakabnr/9/1c5c1/p1p1p1p1p/9/9/P1P1P1P1P/1C5C1/9/RNBAKABNR w"),
            Command::Go(GoParams {
                movetime: Some(3000),
                ..GoParams::default()
            }),
        ];
        for cmd in commands {
            assert_eq!(parse_command(&cmd.to_string()), Some(cmd));
        }
    }

    #[test]
    fn classify_engine_lines() {
        assert_eq!(parse_engine_line("uciok"), EngineLine::UciOk);
        assert_eq!(parse_engine_line("readyok\r"), EngineLine::ReadyOk);
        assert_eq!(
            parse_engine_line("id name Pikafish dev"),
            EngineLine::Id {
                key: "name".to_string(),
                value: "Pikafish dev".to_string()
            }
        );
        assert_eq!(
            parse_engine_line("bestmove h2e2 ponder h9g7"),
            EngineLine::BestMove {
                mv: "h2e2".to_string(),
                ponder: Some("h9g7".to_string())
            }
        );
        assert_eq!(
            parse_engine_line("info depth 12 seldepth 18 score cp 35 nodes 1000 pv h2e2 h9g7"),
            EngineLine::Info {
                depth: Some(12),
                score: Some(Score::Centipawns(35)),
                pv: vec!["h2e2".to_string(), "h9g7".to_string()],
            }
        );
        assert_eq!(
            parse_engine_line("option name Hash type spin"),
            EngineLine::Other("option name Hash type spin".to_string())
        );
    }

    #[test]
    fn scores_and_mate_scaling() {
        assert_eq!(parse_score("info depth 3 score mate -2"), Some(Score::Mate(-2)));
        assert_eq!(Score::Mate(-2).centipawns(), -2000);
        assert_eq!(Score::Centipawns(17).centipawns(), 17);
        assert_eq!(parse_score("info depth 3 score cp"), None);
        assert_eq!(parse_score("bestmove h2e2"), None);
    }

    #[test]
    fn latest_score_scans_backwards() {
        let lines = [
            "info depth 1 score cp 10",
            "info depth 2 score mate 3",
            "info string done",
            "bestmove h2e2",
        ];
        assert_eq!(
            latest_score(&lines),
            Some(("info depth 2 score mate 3", Score::Mate(3)))
        );
        assert_eq!(latest_score::<&str>(&[]), None);
    }

    #[test]
    fn engine_lines_render_back() {
        let line = EngineLine::Info {
            depth: Some(1),
            score: Some(Score::Centipawns(-5)),
            pv: vec!["b0c2".to_string()],
        };
        assert_eq!(line.to_string(), "info depth 1 score cp -5 pv b0c2");
        assert_eq!(parse_engine_line(&line.to_string()), line);
    }
}
