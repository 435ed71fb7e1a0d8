//! Integration tests for the console binary and the engine session.
//!
//! The session tests drive `xq-stub-engine` as a real child process; its
//! failure flags stand in for an engine that never gets ready or never
//! finishes a search.

use std::io::{BufRead, Write};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use xiangqi_bridge::analysis::analyze;
use xiangqi_bridge::board::{Board, Color};
use xiangqi_bridge::engine::{EngineConfig, EngineSession, MoveSource, SessionState, FALLBACK_MOVE};
use xiangqi_bridge::game::{Game, Player};
use xiangqi_bridge::movegen::safe_moves;
use xiangqi_bridge::protocol::coords;
use xiangqi_bridge::protocol::fen::START_BOARD;

const STUB: &str = env!("CARGO_BIN_EXE_xq-stub-engine");

/// Runs the console with `args`, feeds it `commands` and collects stdout.
fn run_console(args: &[&str], commands: &[&str]) -> Vec<String> {
    let exe = env!("CARGO_BIN_EXE_xiangqi");
    let mut child = Command::new(exe)
        .args(args)
        .env_remove("XIANGQI_ENGINE")
        .env_remove("XIANGQI_PARAMS")
        .env_remove("XIANGQI_CLOUD")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start xiangqi");

    let mut stdin = child.stdin.take().unwrap();
    let stdout = child.stdout.take().unwrap();
    let reader = std::io::BufReader::new(stdout);

    for cmd in commands {
        writeln!(stdin, "{}", cmd).unwrap();
    }
    stdin.flush().unwrap();
    drop(stdin);

    let lines: Vec<String> = reader.lines().map(|l| l.unwrap()).collect();
    let status = child.wait().expect("failed to wait on child");
    assert!(status.success());
    lines
}

fn stub_config(args: &[&str]) -> EngineConfig {
    let mut config = EngineConfig::new(STUB).with_args(args.iter().copied());
    config.ready_timeout = Duration::from_millis(500);
    config.analysis_timeout = Duration::from_millis(600);
    config.stop_grace = Duration::from_millis(200);
    config
}

/// Scheduling slack on top of the analysis budget.
const SLACK: Duration = Duration::from_millis(300);

fn legal_from_start(mv: &str, side: Color) -> bool {
    let mut board = Board::new();
    board.set_turn(side);
    let (from, to) = coords::parse_move(mv).unwrap();
    safe_moves(&board, side).contains(&(from, to))
}

// ---------------------------------------------------------------------------
// Engine session
// ---------------------------------------------------------------------------

#[test]
fn session_handshake_and_best_move() {
    let session = EngineSession::spawn(stub_config(&[]));
    assert_eq!(session.state(), SessionState::Ready);

    let answer = session.get_best_move(START_BOARD, Color::Red);
    assert_eq!(answer.source, MoveSource::Engine);
    assert!(legal_from_start(&answer.mv, Color::Red), "{}", answer.mv);
    assert_eq!(answer.position, format!("{START_BOARD} w"));
    assert!(answer.evaluation.unwrap().contains("score cp 0"));
    assert_eq!(answer.score, Some(0));
    assert_eq!(session.state(), SessionState::Ready);

    let answer = session.get_best_move(START_BOARD, Color::Black);
    assert_eq!(answer.source, MoveSource::Engine);
    assert!(legal_from_start(&answer.mv, Color::Black), "{}", answer.mv);
    assert!(!session.last_analysis_lines().is_empty());
}

#[test]
fn session_without_legal_moves_falls_back_but_stays_ready() {
    let session = EngineSession::spawn(stub_config(&[]));
    let answer = session.get_best_move("R3k4/R8/9/9/9/9/9/9/9/3K5", Color::Black);
    assert_eq!(answer.mv, FALLBACK_MOVE);
    assert_eq!(answer.source, MoveSource::Fallback);
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn silent_engine_degrades_at_startup() {
    let session = EngineSession::spawn(stub_config(&["--silent"]));
    assert_eq!(session.state(), SessionState::Degraded);
    assert!(session.degraded_reason().unwrap().contains("readyok"));
    assert_eq!(
        session.get_best_move(START_BOARD, Color::Red).mv,
        FALLBACK_MOVE
    );
}

#[test]
fn stalled_search_times_out_and_recovers() {
    let session = EngineSession::spawn(stub_config(&["--stall"]));
    assert_eq!(session.state(), SessionState::Ready);

    let started = Instant::now();
    let answer = session.get_best_move(START_BOARD, Color::Red);
    let elapsed = started.elapsed();
    assert_eq!(answer.mv, FALLBACK_MOVE);
    assert_eq!(answer.source, MoveSource::Fallback);
    // The search gets the budget minus the stop grace.
    assert!(elapsed >= Duration::from_millis(400), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(600) + SLACK, "{elapsed:?}");
    // The stub answers `stop`, so the session is usable again.
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn hung_search_degrades_the_session() {
    let session = EngineSession::spawn(stub_config(&["--hang"]));
    let started = Instant::now();
    let answer = session.get_best_move(START_BOARD, Color::Black);
    let elapsed = started.elapsed();
    assert_eq!(answer.mv, FALLBACK_MOVE);
    // Waiting out the ignored `stop` stays inside the same budget.
    assert!(elapsed >= Duration::from_millis(600), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(600) + SLACK, "{elapsed:?}");
    assert_eq!(session.state(), SessionState::Degraded);
    assert!(!session.is_available());

    let again = session.get_best_move(START_BOARD, Color::Black);
    assert_eq!(again.source, MoveSource::Fallback);
}

#[test]
fn close_terminates_and_is_idempotent() {
    let session = EngineSession::spawn(stub_config(&[]));
    session.close();
    session.close();
    assert_eq!(session.state(), SessionState::Terminated);
    assert_eq!(
        session.get_best_move(START_BOARD, Color::Red).source,
        MoveSource::Fallback
    );
}

#[test]
fn analysis_renders_engine_move() {
    let session = EngineSession::spawn(stub_config(&[]));
    let result = analyze(&session, None, &format!("{START_BOARD} w")).unwrap();
    assert_eq!(result.source, MoveSource::Engine);
    let notation = result.notation.unwrap();
    let board = Board::new();
    assert_eq!(board.describe_coordinate_move(&result.mv).unwrap(), notation);
    assert_eq!(result.score, 0);
}

#[test]
fn game_suggests_without_playing() {
    let session = Arc::new(EngineSession::spawn(stub_config(&[])));
    let mut game = Game::new("g", Player::new(1, "a"), Player::new(2, "b")).with_engine(session);
    game.start().unwrap();
    game.make_coordinate_move("h2e2").unwrap();

    let suggestion = game.suggest_move().unwrap();
    assert_eq!(suggestion.side, Color::Black);
    assert_eq!(suggestion.source, MoveSource::Engine);
    assert_eq!(game.moves().len(), 1);
    game.make_coordinate_move(&suggestion.mv).unwrap();
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

#[test]
fn console_plays_notation_and_coordinates() {
    let lines = run_console(
        &["--no-engine"],
        &["notation 炮二平五", "mv h7e7", "state", "quit"],
    );
    assert!(lines.iter().any(|l| l == "red 炮二平五 (7, 2) -> (4, 2) (h2e2)"));
    assert!(lines.iter().any(|l| l == "black 炮8平5 (7, 7) -> (4, 7) (h7e7)"));
    assert!(lines
        .iter()
        .any(|l| l == "fen: rnbakabnr/9/1c2c4/p1p1p1p1p/9/9/P1P1P1P1P/1C2C4/9/RNBAKABNR w"));
}

#[test]
fn console_reports_errors_and_keeps_going() {
    let lines = run_console(
        &["--no-engine"],
        &["dance", "mv h7e7", "pos 4 9", "quit", "pos 4 0"],
    );
    assert_eq!(lines[0], "unknown command 'dance', type 'help' for the list");
    assert!(lines[1].starts_with("error:"));
    assert_eq!(lines[2], "(4, 9): 将 (black)");
    // Nothing after quit is processed.
    assert_eq!(lines.len(), 3);
}

#[test]
fn console_best_move_offline_and_with_engine() {
    let lines = run_console(&["--no-engine"], &["best"]);
    assert_eq!(lines, vec!["bestmove a1a2 (fallback)".to_string()]);

    let lines = run_console(&["--engine", STUB], &["best"]);
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("bestmove "));
    assert!(!lines[0].contains("fallback"), "{}", lines[0]);
}

#[test]
fn console_records_moves_as_json_lines() {
    let path = std::env::temp_dir().join(format!("xq-record-{}.jsonl", std::process::id()));
    let _ = std::fs::remove_file(&path);
    run_console(
        &["--no-engine", "--record", path.to_str().unwrap()],
        &["mv h2e2", "quit"],
    );

    let text = std::fs::read_to_string(&path).unwrap();
    let events: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(events[0]["event"], "game_created");
    let recorded = events
        .iter()
        .find(|e| e["event"] == "move_recorded")
        .unwrap();
    assert_eq!(recorded["record"]["notation"], "炮二平五");
    assert_eq!(recorded["record"]["coordinate"], "h2e2");
    let _ = std::fs::remove_file(&path);
}
