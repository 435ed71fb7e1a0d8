//! Persistence collaborators.
//!
//! The repository reports game lifecycle changes and every recorded move to
//! a [`GameSink`]. Sink failures are logged by the caller and never undo the
//! in-memory change.

use std::io::Write;

use parking_lot::Mutex;
use serde::Serialize;

use super::play::GameSnapshot;
use super::record::MoveRecord;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink encoding: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),
}

pub trait GameSink: Send + Sync {
    fn game_created(&self, game: &GameSnapshot) -> Result<(), SinkError>;
    fn game_updated(&self, game: &GameSnapshot) -> Result<(), SinkError>;
    fn move_recorded(&self, game_id: &str, record: &MoveRecord) -> Result<(), SinkError>;
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl GameSink for NullSink {
    fn game_created(&self, _game: &GameSnapshot) -> Result<(), SinkError> {
        Ok(())
    }

    fn game_updated(&self, _game: &GameSnapshot) -> Result<(), SinkError> {
        Ok(())
    }

    fn move_recorded(&self, _game_id: &str, _record: &MoveRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// An event as seen by a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent {
    GameCreated(GameSnapshot),
    GameUpdated(GameSnapshot),
    MoveRecorded { game_id: String, record: MoveRecord },
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Recorded moves of one game, in order.
    pub fn moves_of(&self, game_id: &str) -> Vec<MoveRecord> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::MoveRecorded { game_id: id, record } if id == game_id => {
                    Some(record.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl GameSink for MemorySink {
    fn game_created(&self, game: &GameSnapshot) -> Result<(), SinkError> {
        self.events.lock().push(SinkEvent::GameCreated(game.clone()));
        Ok(())
    }

    fn game_updated(&self, game: &GameSnapshot) -> Result<(), SinkError> {
        self.events.lock().push(SinkEvent::GameUpdated(game.clone()));
        Ok(())
    }

    fn move_recorded(&self, game_id: &str, record: &MoveRecord) -> Result<(), SinkError> {
        self.events.lock().push(SinkEvent::MoveRecorded {
            game_id: game_id.to_string(),
            record: record.clone(),
        });
        Ok(())
    }
}

/// Writes each event as one JSON line.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        JsonLinesSink {
            out: Mutex::new(out),
        }
    }

    fn write(&self, event: &SinkEvent) -> Result<(), SinkError> {
        let mut out = self.out.lock();
        serde_json::to_writer(&mut *out, event)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> GameSink for JsonLinesSink<W> {
    fn game_created(&self, game: &GameSnapshot) -> Result<(), SinkError> {
        self.write(&SinkEvent::GameCreated(game.clone()))
    }

    fn game_updated(&self, game: &GameSnapshot) -> Result<(), SinkError> {
        self.write(&SinkEvent::GameUpdated(game.clone()))
    }

    fn move_recorded(&self, game_id: &str, record: &MoveRecord) -> Result<(), SinkError> {
        self.write(&SinkEvent::MoveRecorded {
            game_id: game_id.to_string(),
            record: record.clone(),
        })
    }
}
