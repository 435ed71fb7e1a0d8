//! Game coordination.
//!
//! A [`Game`] pairs one board with an optional engine session; the
//! [`GameRepository`] owns active and finished games and reports changes to
//! a [`GameSink`].

pub mod play;
pub mod record;
pub mod repository;
pub mod sink;

pub use play::{Game, GameResult, GameSnapshot, GameStatus, Player};
pub use record::{Classification, MoveRecord};
pub use repository::GameRepository;
pub use sink::{GameSink, JsonLinesSink, MemorySink, NullSink, SinkError, SinkEvent};

use crate::error::XiangqiError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("unknown game '{0}'")]
    UnknownGame(String),

    #[error("game {id} is {status}, moves need a game in play")]
    NotPlaying { id: String, status: GameStatus },

    #[error("game {id} is {status}, only waiting games can start")]
    NotWaiting { id: String, status: GameStatus },

    #[error(transparent)]
    Rules(#[from] XiangqiError),
}
