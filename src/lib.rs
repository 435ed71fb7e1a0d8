//! Xiangqi board model, move rules, notation codec and analysis-engine
//! bridge.
//!
//! Exposes the board representation, move generation, position and move
//! codecs, the UCI engine session, the cloud book lookup and game
//! coordination for use by integration tests and the binary entry points.

pub mod analysis;
pub mod board;
pub mod cli;
pub mod cloud;
pub mod engine;
pub mod error;
pub mod game;
pub mod movegen;
pub mod protocol;

pub use error::{Result, XiangqiError};
