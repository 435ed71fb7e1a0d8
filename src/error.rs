//! Crate-wide error type.
//!
//! Board-rule violations and malformed input are returned to the caller.
//! Engine failures use the same enum internally but are turned into a
//! fallback move by the session before they reach callers.

use std::time::Duration;

use crate::board::{Color, Position};

/// Errors raised by the board, the codecs and the engine session.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum XiangqiError {
    #[error("invalid move '{token}': {reason}")]
    InvalidMoveFormat { token: String, reason: String },

    #[error("no piece at {position}")]
    NoPieceAtSource { position: Position },

    #[error("piece at {position} belongs to {found}, but {expected} is to move")]
    WrongSideToMove {
        position: Position,
        expected: Color,
        found: Color,
    },

    #[error("invalid position encoding: {reason}")]
    InvalidEncoding { reason: String },

    #[error("engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("cloud lookup failed: {0}")]
    Cloud(String),

    #[error("engine did not answer '{waiting_for}' within {timeout:?}")]
    EngineTimeout {
        waiting_for: &'static str,
        timeout: Duration,
    },
}

impl XiangqiError {
    pub(crate) fn invalid_move(token: &str, reason: impl Into<String>) -> Self {
        XiangqiError::InvalidMoveFormat {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_encoding(reason: impl Into<String>) -> Self {
        XiangqiError::InvalidEncoding {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, XiangqiError>;
