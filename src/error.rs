//! Error type for the JSON and command-line boundary
//!
//! The simulation itself never fails; it ignores input it cannot use.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown game: {0}")]
    UnknownGame(String),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
