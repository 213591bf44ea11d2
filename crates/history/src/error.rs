//! Error types for the history engine (thiserror-based).

use thiserror::Error;

/// Errors raised by the history engine.
///
/// These indicate caller bugs (mismatched compound start/end), not runtime
/// conditions. Empty-history undo/redo is a soft `None`, never an error.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum HistoryError {
    #[error("compound group \"{description}\" is already open")]
    CompoundAlreadyOpen { description: String },

    #[error("no compound group is open")]
    CompoundNotOpen,
}

/// Convenience Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
