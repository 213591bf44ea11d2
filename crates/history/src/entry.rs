//! History entries and their payloads.
//!
//! An entry records one undoable unit of work. Its payload is either a pair
//! of opaque data blobs the caller replays itself, or an executable command
//! the engine invokes directly. The two authoring styles share one entry type
//! behind a tagged enum; the engine never inspects data payload contents.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::command::Command;

/// Unique identifier of a history entry, assigned at record time.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier shared by all entries recorded inside one compound group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Well-known action kinds emitted by the engine itself.
pub mod kinds {
    /// Bookkeeping marker opening a compound group.
    pub const COMPOUND_START: &str = "compound:start";
    /// Bookkeeping marker closing a compound group.
    pub const COMPOUND_END: &str = "compound:end";
    /// Kind assigned to command-mode entries.
    pub const COMMAND: &str = "command";
}

/// What an entry carries: caller-replayed data, or an engine-invoked command.
pub enum EntryPayload {
    /// Opaque blobs the caller interprets to apply the inverse/forward effect.
    Data { undo: Value, redo: Value },
    /// Executable forward/backward operations over caller-owned state.
    Command(Box<dyn Command>),
}

impl fmt::Debug for EntryPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data { undo, redo } => f
                .debug_struct("Data")
                .field("undo", undo)
                .field("redo", redo)
                .finish(),
            Self::Command(_) => f.write_str("Command"),
        }
    }
}

/// A single entry in the undo/redo history.
///
/// Entries are immutable once recorded; undo/redo only move the cursor.
#[derive(Debug)]
pub struct HistoryEntry {
    /// Unique identifier, assigned at record time.
    pub id: EntryId,
    /// Category of edit (e.g. "clip:add", "clip:resize").
    pub kind: String,
    /// Human-readable label shown in undo/redo menus.
    pub description: String,
    /// When this entry was created.
    pub timestamp: SystemTime,
    /// Editing surface the entry came from (informational only).
    pub scope: String,
    /// Set when the entry was recorded inside a compound group.
    pub group_id: Option<GroupId>,
    /// The undoable content.
    pub payload: EntryPayload,
}

impl HistoryEntry {
    /// The undo/redo data blobs, or `None` for a command entry.
    pub fn data_payloads(&self) -> Option<(&Value, &Value)> {
        match &self.payload {
            EntryPayload::Data { undo, redo } => Some((undo, redo)),
            EntryPayload::Command(_) => None,
        }
    }

    /// Whether this entry carries an executable command.
    pub fn is_command(&self) -> bool {
        matches!(self.payload, EntryPayload::Command(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data_entry(id: u64) -> HistoryEntry {
        HistoryEntry {
            id: EntryId(id),
            kind: "clip:add".to_string(),
            description: "Add clip".to_string(),
            timestamp: SystemTime::now(),
            scope: "timeline".to_string(),
            group_id: None,
            payload: EntryPayload::Data {
                undo: json!({"clip": "c1"}),
                redo: json!({"clip": "c1", "track": "t1"}),
            },
        }
    }

    #[test]
    fn data_payloads_accessor() {
        let entry = data_entry(1);
        assert!(!entry.is_command());
        let (undo, redo) = entry.data_payloads().unwrap();
        assert_eq!(undo["clip"], "c1");
        assert_eq!(redo["track"], "t1");
    }

    #[test]
    fn command_entry_has_no_data_payloads() {
        let entry = HistoryEntry {
            payload: EntryPayload::Command(Box::new(crate::command::FnCommand::new(
                || {},
                || {},
            ))),
            kind: kinds::COMMAND.to_string(),
            ..data_entry(2)
        };
        assert!(entry.is_command());
        assert!(entry.data_payloads().is_none());
    }

    #[test]
    fn ids_are_ordered() {
        assert!(EntryId(1) < EntryId(2));
        assert_eq!(EntryId(3).to_string(), "3");
        assert_eq!(GroupId(7).to_string(), "7");
    }
}
