//! Serializable engine state.
//!
//! `EngineState` is a defensive, serde-ready copy of the entry sequence,
//! cursor, and save points. The caller owns persistence; this crate only
//! guarantees the snapshot round-trips through serde. Command entries carry
//! closures, which cannot be captured: they appear in a snapshot as a
//! closure-free `Command` record and are skipped on restore.

use std::collections::HashSet;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entry::{EntryId, EntryPayload, GroupId, HistoryEntry};

/// Serde view of an entry payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PayloadRecord {
    /// Opaque caller-supplied undo/redo blobs.
    Data { undo: Value, redo: Value },
    /// A command entry; its closures are not representable.
    Command,
}

/// Serde view of a single history entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub id: EntryId,
    pub kind: String,
    pub description: String,
    pub timestamp: SystemTime,
    pub scope: String,
    pub group_id: Option<GroupId>,
    /// Whether this entry's position was marked as matching persisted state.
    pub is_save_point: bool,
    pub payload: PayloadRecord,
}

impl EntryRecord {
    pub(crate) fn capture(entry: &HistoryEntry, is_save_point: bool) -> Self {
        let payload = match &entry.payload {
            EntryPayload::Data { undo, redo } => PayloadRecord::Data {
                undo: undo.clone(),
                redo: redo.clone(),
            },
            EntryPayload::Command(_) => PayloadRecord::Command,
        };
        Self {
            id: entry.id,
            kind: entry.kind.clone(),
            description: entry.description.clone(),
            timestamp: entry.timestamp,
            scope: entry.scope.clone(),
            group_id: entry.group_id,
            is_save_point,
            payload,
        }
    }

    /// Rebuild a live entry from this record. Command records cannot be
    /// rehydrated and yield `None`.
    pub(crate) fn into_entry(self) -> Option<HistoryEntry> {
        let PayloadRecord::Data { undo, redo } = self.payload else {
            return None;
        };
        Some(HistoryEntry {
            id: self.id,
            kind: self.kind,
            description: self.description,
            timestamp: self.timestamp,
            scope: self.scope,
            group_id: self.group_id,
            payload: EntryPayload::Data { undo, redo },
        })
    }
}

/// Defensive copy of the engine's persistent state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// All entries, oldest first.
    pub entries: Vec<EntryRecord>,
    /// Index of the last applied entry; `None` means nothing applied yet.
    pub cursor: Option<usize>,
    /// Entry ids marked as matching persisted state.
    pub save_points: HashSet<EntryId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::FnCommand;
    use serde_json::json;

    fn data_entry(id: u64) -> HistoryEntry {
        HistoryEntry {
            id: EntryId(id),
            kind: "clip:add".to_string(),
            description: "Add clip".to_string(),
            timestamp: SystemTime::UNIX_EPOCH,
            scope: "timeline".to_string(),
            group_id: Some(GroupId(4)),
            payload: EntryPayload::Data {
                undo: json!({"remove": "c1"}),
                redo: json!({"add": "c1"}),
            },
        }
    }

    #[test]
    fn capture_preserves_fields() {
        let record = EntryRecord::capture(&data_entry(9), true);
        assert_eq!(record.id, EntryId(9));
        assert_eq!(record.kind, "clip:add");
        assert_eq!(record.group_id, Some(GroupId(4)));
        assert!(record.is_save_point);
        assert_eq!(
            record.payload,
            PayloadRecord::Data {
                undo: json!({"remove": "c1"}),
                redo: json!({"add": "c1"}),
            }
        );
    }

    #[test]
    fn data_record_rehydrates() {
        let record = EntryRecord::capture(&data_entry(1), false);
        let entry = record.into_entry().unwrap();
        assert_eq!(entry.id, EntryId(1));
        let (undo, _) = entry.data_payloads().unwrap();
        assert_eq!(undo["remove"], "c1");
    }

    #[test]
    fn command_record_does_not_rehydrate() {
        let entry = HistoryEntry {
            payload: EntryPayload::Command(Box::new(FnCommand::new(|| {}, || {}))),
            ..data_entry(2)
        };
        let record = EntryRecord::capture(&entry, false);
        assert_eq!(record.payload, PayloadRecord::Command);
        assert!(record.into_entry().is_none());
    }

    #[test]
    fn state_serialization_roundtrip() {
        let state = EngineState {
            entries: vec![
                EntryRecord::capture(&data_entry(1), false),
                EntryRecord::capture(&data_entry(2), true),
            ],
            cursor: Some(1),
            save_points: [EntryId(2)].into_iter().collect(),
        };

        let json = serde_json::to_string(&state).unwrap();
        let restored: EngineState = serde_json::from_str(&json).unwrap();
        assert_eq!(state, restored);
    }
}
