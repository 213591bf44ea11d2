//! `cutline-history` -- Action history engine for the Cutline editor.
//!
//! Records reversible edits to the project/timeline and exposes undo/redo
//! with exactly-once replay of each recorded change. This crate provides:
//!
//! - **`HistoryEngine`**: Bounded entry store with a cursor, undo/redo stack
//!   machine, and change notification.
//! - **Debounce coalescing**: Rapid bursts of continuous edits (clip drags,
//!   resizes) collapse into a single undo step after a quiet period.
//! - **Compound groups**: Several elementary edits recorded between
//!   `start_compound`/`end_compound` undo together as one user-visible step.
//! - **Save points**: Cursor positions marked as matching persisted state,
//!   for external dirty-flag computation.
//! - **`Command`/`BatchCommand`**: Entries carrying executable
//!   forward/backward closures instead of data payloads.
//!
//! # Architecture
//!
//! ```text
//! HistoryEngine
//! ├── entries: Vec<HistoryEntry>     (oldest first; bounded)
//! ├── cursor: Option<usize>          (last applied entry; tail = redo)
//! ├── save_points: HashSet<EntryId>  ("matches persisted state")
//! ├── DebounceSlot                   (pending coalesced entry + deadline)
//! └── ListenerSet                    (change observers, failure-isolated)
//! ```
//!
//! The engine is single-threaded: one editing surface owns one engine and
//! drives it with synchronous calls. The only delayed effect is the debounce
//! quiet period, polled via [`HistoryEngine::tick`] from the host main loop.
//! Callers never mutate the entry store directly.
//!
//! # Usage
//!
//! ```
//! use cutline_history::{HistoryConfig, HistoryEngine};
//! use serde_json::json;
//!
//! let mut history = HistoryEngine::new(HistoryConfig::default());
//!
//! history.record(
//!     "clip:add",
//!     "Add clip",
//!     json!({ "remove": "c1" }),
//!     json!({ "add": "c1", "track": "t1" }),
//!     "timeline",
//! );
//!
//! if let Some(entry) = history.undo() {
//!     let (undo_payload, _) = entry.data_payloads().unwrap();
//!     // apply `undo_payload` to the timeline
//!     assert_eq!(undo_payload["remove"], "c1");
//! }
//! ```

pub mod command;
pub mod config;
mod debounce;
pub mod engine;
pub mod entry;
pub mod error;
pub mod listener;
pub mod snapshot;

// Re-export primary types at crate root for convenience.
pub use command::{BatchCommand, Command, FnCommand};
pub use config::{HistoryConfig, HistoryConfigUpdate};
pub use engine::HistoryEngine;
pub use entry::{kinds, EntryId, EntryPayload, GroupId, HistoryEntry};
pub use error::{HistoryError, HistoryResult};
pub use listener::ListenerId;
pub use snapshot::{EngineState, EntryRecord, PayloadRecord};
