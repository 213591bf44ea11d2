//! Debounce coalescing for high-frequency action kinds.
//!
//! A clip drag recorded at animation-frame granularity would produce dozens
//! of undo steps; users expect one "move clip" step. The slot holds at most
//! one pending entry plus a deadline. It does NOT own a thread or async task:
//! the engine is ticked from the host main loop and commits the pending entry
//! once the quiet period elapses, the same polling design as the project
//! auto-saver.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::entry::HistoryEntry;

/// Holds the single pending debounced entry, if any.
#[derive(Debug, Default)]
pub(crate) struct DebounceSlot {
    pending: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    entry: HistoryEntry,
    deadline: Instant,
}

impl DebounceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park an entry, replacing any pending one and restarting the deadline.
    pub fn offer(&mut self, entry: HistoryEntry, window: Duration) {
        if let Some(previous) = &self.pending {
            debug!(
                kind = %previous.entry.kind,
                replaced_by = %entry.description,
                "Pending debounced entry replaced"
            );
        }
        self.pending = Some(Pending {
            entry,
            deadline: Instant::now() + window,
        });
    }

    /// Take the pending entry unconditionally (causal-order flush).
    pub fn take(&mut self) -> Option<HistoryEntry> {
        self.pending.take().map(|p| p.entry)
    }

    /// Take the pending entry only if its quiet period has elapsed.
    pub fn take_expired(&mut self) -> Option<HistoryEntry> {
        if self.pending.as_ref()?.deadline <= Instant::now() {
            self.take()
        } else {
            None
        }
    }

    /// Drop the pending entry without committing it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            debug!(kind = %pending.entry.kind, "Pending debounced entry cancelled");
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Action kind of the pending entry, if any.
    pub fn pending_kind(&self) -> Option<&str> {
        self.pending.as_ref().map(|p| p.entry.kind.as_str())
    }

    /// Time remaining until the pending entry is due, `Duration::ZERO` if
    /// already due, `None` if nothing is pending.
    pub fn time_until_flush(&self) -> Option<Duration> {
        let pending = self.pending.as_ref()?;
        Some(pending.deadline.saturating_duration_since(Instant::now()))
    }
}
