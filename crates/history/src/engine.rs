//! The action history engine.
//!
//! `HistoryEngine` owns the entry store: an append-only, bounded sequence of
//! entries plus a cursor marking the last applied position. Everything after
//! the cursor is the redo tail, discarded in full whenever a new entry is
//! recorded — branching history is not supported. Recording while mid-redo
//! always wins; the redo tail is simply lost, never merged.
//!
//! The engine is single-threaded: all operations are synchronous `&mut self`
//! calls. The only delayed effect is the debounce quiet period, committed by
//! `tick()` from the host main loop or flushed eagerly whenever causal order
//! requires it.

use std::collections::HashSet;
use std::time::{Duration, SystemTime};

use tracing::{debug, info, warn};

use crate::command::Command;
use crate::config::{HistoryConfig, HistoryConfigUpdate};
use crate::debounce::DebounceSlot;
use crate::entry::{kinds, EntryId, EntryPayload, GroupId, HistoryEntry};
use crate::error::{HistoryError, HistoryResult};
use crate::listener::{ListenerId, ListenerSet};
use crate::snapshot::{EngineState, EntryRecord};

#[derive(Debug)]
struct ActiveGroup {
    id: GroupId,
    description: String,
}

/// Undo/redo engine for one editing surface.
///
/// Multiple surfaces (e.g. a timeline and an effects panel) construct
/// independent engines; there is no shared global instance.
pub struct HistoryEngine {
    entries: Vec<HistoryEntry>,
    /// Index of the last applied entry; `None` means nothing to undo.
    cursor: Option<usize>,
    save_points: HashSet<EntryId>,
    config: HistoryConfig,
    debounce: DebounceSlot,
    listeners: ListenerSet,
    active_group: Option<ActiveGroup>,
    next_entry_id: u64,
    next_group_id: u64,
    /// True while an undo/redo command is being applied, to suppress
    /// re-entrant records from command closures.
    applying: bool,
}

impl Default for HistoryEngine {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryEngine {
    pub fn new(config: HistoryConfig) -> Self {
        info!(
            max_entries = config.max_entries,
            debounce_ms = config.debounce_ms,
            "History engine initialized"
        );
        Self {
            entries: Vec::new(),
            cursor: None,
            save_points: HashSet::new(),
            config,
            debounce: DebounceSlot::new(),
            listeners: ListenerSet::new(),
            active_group: None,
            next_entry_id: 0,
            next_group_id: 0,
            applying: false,
        }
    }

    // --- Recording ---

    /// Record a data-mode entry.
    ///
    /// The payloads are opaque; the caller interprets them to apply the
    /// inverse/forward effect after a later `undo`/`redo`. Recording
    /// discards the redo tail, then enforces `max_entries` by trimming
    /// from the oldest end. Kinds in `excluded_kinds` are dropped here;
    /// debounceable kinds are parked in the debounce slot instead of being
    /// committed immediately.
    pub fn record(
        &mut self,
        kind: impl Into<String>,
        description: impl Into<String>,
        undo: serde_json::Value,
        redo: serde_json::Value,
        scope: impl Into<String>,
    ) {
        let kind = kind.into();
        let description = description.into();

        if self.applying {
            warn!(%kind, %description, "Record suppressed: undo/redo in progress");
            return;
        }
        if self.config.is_excluded(&kind) {
            debug!(%kind, "Record skipped: excluded kind");
            return;
        }

        // A pending entry whose quiet period already elapsed belongs to a
        // finished burst; commit it before looking at the new entry.
        if let Some(expired) = self.debounce.take_expired() {
            self.push_entry(expired);
        }

        let entry = self.make_entry(
            kind,
            description,
            EntryPayload::Data { undo, redo },
            scope.into(),
        );

        if self.config.is_debounceable(&entry.kind) && self.active_group.is_none() {
            // A pending entry of a different kind must not be reordered
            // behind the new one.
            if self.debounce.pending_kind().is_some_and(|k| k != entry.kind) {
                let pending = self.debounce.take().expect("pending kind was present");
                self.push_entry(pending);
            }
            self.debounce.offer(entry, self.config.debounce_window());
            self.listeners.notify_all();
            return;
        }

        self.flush_pending_entry();
        self.push_entry(entry);
        self.listeners.notify_all();
    }

    /// Record a command-mode entry, applying its forward effect first.
    ///
    /// Undoing a command entry invokes `backward()` directly; no caller-side
    /// replay is needed.
    pub fn execute(
        &mut self,
        description: impl Into<String>,
        command: impl Command + 'static,
        scope: impl Into<String>,
    ) {
        let description = description.into();

        if self.applying {
            warn!(%description, "Execute suppressed: undo/redo in progress");
            return;
        }

        self.flush_pending_entry();

        let mut command: Box<dyn Command> = Box::new(command);
        command.forward();

        let entry = self.make_entry(
            kinds::COMMAND.to_string(),
            description,
            EntryPayload::Command(command),
            scope.into(),
        );
        self.push_entry(entry);
        self.listeners.notify_all();
    }

    // --- Undo / redo ---

    /// Step the cursor back one entry and return it.
    ///
    /// For a command entry its `backward()` has already been invoked; for a
    /// data entry the caller applies the undo payload. Returns `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        let flushed = self.flush_pending_entry();

        let Some(idx) = self.cursor else {
            if flushed {
                self.listeners.notify_all();
            }
            debug!("Nothing to undo");
            return None;
        };

        if let EntryPayload::Command(command) = &mut self.entries[idx].payload {
            self.applying = true;
            command.backward();
            self.applying = false;
        }
        self.cursor = idx.checked_sub(1);
        debug!(
            description = %self.entries[idx].description,
            undo_remaining = self.undo_depth(),
            "Undo"
        );

        self.listeners.notify_all();
        Some(&self.entries[idx])
    }

    /// Step the cursor forward one entry and return it.
    ///
    /// For a command entry its `forward()` has already been re-invoked; for
    /// a data entry the caller applies the redo payload. Returns `None` when
    /// there is nothing to redo.
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let flushed = self.flush_pending_entry();

        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.entries.len() {
            if flushed {
                self.listeners.notify_all();
            }
            debug!("Nothing to redo");
            return None;
        }

        if let EntryPayload::Command(command) = &mut self.entries[next].payload {
            self.applying = true;
            command.forward();
            self.applying = false;
        }
        self.cursor = Some(next);
        debug!(
            description = %self.entries[next].description,
            redo_remaining = self.redo_depth(),
            "Redo"
        );

        self.listeners.notify_all();
        Some(&self.entries[next])
    }

    // --- Compound groups ---

    /// Open a compound group; every entry recorded until `end_compound`
    /// is tagged with the returned group id.
    ///
    /// Emits a `compound:start` marker entry carrying the group id in its
    /// redo payload. Nesting is not supported: a second start while a group
    /// is open is a caller bug and fails fast.
    pub fn start_compound(&mut self, description: impl Into<String>) -> HistoryResult<GroupId> {
        if let Some(group) = &self.active_group {
            return Err(HistoryError::CompoundAlreadyOpen {
                description: group.description.clone(),
            });
        }
        let description = description.into();

        self.flush_pending_entry();

        let id = GroupId(self.next_group_id);
        self.next_group_id += 1;

        let marker = self.make_entry(
            kinds::COMPOUND_START.to_string(),
            description.clone(),
            EntryPayload::Data {
                undo: serde_json::Value::Null,
                redo: serde_json::json!({ "group_id": id.0 }),
            },
            String::from("history"),
        );
        self.push_entry(marker);
        self.active_group = Some(ActiveGroup { id, description });

        debug!(group = %id, "Compound group opened");
        self.listeners.notify_all();
        Ok(id)
    }

    /// Close the open compound group, emitting a `compound:end` marker.
    ///
    /// Neither marker carries the group id in its `group_id` field, so the
    /// markers delimit the group without being part of it.
    pub fn end_compound(&mut self) -> HistoryResult<()> {
        let Some(group) = self.active_group.take() else {
            return Err(HistoryError::CompoundNotOpen);
        };

        let marker = self.make_entry(
            kinds::COMPOUND_END.to_string(),
            group.description,
            EntryPayload::Data {
                undo: serde_json::Value::Null,
                redo: serde_json::json!({ "group_id": group.id.0 }),
            },
            String::from("history"),
        );
        self.push_entry(marker);

        debug!(group = %group.id, "Compound group closed");
        self.listeners.notify_all();
        Ok(())
    }

    /// Whether a compound group is currently open.
    pub fn is_compounding(&self) -> bool {
        self.active_group.is_some()
    }

    // --- Save points ---

    /// Mark the entry at the cursor as matching persisted state.
    ///
    /// No-op when nothing has been applied. Dirty-state policy stays with
    /// the caller: compare `cursor_entry_id()` against `save_points()`, and
    /// treat an unresolvable save point as dirty.
    pub fn mark_save_point(&mut self) {
        self.flush_pending_entry();

        let Some(idx) = self.cursor else {
            debug!("Save point skipped: nothing applied");
            return;
        };
        let id = self.entries[idx].id;
        self.save_points.insert(id);
        debug!(entry = %id, "Save point marked");
        self.listeners.notify_all();
    }

    /// Entry ids currently marked as save points.
    pub fn save_points(&self) -> &HashSet<EntryId> {
        &self.save_points
    }

    /// Id of the entry at the cursor, if anything is applied.
    pub fn cursor_entry_id(&self) -> Option<EntryId> {
        self.cursor.map(|idx| self.entries[idx].id)
    }

    // --- Debounce control ---

    /// Commit the pending debounced entry if its quiet period has elapsed.
    ///
    /// Called from the host main loop; returns whether an entry was
    /// committed. `time_until_flush()` tells the host when to call next.
    pub fn tick(&mut self) -> bool {
        let Some(entry) = self.debounce.take_expired() else {
            return false;
        };
        debug!(kind = %entry.kind, "Debounce quiet period elapsed");
        self.push_entry(entry);
        self.listeners.notify_all();
        true
    }

    /// Commit the pending debounced entry immediately, quiet period or not.
    pub fn flush_pending(&mut self) -> bool {
        let flushed = self.flush_pending_entry();
        if flushed {
            self.listeners.notify_all();
        }
        flushed
    }

    /// Whether a debounced entry is parked awaiting its quiet period.
    pub fn has_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Time until the pending debounced entry is due, if any.
    pub fn time_until_flush(&self) -> Option<Duration> {
        self.debounce.time_until_flush()
    }

    // --- Lifecycle ---

    /// Reset to the empty state.
    ///
    /// Cancels any pending debounced entry without committing it, so no
    /// commit can occur after this returns.
    pub fn clear(&mut self) {
        self.debounce.cancel();
        self.entries.clear();
        self.cursor = None;
        self.save_points.clear();
        self.active_group = None;
        debug!("History cleared");
        self.listeners.notify_all();
    }

    /// Load previously captured state, or reset to empty if `None`.
    ///
    /// Command entries cannot be rehydrated from a snapshot (their closures
    /// are gone); they are skipped with the cursor and save points repaired
    /// to the surviving entries.
    pub fn initialize(&mut self, state: Option<EngineState>) {
        self.debounce.cancel();
        self.active_group = None;

        let Some(state) = state else {
            self.entries.clear();
            self.cursor = None;
            self.save_points.clear();
            info!("History engine reset to empty");
            self.listeners.notify_all();
            return;
        };

        let total = state.entries.len();
        let original_cursor = state.cursor;
        let mut entries = Vec::with_capacity(total);
        let mut skipped_at_or_before_cursor = 0usize;

        for (idx, record) in state.entries.into_iter().enumerate() {
            match record.into_entry() {
                Some(entry) => entries.push(entry),
                None => {
                    if original_cursor.is_some_and(|c| idx <= c) {
                        skipped_at_or_before_cursor += 1;
                    }
                }
            }
        }

        let skipped = total - entries.len();
        if skipped > 0 {
            warn!(skipped, "Dropped command entries on restore");
        }

        self.cursor = original_cursor
            .and_then(|c| c.checked_sub(skipped_at_or_before_cursor))
            .filter(|c| *c < entries.len());
        self.entries = entries;
        self.save_points = state.save_points;
        self.retain_save_points();

        self.next_entry_id = self
            .entries
            .iter()
            .map(|e| e.id.0 + 1)
            .max()
            .unwrap_or(0);
        self.next_group_id = self
            .entries
            .iter()
            .filter_map(|e| e.group_id)
            .map(|g| g.0 + 1)
            .max()
            .unwrap_or(0);

        self.enforce_bound();
        info!(entries = self.entries.len(), "History state restored");
        self.listeners.notify_all();
    }

    /// Apply a partial configuration update.
    ///
    /// Lowering `max_entries` immediately re-trims existing entries to the
    /// new bound.
    pub fn set_config(&mut self, update: HistoryConfigUpdate) {
        self.config.apply(update);
        let before = self.entries.len();
        self.enforce_bound();
        debug!(max_entries = self.config.max_entries, "Configuration updated");
        if self.entries.len() != before {
            self.listeners.notify_all();
        }
    }

    // --- Observation ---

    /// Register a change listener; it is immediately invoked once, then
    /// again after every mutating operation. Unsubscribe with the returned
    /// token.
    pub fn subscribe(&mut self, listener: impl FnMut() + 'static) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    /// Remove a listener. Returns `false` if the token was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    // --- Queries ---

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    /// Label of the entry that would be undone next.
    pub fn undo_description(&self) -> Option<&str> {
        self.cursor.map(|idx| self.entries[idx].description.as_str())
    }

    /// Label of the entry that would be redone next.
    pub fn redo_description(&self) -> Option<&str> {
        let next = self.cursor.map_or(0, |c| c + 1);
        self.entries.get(next).map(|e| e.description.as_str())
    }

    /// Number of committed entries (a pending debounced entry is not yet
    /// part of history).
    pub fn history_size(&self) -> usize {
        self.entries.len()
    }

    /// Number of entries available to undo.
    pub fn undo_depth(&self) -> usize {
        self.cursor.map_or(0, |c| c + 1)
    }

    /// Number of entries available to redo.
    pub fn redo_depth(&self) -> usize {
        self.entries.len() - self.undo_depth()
    }

    /// Most-recent-first snapshot of all entries, for a history panel.
    pub fn history(&self) -> Vec<EntryRecord> {
        self.entries
            .iter()
            .rev()
            .map(|e| EntryRecord::capture(e, self.save_points.contains(&e.id)))
            .collect()
    }

    /// Defensive copy of the persistent engine state.
    pub fn state(&self) -> EngineState {
        EngineState {
            entries: self
                .entries
                .iter()
                .map(|e| EntryRecord::capture(e, self.save_points.contains(&e.id)))
                .collect(),
            cursor: self.cursor,
            save_points: self.save_points.clone(),
        }
    }

    /// Defensive copy of the current configuration.
    pub fn config(&self) -> HistoryConfig {
        self.config.clone()
    }

    /// Cursor position: index of the last applied entry, `None` if nothing
    /// is applied.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Whether an undo/redo command is currently being applied.
    pub fn is_applying(&self) -> bool {
        self.applying
    }

    // --- Internals ---

    fn make_entry(
        &mut self,
        kind: String,
        description: String,
        payload: EntryPayload,
        scope: String,
    ) -> HistoryEntry {
        let id = EntryId(self.next_entry_id);
        self.next_entry_id += 1;
        HistoryEntry {
            id,
            kind,
            description,
            timestamp: SystemTime::now(),
            scope,
            group_id: self.active_group.as_ref().map(|g| g.id),
            payload,
        }
    }

    /// Append an entry: discard the redo tail, advance the cursor, enforce
    /// the bound.
    fn push_entry(&mut self, entry: HistoryEntry) {
        let keep = self.cursor.map_or(0, |c| c + 1);
        if keep < self.entries.len() {
            let discarded = self.entries.len() - keep;
            self.entries.truncate(keep);
            self.retain_save_points();
            debug!(discarded, "Redo tail discarded");
        }

        debug!(
            kind = %entry.kind,
            description = %entry.description,
            depth = self.entries.len() + 1,
            "History entry pushed"
        );
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);
        self.enforce_bound();
    }

    /// Trim oldest entries down to `max_entries`, shifting the cursor back
    /// by the number trimmed.
    fn enforce_bound(&mut self) {
        if self.entries.len() <= self.config.max_entries {
            return;
        }
        let trimmed = self.entries.len() - self.config.max_entries;
        self.entries.drain(..trimmed);
        self.cursor = self.cursor.and_then(|c| c.checked_sub(trimmed));
        self.retain_save_points();
        debug!(trimmed, "Oldest entries trimmed");
    }

    /// Drop save points whose entries no longer exist; the caller treats an
    /// unresolvable save point as dirty.
    fn retain_save_points(&mut self) {
        if self.save_points.is_empty() {
            return;
        }
        let live: HashSet<EntryId> = self.entries.iter().map(|e| e.id).collect();
        self.save_points.retain(|id| live.contains(id));
    }

    /// Commit the pending debounced entry, if any, without notifying.
    fn flush_pending_entry(&mut self) -> bool {
        match self.debounce.take() {
            Some(entry) => {
                self.push_entry(entry);
                true
            }
            None => false,
        }
    }
}
