//! History engine configuration.
//!
//! Uses plain types (u64 milliseconds, `String` kind tags) for robust
//! serialization; the config travels with project settings.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default maximum number of retained history entries.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Default debounce quiet period in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// History engine configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of retained entries; the oldest are trimmed first.
    pub max_entries: usize,
    /// Quiet period for debounceable action kinds, in milliseconds.
    pub debounce_ms: u64,
    /// Action kinds coalesced by the debounce window (continuous edits).
    pub debounceable_kinds: HashSet<String>,
    /// Action kinds never recorded at all.
    pub excluded_kinds: HashSet<String>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            debounceable_kinds: [
                "clip:move",
                "clip:resize",
                "clip:drag",
                "keyframe:drag",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            excluded_kinds: ["selection:change"].into_iter().map(String::from).collect(),
        }
    }
}

impl HistoryConfig {
    /// Whether entries of this kind are coalesced by the debounce window.
    pub fn is_debounceable(&self, kind: &str) -> bool {
        self.debounceable_kinds.contains(kind)
    }

    /// Whether entries of this kind are dropped at the record boundary.
    pub fn is_excluded(&self, kind: &str) -> bool {
        self.excluded_kinds.contains(kind)
    }

    /// The debounce quiet period as a `Duration`.
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Apply a partial update, overwriting only the fields it carries.
    pub fn apply(&mut self, update: HistoryConfigUpdate) {
        if let Some(max_entries) = update.max_entries {
            self.max_entries = max_entries;
        }
        if let Some(debounce_ms) = update.debounce_ms {
            self.debounce_ms = debounce_ms;
        }
        if let Some(kinds) = update.debounceable_kinds {
            self.debounceable_kinds = kinds;
        }
        if let Some(kinds) = update.excluded_kinds {
            self.excluded_kinds = kinds;
        }
    }
}

/// Partial configuration update; `None` fields keep their current value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfigUpdate {
    pub max_entries: Option<usize>,
    pub debounce_ms: Option<u64>,
    pub debounceable_kinds: Option<HashSet<String>>,
    pub excluded_kinds: Option<HashSet<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HistoryConfig::default();
        assert_eq!(config.max_entries, DEFAULT_MAX_ENTRIES);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(config.is_debounceable("clip:move"));
        assert!(config.is_debounceable("clip:resize"));
        assert!(!config.is_debounceable("clip:add"));
        assert!(config.is_excluded("selection:change"));
        assert!(!config.is_excluded("clip:add"));
    }

    #[test]
    fn debounce_window_from_millis() {
        let config = HistoryConfig {
            debounce_ms: 250,
            ..Default::default()
        };
        assert_eq!(config.debounce_window(), Duration::from_millis(250));
    }

    #[test]
    fn partial_update_overwrites_only_given_fields() {
        let mut config = HistoryConfig::default();
        config.apply(HistoryConfigUpdate {
            max_entries: Some(5),
            ..Default::default()
        });
        assert_eq!(config.max_entries, 5);
        assert_eq!(config.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert!(config.is_debounceable("clip:move"));
    }

    #[test]
    fn empty_update_is_noop() {
        let mut config = HistoryConfig::default();
        let before = config.clone();
        config.apply(HistoryConfigUpdate::default());
        assert_eq!(config, before);
    }

    #[test]
    fn config_serialization_roundtrip() {
        let config = HistoryConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: HistoryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, restored);
    }
}
