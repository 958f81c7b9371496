//! Persistent key-value storage for analysis payloads and history.
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use thiserror::Error;

use crate::constants::{ANALYSIS_KEY, RECENT_CAPACITY, RECENT_KEY};
use crate::data::{AnalysisPayload, RecentAnalysis};

/// Trait for abstracting the device key-value store.
/// Platform-specific implementations should provide this
pub trait AnalysisStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the most recent analysis payload, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load_analysis(&self) -> Result<Option<AnalysisPayload>, Self::Error>;

    /// Persist the most recent analysis payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be written.
    fn save_analysis(&self, payload: &AnalysisPayload) -> Result<(), Self::Error>;

    /// Load the recent-analyses history, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn load_recent(&self) -> Result<Vec<RecentAnalysis>, Self::Error>;

    /// Replace the recent-analyses history.
    ///
    /// # Errors
    ///
    /// Returns an error if the history cannot be written.
    fn save_recent(&self, recent: &[RecentAnalysis]) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Prepend `entry`, drop older rows with the same id, and cap the list.
#[must_use]
pub fn merge_recent(existing: Vec<RecentAnalysis>, entry: RecentAnalysis) -> Vec<RecentAnalysis> {
    let mut merged = Vec::with_capacity(RECENT_CAPACITY);
    let id = entry.id.clone();
    merged.push(entry);
    merged.extend(existing.into_iter().filter(|row| row.id != id));
    merged.truncate(RECENT_CAPACITY);
    merged
}

/// Store a fresh payload and fold it into the recent history.
///
/// # Errors
///
/// Returns the store's error if any read or write fails.
pub fn record_analysis<S: AnalysisStore>(
    store: &S,
    payload: &AnalysisPayload,
    at: i64,
) -> Result<(), S::Error> {
    store.save_analysis(payload)?;
    let recent = store.load_recent()?;
    let merged = merge_recent(recent, RecentAnalysis::from_payload(payload, at));
    store.save_recent(&merged)
}

/// In-memory store holding raw JSON strings, shareable across handles.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw string stored under `key`.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Overwrite `key` with an arbitrary string, bypassing encoding.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

impl AnalysisStore for MemoryStore {
    type Error = StoreError;

    fn load_analysis(&self) -> Result<Option<AnalysisPayload>, Self::Error> {
        let Some(raw) = self.raw(ANALYSIS_KEY) else {
            return Ok(None);
        };
        match AnalysisPayload::from_json(&raw) {
            Ok(payload) => Ok(Some(payload)),
            Err(err) => {
                log::warn!("ignoring unreadable {ANALYSIS_KEY}: {err}");
                Ok(None)
            }
        }
    }

    fn save_analysis(&self, payload: &AnalysisPayload) -> Result<(), Self::Error> {
        let raw = serde_json::to_string(payload).map_err(|source| StoreError::Encode {
            key: ANALYSIS_KEY,
            source,
        })?;
        self.insert_raw(ANALYSIS_KEY, &raw);
        Ok(())
    }

    fn load_recent(&self) -> Result<Vec<RecentAnalysis>, Self::Error> {
        let Some(raw) = self.raw(RECENT_KEY) else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(rows) => Ok(rows),
            Err(err) => {
                log::warn!("ignoring unreadable {RECENT_KEY}: {err}");
                Ok(Vec::new())
            }
        }
    }

    fn save_recent(&self, recent: &[RecentAnalysis]) -> Result<(), Self::Error> {
        let raw = serde_json::to_string(recent).map_err(|source| StoreError::Encode {
            key: RECENT_KEY,
            source,
        })?;
        self.insert_raw(RECENT_KEY, &raw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Analysis;

    fn payload(id: &str) -> AnalysisPayload {
        AnalysisPayload {
            session_id: id.to_string(),
            analysis: Analysis {
                recommended_test: Some(format!("test-{id}")),
                ..Analysis::default()
            },
        }
    }

    #[test]
    fn record_keeps_newest_three_without_duplicates() {
        let store = MemoryStore::new();
        for (at, id) in ["a", "b", "c", "b", "d"].iter().enumerate() {
            record_analysis(&store, &payload(id), i64::try_from(at).unwrap()).unwrap();
        }
        let recent = store.load_recent().unwrap();
        let ids: Vec<&str> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "b", "c"]);
        assert_eq!(recent[1].at, 3);
        assert_eq!(
            store.load_analysis().unwrap().unwrap().session_id,
            "d".to_string()
        );
    }

    #[test]
    fn corrupt_entries_read_as_absent() {
        let store = MemoryStore::new();
        store.insert_raw(ANALYSIS_KEY, "{ broken");
        store.insert_raw(RECENT_KEY, "[1, 2");
        assert!(store.load_analysis().unwrap().is_none());
        assert!(store.load_recent().unwrap().is_empty());
    }

    #[test]
    fn clones_share_entries() {
        let store = MemoryStore::new();
        let handle = store.clone();
        store.save_analysis(&payload("shared")).unwrap();
        assert!(handle.load_analysis().unwrap().is_some());
        handle.remove(ANALYSIS_KEY);
        assert!(store.raw(ANALYSIS_KEY).is_none());
    }
}
