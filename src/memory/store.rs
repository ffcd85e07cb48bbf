//! Working memory: durable, cross-conversation facts about the user
//!
//! Working memory holds three deduplicated string collections (facts,
//! preferences, topics) under a single user id. It is mutated only by
//! merging deltas proposed by the memory extractor — never by destructive
//! overwrite — except for the explicit clear operation that accompanies a
//! full conversation purge.

use crate::error::{ConfideError, Result};
use crate::storage::{KvStore, StorageKeys};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Durable memory about the user
///
/// Each collection contains no duplicate entries (case-sensitive exact
/// match) and preserves insertion order for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingMemory {
    /// Owner of this memory (single-user: "default")
    pub user_id: String,
    /// Concrete information about the user (job, relationships, hobbies)
    pub facts: Vec<String>,
    /// What they like, dislike, and value
    pub preferences: Vec<String>,
    /// Themes discussed across conversations
    pub topics: Vec<String>,
}

impl WorkingMemory {
    /// Create an empty memory for the given user
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner identifier
    ///
    /// # Examples
    ///
    /// ```
    /// use confide::memory::WorkingMemory;
    ///
    /// let memory = WorkingMemory::empty("default");
    /// assert!(memory.is_empty());
    /// ```
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            facts: Vec::new(),
            preferences: Vec::new(),
            topics: Vec::new(),
        }
    }

    /// Whether all three collections are empty
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.preferences.is_empty() && self.topics.is_empty()
    }

    /// Total number of stored entries
    pub fn len(&self) -> usize {
        self.facts.len() + self.preferences.len() + self.topics.len()
    }
}

/// Candidate new memory entries proposed by the extractor
///
/// Transient and never persisted; the store performs the deduplicating
/// merge. Absent fields in model output decode as empty collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryDelta {
    /// New facts
    #[serde(default)]
    pub facts: Vec<String>,
    /// New preferences
    #[serde(default)]
    pub preferences: Vec<String>,
    /// New topics
    #[serde(default)]
    pub topics: Vec<String>,
}

impl MemoryDelta {
    /// Whether the delta proposes nothing
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.preferences.is_empty() && self.topics.is_empty()
    }
}

/// Persisted working-memory store
///
/// Reads never fail: absent or malformed stored state yields the empty
/// default. The merge is a set union per collection using exact string
/// equality, which makes it idempotent — merging the same delta twice
/// leaves the same state as merging it once.
pub struct MemoryStore {
    kv: Arc<dyn KvStore>,
    key: String,
    user_id: String,
}

impl MemoryStore {
    /// Create a store over the given key-value backend
    ///
    /// # Arguments
    ///
    /// * `kv` - Key-value backend
    /// * `keys` - Logical storage keys
    /// * `user_id` - Owner identifier for the memory singleton
    pub fn new(kv: Arc<dyn KvStore>, keys: &StorageKeys, user_id: impl Into<String>) -> Self {
        Self {
            kv,
            key: keys.working_memory.clone(),
            user_id: user_id.into(),
        }
    }

    /// Read the current working memory
    ///
    /// Returns the empty default when nothing is stored or the stored
    /// value is malformed.
    pub fn read(&self) -> WorkingMemory {
        match self.kv.get(&self.key) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(memory) => memory,
                Err(e) => {
                    tracing::warn!("Stored memory is malformed, starting fresh: {}", e);
                    WorkingMemory::empty(&self.user_id)
                }
            },
            Ok(None) => WorkingMemory::empty(&self.user_id),
            Err(e) => {
                tracing::warn!("Failed to read working memory, starting fresh: {}", e);
                WorkingMemory::empty(&self.user_id)
            }
        }
    }

    /// Merge a delta into the stored memory
    ///
    /// For each collection the result is the union of existing entries and
    /// delta entries with exact string equality as the dedup key. The new
    /// state is persisted in one write and returned.
    ///
    /// # Arguments
    ///
    /// * `delta` - Candidate new entries
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Storage` if the write fails
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use confide::memory::{MemoryDelta, MemoryStore};
    /// use confide::storage::{MemoryKv, StorageKeys};
    ///
    /// let store = MemoryStore::new(Arc::new(MemoryKv::new()), &StorageKeys::default(), "default");
    /// let delta = MemoryDelta {
    ///     facts: vec!["works as a nurse".to_string()],
    ///     ..Default::default()
    /// };
    ///
    /// let merged = store.merge(&delta).unwrap();
    /// assert_eq!(merged.facts, vec!["works as a nurse"]);
    ///
    /// // Merging again changes nothing
    /// let merged_again = store.merge(&delta).unwrap();
    /// assert_eq!(merged_again, merged);
    /// ```
    pub fn merge(&self, delta: &MemoryDelta) -> Result<WorkingMemory> {
        let current = self.read();

        let merged = WorkingMemory {
            user_id: current.user_id.clone(),
            facts: union(&current.facts, &delta.facts),
            preferences: union(&current.preferences, &delta.preferences),
            topics: union(&current.topics, &delta.topics),
        };

        self.write(&merged)?;
        Ok(merged)
    }

    /// Replace the stored memory wholesale
    ///
    /// # Arguments
    ///
    /// * `memory` - The replacement state
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Storage` if the write fails
    pub fn replace(&self, memory: &WorkingMemory) -> Result<()> {
        self.write(memory)
    }

    /// Remove all working memory
    pub fn clear(&self) -> Result<()> {
        self.kv.remove(&self.key)
    }

    fn write(&self, memory: &WorkingMemory) -> Result<()> {
        let json = serde_json::to_string(memory)
            .map_err(|e| ConfideError::Storage(format!("Serialization failed: {}", e)))?;
        self.kv.set(&self.key, &json)
    }
}

/// Union of two string collections preserving first-seen order
fn union(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut result = Vec::with_capacity(existing.len() + incoming.len());
    for item in existing.iter().chain(incoming.iter()) {
        if seen.insert(item.as_str()) {
            result.push(item.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKv;

    fn store() -> MemoryStore {
        MemoryStore::new(Arc::new(MemoryKv::new()), &StorageKeys::default(), "default")
    }

    fn delta(facts: &[&str], preferences: &[&str], topics: &[&str]) -> MemoryDelta {
        MemoryDelta {
            facts: facts.iter().map(|s| s.to_string()).collect(),
            preferences: preferences.iter().map(|s| s.to_string()).collect(),
            topics: topics.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_read_empty_default() {
        let store = store();
        let memory = store.read();
        assert_eq!(memory.user_id, "default");
        assert!(memory.is_empty());
        assert_eq!(memory.len(), 0);
    }

    #[test]
    fn test_read_tolerates_malformed_state() {
        let kv: Arc<dyn KvStore> = Arc::new(MemoryKv::new());
        let keys = StorageKeys::default();
        kv.set(&keys.working_memory, "not json at all").unwrap();

        let store = MemoryStore::new(kv, &keys, "default");
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_merge_adds_entries() {
        let store = store();
        let merged = store
            .merge(&delta(
                &["works as a nurse"],
                &["prefers quiet evenings"],
                &["work stress"],
            ))
            .unwrap();

        assert_eq!(merged.facts, vec!["works as a nurse"]);
        assert_eq!(merged.preferences, vec!["prefers quiet evenings"]);
        assert_eq!(merged.topics, vec!["work stress"]);

        // Persisted, not just returned
        assert_eq!(store.read(), merged);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let store = store();
        let d = delta(&["has two cats"], &[], &["loneliness"]);

        let once = store.merge(&d).unwrap();
        let twice = store.merge(&d).unwrap();

        assert_eq!(once, twice);
        assert_eq!(twice.facts.len(), 1);
        assert_eq!(twice.topics.len(), 1);
    }

    #[test]
    fn test_merge_union_is_order_independent() {
        let d1 = delta(&["fact one"], &[], &["topic a"]);
        let d2 = delta(&["fact two"], &["pref x"], &["topic a"]);

        let store_a = store();
        store_a.merge(&d1).unwrap();
        let ab = store_a.merge(&d2).unwrap();

        let store_b = store();
        store_b.merge(&d2).unwrap();
        let ba = store_b.merge(&d1).unwrap();

        // Same membership regardless of merge order
        let as_set = |v: &[String]| v.iter().cloned().collect::<HashSet<_>>();
        assert_eq!(as_set(&ab.facts), as_set(&ba.facts));
        assert_eq!(as_set(&ab.preferences), as_set(&ba.preferences));
        assert_eq!(as_set(&ab.topics), as_set(&ba.topics));
    }

    #[test]
    fn test_merge_dedup_is_case_sensitive() {
        let store = store();
        store.merge(&delta(&["Works as a nurse"], &[], &[])).unwrap();
        let merged = store.merge(&delta(&["works as a nurse"], &[], &[])).unwrap();

        // Exact-match dedup: different case means a different entry
        assert_eq!(merged.facts.len(), 2);
    }

    #[test]
    fn test_merge_preserves_insertion_order() {
        let store = store();
        store.merge(&delta(&["first"], &[], &[])).unwrap();
        store.merge(&delta(&["second", "first"], &[], &[])).unwrap();
        let merged = store.merge(&delta(&["third"], &[], &[])).unwrap();

        assert_eq!(merged.facts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_merge_empty_delta_is_noop() {
        let store = store();
        store.merge(&delta(&["a fact"], &[], &[])).unwrap();
        let merged = store.merge(&MemoryDelta::default()).unwrap();
        assert_eq!(merged.facts, vec!["a fact"]);
    }

    #[test]
    fn test_replace_overwrites() {
        let store = store();
        store.merge(&delta(&["old fact"], &[], &[])).unwrap();

        let mut replacement = WorkingMemory::empty("default");
        replacement.facts.push("only fact".to_string());
        store.replace(&replacement).unwrap();

        assert_eq!(store.read().facts, vec!["only fact"]);
    }

    #[test]
    fn test_clear_resets_to_default() {
        let store = store();
        store
            .merge(&delta(&["a fact"], &["a pref"], &["a topic"]))
            .unwrap();
        store.clear().unwrap();
        assert!(store.read().is_empty());
    }

    #[test]
    fn test_delta_tolerates_missing_fields() {
        let parsed: MemoryDelta = serde_json::from_str(r#"{"facts": ["one"]}"#).unwrap();
        assert_eq!(parsed.facts, vec!["one"]);
        assert!(parsed.preferences.is_empty());
        assert!(parsed.topics.is_empty());
        assert!(!parsed.is_empty());
    }

    #[test]
    fn test_memory_round_trip() {
        let store = store();
        let merged = store
            .merge(&delta(&["f1", "f2"], &["p1"], &["t1", "t2", "t3"]))
            .unwrap();

        let json = serde_json::to_string(&merged).unwrap();
        let parsed: WorkingMemory = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, merged);
    }
}
