//! Local persistence for conversations, working memory, and the system prompt
//!
//! Everything Confide persists goes through a small key-value contract:
//! `get`/`set`/`remove` over three fixed logical keys, with all values
//! serialized as JSON text. The embedded `sled` store backs normal runs; an
//! in-memory implementation backs tests. Reads tolerate absent and malformed
//! data by falling back to documented defaults — a corrupt store must never
//! crash the application.

use crate::error::{ConfideError, Result};
use crate::session::Conversation;
use directories::ProjectDirs;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

/// Logical storage keys
///
/// Passed to the stores at construction time rather than read from module
/// globals, so tests can isolate state behind distinct keys or fresh fakes.
#[derive(Debug, Clone)]
pub struct StorageKeys {
    /// Key holding the conversation collection
    pub conversations: String,
    /// Key holding the working memory
    pub working_memory: String,
    /// Key holding the custom system prompt override
    pub system_prompt: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            conversations: "confide_conversations".to_string(),
            working_memory: "confide_working_memory".to_string(),
            system_prompt: "confide_system_prompt".to_string(),
        }
    }
}

/// Key-value persistence contract
///
/// The three logical keys in `StorageKeys` are the only keys Confide uses.
pub trait KvStore: Send + Sync {
    /// Read the value stored under a key, if any
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value under a key, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key and its value
    fn remove(&self, key: &str) -> Result<()>;
}

/// Embedded key-value store backed by `sled`
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open the store in the application data directory
    ///
    /// The `CONFIDE_DATA_DIR` environment variable overrides the platform
    /// data directory, and an explicit `data_dir` overrides the platform
    /// default but not the environment variable. This makes it easy to
    /// point the binary at a test directory without touching user data.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Optional data directory from configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Storage` if the directory cannot be resolved
    /// or the database cannot be opened
    pub fn open(data_dir: Option<&str>) -> Result<Self> {
        let dir = if let Ok(override_dir) = std::env::var("CONFIDE_DATA_DIR") {
            PathBuf::from(override_dir)
        } else if let Some(dir) = data_dir {
            PathBuf::from(dir)
        } else {
            let proj_dirs = ProjectDirs::from("app", "confide", "confide").ok_or_else(|| {
                ConfideError::Storage("Could not determine data directory".to_string())
            })?;
            proj_dirs.data_dir().to_path_buf()
        };

        Self::open_at(dir)
    }

    /// Open the store at an explicit path
    ///
    /// Primarily useful for tests where the default application data
    /// directory is not desirable.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory for the database files
    ///
    /// # Examples
    ///
    /// ```
    /// use confide::storage::SledStore;
    ///
    /// let dir = tempfile::TempDir::new().unwrap();
    /// let store = SledStore::open_at(dir.path().join("store")).unwrap();
    /// ```
    pub fn open_at(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfideError::Storage(format!("Failed to create data dir: {}", e)))?;
        }

        let db = sled::open(&path)
            .map_err(|e| ConfideError::Storage(format!("Failed to open database: {}", e)))?;
        Ok(Self { db })
    }
}

impl KvStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self
            .db
            .get(key.as_bytes())
            .map_err(|e| ConfideError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.db
            .insert(key.as_bytes(), value.as_bytes())
            .map_err(|e| ConfideError::Storage(format!("Insert failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| ConfideError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.db
            .remove(key.as_bytes())
            .map_err(|e| ConfideError::Storage(format!("Remove failed: {}", e)))?;
        self.db
            .flush()
            .map_err(|e| ConfideError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

/// In-memory key-value store
///
/// Behaves like `SledStore` without touching disk. Used by tests and
/// available for ephemeral sessions.
#[derive(Default)]
pub struct MemoryKv {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKv {
    /// Create an empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ConfideError::Storage("Store lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ConfideError::Storage("Store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ConfideError::Storage("Store lock poisoned".to_string()))?;
        entries.remove(key);
        Ok(())
    }
}

/// Persisted collection of conversations
///
/// Conversations are stored as one JSON array under a single key, newest
/// entries appended last. Absent or malformed stored data reads as an
/// empty collection.
pub struct ConversationStore {
    kv: Arc<dyn KvStore>,
    key: String,
}

impl ConversationStore {
    /// Create a store over the given key-value backend
    ///
    /// # Arguments
    ///
    /// * `kv` - Key-value backend
    /// * `keys` - Logical storage keys
    pub fn new(kv: Arc<dyn KvStore>, keys: &StorageKeys) -> Self {
        Self {
            kv,
            key: keys.conversations.clone(),
        }
    }

    /// List all stored conversations
    ///
    /// Absent or malformed stored data yields an empty list rather than
    /// an error.
    pub fn list(&self) -> Vec<Conversation> {
        match self.kv.get(&self.key) {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(conversations) => conversations,
                Err(e) => {
                    tracing::warn!("Stored conversations are malformed, treating as empty: {}", e);
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read conversations, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    /// Look up a conversation by id or unambiguous id prefix
    ///
    /// # Arguments
    ///
    /// * `id` - Full UUID or a prefix of one
    ///
    /// # Returns
    ///
    /// Returns the conversation when exactly one id matches
    pub fn get(&self, id: &str) -> Option<Conversation> {
        let conversations = self.list();

        if let Some(exact) = conversations.iter().find(|c| c.id == id) {
            return Some(exact.clone());
        }

        let mut matches = conversations.iter().filter(|c| c.id.starts_with(id));
        let first = matches.next()?;
        if matches.next().is_some() {
            tracing::warn!("Conversation id prefix '{}' is ambiguous", id);
            return None;
        }
        Some(first.clone())
    }

    /// Insert or update a conversation by id
    ///
    /// # Arguments
    ///
    /// * `conversation` - The conversation snapshot to persist
    ///
    /// # Errors
    ///
    /// Returns `ConfideError::Storage` if the write fails
    pub fn save(&self, conversation: &Conversation) -> Result<()> {
        let mut conversations = self.list();
        match conversations.iter_mut().find(|c| c.id == conversation.id) {
            Some(existing) => *existing = conversation.clone(),
            None => conversations.push(conversation.clone()),
        }
        self.write(&conversations)
    }

    /// Delete a conversation by exact id
    ///
    /// # Arguments
    ///
    /// * `id` - The conversation id
    ///
    /// # Returns
    ///
    /// Returns true when a conversation was removed
    pub fn delete(&self, id: &str) -> Result<bool> {
        let mut conversations = self.list();
        let before = conversations.len();
        conversations.retain(|c| c.id != id);
        let removed = conversations.len() < before;
        if removed {
            self.write(&conversations)?;
        }
        Ok(removed)
    }

    /// Remove the entire conversation collection
    pub fn clear(&self) -> Result<()> {
        self.kv.remove(&self.key)
    }

    fn write(&self, conversations: &[Conversation]) -> Result<()> {
        let json = serde_json::to_string(conversations)
            .map_err(|e| ConfideError::Storage(format!("Serialization failed: {}", e)))?;
        self.kv.set(&self.key, &json)
    }
}

/// Persisted system prompt override
///
/// The default prompt is injected at construction rather than read from a
/// module global; `current()` returns the override when one is stored and
/// the default otherwise.
pub struct PromptStore {
    kv: Arc<dyn KvStore>,
    key: String,
    default_prompt: String,
}

impl PromptStore {
    /// Create a store over the given key-value backend
    ///
    /// # Arguments
    ///
    /// * `kv` - Key-value backend
    /// * `keys` - Logical storage keys
    /// * `default_prompt` - Prompt used when no override is stored
    pub fn new(kv: Arc<dyn KvStore>, keys: &StorageKeys, default_prompt: impl Into<String>) -> Self {
        Self {
            kv,
            key: keys.system_prompt.clone(),
            default_prompt: default_prompt.into(),
        }
    }

    /// The effective base system prompt
    pub fn current(&self) -> String {
        match self.kv.get(&self.key) {
            Ok(Some(prompt)) if !prompt.trim().is_empty() => prompt,
            Ok(_) => self.default_prompt.clone(),
            Err(e) => {
                tracing::warn!("Failed to read system prompt, using default: {}", e);
                self.default_prompt.clone()
            }
        }
    }

    /// Whether an override is currently stored
    pub fn is_overridden(&self) -> bool {
        matches!(self.kv.get(&self.key), Ok(Some(p)) if !p.trim().is_empty())
    }

    /// Store a prompt override
    ///
    /// # Arguments
    ///
    /// * `prompt` - The replacement base prompt
    pub fn set(&self, prompt: &str) -> Result<()> {
        self.kv.set(&self.key, prompt)
    }

    /// Remove the override, restoring the default prompt
    pub fn reset(&self) -> Result<()> {
        self.kv.remove(&self.key)
    }
}
