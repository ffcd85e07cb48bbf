//! Working memory for cross-conversation personalization
//!
//! This module holds the durable memory store and the extractor that
//! proposes new entries from completed conversations.

pub mod extractor;
pub mod store;

pub use extractor::MemoryExtractor;
pub use store::{MemoryDelta, MemoryStore, WorkingMemory};
