//! Key-value storage backends for persisted tokens
//!
//! Two scopes are provided: a durable scope that survives restarts
//! (`FileStore`) and a session scope that lives as long as the process
//! (`MemoryStore`). Both sit behind the same synchronous interface.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StorageError;

pub trait KeyValueStore: Send + Sync {
    /// Absence is a normal outcome, not an error.
    fn get(&self, key: &str) -> Option<String>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing a missing key is a no-op.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
