//! Durable session storage for the INMS client.
//!
//! This crate provides:
//! - the [`DurableStorage`] key/value abstraction
//! - a file-backed implementation (one JSON document per client profile)
//! - an in-memory implementation for tests and ephemeral sessions
//! - [`CredentialStore`], the typed view over the three session keys

mod credentials;
mod file;
mod keys;
mod memory;
mod traits;

pub use credentials::{CachedUser, CredentialPair, CredentialStore, StoredSession};
pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::DurableStorage;

use std::path::Path;
use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Create a CredentialStore persisted at `path`.
pub fn create_credential_store(path: &Path) -> CredentialStore {
    CredentialStore::new(Box::new(FileStorage::new(path)))
}

/// Create a CredentialStore that lives only as long as the process.
pub fn create_ephemeral_credential_store() -> CredentialStore {
    CredentialStore::new(Box::new(MemoryStorage::new()))
}
