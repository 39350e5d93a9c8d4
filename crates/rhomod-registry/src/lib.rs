//! # rhomod-registry
//!
//! Content-addressed registry of published Rholang modules.
//!
//! This crate provides:
//! - `ContentHash` (Keccak-256 of raw module source)
//! - `ModuleHandle` and the `Publisher` seam the ledger side implements
//! - `RegistryStore` with JSONL-file and in-memory backends
//! - `Registry`, which publishes each distinct source at most once
//!
//! ## Data model
//!
//! ```text
//! registry.jsonl (on disk, one line per published module)
//!     ↕  load on open / append on insert
//! Registry (in-memory index + single-flight slots per content hash)
//! ```

pub mod config;
pub mod handle;
pub mod hash;
pub mod jsonl;
pub mod registry;
pub mod store;

pub use config::{
    DEFAULT_LOCK_RETRIES, DEFAULT_LOCK_RETRY_DELAY_MS, DEFAULT_REGISTRY_PATH, RegistryConfig,
};
pub use handle::{DeploymentError, FnPublisher, ModuleHandle, Publisher, publisher_fn};
pub use hash::{CONTENT_HASH_LEN, ContentHash, ContentHashParseError};
pub use jsonl::{
    JsonlError, RegistryEntry, append_entry_to_path, parse_entries, read_entries_from_path,
};
pub use registry::{Registry, RegistryError};
pub use store::{InMemoryStore, JsonlFileStore, RegistryStore, StoreError, registry_lock_path};
