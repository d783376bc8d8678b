//! Durable key-value persistence for Hope Services clients.
//!
//! Provides a small storage port with in-memory and file backends, a typed
//! JSON [`Cache`] on top of it, and idempotency key records with expiry.
//!
//! # Example
//!
//! ```rust,ignore
//! use hope_cache::{Cache, FileStore, IdempotencyKeys};
//!
//! let cache = Cache::new(FileStore::open("storage.json")?);
//!
//! // Store and read back any serde type
//! cache.set("greeting", &"hello")?;
//! let greeting: Option<String> = cache.get("greeting")?;
//!
//! // Idempotency keys live in the same store
//! let keys = IdempotencyKeys::new(cache.clone());
//! let key = keys.key_for("last-order", "cart-digest")?;
//! ```

mod clock;
mod error;
mod idempotency;
mod kv;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CacheError;
pub use idempotency::{
    IdempotencyKey, IdempotencyKeys, IdempotencyRecord, DEFAULT_KEY_TTL_HOURS, IDEMPOTENCY_PREFIX,
};
pub use kv::Cache;
pub use store::{FileStore, KvStore, MemoryStore};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{Cache, CacheError, FileStore, IdempotencyKey, IdempotencyKeys, KvStore};
}
