//! Idempotency key records using the key-value store.
//!
//! A checkout attempt is tagged with a key that the server uses to recognise
//! resubmissions. The key is stored under an order context so a retry of the
//! same logical attempt can reuse it until it expires.

use std::sync::Arc;

use chrono::Duration;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::{storage_key, Cache, CacheError};

/// Storage namespace for idempotency records.
pub const IDEMPOTENCY_PREFIX: &str = "idempotency";

/// How long a stored key stays reusable.
pub const DEFAULT_KEY_TTL_HOURS: i64 = 24;

const SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// An opaque idempotency token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Wrap an existing token.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for IdempotencyKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for IdempotencyKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A stored key together with its creation time in Unix milliseconds.
///
/// `fingerprint` identifies the payload the key was issued for. Records
/// written without one still satisfy [`IdempotencyKeys::retrieve_key`] but
/// are never reused by [`IdempotencyKeys::key_for`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub key: IdempotencyKey,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Generates, stores and retrieves idempotency keys.
///
/// # Example
///
/// ```rust,ignore
/// let keys = IdempotencyKeys::new(cache);
/// let key = keys.key_for("last-order", &request_digest)?;
/// // ... submit with `key`; retrying the same payload hands back the same token.
/// ```
#[derive(Clone)]
pub struct IdempotencyKeys {
    cache: Cache,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl std::fmt::Debug for IdempotencyKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdempotencyKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl IdempotencyKeys {
    /// Create a key manager over `cache` using the system clock.
    pub fn new(cache: Cache) -> Self {
        Self {
            cache,
            clock: Arc::new(SystemClock),
            ttl: Duration::hours(DEFAULT_KEY_TTL_HOURS),
        }
    }

    /// Use a different clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the expiry window.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Generate a fresh key: `<unix-millis>-<9 base36 chars>`.
    ///
    /// Unique enough to tell one user's attempts apart; not a secret.
    pub fn generate_key(&self) -> IdempotencyKey {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        IdempotencyKey(format!("{}-{}", self.now_millis(), suffix))
    }

    /// Persist `key` for `context`, stamped with the current time.
    pub fn store_key(&self, context: &str, key: &IdempotencyKey) -> Result<(), CacheError> {
        self.write_record(context, key, None)
    }

    /// Return the key stored for `context` unless it has expired.
    ///
    /// A record that cannot be decoded, or whose timestamp lies in the
    /// future, is treated as absent.
    pub fn retrieve_key(&self, context: &str) -> Result<Option<IdempotencyKey>, CacheError> {
        Ok(self.live_record(context)?.map(|record| record.key))
    }

    /// Remove any record for `context`.
    pub fn forget_key(&self, context: &str) -> Result<(), CacheError> {
        self.cache.delete(&Self::record_key(context))
    }

    /// Reuse the live key for `context` if it was issued for the same
    /// `fingerprint`, otherwise generate and store a new one.
    pub fn key_for(&self, context: &str, fingerprint: &str) -> Result<IdempotencyKey, CacheError> {
        if let Some(record) = self.live_record(context)? {
            if record.fingerprint.as_deref() == Some(fingerprint) {
                tracing::debug!(context, key = %record.key, "reusing idempotency key");
                return Ok(record.key);
            }
            tracing::debug!(context, key = %record.key, "payload changed, replacing idempotency key");
        }
        let key = self.generate_key();
        self.write_record(context, &key, Some(fingerprint))?;
        tracing::debug!(context, key = %key, "generated idempotency key");
        Ok(key)
    }

    fn live_record(&self, context: &str) -> Result<Option<IdempotencyRecord>, CacheError> {
        let record = match self.cache.get::<IdempotencyRecord>(&Self::record_key(context)) {
            Ok(record) => record,
            Err(CacheError::SerializeError(e)) => {
                tracing::warn!(context, error = %e, "discarding unreadable idempotency record");
                None
            }
            Err(e) => return Err(e),
        };

        Ok(record.filter(|record| {
            let age = self.now_millis().checked_sub(record.timestamp);
            let live = matches!(age, Some(age) if (0..self.ttl.num_milliseconds()).contains(&age));
            if !live {
                tracing::debug!(context, timestamp = record.timestamp, "stored idempotency key expired");
            }
            live
        }))
    }

    fn write_record(
        &self,
        context: &str,
        key: &IdempotencyKey,
        fingerprint: Option<&str>,
    ) -> Result<(), CacheError> {
        let record = IdempotencyRecord {
            key: key.clone(),
            timestamp: self.now_millis(),
            fingerprint: fingerprint.map(str::to_string),
        };
        self.cache.set(&Self::record_key(context), &record)
    }

    fn now_millis(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn record_key(context: &str) -> String {
        storage_key!(IDEMPOTENCY_PREFIX, context)
    }
}
