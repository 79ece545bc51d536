//! In-process caches
//!
//! [`CollectionCache`] is the single slot holding the latest normalized
//! collection. [`IntakeTokens`] maps short-lived intake tokens to one record
//! each. Neither is ever held across a network call.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use intake_common::NormalizedRecord;
use moka::future::Cache;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::time::Instant;

/// Length of a minted intake token
pub const TOKEN_LEN: usize = 20;

#[derive(Debug)]
struct CachedCollection {
    records: Arc<Vec<NormalizedRecord>>,
    expires_at: Instant,
}

/// Process-wide TTL slot for the normalized collection
///
/// Readers get a shared snapshot without taking a lock; a `put` swaps the
/// whole value atomically, so a reader sees either the previous collection or
/// the new one in full and never waits on a writer.
#[derive(Debug, Default)]
pub struct CollectionCache {
    slot: ArcSwapOption<CachedCollection>,
}

impl CollectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current collection, or `None` if never populated or expired
    pub fn get(&self) -> Option<Arc<Vec<NormalizedRecord>>> {
        self.slot
            .load_full()
            .filter(|cached| Instant::now() < cached.expires_at)
            .map(|cached| Arc::clone(&cached.records))
    }

    /// Replace the collection and reset its expiry
    pub fn put(&self, records: Vec<NormalizedRecord>, ttl: Duration) {
        self.slot.store(Some(Arc::new(CachedCollection {
            records: Arc::new(records),
            expires_at: Instant::now() + ttl,
        })));
    }

    pub fn invalidate(&self) {
        self.slot.store(None);
    }
}

/// Intake token store; every entry expires on its own schedule
#[derive(Clone)]
pub struct IntakeTokens {
    entries: Cache<String, NormalizedRecord>,
}

impl IntakeTokens {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder().time_to_live(ttl).build(),
        }
    }

    /// Bind a fresh random token to `record`
    pub async fn mint(&self, record: NormalizedRecord) -> String {
        let token = generate_token();
        self.entries.insert(token.clone(), record).await;
        token
    }

    /// Resolve a token; re-reads are allowed until it expires
    pub async fn resolve(&self, token: &str) -> Option<NormalizedRecord> {
        if token.is_empty() {
            return None;
        }
        self.entries.get(token).await
    }
}

fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}
