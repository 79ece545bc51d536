//! Latest-customer pipeline: fetch, normalize, filter, dedupe, cache
//!
//! The cache stores records already filtered and deduplicated at fetch time.
//! Reads deduplicate again so customers converted since the last fetch drop
//! out immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use intake_common::filter::{candidate_legacy_ids, dedupe, retain_acceptable};
use intake_common::{normalize, NormalizedRecord};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{error, info, warn, Instrument, Span};

use crate::db::customers::find_existing_legacy_ids;
use crate::error::{ApiResult, FetchError};
use crate::upstream::FetchProfile;
use crate::AppState;

/// Where a listing response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Live,
}

/// Drop records whose legacy id already belongs to a local customer
pub async fn reject_existing(
    pool: &SqlitePool,
    records: &[NormalizedRecord],
) -> sqlx::Result<Vec<NormalizedRecord>> {
    let candidates = candidate_legacy_ids(records);
    if candidates.is_empty() {
        return Ok(records.to_vec());
    }
    let existing = find_existing_legacy_ids(pool, &candidates).await?;
    Ok(dedupe(records, &existing))
}

/// Current listing for the proxy endpoint
///
/// A cache hit returns immediately and schedules a background refresh. A
/// miss fetches synchronously; if that fails nothing is cached.
pub async fn load_latest(state: &AppState) -> ApiResult<(Vec<NormalizedRecord>, Source)> {
    if let Some(cached) = state.collection.get() {
        let records = reject_existing(&state.db, &cached).await?;
        info!(cached = cached.len(), total = records.len(), "proxy:cache_hit");
        spawn_background_refresh(state);
        return Ok((records, Source::Cache));
    }

    info!("proxy:cache_miss");
    let records = fetch_and_cache(state, FetchProfile::FULL_REFRESH).await?;
    Ok((records, Source::Live))
}

/// Fetch the listing, run it through normalize/filter/dedupe and cache it
pub async fn fetch_and_cache(
    state: &AppState,
    profile: FetchProfile,
) -> ApiResult<Vec<NormalizedRecord>> {
    let started = Instant::now();
    let payload = match state.upstream.fetch_latest(profile).await {
        Ok(payload) => payload,
        Err(err) => {
            let ms = started.elapsed().as_millis() as u64;
            match &err {
                FetchError::Rejected { status } => {
                    warn!(profile = profile.name, status, ms, "proxy:upstream_not_ok")
                }
                other => {
                    error!(profile = profile.name, ms, error = %other, "proxy:upstream_exception")
                }
            }
            return Err(err.into());
        }
    };
    info!(
        profile = profile.name,
        ms = started.elapsed().as_millis() as u64,
        "proxy:upstream_response"
    );

    let normalized = normalize(payload);
    let raw_count = normalized.len();
    let records = reject_existing(&state.db, &retain_acceptable(normalized)).await?;

    state.collection.put(records.clone(), state.collection_ttl);
    info!(raw_count, normalized_count = records.len(), "proxy:normalized_cached");
    Ok(records)
}

/// Clears the in-flight flag even if the refresh task panics
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Start a detached background refresh unless one is already running
///
/// The task inherits the caller's span so its log lines keep the request's
/// correlation id. Its outcome is only logged. Returns whether a task was
/// started.
pub fn spawn_background_refresh(state: &AppState) -> bool {
    if state.refresh_in_flight.swap(true, Ordering::AcqRel) {
        info!("proxy:bg_refresh_skipped");
        return false;
    }

    let guard = InFlightGuard(Arc::clone(&state.refresh_in_flight));
    let state = state.clone();
    tokio::spawn(
        async move {
            let _guard = guard;
            match fetch_and_cache(&state, FetchProfile::BACKGROUND_WARM).await {
                Ok(records) => info!(count = records.len(), "proxy:bg_refresh_done"),
                Err(err) => warn!(error = %err, "proxy:bg_refresh_failed"),
            }
        }
        .instrument(Span::current()),
    );
    info!("proxy:bg_refresh_started");
    true
}

/// Cached collection, warming it once from upstream when empty
///
/// Warm-up failures are logged and swallowed; the result is then whatever
/// the cache holds, possibly nothing.
pub async fn warm_collection(state: &AppState, event_prefix: &str) -> Arc<Vec<NormalizedRecord>> {
    if let Some(cached) = state.collection.get() {
        return cached;
    }

    warn!("{}:cache_miss", event_prefix);
    match fetch_and_cache(state, FetchProfile::ON_DEMAND_WARM).await {
        Ok(records) => info!(count = records.len(), "{}:warm_done", event_prefix),
        Err(err) => warn!(error = %err, "{}:warm_failed", event_prefix),
    }

    state.collection.get().unwrap_or_default()
}
