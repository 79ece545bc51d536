//! Dashboard over the cached listing
//!
//! `GET /dashboard?page&perPage&olderMonths&search&sortBy&sortDir&realtorOnly`

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Local;
use tracing::info;

use crate::pipeline::warm_collection;
use crate::query::{query, DashboardQuery, QueryParams, QueryResult};
use crate::AppState;

/// GET /dashboard
///
/// Always answers; an unreachable portal with an empty cache yields no rows.
pub async fn dashboard(
    State(state): State<AppState>,
    Query(raw): Query<DashboardQuery>,
) -> Json<QueryResult> {
    let started = Instant::now();
    let params = QueryParams::from(&raw);
    info!(
        page = params.page,
        per_page = params.per_page,
        older_months = params.older_months,
        search = %params.search,
        sort_by = ?params.sort_by,
        sort_dir = ?params.sort_dir,
        realtor_only = params.realtor_only,
        "dashboard:start"
    );

    let records = warm_collection(&state, "dashboard").await;
    let result = query(&records, &params, Local::now().date_naive());

    info!(
        total = result.meta.page.total,
        returned = result.rows.len(),
        ms = started.elapsed().as_millis() as u64,
        "dashboard:render"
    );
    Json(result)
}
