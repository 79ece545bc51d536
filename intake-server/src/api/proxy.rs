//! Latest-customer listing proxy
//!
//! `GET /proxy/customer-latest?page&perPage`

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use intake_common::NormalizedRecord;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::pagination::{paginate, parse_page, parse_per_page, PageMeta};
use crate::pipeline::{load_latest, Source};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub page: Option<String>,
    #[serde(rename = "perPage")]
    pub per_page: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListingMeta {
    #[serde(flatten)]
    pub page: PageMeta,
    pub source: Source,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub data: Vec<NormalizedRecord>,
    pub meta: ListingMeta,
}

/// GET /proxy/customer-latest
///
/// Serves the cached listing when present (scheduling a background refresh),
/// otherwise fetches live. A failed live fetch is a 502.
pub async fn customer_latest(
    State(state): State<AppState>,
    Query(params): Query<ListingQuery>,
) -> ApiResult<Json<ListingResponse>> {
    let started = Instant::now();
    let page = parse_page(params.page.as_deref());
    let per_page = parse_per_page(params.per_page.as_deref());
    info!(page, per_page, "proxy:start");

    let (records, source) = load_latest(&state).await?;

    let (data, meta) = paginate(&records, page, per_page);
    info!(
        total = meta.total,
        returned = data.len(),
        last_page = meta.last_page,
        "proxy:paginate"
    );
    info!(
        source = ?source,
        ms = started.elapsed().as_millis() as u64,
        "proxy:done"
    );

    Ok(Json(ListingResponse {
        data,
        meta: ListingMeta { page: meta, source },
    }))
}
