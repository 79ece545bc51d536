//! Single-customer inspection refresh
//!
//! `POST /proxy/latest-inspection-refresh {customer_id, legacy_id}` pulls the
//! customer's newest inspection from the portal and replaces the stored
//! `latest_inspection` snapshot.

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use intake_common::filter::retain_acceptable;
use intake_common::models::InspectionSnapshot;
use intake_common::normalize;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::db::customers;
use crate::error::{ApiError, ApiResult};
use crate::validation::validate_refresh;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct RefreshedInspection {
    pub customer_id: i64,
    pub latest_inspection: InspectionSnapshot,
}

/// POST /proxy/latest-inspection-refresh
pub async fn refresh_latest_inspection(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<RefreshedInspection>> {
    let request = validate_refresh(&body).map_err(ApiError::Validation)?;
    if customers::find_by_id(&state.db, request.customer_id).await?.is_none() {
        return Err(ApiError::invalid(
            "customer_id",
            "The selected customer id is invalid.",
        ));
    }

    let started = Instant::now();
    info!(
        customer_id = request.customer_id,
        legacy_id = request.legacy_id,
        "latestInspection:start"
    );

    let payload = state.upstream.fetch_one(request.legacy_id).await.map_err(|e| {
        warn!(legacy_id = request.legacy_id, error = %e, "latestInspection:upstream_failed");
        ApiError::from(e)
    })?;

    let Some(record) = retain_acceptable(normalize(payload)).into_iter().next() else {
        warn!(legacy_id = request.legacy_id, "latestInspection:no_record");
        return Err(ApiError::NotFound(format!(
            "No inspection found for legacy customer {}",
            request.legacy_id
        )));
    };

    let snapshot = InspectionSnapshot::from(&record);
    let value = serde_json::to_value(&snapshot).map_err(|e| ApiError::Internal(e.to_string()))?;
    if !customers::update_latest_inspection(&state.db, request.customer_id, &value).await? {
        return Err(ApiError::NotFound(format!(
            "Customer {} not found",
            request.customer_id
        )));
    }

    info!(
        customer_id = request.customer_id,
        inspection_id = ?snapshot.inspection.id,
        ms = started.elapsed().as_millis() as u64,
        "latestInspection:done"
    );
    Ok(Json(RefreshedInspection {
        customer_id: request.customer_id,
        latest_inspection: snapshot,
    }))
}
