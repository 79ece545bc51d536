//! Contact logging for an existing customer

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::Value;
use tracing::info;

use crate::api::customers::ContactEntry;
use crate::db::{contact_records, customers};
use crate::error::{ApiError, ApiResult};
use crate::validation::validate_contact_record;
use crate::AppState;

/// POST /customer/:id/records
///
/// Inserts the record and refreshes the customer's last-contact summary in
/// one transaction.
pub async fn store_contact_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<ContactEntry>)> {
    if customers::find_by_id(&state.db, id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Customer {} not found", id)));
    }

    let record = validate_contact_record(&body).map_err(ApiError::Validation)?;
    let stored = contact_records::log_contact(&state.db, id, &record).await?;
    info!(
        customer_id = id,
        contact_type = %record.contact_type,
        "contact:logged"
    );

    Ok((StatusCode::CREATED, Json(stored.into())))
}
