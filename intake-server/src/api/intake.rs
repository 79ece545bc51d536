//! Intake start and form prefill
//!
//! Starting an intake binds the cached legacy record to a short-lived token;
//! the create form resolves the token back into prefill data.

use axum::extract::{Path, Query, State};
use axum::Json;
use intake_common::NormalizedRecord;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::customers;
use crate::error::{ApiError, ApiResult};
use crate::pipeline::warm_collection;
use crate::AppState;

pub const SESSION_EXPIRED: &str = "Session expired. Please start intake again.";

#[derive(Debug, Serialize)]
pub struct IntakeStarted {
    pub token: String,
    pub legacy_id: i64,
    /// Where the client continues the intake
    pub redirect: String,
}

/// GET /customer/intake/:legacy_id
///
/// Looks the id up in the cached listing, warming the cache once when it is
/// empty.
pub async fn start_intake(
    State(state): State<AppState>,
    Path(legacy_id): Path<i64>,
) -> ApiResult<Json<IntakeStarted>> {
    info!(legacy_id, "intake:start");

    let records = warm_collection(&state, "intake").await;
    let Some(record) = records
        .iter()
        .find(|r| r.customer.id == Some(legacy_id))
        .cloned()
    else {
        warn!(legacy_id, cached = records.len(), "intake:not_found");
        return Err(ApiError::NotFound(
            "Customer not found in source data.".to_string(),
        ));
    };

    let token = state.tokens.mint(record).await;
    info!(legacy_id, "intake:token_minted");

    Ok(Json(IntakeStarted {
        redirect: format!("/customer/create?token={}", token),
        token,
        legacy_id,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateFormQuery {
    pub token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateForm {
    pub token: Option<String>,
    pub initial: Option<NormalizedRecord>,
    /// Local customer already converted from the same legacy id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_customer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// GET /customer/create?token
pub async fn create_form(
    State(state): State<AppState>,
    Query(params): Query<CreateFormQuery>,
) -> ApiResult<Json<CreateForm>> {
    let token = params.token.unwrap_or_default();
    let Some(initial) = state.tokens.resolve(&token).await else {
        info!("intake:token_expired");
        return Ok(Json(CreateForm {
            token: None,
            initial: None,
            existing_customer_id: None,
            message: Some(SESSION_EXPIRED),
        }));
    };

    let existing_customer_id = match initial.customer.id {
        Some(legacy_id) => customers::find_by_legacy_id(&state.db, legacy_id)
            .await?
            .map(|c| c.id),
        None => None,
    };

    Ok(Json(CreateForm {
        token: Some(token),
        initial: Some(initial),
        existing_customer_id,
        message: None,
    }))
}
