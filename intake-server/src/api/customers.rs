//! Local customer endpoints
//!
//! Index, intake store, detail with contact history, and social link edits.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::db::customers::{self, CustomerListQuery, DEFAULT_SORT_FIELD, SORT_FIELDS};
use crate::db::{contact_records, ContactRecord, Customer};
use crate::error::{ApiError, ApiResult};
use crate::pagination::{leading_int, parse_page, PageMeta};
use crate::validation::{validate_social_media_links, validate_store_customer};
use crate::AppState;

const DEFAULT_INDEX_PER_PAGE: usize = 10;

/// Contact history page size on the detail view
pub const CONTACTS_PER_PAGE: usize = 5;

#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    pub search: Option<String>,
    pub page: Option<String>,
    pub per_page: Option<String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
}

/// Filters echoed back with the index
#[derive(Debug, Serialize)]
pub struct IndexFilters {
    pub search: String,
    pub per_page: usize,
    pub sort_field: &'static str,
    /// `1` ascending, anything else descending
    pub sort_order: i64,
}

#[derive(Debug, Serialize)]
pub struct CustomerIndex {
    pub data: Vec<CustomerView>,
    pub meta: PageMeta,
    pub filters: IndexFilters,
}

/// Customer as served, with its display name
#[derive(Debug, Serialize)]
pub struct CustomerView {
    #[serde(flatten)]
    pub customer: Customer,
    pub full_name: String,
}

impl From<Customer> for CustomerView {
    fn from(customer: Customer) -> Self {
        Self {
            full_name: customer.full_name(),
            customer,
        }
    }
}

/// `sort_order` as sent: numbers are truncated, `"asc"` is 1, else -1
fn parse_sort_order(raw: Option<&str>) -> i64 {
    let Some(raw) = raw.map(str::trim) else {
        return -1;
    };
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => n.trunc() as i64,
        _ if raw == "asc" => 1,
        _ => -1,
    }
}

fn sort_field(raw: Option<&str>) -> &'static str {
    let requested = raw.unwrap_or("").trim();
    SORT_FIELDS
        .iter()
        .copied()
        .find(|field| *field == requested)
        .unwrap_or(DEFAULT_SORT_FIELD)
}

/// GET /customers
pub async fn list_customers(
    State(state): State<AppState>,
    Query(params): Query<IndexQuery>,
) -> ApiResult<Json<CustomerIndex>> {
    let per_page = params
        .per_page
        .as_deref()
        .and_then(leading_int)
        .filter(|n| *n > 0)
        .map(|n| n as usize)
        .unwrap_or(DEFAULT_INDEX_PER_PAGE);
    let page = parse_page(params.page.as_deref());
    let search = params.search.as_deref().unwrap_or("").trim().to_string();
    let sort_field = sort_field(params.sort_field.as_deref());
    let sort_order = parse_sort_order(params.sort_order.as_deref());

    let query = CustomerListQuery {
        search: search.clone(),
        sort_field,
        ascending: sort_order == 1,
        limit: per_page as i64,
        offset: i64::try_from((page - 1).saturating_mul(per_page)).unwrap_or(i64::MAX),
    };
    let (rows, total) = customers::list(&state.db, &query).await?;

    let meta = PageMeta::new(total.max(0) as usize, page, per_page, rows.len());
    Ok(Json(CustomerIndex {
        data: rows.into_iter().map(CustomerView::from).collect(),
        meta,
        filters: IndexFilters {
            search,
            per_page,
            sort_field,
            sort_order,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct StoredCustomer {
    pub id: i64,
    pub message: &'static str,
}

/// POST /customers
///
/// Upserts by legacy id. The customer, its contact records and the
/// last-contact summary are written in one transaction after the whole
/// payload validates.
pub async fn store_customer(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<(StatusCode, Json<StoredCustomer>)> {
    let store = validate_store_customer(&body).map_err(ApiError::Validation)?;
    info!(
        legacy_id = store.customer.legacy_id,
        contacts = store.contacts.len(),
        "intake:store"
    );

    let id = customers::upsert_with_contacts(&state.db, &store.customer, &store.contacts)
        .await
        .map_err(|e| {
            error!(legacy_id = store.customer.legacy_id, error = %e, "intake:store_failed");
            ApiError::from(e)
        })?;

    info!(customer_id = id, legacy_id = store.customer.legacy_id, "intake:stored");
    Ok((
        StatusCode::CREATED,
        Json(StoredCustomer {
            id,
            message: "Customer saved.",
        }),
    ))
}

#[derive(Debug, Default, Deserialize)]
pub struct ShowQuery {
    pub page: Option<String>,
}

/// One contact history entry, `occurred_at` as RFC 3339
#[derive(Debug, Serialize)]
pub struct ContactEntry {
    pub id: i64,
    pub contact_type: String,
    pub call_outcome: Option<String>,
    pub call_direction: Option<String>,
    pub occurred_at: String,
    pub notes: Option<String>,
}

impl From<ContactRecord> for ContactEntry {
    fn from(record: ContactRecord) -> Self {
        Self {
            id: record.id,
            contact_type: record.contact_type,
            call_outcome: record.call_outcome,
            call_direction: record.call_direction,
            occurred_at: record.occurred_at.and_utc().to_rfc3339(),
            notes: record.notes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ContactPage {
    pub data: Vec<ContactEntry>,
    pub meta: PageMeta,
}

#[derive(Debug, Serialize)]
pub struct CustomerDetail {
    pub customer: CustomerView,
    pub contacts: ContactPage,
}

/// GET /customer/:id
pub async fn show_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ShowQuery>,
) -> ApiResult<Json<CustomerDetail>> {
    let customer = customers::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Customer {} not found", id)))?;

    let page = parse_page(params.page.as_deref());
    let offset = i64::try_from((page - 1).saturating_mul(CONTACTS_PER_PAGE)).unwrap_or(i64::MAX);
    let (records, total) =
        contact_records::page_for_customer(&state.db, id, CONTACTS_PER_PAGE as i64, offset).await?;

    let meta = PageMeta::new(total.max(0) as usize, page, CONTACTS_PER_PAGE, records.len());
    Ok(Json(CustomerDetail {
        customer: customer.into(),
        contacts: ContactPage {
            data: records.into_iter().map(ContactEntry::from).collect(),
            meta,
        },
    }))
}

/// PUT /customer/:id
///
/// Only `social_media_links` is editable; a missing or null list clears it.
pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> ApiResult<Json<CustomerView>> {
    let links = validate_social_media_links(&body).map_err(ApiError::Validation)?;

    if !customers::update_social_media_links(&state.db, id, links.as_deref()).await? {
        return Err(ApiError::NotFound(format!("Customer {} not found", id)));
    }

    let customer = customers::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Customer {} not found", id)))?;
    info!(customer_id = id, "customer:links_updated");
    Ok(Json(customer.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_order_parsing() {
        assert_eq!(parse_sort_order(None), -1);
        assert_eq!(parse_sort_order(Some("1")), 1);
        assert_eq!(parse_sort_order(Some("1.9")), 1);
        assert_eq!(parse_sort_order(Some("-1")), -1);
        assert_eq!(parse_sort_order(Some("asc")), 1);
        assert_eq!(parse_sort_order(Some("desc")), -1);
        assert_eq!(parse_sort_order(Some("0")), 0);
    }

    #[test]
    fn test_sort_field_allow_list() {
        assert_eq!(sort_field(Some("last_name")), "last_name");
        assert_eq!(sort_field(Some(" email_1 ")), "email_1");
        assert_eq!(sort_field(Some("id; DROP TABLE customers")), DEFAULT_SORT_FIELD);
        assert_eq!(sort_field(None), DEFAULT_SORT_FIELD);
    }
}
