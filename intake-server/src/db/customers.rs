//! Customer persistence

use std::collections::{BTreeSet, HashSet};

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, SqlitePool};

use super::contact_records::{self, NewContactRecord};

/// Locally owned customer row
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Customer {
    pub id: i64,
    pub legacy_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_1: Option<String>,
    pub phone_2: Option<String>,
    pub email_1: Option<String>,
    pub email_2: Option<String>,
    pub social_media_links: Option<Json<Vec<String>>>,
    pub is_realtor: bool,
    pub latest_inspection: Option<Json<serde_json::Value>>,
    pub last_contact_at: Option<NaiveDateTime>,
    pub last_contact_type: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Customer {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Validated customer fields, keyed by legacy id
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerUpsert {
    pub legacy_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub phone_1: Option<String>,
    pub phone_2: Option<String>,
    pub email_1: Option<String>,
    pub email_2: Option<String>,
    pub is_realtor: bool,
    pub latest_inspection: serde_json::Value,
}

/// Sortable columns of the customer index
pub const SORT_FIELDS: &[&str] = &[
    "last_name",
    "phone_1",
    "email_1",
    "is_realtor",
    "last_contact_at",
    "created_at",
    "updated_at",
];

pub const DEFAULT_SORT_FIELD: &str = "created_at";

/// Filter, order and page window for [`list`]
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerListQuery {
    pub search: String,
    /// One of [`SORT_FIELDS`]
    pub sort_field: &'static str,
    pub ascending: bool,
    pub limit: i64,
    pub offset: i64,
}

const SELECT_COLUMNS: &str = "id, legacy_id, first_name, last_name, phone_1, phone_2, email_1, \
     email_2, social_media_links, is_realtor, latest_inspection, last_contact_at, \
     last_contact_type, created_at, updated_at";

/// Which of `ids` already belong to local customers, in one query
pub async fn find_existing_legacy_ids(
    pool: &SqlitePool,
    ids: &BTreeSet<i64>,
) -> sqlx::Result<HashSet<i64>> {
    if ids.is_empty() {
        return Ok(HashSet::new());
    }

    let id_list = serde_json::Value::from(ids.iter().copied().collect::<Vec<i64>>()).to_string();
    let found: Vec<i64> = sqlx::query_scalar(
        "SELECT legacy_id FROM customers WHERE legacy_id IN (SELECT value FROM json_each(?))",
    )
    .bind(id_list)
    .fetch_all(pool)
    .await?;

    Ok(found.into_iter().collect())
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> sqlx::Result<Option<Customer>> {
    sqlx::query_as::<_, Customer>(&format!("SELECT {} FROM customers WHERE id = ?", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_legacy_id(pool: &SqlitePool, legacy_id: i64) -> sqlx::Result<Option<Customer>> {
    sqlx::query_as::<_, Customer>(&format!(
        "SELECT {} FROM customers WHERE legacy_id = ?",
        SELECT_COLUMNS
    ))
    .bind(legacy_id)
    .fetch_optional(pool)
    .await
}

/// One page of customers plus the total match count
pub async fn list(pool: &SqlitePool, query: &CustomerListQuery) -> sqlx::Result<(Vec<Customer>, i64)> {
    // sort_field is always one of SORT_FIELDS, never caller text
    let sort_column = if SORT_FIELDS.contains(&query.sort_field) {
        query.sort_field
    } else {
        DEFAULT_SORT_FIELD
    };
    let order_expr = if sort_column == "last_name" {
        "last_name COLLATE NOCASE"
    } else {
        sort_column
    };
    let direction = if query.ascending { "ASC" } else { "DESC" };

    let search = query.search.trim();
    let filter = if search.is_empty() {
        ""
    } else {
        " WHERE first_name LIKE ?1 OR last_name LIKE ?1 OR email_1 LIKE ?1 OR phone_1 LIKE ?1"
    };
    let pattern = format!("%{}%", search);

    let count_sql = format!("SELECT COUNT(*) FROM customers{}", filter);
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    if !search.is_empty() {
        count_query = count_query.bind(&pattern);
    }
    let total = count_query.fetch_one(pool).await?;

    let page_sql = format!(
        "SELECT {} FROM customers{} ORDER BY {} {}, id {} LIMIT {} OFFSET {}",
        SELECT_COLUMNS,
        filter,
        order_expr,
        direction,
        direction,
        query.limit.max(1),
        query.offset.max(0)
    );
    let mut page_query = sqlx::query_as::<_, Customer>(&page_sql);
    if !search.is_empty() {
        page_query = page_query.bind(&pattern);
    }
    let rows = page_query.fetch_all(pool).await?;

    Ok((rows, total))
}

/// Insert or update a customer by legacy id, together with its new contacts
///
/// Runs in one transaction: either the customer, every contact record and the
/// refreshed last-contact summary are written, or nothing is. Existing social
/// media links are kept on update.
pub async fn upsert_with_contacts(
    pool: &SqlitePool,
    customer: &CustomerUpsert,
    contacts: &[NewContactRecord],
) -> sqlx::Result<i64> {
    let now = Utc::now().naive_utc();
    let mut tx = pool.begin().await?;

    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO customers (
            legacy_id, first_name, last_name, phone_1, phone_2, email_1, email_2,
            social_media_links, is_realtor, latest_inspection, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, '[]', ?, ?, ?, ?)
        ON CONFLICT(legacy_id) DO UPDATE SET
            first_name = excluded.first_name,
            last_name = excluded.last_name,
            phone_1 = excluded.phone_1,
            phone_2 = excluded.phone_2,
            email_1 = excluded.email_1,
            email_2 = excluded.email_2,
            is_realtor = excluded.is_realtor,
            latest_inspection = excluded.latest_inspection,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(customer.legacy_id)
    .bind(&customer.first_name)
    .bind(&customer.last_name)
    .bind(&customer.phone_1)
    .bind(&customer.phone_2)
    .bind(&customer.email_1)
    .bind(&customer.email_2)
    .bind(customer.is_realtor)
    .bind(Json(&customer.latest_inspection))
    .bind(now)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    for contact in contacts {
        contact_records::insert(&mut tx, id, contact, now).await?;
    }
    contact_records::refresh_summary(&mut tx, id).await?;

    tx.commit().await?;
    Ok(id)
}

/// Replace social media links; `false` when the customer does not exist
pub async fn update_social_media_links(
    pool: &SqlitePool,
    id: i64,
    links: Option<&[String]>,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE customers SET social_media_links = ?, updated_at = ? WHERE id = ?",
    )
    .bind(links.map(Json))
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Replace the latest inspection snapshot; `false` when the customer does not exist
pub async fn update_latest_inspection(
    pool: &SqlitePool,
    id: i64,
    snapshot: &serde_json::Value,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "UPDATE customers SET latest_inspection = ?, updated_at = ? WHERE id = ?",
    )
    .bind(Json(snapshot))
    .bind(Utc::now().naive_utc())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}
