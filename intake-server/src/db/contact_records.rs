//! Contact record persistence and the per-customer last-contact summary

use chrono::{NaiveDateTime, Utc};
use intake_common::models::{CallDirection, CallOutcome, ContactType};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, SqliteConnection, SqlitePool};

/// Stored contact attempt
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct ContactRecord {
    pub id: i64,
    pub customer_id: i64,
    pub contact_type: String,
    pub call_outcome: Option<String>,
    pub call_direction: Option<String>,
    pub occurred_at: NaiveDateTime,
    pub notes: Option<String>,
    pub meta: Option<Json<serde_json::Value>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Validated contact attempt awaiting insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewContactRecord {
    pub contact_type: ContactType,
    pub call_outcome: Option<CallOutcome>,
    pub call_direction: Option<CallDirection>,
    pub occurred_at: NaiveDateTime,
    pub notes: Option<String>,
}

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    customer_id: i64,
    record: &NewContactRecord,
    now: NaiveDateTime,
) -> sqlx::Result<i64> {
    sqlx::query_scalar(
        r#"
        INSERT INTO contact_records (
            customer_id, contact_type, call_outcome, call_direction,
            occurred_at, notes, meta, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, '{}', ?, ?)
        RETURNING id
        "#,
    )
    .bind(customer_id)
    .bind(record.contact_type.as_str())
    .bind(record.call_outcome.map(|o| o.as_str()))
    .bind(record.call_direction.map(|d| d.as_str()))
    .bind(record.occurred_at)
    .bind(&record.notes)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await
}

/// Recompute `last_contact_at`/`last_contact_type` from the newest record
pub(crate) async fn refresh_summary(conn: &mut SqliteConnection, customer_id: i64) -> sqlx::Result<()> {
    let latest: Option<(NaiveDateTime, String)> = sqlx::query_as(
        r#"
        SELECT occurred_at, contact_type FROM contact_records
        WHERE customer_id = ?
        ORDER BY occurred_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(customer_id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some((occurred_at, contact_type)) = latest {
        sqlx::query(
            "UPDATE customers SET last_contact_at = ?, last_contact_type = ?, updated_at = ? WHERE id = ?",
        )
        .bind(occurred_at)
        .bind(contact_type)
        .bind(Utc::now().naive_utc())
        .bind(customer_id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Log one contact attempt and refresh the summary atomically
pub async fn log_contact(
    pool: &SqlitePool,
    customer_id: i64,
    record: &NewContactRecord,
) -> sqlx::Result<ContactRecord> {
    let now = Utc::now().naive_utc();
    let mut tx = pool.begin().await?;

    let id = insert(&mut tx, customer_id, record, now).await?;
    refresh_summary(&mut tx, customer_id).await?;

    let stored = sqlx::query_as::<_, ContactRecord>(
        r#"
        SELECT id, customer_id, contact_type, call_outcome, call_direction,
               occurred_at, notes, meta, created_at, updated_at
        FROM contact_records WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(stored)
}

/// Newest-first page of a customer's contact history plus its total count
pub async fn page_for_customer(
    pool: &SqlitePool,
    customer_id: i64,
    limit: i64,
    offset: i64,
) -> sqlx::Result<(Vec<ContactRecord>, i64)> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_records WHERE customer_id = ?")
        .bind(customer_id)
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, ContactRecord>(
        r#"
        SELECT id, customer_id, contact_type, call_outcome, call_direction,
               occurred_at, notes, meta, created_at, updated_at
        FROM contact_records
        WHERE customer_id = ?
        ORDER BY occurred_at DESC, id DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(customer_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok((rows, total))
}
