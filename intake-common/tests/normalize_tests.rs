//! End-to-end tests of legacy body → normalized, retained, deduplicated records

use intake_common::filter::{candidate_legacy_ids, dedupe, retain_acceptable};
use intake_common::{normalize, LegacyPayload};
use serde_json::json;
use std::collections::HashSet;

fn listing_body() -> serde_json::Value {
    json!([
        {
            "customer_id": 7,
            "first_name": "Dana",
            "phone_number": "5551234567",
            "inspection_number": 99,
            "inspection_date": "2024-03-05",
            "total_fee": "1234.5"
        },
        {
            "customer_id": 8,
            "first_name": "No contact",
            "inspection_number": 100
        },
        {
            "customer_id": 9,
            "email": "Lee@Example.com",
            "inspection_number": "101"
        },
        {
            "email": "anon@example.com",
            "inspection_number": 102
        },
        {
            "customer_id": 10,
            "phone_number": "5550001111"
        }
    ])
}

#[test]
fn test_listing_pipeline() {
    let payload = LegacyPayload::from_value(listing_body()).unwrap();
    let records = retain_acceptable(normalize(payload));

    let ids: Vec<Option<i64>> = records.iter().map(|r| r.customer.id).collect();
    assert_eq!(ids, vec![Some(7), Some(9), None]);
    assert_eq!(records[1].customer.email_1.as_deref(), Some("lee@example.com"));

    let candidates = candidate_legacy_ids(&records);
    assert_eq!(candidates.into_iter().collect::<Vec<_>>(), vec![7, 9]);

    let existing: HashSet<i64> = [9].into_iter().collect();
    let fresh = dedupe(&records, &existing);
    let ids: Vec<Option<i64>> = fresh.iter().map(|r| r.customer.id).collect();
    assert_eq!(ids, vec![Some(7), None]);
}

#[test]
fn test_enveloped_single_record() {
    let body = json!({
        "success": true,
        "data": {
            "customer_id": 7,
            "inspection_number": 120,
            "inspection_date": "2025-01-15T08:00:00Z",
            "total_fee": 475,
            "property_type_id": 1,
            "square_footage": "2,400"
        }
    });

    let records = normalize(LegacyPayload::from_value(body).unwrap());
    assert_eq!(records.len(), 1);

    let r = &records[0];
    assert_eq!(r.inspection.id, Some(120));
    assert_eq!(r.inspection.date.as_deref(), Some("01/15/25"));
    assert_eq!(r.inspection.fee.as_deref(), Some("$475.00"));
    assert_eq!(r.property.property_type.as_deref(), Some("Single-Family Home"));
    assert_eq!(r.property.square_footage.as_deref(), Some("2,400"));
}

#[test]
fn test_serialized_shape() {
    let records = normalize(
        LegacyPayload::from_value(json!({"customer_id": 1, "inspection_number": 2})).unwrap(),
    );
    let value = serde_json::to_value(&records[0]).unwrap();

    assert!(value["customer"]["phone_1"].is_null());
    assert!(value["inspection"]["date_raw"].is_null());
    assert_eq!(value["property"]["state"], "FL");
    assert_eq!(value["inspection"]["id"], 2);
}
