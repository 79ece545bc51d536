//! Legacy record normalization
//!
//! Maps the portal's flat, loosely typed rows onto [`NormalizedRecord`].
//! Pure and deterministic: the same input always yields the same output.
//! Retention is decided separately by [`crate::filter`].

use crate::format::{
    display_date, format_currency, format_phone, iso_date, number_format, parse_legacy_date,
};
use crate::legacy::{LegacyPayload, LegacyRecord};
use crate::models::{CustomerInfo, InspectionInfo, NormalizedRecord, PropertyInfo};

/// State assumed when the portal omits one
pub const DEFAULT_STATE: &str = "FL";

/// Normalize every record of a payload, preserving order
pub fn normalize(payload: impl Into<LegacyPayload>) -> Vec<NormalizedRecord> {
    payload
        .into()
        .into_records()
        .iter()
        .map(normalize_record)
        .collect()
}

/// Normalize one legacy row
pub fn normalize_record(item: &LegacyRecord) -> NormalizedRecord {
    let inspection_date = item.text("inspection_date").and_then(|raw| parse_legacy_date(&raw));

    NormalizedRecord {
        customer: CustomerInfo {
            id: item.int("customer_id"),
            first_name: item.text("first_name"),
            last_name: item.text("last_name"),
            phone_1: item.text("phone_number").and_then(|p| format_phone(&p)),
            phone_2: item.text("phone_number_2").and_then(|p| format_phone(&p)),
            email_1: item.text("email").and_then(|e| normalize_email(&e)),
            email_2: item.text("email_2").and_then(|e| normalize_email(&e)),
            is_realtor: item.flag("is_realtor"),
        },
        inspection: InspectionInfo {
            id: item.int("inspection_number"),
            date: inspection_date.map(display_date),
            date_raw: inspection_date.map(iso_date),
            fee: item.float("total_fee").map(format_currency),
            general: item.flag("general_inspection"),
            mitigation: item.flag("mitigation"),
            four_point: item.flag("four_point"),
            customer_role: item.text("customer_role").map(|role| role_label(&role)),
        },
        property: PropertyInfo {
            id: item.int("property_id"),
            property_type: item.int("property_type_id").and_then(property_type_label),
            street_address: item.text("street_address"),
            city: item.text("city"),
            state: Some(item.text("state").unwrap_or_else(|| DEFAULT_STATE.to_string())),
            square_footage: item.float("square_footage").map(|sqft| number_format(sqft, 0)),
        },
    }
}

/// Trimmed, lowercased email; blank input has no email
pub fn normalize_email(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Display label for a portal property type id
pub fn property_type_label(id: i64) -> Option<String> {
    let label = match id {
        1 => "Single-Family Home",
        2 => "Multi-Unit Building",
        3 => "Townhouse/Villa",
        4 => "Condominium",
        5 => "Commercial Building",
        _ => return None,
    };
    Some(label.to_string())
}

/// Display label for a portal role key; unknown keys are passed through
pub fn role_label(key: &str) -> String {
    match key {
        "primary_customer" => "Primary Customer",
        "secondary_customer" => "Secondary Customer",
        "primary_agent" => "Primary Agent",
        "secondary_agent" => "Secondary Agent",
        other => other,
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> LegacyRecord {
        match value {
            Value::Object(map) => LegacyRecord::new(map),
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_full_row() {
        let row = record(json!({
            "customer_id": "7",
            "first_name": "Dana",
            "last_name": "Reyes",
            "phone_number": "5551234567",
            "phone_number_2": "1 555 765 4321",
            "email": "  Dana@Example.COM ",
            "email_2": "",
            "is_realtor": "1",
            "inspection_number": 99,
            "inspection_date": "2024-03-05 09:15:00",
            "total_fee": "1234.5",
            "general_inspection": 1,
            "mitigation": 0,
            "four_point": null,
            "customer_role": "primary_agent",
            "property_id": 301,
            "property_type_id": "3",
            "street_address": "12 Palm Way",
            "city": "Tampa",
            "square_footage": 1850
        }));

        let n = normalize_record(&row);
        assert_eq!(n.customer.id, Some(7));
        assert_eq!(n.customer.phone_1.as_deref(), Some("(555) 123-4567"));
        assert_eq!(n.customer.phone_2.as_deref(), Some("+1 (555) 765-4321"));
        assert_eq!(n.customer.email_1.as_deref(), Some("dana@example.com"));
        assert_eq!(n.customer.email_2, None);
        assert_eq!(n.customer.is_realtor, Some(true));

        assert_eq!(n.inspection.id, Some(99));
        assert_eq!(n.inspection.date.as_deref(), Some("03/05/24"));
        assert_eq!(n.inspection.date_raw.as_deref(), Some("2024-03-05"));
        assert_eq!(n.inspection.fee.as_deref(), Some("$1,234.50"));
        assert_eq!(n.inspection.general, Some(true));
        assert_eq!(n.inspection.mitigation, Some(false));
        assert_eq!(n.inspection.four_point, None);
        assert_eq!(n.inspection.customer_role.as_deref(), Some("Primary Agent"));

        assert_eq!(n.property.id, Some(301));
        assert_eq!(n.property.property_type.as_deref(), Some("Townhouse/Villa"));
        assert_eq!(n.property.state.as_deref(), Some("FL"));
        assert_eq!(n.property.square_footage.as_deref(), Some("1,850"));
    }

    #[test]
    fn test_sparse_row() {
        let n = normalize_record(&record(json!({
            "inspection_date": "garbage",
            "customer_role": "landlord",
            "property_type_id": 9,
            "state": "GA",
            "total_fee": ""
        })));

        assert_eq!(n.customer.id, None);
        assert_eq!(n.customer.phone_1, None);
        assert_eq!(n.customer.is_realtor, None);
        assert_eq!(n.inspection.date, None);
        assert_eq!(n.inspection.date_raw, None);
        assert_eq!(n.inspection.fee, None);
        assert_eq!(n.inspection.customer_role.as_deref(), Some("landlord"));
        assert_eq!(n.property.property_type, None);
        assert_eq!(n.property.state.as_deref(), Some("GA"));
        assert_eq!(n.property.square_footage, None);
    }

    #[test]
    fn test_single_and_many_share_one_path() {
        let row = record(json!({"customer_id": 1, "email": "a@b.co", "inspection_number": 5}));
        let single = normalize(row.clone());
        let many = normalize(vec![row.clone(), row]);

        assert_eq!(single.len(), 1);
        assert_eq!(many.len(), 2);
        assert_eq!(single[0], many[1]);
    }

    #[test]
    fn test_deterministic() {
        let rows = vec![
            record(json!({"customer_id": 3, "phone_number": "555-000-1111", "total_fee": 80})),
            record(json!({"customer_id": 4, "inspection_date": "01/02/2023"})),
        ];
        assert_eq!(normalize(rows.clone()), normalize(rows));
    }
}
