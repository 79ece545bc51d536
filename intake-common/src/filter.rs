//! Record retention and deduplication

use std::collections::{BTreeSet, HashSet};

use crate::models::NormalizedRecord;

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|s| !s.is_empty())
}

/// A record is usable when it can be contacted and has an inspection number
///
/// Inspection number 0 counts as missing.
pub fn acceptable(record: &NormalizedRecord) -> bool {
    let c = &record.customer;
    let has_contact =
        present(&c.phone_1) || present(&c.phone_2) || present(&c.email_1) || present(&c.email_2);
    let has_inspection = record.inspection.id.is_some_and(|id| id != 0);

    has_contact && has_inspection
}

/// Keep only usable records, preserving order
pub fn retain_acceptable(records: Vec<NormalizedRecord>) -> Vec<NormalizedRecord> {
    records.into_iter().filter(acceptable).collect()
}

/// Distinct non-null legacy customer ids, in ascending order
pub fn candidate_legacy_ids(records: &[NormalizedRecord]) -> BTreeSet<i64> {
    records.iter().filter_map(|r| r.customer.id).collect()
}

/// Drop records already converted into local customers
///
/// Records without a legacy id are never duplicates.
pub fn dedupe(records: &[NormalizedRecord], existing: &HashSet<i64>) -> Vec<NormalizedRecord> {
    records
        .iter()
        .filter(|r| r.customer.id.map_or(true, |id| !existing.contains(&id)))
        .cloned()
        .collect()
}
