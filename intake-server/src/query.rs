//! Dashboard query engine
//!
//! Pure filter/search/sort/paginate pass over a cached collection. Derived
//! fields (`months_since`, `fee_num`) are computed per call and never written
//! back to the cache.

use std::cmp::Ordering;

use chrono::{Datelike, NaiveDate};
use intake_common::format::parse_currency;
use intake_common::models::{CustomerInfo, InspectionInfo, PropertyInfo};
use intake_common::NormalizedRecord;
use serde::{Deserialize, Serialize};

use crate::pagination::{leading_int, paginate, parse_page, parse_per_page, PageMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    DateRaw,
    LastName,
    Fee,
}

impl SortKey {
    /// Unrecognized keys fall back to `date_raw`
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("last_name") => Self::LastName,
            Some("fee") => Self::Fee,
            _ => Self::DateRaw,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

impl SortDir {
    /// Case-insensitive; anything but `asc` is descending
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }
}

/// Raw dashboard query string, every value as sent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub page: Option<String>,
    #[serde(rename = "perPage")]
    pub per_page: Option<String>,
    #[serde(rename = "olderMonths")]
    pub older_months: Option<String>,
    pub search: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    #[serde(rename = "sortDir")]
    pub sort_dir: Option<String>,
    #[serde(rename = "realtorOnly")]
    pub realtor_only: Option<String>,
}

/// Sanitized query parameters
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub page: usize,
    pub per_page: usize,
    /// Keep records at least this many months old; 0 disables
    pub older_months: i64,
    pub search: String,
    pub sort_by: SortKey,
    pub sort_dir: SortDir,
    pub realtor_only: bool,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self::from(&DashboardQuery::default())
    }
}

impl From<&DashboardQuery> for QueryParams {
    fn from(raw: &DashboardQuery) -> Self {
        Self {
            page: parse_page(raw.page.as_deref()),
            per_page: parse_per_page(raw.per_page.as_deref()),
            older_months: raw.older_months.as_deref().and_then(leading_int).unwrap_or(0),
            search: raw.search.as_deref().unwrap_or("").trim().to_string(),
            sort_by: SortKey::parse(raw.sort_by.as_deref()),
            sort_dir: SortDir::parse(raw.sort_dir.as_deref()),
            realtor_only: raw.realtor_only.as_deref().is_some_and(truthy),
        }
    }
}

/// Form-style boolean: `1`, `true`, `on` and `yes` are true
pub fn truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

/// Inspection fields plus the dashboard-only derived values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedInspection {
    #[serde(flatten)]
    pub info: InspectionInfo,
    pub months_since: Option<i64>,
    pub fee_num: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardRow {
    pub customer: CustomerInfo,
    pub inspection: DerivedInspection,
    pub property: PropertyInfo,
}

impl DashboardRow {
    pub fn derive(record: &NormalizedRecord, today: NaiveDate) -> Self {
        let months_since = record
            .inspection
            .date_raw
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
            .map(|date| months_between(date, today));
        let fee_num = record.inspection.fee.as_deref().and_then(parse_currency);

        Self {
            customer: record.customer.clone(),
            inspection: DerivedInspection {
                info: record.inspection.clone(),
                months_since,
                fee_num,
            },
            property: record.property.clone(),
        }
    }

    fn haystack(&self) -> String {
        let c = &self.customer;
        let p = &self.property;
        [
            &c.first_name,
            &c.last_name,
            &c.email_1,
            &c.email_2,
            &c.phone_1,
            &c.phone_2,
            &p.street_address,
            &p.city,
        ]
        .iter()
        .map(|field| field.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}

/// Whole calendar months from `from` to `to`; negative when `from` is later
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    if from > to {
        return -months_between(to, from);
    }
    let mut months =
        i64::from(to.year() - from.year()) * 12 + i64::from(to.month()) - i64::from(from.month());
    if to.day() < from.day() {
        months -= 1;
    }
    months
}

/// Page metadata plus the applied filters
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMeta {
    #[serde(flatten)]
    pub page: PageMeta,
    pub source: &'static str,
    pub older_months: i64,
    pub search: String,
    pub sort_by: SortKey,
    pub sort_dir: SortDir,
    pub realtor_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub rows: Vec<DashboardRow>,
    pub meta: DashboardMeta,
}

/// Derive, filter, search, sort and paginate
pub fn query(records: &[NormalizedRecord], params: &QueryParams, today: NaiveDate) -> QueryResult {
    let needle = params.search.to_lowercase();

    let mut rows: Vec<DashboardRow> = records
        .iter()
        .filter(|r| !params.realtor_only || r.customer.is_realtor == Some(true))
        .map(|r| DashboardRow::derive(r, today))
        .filter(|row| {
            params.older_months <= 0
                || row
                    .inspection
                    .months_since
                    .is_some_and(|m| m >= params.older_months)
        })
        .filter(|row| needle.is_empty() || row.haystack().contains(&needle))
        .collect();

    // Stable sort; missing keys go last in either direction
    rows.sort_by(|a, b| compare_rows(a, b, params.sort_by, params.sort_dir));

    let (rows, page) = paginate(&rows, params.page, params.per_page);
    QueryResult {
        rows,
        meta: DashboardMeta {
            page,
            source: "cache",
            older_months: params.older_months,
            search: params.search.clone(),
            sort_by: params.sort_by,
            sort_dir: params.sort_dir,
            realtor_only: params.realtor_only,
        },
    }
}

fn compare_rows(a: &DashboardRow, b: &DashboardRow, key: SortKey, dir: SortDir) -> Ordering {
    match key {
        SortKey::DateRaw => compare_present(
            a.inspection.info.date_raw.as_deref(),
            b.inspection.info.date_raw.as_deref(),
            dir,
            |x, y| x.cmp(y),
        ),
        SortKey::LastName => compare_present(
            a.customer.last_name.as_deref().map(str::to_lowercase),
            b.customer.last_name.as_deref().map(str::to_lowercase),
            dir,
            |x, y| x.cmp(y),
        ),
        SortKey::Fee => compare_present(a.inspection.fee_num, b.inspection.fee_num, dir, |x, y| {
            x.total_cmp(y)
        }),
    }
}

fn compare_present<T>(
    a: Option<T>,
    b: Option<T>,
    dir: SortDir,
    cmp: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => match dir {
            SortDir::Asc => cmp(&x, &y),
            SortDir::Desc => cmp(&y, &x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: i64) -> NormalizedRecord {
        NormalizedRecord {
            customer: CustomerInfo {
                id: Some(id),
                ..Default::default()
            },
            inspection: InspectionInfo {
                id: Some(id),
                ..Default::default()
            },
            property: PropertyInfo::default(),
        }
    }

    fn with_fee(id: i64, fee: Option<&str>) -> NormalizedRecord {
        let mut r = rec(id);
        r.inspection.fee = fee.map(String::from);
        r
    }

    fn with_date(id: i64, date_raw: Option<&str>) -> NormalizedRecord {
        let mut r = rec(id);
        r.inspection.date_raw = date_raw.map(String::from);
        r
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn params(sort_by: SortKey, sort_dir: SortDir) -> QueryParams {
        QueryParams {
            sort_by,
            sort_dir,
            ..Default::default()
        }
    }

    fn fees(result: &QueryResult) -> Vec<Option<String>> {
        result.rows.iter().map(|r| r.inspection.info.fee.clone()).collect()
    }

    #[test]
    fn test_fee_ascending_missing_last() {
        let records = vec![
            with_fee(1, Some("$50.00")),
            with_fee(2, None),
            with_fee(3, Some("$10.00")),
        ];
        let result = query(&records, &params(SortKey::Fee, SortDir::Asc), today());
        assert_eq!(
            fees(&result),
            vec![Some("$10.00".into()), Some("$50.00".into()), None]
        );
    }

    #[test]
    fn test_fee_descending_missing_last() {
        let records = vec![
            with_fee(1, None),
            with_fee(2, Some("$1,200.00")),
            with_fee(3, Some("$10.00")),
        ];
        let result = query(&records, &params(SortKey::Fee, SortDir::Desc), today());
        assert_eq!(
            fees(&result),
            vec![Some("$1,200.00".into()), Some("$10.00".into()), None]
        );
        assert_eq!(result.rows[0].inspection.fee_num, Some(1200.0));
    }

    #[test]
    fn test_default_sort_newest_first_and_stable() {
        let records = vec![
            with_date(1, Some("2024-01-01")),
            with_date(2, None),
            with_date(3, Some("2025-02-01")),
            with_date(4, Some("2024-01-01")),
        ];
        let result = query(&records, &QueryParams::default(), today());
        let ids: Vec<Option<i64>> = result.rows.iter().map(|r| r.customer.id).collect();
        assert_eq!(ids, vec![Some(3), Some(1), Some(4), Some(2)]);
    }

    #[test]
    fn test_last_name_case_insensitive() {
        let mut records = vec![rec(1), rec(2), rec(3)];
        records[0].customer.last_name = Some("zane".into());
        records[1].customer.last_name = Some("Adams".into());
        records[2].customer.last_name = Some("baker".into());

        let result = query(&records, &params(SortKey::LastName, SortDir::Asc), today());
        let names: Vec<&str> = result
            .rows
            .iter()
            .map(|r| r.customer.last_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["Adams", "baker", "zane"]);
    }

    #[test]
    fn test_older_months_filter() {
        let records = vec![
            with_date(1, Some("2025-03-15")), // exactly 3 months
            with_date(2, Some("2025-03-16")), // 2 months
            with_date(3, None),
            with_date(4, Some("2023-06-15")),
        ];
        let p = QueryParams {
            older_months: 3,
            ..Default::default()
        };
        let result = query(&records, &p, today());
        let ids: Vec<Option<i64>> = result.rows.iter().map(|r| r.customer.id).collect();
        assert_eq!(ids, vec![Some(1), Some(4)]);
        assert_eq!(result.rows[1].inspection.months_since, Some(24));
    }

    #[test]
    fn test_search_and_realtor_filter() {
        let mut records = vec![rec(1), rec(2), rec(3)];
        records[0].property.city = Some("Tampa".into());
        records[0].customer.is_realtor = Some(true);
        records[1].customer.email_1 = Some("tampa.fan@example.com".into());
        records[2].customer.first_name = Some("Orlando".into());
        records[2].customer.is_realtor = Some(true);

        let p = QueryParams {
            search: "TAMPA".into(),
            ..Default::default()
        };
        assert_eq!(query(&records, &p, today()).meta.page.total, 2);

        let p = QueryParams {
            realtor_only: true,
            ..Default::default()
        };
        let result = query(&records, &p, today());
        assert_eq!(result.meta.page.total, 2);
        assert!(result.meta.realtor_only);
    }

    #[test]
    fn test_page_beyond_end() {
        let records: Vec<NormalizedRecord> = (1..=3).map(rec).collect();
        let p = QueryParams {
            page: 4,
            per_page: 10,
            ..Default::default()
        };
        let result = query(&records, &p, today());
        assert!(result.rows.is_empty());
        assert_eq!(result.meta.page.from, 0);
        assert_eq!(result.meta.page.to, 0);
        assert_eq!(result.meta.page.last_page, 1);
    }

    #[test]
    fn test_params_from_raw_query() {
        let raw = DashboardQuery {
            page: Some("2".into()),
            per_page: Some("37".into()),
            older_months: Some("6".into()),
            search: Some("  lee ".into()),
            sort_by: Some("bogus".into()),
            sort_dir: Some("ASC".into()),
            realtor_only: Some("true".into()),
        };
        let p = QueryParams::from(&raw);
        assert_eq!(p.page, 2);
        assert_eq!(p.per_page, 25);
        assert_eq!(p.older_months, 6);
        assert_eq!(p.search, "lee");
        assert_eq!(p.sort_by, SortKey::DateRaw);
        assert_eq!(p.sort_dir, SortDir::Asc);
        assert!(p.realtor_only);
    }

    #[test]
    fn test_months_between() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(months_between(d(2025, 1, 31), d(2025, 2, 28)), 0);
        assert_eq!(months_between(d(2025, 1, 15), d(2025, 2, 15)), 1);
        assert_eq!(months_between(d(2024, 6, 16), d(2025, 6, 15)), 11);
        assert_eq!(months_between(d(2025, 9, 15), d(2025, 6, 15)), -3);
    }

    #[test]
    fn test_derived_fields_serialize_inside_inspection() {
        let mut r = with_date(1, Some("2025-01-15"));
        r.inspection.fee = Some("$99.50".into());
        let json = serde_json::to_value(DashboardRow::derive(&r, today())).unwrap();
        assert_eq!(json["inspection"]["months_since"], 5);
        assert_eq!(json["inspection"]["fee_num"], 99.5);
        assert_eq!(json["inspection"]["id"], 1);
    }
}
