//! Payload preparation and validation for locally authored data
//!
//! Bodies arrive as loose JSON (forms send numbers as strings, booleans as
//! `"1"`, and so on). Each validator first prepares values the way staff
//! enter them (trimmed lowercase emails, digit-only phones, `$1,234.50`
//! fees) and then checks every rule, collecting all messages before
//! returning. Nothing is written unless validation passes.

use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use intake_common::format::{digits_only, parse_legacy_date};
use intake_common::models::{CallDirection, CallOutcome, ContactType};
use regex::Regex;
use reqwest::Url;
use serde_json::{json, Map, Value};

use crate::db::{CustomerUpsert, NewContactRecord};
use crate::error::ValidationErrors;

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap_or_else(|e| panic!("email pattern: {e}"))
    })
}

fn phone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{7,15}$").unwrap_or_else(|e| panic!("phone pattern: {e}")))
}

fn fee_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d+(\.\d{1,2})?$").unwrap_or_else(|e| panic!("fee pattern: {e}"))
    })
}

/// Human label for a field path, `customer.first_name` → `customer.first name`
fn label(field: &str) -> String {
    field.replace('_', " ")
}

/// Value at `key`, with JSON `null` treated as absent
fn field<'a>(obj: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Value> {
    obj.and_then(|o| o.get(key)).filter(|v| !v.is_null())
}

/// Collects messages while reading typed values out of a body
struct Checker {
    errors: ValidationErrors,
}

impl Checker {
    fn new() -> Self {
        Self {
            errors: ValidationErrors::new(),
        }
    }

    fn fail(&mut self, path: &str, message: String) {
        self.errors.add(path, message);
    }

    fn required(&mut self, path: &str) {
        self.fail(path, format!("The {} field is required.", label(path)));
    }

    /// Object at `key`; missing or non-object is a required failure
    fn object<'a>(&mut self, body: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
        match body.get(key) {
            Some(Value::Object(map)) => Some(map),
            Some(Value::Null) | None => {
                self.required(key);
                None
            }
            Some(_) => {
                self.fail(key, format!("The {} field must be an object.", label(key)));
                None
            }
        }
    }

    /// Optional string with a maximum length in characters
    fn string(&mut self, path: &str, value: Option<&Value>, max: usize) -> Option<String> {
        let text = match value? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => {
                self.fail(path, format!("The {} field must be a string.", label(path)));
                return None;
            }
        };
        if text.chars().count() > max {
            self.fail(
                path,
                format!("The {} field must not be greater than {} characters.", label(path), max),
            );
            return None;
        }
        Some(text)
    }

    fn required_string(&mut self, path: &str, value: Option<&Value>, max: usize) -> Option<String> {
        match value {
            Some(Value::String(s)) if s.trim().is_empty() => {
                self.required(path);
                None
            }
            Some(v) => self.string(path, Some(v), max),
            None => {
                self.required(path);
                None
            }
        }
    }

    /// Optional integer (numbers or digit strings) with a lower bound
    fn integer(&mut self, path: &str, value: Option<&Value>, min: i64) -> Option<i64> {
        let parsed = match value? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) if s.trim().is_empty() => return None,
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match parsed {
            None => {
                self.fail(path, format!("The {} field must be an integer.", label(path)));
                None
            }
            Some(n) if n < min => {
                self.fail(path, format!("The {} field must be at least {}.", label(path), min));
                None
            }
            Some(n) => Some(n),
        }
    }

    /// Optional strict boolean: true/false, 1/0, "1"/"0", "true"/"false"
    fn boolean(&mut self, path: &str, value: Option<&Value>) -> Option<bool> {
        let parsed = match value? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.trim() {
                "1" | "true" => Some(true),
                "0" | "false" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if parsed.is_none() {
            self.fail(path, format!("The {} field must be true or false.", label(path)));
        }
        parsed
    }

    fn matches(&mut self, path: &str, value: Option<String>, pattern: &Regex) -> Option<String> {
        let value = value?;
        if pattern.is_match(&value) {
            Some(value)
        } else {
            self.fail(path, format!("The {} field format is invalid.", label(path)));
            None
        }
    }

    fn one_of<T: std::str::FromStr>(&mut self, path: &str, value: Option<&Value>) -> Option<T> {
        match value? {
            Value::String(s) => match s.parse::<T>() {
                Ok(v) => Some(v),
                Err(_) => {
                    self.fail(path, format!("The selected {} is invalid.", label(path)));
                    None
                }
            },
            _ => {
                self.fail(path, format!("The selected {} is invalid.", label(path)));
                None
            }
        }
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

/// Trimmed lowercase email, blank treated as absent
fn prepare_email(value: Option<&Value>) -> Option<Value> {
    let raw = match value? {
        Value::String(s) => s.trim().to_lowercase(),
        other => return Some(other.clone()),
    };
    if raw.is_empty() {
        None
    } else {
        Some(Value::String(raw))
    }
}

/// Digits only, blank treated as absent
fn prepare_phone(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Some(String::new()),
    };
    if raw.trim().is_empty() {
        return None;
    }
    Some(digits_only(&raw))
}

/// Lenient form boolean; anything unrecognized is false
fn prepare_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "on" | "yes"
        ),
        _ => false,
    }
}

/// `"1,234"` → `"1234"`; non-strings pass through
fn prepare_square_footage(value: Option<&Value>) -> Option<Value> {
    match value? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(Value::String(s.replace(',', "").trim().to_string())),
        other => Some(other.clone()),
    }
}

/// `"$1,234.50"` → `"1234.50"`; numbers are rendered as text
fn prepare_fee(value: Option<&Value>) -> Option<String> {
    let raw = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return Some(String::new()),
    };
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && *c != '$' && *c != ' ')
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// Validated `POST /customers` body
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCustomer {
    pub token: String,
    pub customer: CustomerUpsert,
    pub contacts: Vec<NewContactRecord>,
}

/// Prepare and validate a customer intake submission
pub fn validate_store_customer(body: &Value) -> Result<StoreCustomer, ValidationErrors> {
    let mut c = Checker::new();

    let token = c.required_string("token", body.get("token").filter(|v| !v.is_null()), 100);
    let legacy_id = match body.get("legacy_customer_id").filter(|v| !v.is_null()) {
        None => {
            c.required("legacy_customer_id");
            None
        }
        value => c.integer("legacy_customer_id", value, 1),
    };

    // Customer
    let customer = c.object(body, "customer");
    let first_name = c.required_string("customer.first_name", field(customer, "first_name"), 100);
    let last_name = c.required_string("customer.last_name", field(customer, "last_name"), 100);

    let mut emails = [None, None];
    for (slot, key) in emails.iter_mut().zip(["email_1", "email_2"]) {
        let path = format!("customer.{}", key);
        let prepared = prepare_email(field(customer, key));
        *slot = c.string(&path, prepared.as_ref(), 255).and_then(|email| {
            if email_pattern().is_match(&email) {
                Some(email)
            } else {
                c.fail(&path, format!("The {} field must be a valid email address.", label(&path)));
                None
            }
        });
    }

    let mut phones = [None, None];
    for (slot, key) in phones.iter_mut().zip(["phone_1", "phone_2"]) {
        let path = format!("customer.{}", key);
        *slot = c.matches(&path, prepare_phone(field(customer, key)), phone_pattern());
    }

    let is_realtor = match customer.and_then(|o| o.get("is_realtor")) {
        Some(value) => Some(prepare_flag(value)),
        None => {
            if customer.is_some() {
                c.required("customer.is_realtor");
            }
            None
        }
    };

    // Property
    let property = c.object(body, "property");
    let property_id = c.integer("property.id", field(property, "id"), 1);
    let property_type = c.string("property.property_type", field(property, "property_type"), 100);
    let street_address = c.string("property.street_address", field(property, "street_address"), 255);
    let city = c.string("property.city", field(property, "city"), 120);
    let state = c.string("property.state", field(property, "state"), 2);
    let square_footage = c.integer(
        "property.square_footage",
        prepare_square_footage(field(property, "square_footage")).as_ref(),
        0,
    );

    // Inspection
    let inspection = c.object(body, "inspection");
    let inspection_id = c.integer("inspection.id", field(inspection, "id"), 1);
    let customer_role = c.string("inspection.customer_role", field(inspection, "customer_role"), 100);
    let date = c.string("inspection.date", field(inspection, "date"), 8).and_then(|d| {
        if NaiveDate::parse_from_str(&d, "%m/%d/%y").is_ok() {
            Some(d)
        } else {
            c.fail(
                "inspection.date",
                "The inspection.date field must match the format m/d/y.".to_string(),
            );
            None
        }
    });
    let date_raw = c
        .string("inspection.date_raw", field(inspection, "date_raw"), 40)
        .and_then(|d| {
            if parse_legacy_date(&d).is_some() {
                Some(d)
            } else {
                c.fail(
                    "inspection.date_raw",
                    "The inspection.date raw field must be a valid date.".to_string(),
                );
                None
            }
        });
    let fee = c.matches(
        "inspection.fee",
        prepare_fee(field(inspection, "fee")),
        fee_pattern(),
    );
    let general = c.boolean("inspection.general", field(inspection, "general"));
    let mitigation = c.boolean("inspection.mitigation", field(inspection, "mitigation"));
    let four_point = c.boolean("inspection.four_point", field(inspection, "four_point"));

    // Contact records
    let mut contacts = Vec::new();
    match body.get("contact_records") {
        None | Some(Value::Null) => {}
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                let prefix = format!("contact_records.{}", index);
                if let Some(record) = check_contact(&mut c, &prefix, item, false) {
                    contacts.push(record);
                }
            }
        }
        Some(_) => c.fail(
            "contact_records",
            "The contact records field must be an array.".to_string(),
        ),
    }

    let (Some(token), Some(legacy_id), Some(first_name), Some(last_name), Some(is_realtor)) =
        (token, legacy_id, first_name, last_name, is_realtor)
    else {
        if c.errors.is_empty() {
            c.required("customer");
        }
        return Err(c.errors);
    };

    let [email_1, email_2] = emails;
    let [phone_1, phone_2] = phones;
    let latest_inspection = json!({
        "id": inspection_id,
        "customer_role": customer_role,
        "date": date,
        "date_raw": date_raw,
        "fee": fee,
        "general": general,
        "mitigation": mitigation,
        "four_point": four_point,
        "property": {
            "id": property_id,
            "property_type": property_type,
            "street_address": street_address,
            "city": city,
            "state": state,
            "square_footage": square_footage,
        },
    });

    c.finish(StoreCustomer {
        token,
        customer: CustomerUpsert {
            legacy_id,
            first_name,
            last_name,
            phone_1,
            phone_2,
            email_1,
            email_2,
            is_realtor,
            latest_inspection,
        },
        contacts,
    })
}

/// Validate a single contact record for `POST /customer/:id/records`
///
/// Date and time are both required here.
pub fn validate_contact_record(body: &Value) -> Result<NewContactRecord, ValidationErrors> {
    let mut c = Checker::new();
    let record = check_contact(&mut c, "", body, true);
    match record {
        Some(record) => c.finish(record),
        None => Err(c.errors),
    }
}

fn check_contact(
    c: &mut Checker,
    prefix: &str,
    item: &Value,
    date_time_required: bool,
) -> Option<NewContactRecord> {
    let path = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    };

    let Some(obj) = item.as_object() else {
        c.fail(
            &path("contact_type"),
            format!("The {} field is required.", label(&path("contact_type"))),
        );
        return None;
    };
    let obj = Some(obj);

    let contact_type = match field(obj, "contact_type") {
        None => {
            c.required(&path("contact_type"));
            None
        }
        value => c.one_of::<ContactType>(&path("contact_type"), value),
    };
    let call_outcome = c.one_of::<CallOutcome>(&path("call_outcome"), field(obj, "call_outcome"));
    let call_direction =
        c.one_of::<CallDirection>(&path("call_direction"), field(obj, "call_direction"));
    let notes = c.string(&path("notes"), field(obj, "notes"), 2000);

    let date_raw = c.string(&path("date"), field(obj, "date"), 40);
    let time_raw = c.string(&path("time"), field(obj, "time"), 8);

    if date_time_required || time_raw.is_some() {
        if date_raw.is_none() && !c.errors.contains(&path("date")) {
            c.required(&path("date"));
        }
    }
    if date_time_required || date_raw.is_some() {
        if time_raw.is_none() && !c.errors.contains(&path("time")) {
            c.required(&path("time"));
        }
    }

    let date = date_raw.as_deref().and_then(|d| {
        let parsed = parse_legacy_date(d);
        if parsed.is_none() {
            c.fail(
                &path("date"),
                format!("The {} field must be a valid date.", label(&path("date"))),
            );
        }
        parsed
    });
    let time = time_raw.as_deref().and_then(|t| {
        let parsed = NaiveTime::parse_from_str(t, "%H:%M").ok();
        if parsed.is_none() {
            c.fail(
                &path("time"),
                format!("The {} field must match the format H:i.", label(&path("time"))),
            );
        }
        parsed
    });

    let occurred_at = match (date, time) {
        (Some(date), Some(time)) => NaiveDateTime::new(date, time),
        (None, None) if date_raw.is_none() && time_raw.is_none() => {
            Utc::now().date_naive().and_time(NaiveTime::MIN)
        }
        _ => return None,
    };

    Some(NewContactRecord {
        contact_type: contact_type?,
        call_outcome,
        call_direction,
        occurred_at,
        notes: notes.filter(|n| !n.is_empty()),
    })
}

/// Validate `PUT /customer/:id`; `None` clears the links
pub fn validate_social_media_links(body: &Value) -> Result<Option<Vec<String>>, ValidationErrors> {
    let mut c = Checker::new();
    let links = match body.get("social_media_links") {
        None | Some(Value::Null) => None,
        Some(Value::Array(items)) => {
            let mut links = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let path = format!("social_media_links.{}", index);
                match item {
                    Value::Null => {}
                    Value::String(s) if is_web_url(s) => links.push(s.clone()),
                    _ => c.fail(&path, format!("The {} field must be a valid URL.", label(&path))),
                }
            }
            Some(links)
        }
        Some(_) => {
            c.fail(
                "social_media_links",
                "The social media links field must be an array.".to_string(),
            );
            None
        }
    };
    c.finish(links)
}

fn is_web_url(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false)
}

/// Validated `POST /proxy/latest-inspection-refresh` body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshRequest {
    pub customer_id: i64,
    pub legacy_id: i64,
}

pub fn validate_refresh(body: &Value) -> Result<RefreshRequest, ValidationErrors> {
    let mut c = Checker::new();
    let customer_id = match body.get("customer_id").filter(|v| !v.is_null()) {
        None => {
            c.required("customer_id");
            None
        }
        value => c.integer("customer_id", value, i64::MIN),
    };
    let legacy_id = match body.get("legacy_id").filter(|v| !v.is_null()) {
        None => {
            c.required("legacy_id");
            None
        }
        value => c.integer("legacy_id", value, i64::MIN),
    };

    match (customer_id, legacy_id) {
        (Some(customer_id), Some(legacy_id)) => c.finish(RefreshRequest {
            customer_id,
            legacy_id,
        }),
        _ => Err(c.errors),
    }
}
