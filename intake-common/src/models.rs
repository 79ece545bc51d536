//! Canonical record shapes
//!
//! [`NormalizedRecord`] is what the normalizer produces from a legacy row and
//! what the proxy cache stores. Field names match the JSON served to clients.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Customer/inspection/property triple produced by the normalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub customer: CustomerInfo,
    pub inspection: InspectionInfo,
    pub property: PropertyInfo,
}

/// Contact details of the legacy customer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Legacy portal customer id
    pub id: Option<i64>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_1: Option<String>,
    pub phone_2: Option<String>,
    pub email_1: Option<String>,
    pub email_2: Option<String>,
    pub is_realtor: Option<bool>,
}

/// Most recent inspection of the customer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InspectionInfo {
    /// Inspection number
    pub id: Option<i64>,
    /// Display date, `MM/DD/YY`
    pub date: Option<String>,
    /// Machine date, `YYYY-MM-DD`
    pub date_raw: Option<String>,
    /// Display currency, `$1,234.50`
    pub fee: Option<String>,
    pub general: Option<bool>,
    pub mitigation: Option<bool>,
    pub four_point: Option<bool>,
    /// Display label of the customer's role on the inspection
    pub customer_role: Option<String>,
}

/// Inspected property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub id: Option<i64>,
    /// Display label of the property type
    pub property_type: Option<String>,
    pub street_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    /// Display area with thousands separator, `1,234`
    pub square_footage: Option<String>,
}

/// Inspection snapshot stored on a local customer (`latest_inspection`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionSnapshot {
    #[serde(flatten)]
    pub inspection: InspectionInfo,
    pub property: Option<PropertyInfo>,
}

impl From<&NormalizedRecord> for InspectionSnapshot {
    fn from(record: &NormalizedRecord) -> Self {
        Self {
            inspection: record.inspection.clone(),
            property: Some(record.property.clone()),
        }
    }
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every accepted wire value
            pub const ALL: &'static [&'static str] = &[$($text),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(Error::InvalidInput(format!(
                        "unknown {}: {}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum! {
    /// Channel used for a contact attempt
    ContactType {
        PhoneCall => "phone_call",
        TextMessage => "text_message",
        Email => "email",
        Mail => "mail",
    }
}

string_enum! {
    /// Result of a phone call
    CallOutcome {
        Busy => "busy",
        Connected => "connected",
        LeftVoicemail => "left_voicemail",
        NoAnswer => "no_answer",
        WrongNumber => "wrong_number",
    }
}

string_enum! {
    /// Who initiated the call
    CallDirection {
        Inbound => "inbound",
        Outbound => "outbound",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contact_type_round_trip() {
        assert_eq!("text_message".parse::<ContactType>().unwrap(), ContactType::TextMessage);
        assert_eq!(ContactType::PhoneCall.as_str(), "phone_call");
        assert!("fax".parse::<ContactType>().is_err());
        assert_eq!(
            serde_json::to_string(&CallOutcome::LeftVoicemail).unwrap(),
            "\"left_voicemail\""
        );
    }

    #[test]
    fn test_snapshot_nests_property() {
        let record = NormalizedRecord {
            customer: CustomerInfo::default(),
            inspection: InspectionInfo {
                id: Some(12),
                ..Default::default()
            },
            property: PropertyInfo {
                city: Some("Tampa".to_string()),
                ..Default::default()
            },
        };

        let json = serde_json::to_value(InspectionSnapshot::from(&record)).unwrap();
        assert_eq!(json["id"], 12);
        assert_eq!(json["property"]["city"], "Tampa");
    }
}
