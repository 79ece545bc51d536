//! # Portal Intake Common Library
//!
//! Shared code for the intake service and its tooling:
//! - Legacy payload ingestion types
//! - Canonical customer/inspection/property records
//! - Field normalization and record filtering
//! - Configuration loading
//! - Error types

pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod legacy;
pub mod models;
pub mod normalize;

pub use error::{Error, Result};
pub use legacy::{LegacyPayload, LegacyRecord};
pub use models::NormalizedRecord;
pub use normalize::normalize;
