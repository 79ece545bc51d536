//! HTTP API handlers for intake-server

pub mod contact_records;
pub mod customers;
pub mod dashboard;
pub mod health;
pub mod intake;
pub mod proxy;
pub mod refresh;

pub use contact_records::store_contact_record;
pub use customers::{list_customers, show_customer, store_customer, update_customer};
pub use dashboard::dashboard;
pub use health::health_routes;
pub use intake::{create_form, start_intake};
pub use proxy::customer_latest;
pub use refresh::refresh_latest_inspection;
