//! # waflow-store
//!
//! Durable tenant records, backed by SQLite.
//!
//! One row per tenant: identity reference, subscription plan and status,
//! optional provider credential, and the owned instance names as a JSON
//! array.  Instances have no table of their own; their full state lives in
//! the external provider and is fetched on demand.

pub mod database;
pub mod migrations;
pub mod models;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::UserRecord;
pub use users::AppendOutcome;
