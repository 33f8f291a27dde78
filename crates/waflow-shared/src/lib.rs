//! # waflow-shared
//!
//! Domain types shared across the waflow workspace: the subscription plan
//! catalog, the pure quota policy, input validation helpers, relay event
//! payloads, and the error taxonomy every layer reports in.

pub mod error;
pub mod events;
pub mod plans;
pub mod quota;
pub mod types;
pub mod validate;

pub use error::CoreError;
pub use plans::{Plan, SubscriptionPlan};
pub use types::{Instance, Integration, PlanStatus};
