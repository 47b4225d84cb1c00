//! Core domain types, error taxonomy and pricing math for the gateway.
//!
//! This crate provides the foundational types shared by every other crate in
//! the workspace:
//!
//! - **Domain model**: [`Account`], [`ApiKey`], [`ModelCost`], [`UsageLog`]
//! - **Request-scoped values**: [`Principal`], [`Usage`]
//! - **Identifiers**: [`RequestId`]
//! - **Errors**: [`GatewayError`]
//! - **Pricing**: [`pricing::cost_usd`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod account;
pub mod api_key;
pub mod error;
pub mod ids;
pub mod model_cost;
pub mod pricing;
pub mod usage;

pub use account::{Account, BudgetDuration};
pub use api_key::ApiKey;
pub use error::{GatewayError, Result};
pub use ids::{IdError, RequestId};
pub use model_cost::ModelCost;
pub use usage::{Principal, Usage, UsageLog};
