//! Gateway HTTP service.
//!
//! This crate provides the HTTP surface of the LLM API gateway:
//!
//! - Bearer-key auth resolution against [`gateway_cache::AuthCache`]
//! - Budget precheck and post-facto usage settlement
//! - Proxying of three ingress dialects to their upstream providers
//! - A minimal admin surface for account/key/pricing mutation
//!
//! # Authentication
//!
//! Proxy routes authenticate with a bearer API key resolved through
//! [`resolver::resolve`]. Admin routes authenticate with a static
//! `X-Admin-Key` header checked against [`config::ServiceConfig::admin_api_key`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // extractor impls need async for the trait signature

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod pipeline;
pub mod resolver;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, Providers};
