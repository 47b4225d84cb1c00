//! The per-instance time-bounded auth cache (spec.md §4.3).
//!
//! Wraps [`gateway_store::Store`] with three `moka` namespaces and a
//! subscription loop over [`gateway_bus::EventSource`] that evicts on
//! invalidation events.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;

pub use cache::{
    run_invalidation_listener, AuthCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL_SECONDS,
};
