//! Cluster-wide pub/sub of cache-invalidation events (spec.md §4.2).
//!
//! `AuthCache` depends on [`EventSource`]; admin writers depend on
//! [`EventSink`]. [`RedisBus`] implements both for production; [`LocalBus`]
//! implements both in-process for tests.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod event;
pub mod local;
pub mod redis_bus;
pub mod traits;

pub use error::{BusError, Result};
pub use event::{EventKind, InvalidationEvent};
pub use local::LocalBus;
pub use redis_bus::RedisBus;
pub use traits::{EventSink, EventSource};
