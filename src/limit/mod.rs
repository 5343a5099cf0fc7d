//! Interval-window order limiting logic.
//!
//! This module holds the decision core: calendar-aware interval boundary
//! computation, the boundary-aligned count cache, the authoritative order
//! counter, and the limiter that composes them into capacity decisions.

mod cache;
mod gate;
mod interval;
mod limiter;
mod store;

pub use cache::{CacheStore, MemoryCache};
pub use gate::{Admission, OrderGate};
pub use interval::{
    interval_start, next_interval_start, seconds_until, week_start_from_index, IntervalKind,
};
pub use limiter::{
    OrderLimiter, RolloverContext, RolloverOverride, StartContext, StartOverride, UNLIMITED,
};
pub use store::{MemoryOrderStore, OrderRecord, OrderStore};
