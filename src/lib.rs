//! Turnstile - Interval-Window Order Limiting
//!
//! This crate implements the counting and decision core behind an
//! order-limiting policy: for a store that sells a finite capacity of
//! order slots per recurring interval (daily, weekly, or monthly), it
//! answers how many qualifying orders have been placed in the current
//! interval, how many remain, and when the interval next resets.
//!
//! Configuration, the count cache, and the authoritative order store are
//! reached through narrow traits so hosts can plug in their own backends.

pub mod limit;
pub mod config;
pub mod clock;
pub mod error;
