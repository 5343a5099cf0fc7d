//! Ordering admission stub.

use chrono::TimeZone;
use tracing::debug;

use crate::error::Result;

use super::limiter::OrderLimiter;

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Capacity remains in the current interval.
    Allowed,
    /// The interval's order limit has been reached.
    Blocked,
}

/// Gate deciding whether a new order attempt may proceed.
///
/// The gate consumes the limiter's decision and nothing else. What
/// blocking actually does (hiding checkout, queueing the order) is the
/// host's concern, along with its failure and rollback semantics.
pub struct OrderGate<Tz: TimeZone> {
    limiter: OrderLimiter<Tz>,
}

impl<Tz> OrderGate<Tz>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
{
    /// Create a gate over a limiter.
    pub fn new(limiter: OrderLimiter<Tz>) -> Self {
        Self { limiter }
    }

    /// The underlying limiter.
    pub fn limiter(&self) -> &OrderLimiter<Tz> {
        &self.limiter
    }

    /// Decide whether a new order attempt may proceed.
    pub async fn admit(&self) -> Result<Admission> {
        if self.limiter.has_reached_limit().await? {
            debug!("Order limit reached, blocking new orders");
            Ok(Admission::Blocked)
        } else {
            Ok(Admission::Allowed)
        }
    }
}
