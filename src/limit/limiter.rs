//! Limit decision layer.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc, Weekday};
use tracing::{debug, trace};

use crate::clock::{Clock, SystemClock};
use crate::config::LimitSettings;
use crate::error::Result;

use super::cache::CacheStore;
use super::interval::{self, IntervalKind};
use super::store::OrderStore;

/// Name of the single cache slot holding the current interval's count.
const COUNT_CACHE_NAME: &str = "turnstile_interval_count";

/// Sentinel returned by capacity accessors when limiting does not apply.
pub const UNLIMITED: i64 = -1;

/// Context handed to a start override.
#[derive(Debug, Clone)]
pub struct StartContext<Tz: TimeZone> {
    /// The instant the boundary was computed for.
    pub now: DateTime<Tz>,
    /// The configured interval kind.
    pub kind: IntervalKind,
    /// The configured start-of-week day.
    pub week_start: Weekday,
}

/// Context handed to a rollover override.
#[derive(Debug, Clone)]
pub struct RolloverContext<Tz: TimeZone> {
    /// Start of the current interval.
    pub current_start: DateTime<Tz>,
    /// The configured interval kind.
    pub kind: IntervalKind,
}

/// Host override replacing the computed interval start.
pub type StartOverride<Tz> =
    Box<dyn Fn(DateTime<Tz>, &StartContext<Tz>) -> DateTime<Tz> + Send + Sync>;

/// Host override replacing the computed next interval start.
pub type RolloverOverride<Tz> =
    Box<dyn Fn(DateTime<Tz>, &RolloverContext<Tz>) -> DateTime<Tz> + Send + Sync>;

/// The order limiting decision layer.
///
/// Composes a settings snapshot, the interval boundary calculator, the
/// count cache, and the authoritative order store into capacity
/// decisions. Capacity accessors return [`UNLIMITED`] (-1) when limiting
/// is disabled or no usable limit is configured; a remaining capacity of
/// exactly zero means the limit has been reached, so the two states stay
/// distinguishable.
pub struct OrderLimiter<Tz: TimeZone> {
    settings: LimitSettings,
    tz: Tz,
    clock: Arc<dyn Clock>,
    cache: Arc<dyn CacheStore>,
    store: Arc<dyn OrderStore>,
    start_override: Option<StartOverride<Tz>>,
    rollover_override: Option<RolloverOverride<Tz>>,
}

impl<Tz> OrderLimiter<Tz>
where
    Tz: TimeZone + Send + Sync,
    Tz::Offset: Send + Sync,
{
    /// Create a limiter over the given collaborators, using the system
    /// clock.
    pub fn new(
        settings: LimitSettings,
        tz: Tz,
        cache: Arc<dyn CacheStore>,
        store: Arc<dyn OrderStore>,
    ) -> Self {
        Self {
            settings,
            tz,
            clock: Arc::new(SystemClock),
            cache,
            store,
            start_override: None,
            rollover_override: None,
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register an override for the computed interval start.
    ///
    /// The override is applied unconditionally wherever the boundary is
    /// used and may replace it entirely.
    pub fn with_start_override<F>(mut self, f: F) -> Self
    where
        F: Fn(DateTime<Tz>, &StartContext<Tz>) -> DateTime<Tz> + Send + Sync + 'static,
    {
        self.start_override = Some(Box::new(f));
        self
    }

    /// Register an override for the computed next interval start.
    pub fn with_rollover_override<F>(mut self, f: F) -> Self
    where
        F: Fn(DateTime<Tz>, &RolloverContext<Tz>) -> DateTime<Tz> + Send + Sync + 'static,
    {
        self.rollover_override = Some(Box::new(f));
        self
    }

    /// The settings snapshot this limiter decides against.
    pub fn settings(&self) -> &LimitSettings {
        &self.settings
    }

    /// Whether order limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.settings.enabled
    }

    /// The configured limit, or [`UNLIMITED`] when limiting is disabled
    /// or the configured value is absent or negative.
    pub fn limit(&self) -> i64 {
        if !self.settings.enabled {
            return UNLIMITED;
        }
        match self.settings.limit {
            Some(limit) if limit >= 0 => limit,
            _ => UNLIMITED,
        }
    }

    /// Start of the current interval, start override applied.
    pub fn interval_start(&self) -> DateTime<Tz> {
        self.interval_start_at(&self.now_local())
    }

    /// Seconds until the next interval boundary, rollover override
    /// applied. Never negative.
    pub fn seconds_until_next_interval(&self) -> u64 {
        self.seconds_until_next_at(&self.now_local())
    }

    /// Remaining order capacity in the current interval.
    ///
    /// Returns [`UNLIMITED`] without touching the cache when limiting is
    /// inactive; otherwise the configured limit minus the interval's
    /// qualifying order count, floored at zero. The count comes from the
    /// cache when present and is regenerated from the authoritative store
    /// on a miss.
    pub async fn remaining_orders(&self) -> Result<i64> {
        let limit = self.limit();
        if limit < 0 {
            trace!("Limiting inactive, capacity is unlimited");
            return Ok(UNLIMITED);
        }

        let count = match self.cache.get(COUNT_CACHE_NAME).await {
            Some(count) => {
                trace!(count, "Interval count cache hit");
                count
            }
            None => self.regenerate().await?,
        };

        Ok((limit - count as i64).max(0))
    }

    /// Whether the current interval's capacity is exhausted.
    ///
    /// Always `false` when limiting is disabled or unlimited.
    pub async fn has_reached_limit(&self) -> Result<bool> {
        Ok(self.remaining_orders().await? == 0)
    }

    /// Recount qualifying orders from the authoritative store and
    /// rewrite the cache slot.
    ///
    /// The entry's TTL is the time remaining until the next interval
    /// boundary at the moment of writing, so it lapses exactly at
    /// rollover. The count is always recomputed from the store rather
    /// than incremented: concurrent regenerations each derive the same
    /// ground-truth value and may safely overwrite one another.
    pub async fn regenerate(&self) -> Result<u64> {
        let now = self.now_local();
        let start = self.interval_start_at(&now);
        let count = self.store.count_qualifying(start.with_timezone(&Utc)).await?;
        let ttl = self.seconds_until_next_at(&now);

        debug!(
            count,
            ttl_seconds = ttl,
            interval = self.settings.interval.as_str(),
            "Regenerated interval order count"
        );

        self.cache.set(COUNT_CACHE_NAME, count, ttl).await;
        Ok(count)
    }

    fn now_local(&self) -> DateTime<Tz> {
        self.clock.now().with_timezone(&self.tz)
    }

    fn interval_start_at(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let computed =
            interval::interval_start(now, self.settings.interval, self.settings.week_start);
        match &self.start_override {
            Some(f) => {
                let ctx = StartContext {
                    now: now.clone(),
                    kind: self.settings.interval,
                    week_start: self.settings.week_start,
                };
                f(computed, &ctx)
            }
            None => computed,
        }
    }

    fn seconds_until_next_at(&self, now: &DateTime<Tz>) -> u64 {
        let current_start = self.interval_start_at(now);
        let computed = interval::next_interval_start(&current_start, self.settings.interval);
        let next_start = match &self.rollover_override {
            Some(f) => {
                let ctx = RolloverContext {
                    current_start: current_start.clone(),
                    kind: self.settings.interval,
                };
                f(computed, &ctx)
            }
            None => computed,
        };
        interval::seconds_until(now, &next_start)
    }
}
