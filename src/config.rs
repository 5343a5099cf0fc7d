//! Limit settings access.
//!
//! Settings live in an external configuration store as a loosely typed
//! key-to-value mapping. They are fetched once per decision lifecycle and
//! converted into an immutable [`LimitSettings`] snapshot; typed lookups
//! apply defaults for missing or malformed values rather than failing.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Weekday;
use serde_yaml::Value;
use tracing::warn;

use crate::error::{Result, TurnstileError};
use crate::limit::{week_start_from_index, IntervalKind};

/// Recognized settings keys.
pub mod keys {
    /// Whether order limiting is enabled.
    pub const ENABLED: &str = "enabled";
    /// Maximum qualifying orders per interval.
    pub const LIMIT: &str = "limit";
    /// Interval kind: `daily`, `weekly`, or `monthly`.
    pub const INTERVAL: &str = "interval";
    /// Site-wide start-of-week day, 0=Sunday..6=Saturday.
    pub const WEEK_START_DAY: &str = "week_start_day";
}

/// The loosely typed settings mapping served by a configuration store.
pub type SettingsBag = HashMap<String, Value>;

/// Trait for configuration store implementations.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the full settings bag.
    async fn load(&self) -> Result<SettingsBag>;
}

/// In-memory settings store serving a fixed bag.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    bag: SettingsBag,
}

impl MemorySettingsStore {
    /// Create a store serving the given bag.
    pub fn new(bag: SettingsBag) -> Self {
        Self { bag }
    }

    /// Parse a settings bag from a YAML mapping.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let bag: SettingsBag = serde_yaml::from_str(yaml)
            .map_err(|e| TurnstileError::Config(format!("Failed to parse settings: {}", e)))?;
        Ok(Self::new(bag))
    }

    /// Look up a raw setting value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.bag.get(key)
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<SettingsBag> {
        Ok(self.bag.clone())
    }
}

/// Immutable settings snapshot for one decision lifecycle.
///
/// Callers needing fresher values load a new snapshot; an existing
/// snapshot never re-fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitSettings {
    /// Whether order limiting is enabled.
    pub enabled: bool,
    /// Configured limit, kept raw. Absent or non-numeric values are
    /// `None`; negative values are preserved and treated as unlimited by
    /// the limiter.
    pub limit: Option<i64>,
    /// The interval the limit applies to.
    pub interval: IntervalKind,
    /// First day of the week for weekly intervals.
    pub week_start: Weekday,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            limit: None,
            interval: IntervalKind::Daily,
            week_start: Weekday::Mon,
        }
    }
}

impl LimitSettings {
    /// Build a snapshot from a settings bag with per-key defaulting.
    pub fn from_bag(bag: &SettingsBag) -> Self {
        let enabled = bag.get(keys::ENABLED).map(as_flag).unwrap_or(false);
        let limit = bag.get(keys::LIMIT).and_then(as_integer);
        let interval = bag
            .get(keys::INTERVAL)
            .and_then(Value::as_str)
            .map(IntervalKind::parse)
            .unwrap_or_default();
        let week_start = bag
            .get(keys::WEEK_START_DAY)
            .and_then(as_integer)
            .map(|i| week_start_from_index(i.rem_euclid(7) as u8))
            .unwrap_or(Weekday::Mon);

        Self {
            enabled,
            limit,
            interval,
            week_start,
        }
    }

    /// Load a snapshot from a configuration store.
    ///
    /// An unavailable store yields the default snapshot (limiting
    /// disabled) rather than an error.
    pub async fn load(store: &dyn SettingsStore) -> Self {
        match store.load().await {
            Ok(bag) => Self::from_bag(&bag),
            Err(e) => {
                warn!(error = %e, "Settings unavailable, using defaults");
                Self::default()
            }
        }
    }
}

/// Interpret a setting as a boolean flag.
fn as_flag(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

/// Interpret a setting as an integer, tolerating numeric strings.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
