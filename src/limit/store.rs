//! Authoritative order counting.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::error::Result;

/// Trait for order store implementations.
///
/// The store designates which order classifications count toward the
/// limit; the counting query is a pure read against that set and must
/// never mutate store state. Query failures propagate rather than being
/// reported as zero.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Count qualifying orders created at or after `since`.
    async fn count_qualifying(&self, since: DateTime<Utc>) -> Result<u64>;
}

/// A recorded order: a type classification and a creation instant.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    /// Type classification, e.g. `sale` or `subscription_renewal`.
    pub kind: String,
    /// Creation instant in UTC.
    pub created_at: DateTime<Utc>,
}

/// In-memory order store.
///
/// Holds order records and a designated set of counting kinds; suitable
/// as a host-side default and as a test double.
pub struct MemoryOrderStore {
    orders: RwLock<Vec<OrderRecord>>,
    counting_kinds: HashSet<String>,
    queries: AtomicU64,
}

impl MemoryOrderStore {
    /// Create a store where the given kinds count toward the limit.
    pub fn new<I, S>(counting_kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            orders: RwLock::new(Vec::new()),
            counting_kinds: counting_kinds.into_iter().map(Into::into).collect(),
            queries: AtomicU64::new(0),
        }
    }

    /// Record an order.
    pub fn record(&self, kind: impl Into<String>, created_at: DateTime<Utc>) {
        self.orders.write().push(OrderRecord {
            kind: kind.into(),
            created_at,
        });
    }

    /// Number of recorded orders of any kind.
    pub fn order_count(&self) -> usize {
        self.orders.read().len()
    }

    /// Number of counting queries served.
    ///
    /// This is primarily useful for testing cache behavior.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn count_qualifying(&self, since: DateTime<Utc>) -> Result<u64> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let orders = self.orders.read();
        let count = orders
            .iter()
            .filter(|o| o.created_at >= since && self.counting_kinds.contains(&o.kind))
            .count();
        Ok(count as u64)
    }
}
