//! # Trade History Store - Append-Only Settlement Record
//!
//! Entries are appended in settlement-confirmation order, which is the only
//! observable order (concurrent submissions may finalize out of submission
//! order). Appends are idempotent on the transaction reference so a replayed
//! finalize cannot double-append. There are no update or delete operations;
//! corrections are modeled as new compensating records.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use types::{PoolId, TradeRecord};

/// Query ordering by record timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Thread-safe append-only trade history
pub struct TradeHistoryStore {
    /// tx_ref -> record
    records: DashMap<String, TradeRecord>,
    /// pool -> tx_refs in confirmation order
    by_pool: DashMap<PoolId, Vec<String>>,
}

impl TradeHistoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_pool: DashMap::new(),
        }
    }

    /// Append a record. Returns false (and stores nothing) when a record with
    /// the same transaction reference already exists. The reference is claimed
    /// under a single entry guard, so concurrent appends of the same reference
    /// cannot both index it.
    pub fn append(&self, record: TradeRecord) -> bool {
        match self.records.entry(record.tx_ref.clone()) {
            Entry::Occupied(_) => {
                debug!(tx_ref = %record.tx_ref, "duplicate trade record, skipping append");
                false
            }
            Entry::Vacant(slot) => {
                self.by_pool
                    .entry(record.pool)
                    .or_default()
                    .push(record.tx_ref.clone());
                debug!(
                    pool_id = %record.pool,
                    tx_ref = %record.tx_ref,
                    side = %record.side,
                    price = %record.price,
                    "trade recorded"
                );
                slot.insert(record);
                true
            }
        }
    }

    /// Records for a pool at or after `since`, ordered by timestamp
    pub fn query(
        &self,
        pool_id: PoolId,
        since: DateTime<Utc>,
        order: SortOrder,
    ) -> Vec<TradeRecord> {
        let mut rows: Vec<TradeRecord> = self
            .by_pool
            .get(&pool_id)
            .map(|refs| {
                refs.iter()
                    .filter_map(|tx_ref| self.records.get(tx_ref).map(|r| r.clone()))
                    .filter(|r| r.timestamp >= since)
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by_key(|r| r.timestamp);
        if order == SortOrder::Descending {
            rows.reverse();
        }
        rows
    }

    /// Most recent records for a pool, newest first
    pub fn latest(&self, pool_id: PoolId, limit: usize) -> Vec<TradeRecord> {
        self.by_pool
            .get(&pool_id)
            .map(|refs| {
                refs.iter()
                    .rev()
                    .take(limit)
                    .filter_map(|tx_ref| self.records.get(tx_ref).map(|r| r.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn pool_count(&self, pool_id: PoolId) -> usize {
        self.by_pool.get(&pool_id).map(|v| v.len()).unwrap_or(0)
    }
}

impl Default for TradeHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
