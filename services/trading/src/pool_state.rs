//! # Pool State Repository - Canonical Reserve Bookkeeping
//!
//! Owns the cached reserve figures for each pool. The external ledger is the
//! source of truth; `refresh` overwrites the cache from a live snapshot and
//! `apply_delta` performs the compare-and-update that keeps local bookkeeping
//! consistent with settled trades.
//!
//! Two mechanisms serialize settlements per pool:
//! - a claim set enforcing at most one in-flight settlement per pool; a
//!   second settlement attempt observes `PoolContended` immediately
//! - a version counter checked by `apply_delta`, so a write against stale
//!   state is rejected rather than silently applied
//!
//! A delta that would drive a reserve to zero or below halts the pool: that
//! state means an internal bug or a quote computed against stale reserves,
//! and it is never clamped away.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use tracing::{debug, error, warn};

use types::{Pool, PoolId, TradeError};

/// Exclusive right to settle against one pool. Released on drop.
pub struct SettlementClaim<'a> {
    repo: &'a PoolStateRepository,
    pool: PoolId,
}

impl SettlementClaim<'_> {
    pub fn pool(&self) -> PoolId {
        self.pool
    }
}

impl Drop for SettlementClaim<'_> {
    fn drop(&mut self) {
        self.repo.claims.remove(&self.pool);
    }
}

/// Thread-safe repository of pool state
pub struct PoolStateRepository {
    pools: DashMap<PoolId, Pool>,
    /// Pools with a settlement in flight
    claims: DashMap<PoolId, ()>,
}

impl PoolStateRepository {
    pub fn new() -> Self {
        Self {
            pools: DashMap::new(),
            claims: DashMap::new(),
        }
    }

    pub fn insert(&self, pool: Pool) {
        debug!(pool_id = %pool.id, version = pool.version, "pool registered");
        self.pools.insert(pool.id, pool);
    }

    pub fn get(&self, pool_id: PoolId) -> Result<Pool, TradeError> {
        self.pools
            .get(&pool_id)
            .map(|p| p.clone())
            .ok_or(TradeError::PoolNotFound { pool: pool_id })
    }

    pub fn count(&self) -> usize {
        self.pools.len()
    }

    /// Claim the pool for one settlement. Fails with `PoolContended` while
    /// another settlement holds it.
    pub fn try_claim(&self, pool_id: PoolId) -> Result<SettlementClaim<'_>, TradeError> {
        match self.claims.entry(pool_id) {
            Entry::Occupied(_) => {
                warn!(pool_id = %pool_id, "settlement already in flight");
                Err(TradeError::PoolContended { pool: pool_id })
            }
            Entry::Vacant(slot) => {
                slot.insert(());
                Ok(SettlementClaim {
                    repo: self,
                    pool: pool_id,
                })
            }
        }
    }

    /// Overwrite cached reserves from ledger truth. Bumps the version so any
    /// delta computed against the stale figures is rejected.
    pub fn refresh(
        &self,
        pool_id: PoolId,
        reserve_base: Decimal,
        reserve_quote: Decimal,
        trading_fee: u32,
        lp_shares: Decimal,
    ) -> Result<Pool, TradeError> {
        let mut entry = self
            .pools
            .get_mut(&pool_id)
            .ok_or(TradeError::PoolNotFound { pool: pool_id })?;

        entry.reserve_base = reserve_base;
        entry.reserve_quote = reserve_quote;
        entry.trading_fee = trading_fee;
        entry.lp_shares = lp_shares;
        entry.version += 1;
        debug!(
            pool_id = %pool_id,
            reserve_base = %reserve_base,
            reserve_quote = %reserve_quote,
            version = entry.version,
            "pool refreshed from ledger snapshot"
        );
        Ok(entry.clone())
    }

    /// Atomically adjust reserves by signed deltas, contingent on the pool
    /// not having been mutated since `expected_version` was read.
    ///
    /// Rejects (never silently applies) when a resulting reserve would be
    /// non-positive, and halts the pool.
    pub fn apply_delta(
        &self,
        pool_id: PoolId,
        base_delta: Decimal,
        quote_delta: Decimal,
        expected_version: u64,
    ) -> Result<Pool, TradeError> {
        let mut entry = self
            .pools
            .get_mut(&pool_id)
            .ok_or(TradeError::PoolNotFound { pool: pool_id })?;

        if entry.halted {
            return Err(TradeError::PoolHalted { pool: pool_id });
        }
        if entry.version != expected_version {
            warn!(
                pool_id = %pool_id,
                expected = expected_version,
                actual = entry.version,
                "stale version on apply_delta"
            );
            return Err(TradeError::PoolContended { pool: pool_id });
        }

        // Compute both sides before writing either; a partial apply would
        // corrupt the invariant product
        let new_base = entry.reserve_base + base_delta;
        let new_quote = entry.reserve_quote + quote_delta;

        if new_base <= Decimal::ZERO {
            entry.halted = true;
            error!(pool_id = %pool_id, delta = %base_delta, reserve = %entry.reserve_base,
                "base reserve underflow, pool halted");
            return Err(TradeError::ReserveUnderflow {
                pool: pool_id,
                reserve: entry.reserve_base,
                delta: base_delta,
            });
        }
        if new_quote <= Decimal::ZERO {
            entry.halted = true;
            error!(pool_id = %pool_id, delta = %quote_delta, reserve = %entry.reserve_quote,
                "quote reserve underflow, pool halted");
            return Err(TradeError::ReserveUnderflow {
                pool: pool_id,
                reserve: entry.reserve_quote,
                delta: quote_delta,
            });
        }

        entry.reserve_base = new_base;
        entry.reserve_quote = new_quote;
        entry.version += 1;
        debug!(
            pool_id = %pool_id,
            base_delta = %base_delta,
            quote_delta = %quote_delta,
            version = entry.version,
            "reserve delta applied"
        );
        Ok(entry.clone())
    }

    /// Store the derived market-cap estimate. Informational; does not bump
    /// the version.
    pub fn set_market_cap(&self, pool_id: PoolId, market_cap: Decimal) -> Result<(), TradeError> {
        let mut entry = self
            .pools
            .get_mut(&pool_id)
            .ok_or(TradeError::PoolNotFound { pool: pool_id })?;
        entry.market_cap = market_cap;
        Ok(())
    }

    /// Operator action after an underflow has been investigated
    pub fn resume(&self, pool_id: PoolId) -> Result<(), TradeError> {
        let mut entry = self
            .pools
            .get_mut(&pool_id)
            .ok_or(TradeError::PoolNotFound { pool: pool_id })?;
        entry.halted = false;
        entry.version += 1;
        Ok(())
    }
}

impl Default for PoolStateRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use types::IssuedAsset;

    fn repo_with_pool() -> (PoolStateRepository, PoolId) {
        let repo = PoolStateRepository::new();
        let id = PoolId::new(1).unwrap();
        repo.insert(Pool::new(
            id,
            IssuedAsset::new("SHRK", "rIssuer1"),
            dec!(1000000),
            dec!(2000000000),
            500,
        ));
        (repo, id)
    }

    #[test]
    fn test_get_unknown_pool() {
        let repo = PoolStateRepository::new();
        let missing = PoolId::new(9).unwrap();
        assert_eq!(
            repo.get(missing),
            Err(TradeError::PoolNotFound { pool: missing })
        );
    }

    #[test]
    fn test_apply_delta_updates_reserves_and_version() {
        let (repo, id) = repo_with_pool();
        let before = repo.get(id).unwrap();

        let after = repo
            .apply_delta(id, dec!(1000), dec!(-1988022), before.version)
            .unwrap();

        assert_eq!(after.reserve_base, dec!(1001000));
        assert_eq!(after.reserve_quote, dec!(1998011978));
        assert_eq!(after.version, before.version + 1);
    }

    #[test]
    fn test_stale_version_is_rejected_without_mutation() {
        let (repo, id) = repo_with_pool();
        let before = repo.get(id).unwrap();

        let result = repo.apply_delta(id, dec!(1000), dec!(-1000), before.version + 5);
        assert_eq!(result, Err(TradeError::PoolContended { pool: id }));

        let after = repo.get(id).unwrap();
        assert_eq!(after.reserve_base, before.reserve_base);
        assert_eq!(after.reserve_quote, before.reserve_quote);
        assert_eq!(after.version, before.version);
    }

    #[test]
    fn test_underflow_halts_pool_and_never_clamps() {
        let (repo, id) = repo_with_pool();
        let before = repo.get(id).unwrap();

        let result = repo.apply_delta(id, dec!(-1000001), dec!(0), before.version);
        assert!(matches!(result, Err(TradeError::ReserveUnderflow { .. })));

        let after = repo.get(id).unwrap();
        assert!(after.halted);
        assert_eq!(after.reserve_base, before.reserve_base);

        // Halted pool refuses further deltas until resumed
        let next = repo.apply_delta(id, dec!(1), dec!(-1), after.version);
        assert_eq!(next, Err(TradeError::PoolHalted { pool: id }));

        repo.resume(id).unwrap();
        let resumed = repo.get(id).unwrap();
        assert!(!resumed.halted);
        repo.apply_delta(id, dec!(1), dec!(-1), resumed.version)
            .unwrap();
    }

    #[test]
    fn test_claim_excludes_concurrent_settlement() {
        let (repo, id) = repo_with_pool();

        let claim = repo.try_claim(id).unwrap();
        assert_eq!(claim.pool(), id);
        assert_eq!(
            repo.try_claim(id).err(),
            Some(TradeError::PoolContended { pool: id })
        );

        drop(claim);
        assert!(repo.try_claim(id).is_ok());
    }

    #[test]
    fn test_refresh_overwrites_cache_and_bumps_version() {
        let (repo, id) = repo_with_pool();
        let before = repo.get(id).unwrap();

        let after = repo
            .refresh(id, dec!(1100000), dec!(1900000000), 600, dec!(44721359))
            .unwrap();

        assert_eq!(after.reserve_base, dec!(1100000));
        assert_eq!(after.reserve_quote, dec!(1900000000));
        assert_eq!(after.trading_fee, 600);
        assert_eq!(after.lp_shares, dec!(44721359));
        assert_eq!(after.version, before.version + 1);
    }

    #[test]
    fn test_market_cap_does_not_disturb_version() {
        let (repo, id) = repo_with_pool();
        let before = repo.get(id).unwrap();

        repo.set_market_cap(id, dec!(0.000275)).unwrap();
        let after = repo.get(id).unwrap();
        assert_eq!(after.market_cap, dec!(0.000275));
        assert_eq!(after.version, before.version);
    }
}
