//! Timeslot and tributary-port-number pool accounting
//!
//! Each OTN-capable network termination point carries two fixed-size pools
//! of equal cardinality: the timeslot (TS) pool, one slot per 1.25G of an
//! ODU4, and the tributary port number (TPN) pool. Indices are 1-based as on
//! the wire. Every index is either free or used, never both, so
//! `free_count() + used_count() == size()` holds at all times.
//!
//! Allocation is all-or-nothing: a request that cannot be satisfied leaves
//! the pools untouched. Release is idempotent.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use thiserror::Error;

/// Canonical pool size: 80 tributary slots of an OTU4/ODU4
pub const DEFAULT_POOL_SIZE: u16 = 80;

const WORD_BITS: u16 = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Index range {first}..={last} outside pool of size {size}")]
    OutOfRange { first: u16, last: u16, size: u16 },

    #[error("Tributary slots {first}..={last} not free")]
    SlotsInUse { first: u16, last: u16 },

    #[error("Tributary port number {tpn} not free")]
    TpnInUse { tpn: u16 },

    #[error("Pools on one termination point differ in size: ts={ts} tpn={tpn}")]
    SizeMismatch { ts: u16, tpn: u16 },

    #[error("Stored pool of size {size} carries {words} bitmap words or bits past its end")]
    Corrupt { size: u16, words: usize },
}

/// Client service granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClientRate {
    /// 1GE in ODU0
    OneGe,
    /// 10GE in ODU2e
    TenGe,
    /// 100GE in ODU4
    HundredGe,
}

impl ClientRate {
    /// Tributary slots consumed
    pub fn slots(&self) -> u16 {
        match self {
            Self::OneGe => 1,
            Self::TenGe => 8,
            Self::HundredGe => 80,
        }
    }

    /// Bandwidth moved between available and used on the carrying link
    pub fn bandwidth_mbps(&self) -> u32 {
        match self {
            Self::OneGe => 1_000,
            Self::TenGe => 10_000,
            Self::HundredGe => 100_000,
        }
    }

    pub fn from_mbps(mbps: u32) -> Option<Self> {
        match mbps {
            1_000 => Some(Self::OneGe),
            10_000 => Some(Self::TenGe),
            100_000 => Some(Self::HundredGe),
            _ => None,
        }
    }

    /// First slot used for `tpn` when the caller does not pin one
    pub fn default_start_slot(&self, tpn: u16) -> u16 {
        tpn.saturating_sub(1)
            .saturating_mul(self.slots())
            .saturating_add(1)
    }
}

impl FromStr for ClientRate {
    type Err = String;

    fn from_str(rate: &str) -> Result<Self, Self::Err> {
        match rate {
            "1G" => Ok(Self::OneGe),
            "10G" => Ok(Self::TenGe),
            "100G" => Ok(Self::HundredGe),
            other => Err(format!("unsupported client rate '{other}'")),
        }
    }
}

impl fmt::Display for ClientRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneGe => "1G",
            Self::TenGe => "10G",
            Self::HundredGe => "100G",
        })
    }
}

/// Fixed-size bitmap of used indices
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredPool")]
pub struct ResourcePool {
    size: u16,
    used: Vec<u64>,
}

/// Wire shape of [`ResourcePool`], checked before use
#[derive(Deserialize)]
struct StoredPool {
    size: u16,
    used: Vec<u64>,
}

impl TryFrom<StoredPool> for ResourcePool {
    type Error = PoolError;

    fn try_from(stored: StoredPool) -> Result<Self, Self::Error> {
        let corrupt = PoolError::Corrupt {
            size: stored.size,
            words: stored.used.len(),
        };
        if stored.used.len() != stored.size.div_ceil(WORD_BITS) as usize {
            return Err(corrupt);
        }
        let tail_bits = stored.size % WORD_BITS;
        if let Some(last) = stored.used.last() {
            if tail_bits != 0 && last >> tail_bits != 0 {
                return Err(corrupt);
            }
        }
        Ok(Self {
            size: stored.size,
            used: stored.used,
        })
    }
}

impl ResourcePool {
    /// Pool with every index free
    pub fn new(size: u16) -> Self {
        let words = size.div_ceil(WORD_BITS) as usize;
        Self {
            size,
            used: vec![0; words],
        }
    }

    pub fn size(&self) -> u16 {
        self.size
    }

    pub fn used_count(&self) -> u16 {
        self.used.iter().map(|word| word.count_ones() as u16).sum()
    }

    pub fn free_count(&self) -> u16 {
        self.size - self.used_count()
    }

    /// `None` when the index is outside the pool
    pub fn is_free(&self, index: u16) -> Option<bool> {
        let (word, bit) = self.position(index)?;
        Some(self.used[word] & (1 << bit) == 0)
    }

    pub fn free_indices(&self) -> Vec<u16> {
        (1..=self.size)
            .filter(|&index| self.is_free(index) == Some(true))
            .collect()
    }

    pub fn used_indices(&self) -> Vec<u16> {
        (1..=self.size)
            .filter(|&index| self.is_free(index) == Some(false))
            .collect()
    }

    /// Mark every index in `range` used, or nothing if any is taken
    pub fn take(&mut self, range: RangeInclusive<u16>) -> Result<(), PoolError> {
        self.check_range(&range)?;
        if range.clone().any(|index| self.is_free(index) != Some(true)) {
            return Err(PoolError::SlotsInUse {
                first: *range.start(),
                last: *range.end(),
            });
        }
        for index in range {
            self.set(index, true);
        }
        Ok(())
    }

    /// Mark every index in `range` free. Already-free indices are left as they are.
    pub fn restore(&mut self, range: RangeInclusive<u16>) -> Result<(), PoolError> {
        self.check_range(&range)?;
        for index in range {
            self.set(index, false);
        }
        Ok(())
    }

    fn check_range(&self, range: &RangeInclusive<u16>) -> Result<(), PoolError> {
        let (first, last) = (*range.start(), *range.end());
        if first == 0 || first > last || last > self.size {
            return Err(PoolError::OutOfRange {
                first,
                last,
                size: self.size,
            });
        }
        Ok(())
    }

    fn position(&self, index: u16) -> Option<(usize, u16)> {
        if index == 0 || index > self.size {
            return None;
        }
        let offset = index - 1;
        Some(((offset / WORD_BITS) as usize, offset % WORD_BITS))
    }

    fn set(&mut self, index: u16, used: bool) {
        if let Some((word, bit)) = self.position(index) {
            if used {
                self.used[word] |= 1 << bit;
            } else {
                self.used[word] &= !(1 << bit);
            }
        }
    }
}

impl fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("size", &self.size)
            .field("used", &self.used_indices())
            .finish()
    }
}

/// Slots and port number consumed by one client service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub tpn: u16,
    pub slots: RangeInclusive<u16>,
    pub bandwidth_mbps: u32,
}

/// The TS/TPN pool pair of one termination point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TpPools {
    pub ts_pool: ResourcePool,
    pub tpn_pool: ResourcePool,
}

impl Default for TpPools {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_SIZE)
    }
}

impl TpPools {
    /// Both pools fully free
    pub fn new(size: u16) -> Self {
        Self {
            ts_pool: ResourcePool::new(size),
            tpn_pool: ResourcePool::new(size),
        }
    }

    pub fn check_consistent(&self) -> Result<(), PoolError> {
        if self.ts_pool.size() != self.tpn_pool.size() {
            return Err(PoolError::SizeMismatch {
                ts: self.ts_pool.size(),
                tpn: self.tpn_pool.size(),
            });
        }
        Ok(())
    }

    /// Allocate `rate.slots()` slots starting at `start_slot` (or the slot derived
    /// from `tpn`) plus the port number `tpn`. On error nothing changes.
    pub fn allocate(
        &mut self,
        rate: ClientRate,
        tpn: u16,
        start_slot: Option<u16>,
    ) -> Result<Allocation, PoolError> {
        self.check_consistent()?;
        let slots = Self::slot_range(rate, tpn, start_slot);

        match self.tpn_pool.is_free(tpn) {
            None => {
                return Err(PoolError::OutOfRange {
                    first: tpn,
                    last: tpn,
                    size: self.tpn_pool.size(),
                })
            }
            Some(false) => return Err(PoolError::TpnInUse { tpn }),
            Some(true) => {}
        }

        // Slots first: it is the only step that can still fail
        self.ts_pool.take(slots.clone())?;
        self.tpn_pool.take(tpn..=tpn)?;

        Ok(Allocation {
            tpn,
            slots,
            bandwidth_mbps: rate.bandwidth_mbps(),
        })
    }

    /// Whether the port number and every slot of the service are currently used
    pub fn holds(&self, rate: ClientRate, tpn: u16, start_slot: Option<u16>) -> bool {
        self.tpn_pool.is_free(tpn) == Some(false)
            && Self::slot_range(rate, tpn, start_slot)
                .all(|slot| self.ts_pool.is_free(slot) == Some(false))
    }

    /// Inverse of [`TpPools::allocate`]; releasing free indices is a no-op
    pub fn release(
        &mut self,
        rate: ClientRate,
        tpn: u16,
        start_slot: Option<u16>,
    ) -> Result<(), PoolError> {
        self.check_consistent()?;
        let slots = Self::slot_range(rate, tpn, start_slot);
        // Validate both ranges before touching either pool
        if self.tpn_pool.is_free(tpn).is_none() {
            return Err(PoolError::OutOfRange {
                first: tpn,
                last: tpn,
                size: self.tpn_pool.size(),
            });
        }
        self.ts_pool.check_range(&slots)?;

        self.ts_pool.restore(slots)?;
        self.tpn_pool.restore(tpn..=tpn)?;
        Ok(())
    }

    fn slot_range(rate: ClientRate, tpn: u16, start_slot: Option<u16>) -> RangeInclusive<u16> {
        let first = start_slot.unwrap_or_else(|| rate.default_start_slot(tpn));
        first..=first.saturating_add(rate.slots() - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pool_is_free() {
        let pool = ResourcePool::new(DEFAULT_POOL_SIZE);
        assert_eq!(pool.free_count(), 80);
        assert_eq!(pool.used_count(), 0);
        assert_eq!(pool.free_indices().first(), Some(&1));
        assert_eq!(pool.free_indices().last(), Some(&80));
        assert_eq!(pool.is_free(0), None);
        assert_eq!(pool.is_free(81), None);
    }

    #[test]
    fn test_ten_gig_on_tpn_one_uses_first_eight_slots() {
        let mut pools = TpPools::default();
        let allocation = pools.allocate(ClientRate::TenGe, 1, None).unwrap();

        assert_eq!(allocation.slots, 1..=8);
        assert_eq!(allocation.bandwidth_mbps, 10_000);
        assert_eq!(pools.ts_pool.free_count(), 72);
        assert_eq!(pools.tpn_pool.free_count(), 79);
        assert_eq!(pools.ts_pool.used_indices(), (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn test_derived_start_slot() {
        assert_eq!(ClientRate::TenGe.default_start_slot(2), 9);
        assert_eq!(ClientRate::OneGe.default_start_slot(5), 5);
        assert_eq!(ClientRate::HundredGe.default_start_slot(1), 1);
    }

    #[test]
    fn test_overlapping_allocation_changes_nothing() {
        let mut pools = TpPools::default();
        pools.allocate(ClientRate::TenGe, 1, Some(1)).unwrap();
        let before = pools.clone();

        // TPN 2 is free but slots 5..=12 overlap the first service
        let err = pools.allocate(ClientRate::TenGe, 2, Some(5)).unwrap_err();
        assert_eq!(err, PoolError::SlotsInUse { first: 5, last: 12 });
        assert_eq!(pools, before);

        let err = pools.allocate(ClientRate::OneGe, 1, Some(40)).unwrap_err();
        assert_eq!(err, PoolError::TpnInUse { tpn: 1 });
        assert_eq!(pools, before);
    }

    #[test]
    fn test_range_past_end_rejected() {
        let mut pools = TpPools::default();
        let err = pools.allocate(ClientRate::TenGe, 10, Some(75)).unwrap_err();
        assert!(matches!(err, PoolError::OutOfRange { .. }));
        assert_eq!(pools.ts_pool.free_count(), 80);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut pools = TpPools::default();
        pools.allocate(ClientRate::OneGe, 3, Some(3)).unwrap();

        pools.release(ClientRate::OneGe, 3, Some(3)).unwrap();
        let released = pools.clone();
        pools.release(ClientRate::OneGe, 3, Some(3)).unwrap();

        assert_eq!(pools, released);
        assert_eq!(pools, TpPools::default());
    }

    #[test]
    fn test_client_rate_parsing() {
        assert_eq!("10G".parse::<ClientRate>().unwrap(), ClientRate::TenGe);
        assert!("40G".parse::<ClientRate>().is_err());
        assert_eq!(ClientRate::from_mbps(1_000), Some(ClientRate::OneGe));
        assert_eq!(ClientRate::from_mbps(99_000), None);
    }

    #[test]
    fn test_holds_tracks_allocation() {
        let mut pools = TpPools::default();
        pools.allocate(ClientRate::TenGe, 1, Some(1)).unwrap();
        assert!(pools.holds(ClientRate::TenGe, 1, Some(1)));
        // other port, other slots, or a wider rate than allocated
        assert!(!pools.holds(ClientRate::TenGe, 2, Some(9)));
        assert!(!pools.holds(ClientRate::OneGe, 2, Some(1)));
        assert!(!pools.holds(ClientRate::HundredGe, 1, Some(1)));
    }

    #[test]
    fn test_stored_pool_is_checked() {
        let mut pool = ResourcePool::new(DEFAULT_POOL_SIZE);
        pool.take(3..=5).unwrap();
        let stored = serde_json::to_value(&pool).unwrap();
        let restored: ResourcePool = serde_json::from_value(stored).unwrap();
        assert_eq!(restored, pool);

        let short = serde_json::json!({ "size": 80, "used": [0] });
        assert!(serde_json::from_value::<ResourcePool>(short).is_err());

        // bit 81 set in a pool of 80
        let overflow = serde_json::json!({ "size": 80, "used": [0, 1u64 << 16] });
        assert!(serde_json::from_value::<ResourcePool>(overflow).is_err());
    }
}
