//! Delegation event log and stake snapshot types.
//!
//! A delegation event records the *new total* a delegator has committed to
//! the target account, not a delta. Reconstructing current stake therefore
//! means keeping the latest event per delegator, which is what
//! `StakeSnapshot` holds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chain block height.
pub type BlockNum = u64;

/// One observed stake-change event for the target account.
///
/// Streams of these arrive ordered by `block_num` ascending, as delivered by
/// the source log. `vests == 0.0` means the delegator withdrew entirely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelegationEvent {
    /// Account that changed its delegation.
    pub delegator: String,
    /// New total delegated stake in VESTS.
    pub vests: f64,
    /// Block the event was included in.
    pub block_num: BlockNum,
    /// Block timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Latest known stake for one delegator within the queried range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StakeEntry {
    pub vests: f64,
    pub block_num: BlockNum,
    pub timestamp: DateTime<Utc>,
}

impl StakeEntry {
    pub fn from_event(event: &DelegationEvent) -> Self {
        Self {
            vests: event.vests,
            block_num: event.block_num,
            timestamp: event.timestamp,
        }
    }
}

/// Mapping delegator → latest stake.
///
/// A `BTreeMap` so iteration (and everything derived from it, such as tie
/// order in the payout sort) is deterministic by account name.
pub type StakeSnapshot = BTreeMap<String, StakeEntry>;
