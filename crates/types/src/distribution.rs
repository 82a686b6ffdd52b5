//! Distribution outputs: per-delegator contributions and run reports.

use crate::delegation::BlockNum;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A delegator's stake after conversion to HP, ready for allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatorStake {
    pub delegator: String,
    pub vests: f64,
    pub hp: f64,
    pub block_num: BlockNum,
    pub timestamp: DateTime<Utc>,
}

/// One delegator's slice of a distribution round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatorContribution {
    pub delegator: String,
    pub stake_hp: f64,
    pub share_percent: f64,
    pub payout_hive: f64,
    pub block_num: BlockNum,
    pub timestamp: DateTime<Utc>,
}

/// Full result of one distribution round over the event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributionResult {
    pub contributions: Vec<DelegatorContribution>,
    pub total_stake_hp: f64,
    pub payout_pool_hive: f64,
    pub cutoff: DateTime<Utc>,
    pub events_processed: usize,
}

impl DistributionResult {
    /// A round with no eligible delegators pays nothing.
    pub fn empty(cutoff: DateTime<Utc>, events_processed: usize) -> Self {
        DistributionResult {
            contributions: Vec::new(),
            total_stake_hp: 0.0,
            payout_pool_hive: 0.0,
            cutoff,
            events_processed,
        }
    }
}

/// Report for a dynamic-rate payout run: the derived rate, the accrual figure
/// it was derived from, and the resulting per-delegator payments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicPayoutReport {
    pub rate_percent: f64,
    pub accrual_hp: f64,
    pub pool_considered_hive: f64,
    pub payout_pool_hive: f64,
    pub payments: Vec<DelegatorContribution>,
    pub stats: crate::accrual::AccrualStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_result_has_zero_totals() {
        let cutoff = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let result = DistributionResult::empty(cutoff, 12);
        assert!(result.contributions.is_empty());
        assert_eq!(result.total_stake_hp, 0.0);
        assert_eq!(result.payout_pool_hive, 0.0);
        assert_eq!(result.events_processed, 12);
    }

    #[test]
    fn contribution_serializes_camel_case() {
        let contribution = DelegatorContribution {
            delegator: "alice".to_string(),
            stake_hp: 120.5,
            share_percent: 60.25,
            payout_hive: 3.01,
            block_num: 88_000_000,
            timestamp: Utc.with_ymd_and_hms(2024, 2, 14, 9, 30, 0).unwrap(),
        };
        let json = serde_json::to_value(&contribution).unwrap();
        assert_eq!(json["stakeHp"], 120.5);
        assert_eq!(json["sharePercent"], 60.25);
        assert_eq!(json["payoutHive"], 3.01);
        assert_eq!(json["blockNum"], 88_000_000);
    }
}
