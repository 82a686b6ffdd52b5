//! Eligibility filtering and proportional allocation of a reward pool.

use crate::filter::Filter;
use chrono::{DateTime, Utc};
use hivesplit_types::{DelegatorContribution, DelegatorStake, DistributionResult};

/// Split a reward pool among eligible delegators, proportional to stake.
///
/// Eligibility, in order: the curation account itself is dropped, then any
/// stake under `min_stake_hp`, then any account on the exclusion list. The
/// pool is the filter's accrual override when one is set, the base pool
/// otherwise, with `interest_percent` taken off the top. Survivors are sorted
/// non-increasing by stake; the sort is stable, so equal stakes keep their
/// input order. If no eligible stake remains the shares are not computed at
/// all and an empty result with zero totals comes back.
pub fn allocate(
    account: &str,
    stakes: Vec<DelegatorStake>,
    filter: &Filter,
    pool_base_hive: f64,
    interest_percent: f64,
    cutoff: DateTime<Utc>,
    events_processed: usize,
) -> DistributionResult {
    let mut eligible: Vec<DelegatorStake> = stakes
        .into_iter()
        .filter(|stake| stake.delegator != account)
        .filter(|stake| stake.hp >= filter.min_stake_hp)
        .filter(|stake| !filter.excluded.contains(&stake.delegator))
        .collect();

    let total_stake_hp: f64 = eligible.iter().map(|stake| stake.hp).sum();
    if total_stake_hp <= 0.0 {
        return DistributionResult::empty(cutoff, events_processed);
    }

    let gross_pool_hive = if filter.accrual_override_hive > 0.0 {
        filter.accrual_override_hive
    } else {
        pool_base_hive
    };
    let payout_pool_hive = gross_pool_hive * (100.0 - interest_percent) / 100.0;

    eligible.sort_by(|a, b| b.hp.partial_cmp(&a.hp).unwrap_or(std::cmp::Ordering::Equal));

    let contributions = eligible
        .into_iter()
        .map(|stake| DelegatorContribution {
            delegator: stake.delegator,
            stake_hp: stake.hp,
            share_percent: stake.hp / total_stake_hp * 100.0,
            payout_hive: stake.hp / total_stake_hp * payout_pool_hive,
            block_num: stake.block_num,
            timestamp: stake.timestamp,
        })
        .collect();

    DistributionResult {
        contributions,
        total_stake_hp,
        payout_pool_hive,
        cutoff,
        events_processed,
    }
}
