//! End-to-end distribution orchestration.

use crate::allocator::allocate;
use crate::config::PaymentConfig;
use crate::filter::Filter;
use crate::ports::{ChainGateway, GatewayError};
use crate::rate::dynamic_rate;
use crate::snapshot::latest_stakes;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use hivesplit_types::{
    DelegatorContribution, DelegatorStake, DistributionResult, DynamicPayoutReport,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Sequences one full distribution run against a single chain gateway.
///
/// Stateless across runs: the cutoff and the filter are fixed once at entry
/// and nothing is re-fetched mid-run. Any gateway failure aborts the whole
/// run; no partial result is ever returned.
#[derive(Clone)]
pub struct Distributor {
    gateway: Arc<dyn ChainGateway>,
}

impl Distributor {
    pub fn new(gateway: Arc<dyn ChainGateway>) -> Self {
        Self { gateway }
    }

    /// One static distribution run: fetch events, reduce to current stakes,
    /// convert to HP, allocate the pool.
    ///
    /// Conversions are independent per delegator and run concurrently,
    /// failing fast on the first error.
    pub async fn distribution(
        &self,
        account: &str,
        filter: &Filter,
        pool_base_hive: f64,
        interest_percent: f64,
        now: DateTime<Utc>,
    ) -> Result<DistributionResult, GatewayError> {
        let cutoff = filter.cutoff(now);
        let events = self.gateway.delegation_events(account, cutoff).await?;
        let events_processed = events.len();
        let snapshot = latest_stakes(&events);
        debug!(
            account,
            events = events_processed,
            delegators = snapshot.len(),
            "reduced delegation log"
        );

        let conversions = snapshot.into_iter().map(|(delegator, entry)| {
            let gateway = Arc::clone(&self.gateway);
            async move {
                let hp = gateway.vests_to_hp(entry.vests).await?;
                Ok::<_, GatewayError>(DelegatorStake {
                    delegator,
                    vests: entry.vests,
                    hp,
                    block_num: entry.block_num,
                    timestamp: entry.timestamp,
                })
            }
        });
        let stakes = try_join_all(conversions).await?;

        let result = allocate(
            account,
            stakes,
            filter,
            pool_base_hive,
            interest_percent,
            cutoff,
            events_processed,
        );
        info!(
            account,
            contributors = result.contributions.len(),
            pool_hive = result.payout_pool_hive,
            "distribution computed"
        );
        Ok(result)
    }

    /// Full dynamic-rate payout run: the static distribution for shares,
    /// the rate derivation for the pool, combined into one report.
    ///
    /// The pool considered is the filter's accrual override when set, the
    /// selected accrual total otherwise; the derived rate and the interest
    /// cut are then applied on top. With no eligible stake the payments and
    /// the payout pool are zero while the rate and accrual stay reported.
    pub async fn dynamic_payout(
        &self,
        payment: &PaymentConfig,
        filter: &Filter,
        pool_base_hive: f64,
        interest_percent: f64,
        now: DateTime<Utc>,
    ) -> Result<DynamicPayoutReport, GatewayError> {
        let account = payment.account();
        let distribution = self
            .distribution(account, filter, pool_base_hive, interest_percent, now)
            .await?;
        let rate = dynamic_rate(self.gateway.as_ref(), filter, payment, now).await?;

        let pool_considered_hive = if filter.accrual_override_hive > 0.0 {
            filter.accrual_override_hive
        } else {
            rate.accrual_hp
        };

        let (payout_pool_hive, payments) = if distribution.total_stake_hp > 0.0 {
            let pool = pool_considered_hive * rate.rate_percent / 100.0
                * (100.0 - interest_percent)
                / 100.0;
            let payments = distribution
                .contributions
                .iter()
                .map(|contribution| DelegatorContribution {
                    delegator: contribution.delegator.clone(),
                    stake_hp: contribution.stake_hp,
                    share_percent: contribution.share_percent,
                    payout_hive: contribution.stake_hp / distribution.total_stake_hp * pool,
                    block_num: contribution.block_num,
                    timestamp: contribution.timestamp,
                })
                .collect();
            (pool, payments)
        } else {
            (0.0, Vec::new())
        };

        info!(
            account,
            rate_percent = rate.rate_percent,
            payout_pool_hive,
            payments = payments.len(),
            "dynamic payout computed"
        );
        Ok(DynamicPayoutReport {
            rate_percent: rate.rate_percent,
            accrual_hp: rate.accrual_hp,
            pool_considered_hive,
            payout_pool_hive,
            payments,
            stats: rate.stats,
        })
    }
}
