//! Chain data ports: the engine's only view of the outside world.
//!
//! Every fetch the distribution core needs goes through [`ChainGateway`], so
//! the core stays testable without network access. Any gateway failure is
//! fatal to the run that issued it; the core never retries and never returns
//! partial results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hivesplit_types::{AccrualStats, DelegationEvent};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by chain data sources.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("chain transport error: {0}")]
    Transport(String),

    #[error("chain API rejected the request (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed chain response: {0}")]
    MalformedResponse(String),
}

#[async_trait]
pub trait ChainGateway: Send + Sync {
    /// Delegation events towards `account` at or after `cutoff`, ordered by
    /// block number ascending.
    async fn delegation_events(
        &self,
        account: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<DelegationEvent>, GatewayError>;

    /// Convert raw VESTS to HP at the global ratio current at call time.
    /// Ratio drift between calls within one run is accepted.
    async fn vests_to_hp(&self, vests: f64) -> Result<f64, GatewayError>;

    /// Curation reward accrual totals for the fixed windows.
    async fn reward_stats(&self, account: &str) -> Result<AccrualStats, GatewayError>;

    /// Accrual total over an arbitrary range. Used only when the filter
    /// window is wider than the widest fixed bucket.
    async fn rewards_between(
        &self,
        account: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<f64, GatewayError>;
}

/// Stub gateway backed by in-memory fixtures, for tests and offline runs.
#[derive(Clone, Default)]
pub struct StubChainGateway {
    inner: Arc<RwLock<StubState>>,
}

struct StubState {
    events: Vec<DelegationEvent>,
    hp_per_vests: f64,
    stats: AccrualStats,
    range_total: f64,
    fail_conversion: bool,
}

impl Default for StubState {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            hp_per_vests: 1.0,
            stats: AccrualStats::default(),
            range_total: 0.0,
            fail_conversion: false,
        }
    }
}

impl StubChainGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(self, events: Vec<DelegationEvent>) -> Self {
        self.inner.write().events = events;
        self
    }

    pub fn with_hp_per_vests(self, ratio: f64) -> Self {
        self.inner.write().hp_per_vests = ratio;
        self
    }

    pub fn with_stats(self, stats: AccrualStats) -> Self {
        self.inner.write().stats = stats;
        self
    }

    pub fn with_range_total(self, total_hp: f64) -> Self {
        self.inner.write().range_total = total_hp;
        self
    }

    /// Make every subsequent conversion call fail.
    pub fn with_conversion_failure(self) -> Self {
        self.inner.write().fail_conversion = true;
        self
    }
}

#[async_trait]
impl ChainGateway for StubChainGateway {
    async fn delegation_events(
        &self,
        _account: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<DelegationEvent>, GatewayError> {
        let events = self
            .inner
            .read()
            .events
            .iter()
            .filter(|event| event.timestamp >= cutoff)
            .cloned()
            .collect();
        Ok(events)
    }

    async fn vests_to_hp(&self, vests: f64) -> Result<f64, GatewayError> {
        let state = self.inner.read();
        if state.fail_conversion {
            return Err(GatewayError::Transport(
                "stub conversion failure".to_string(),
            ));
        }
        Ok(vests * state.hp_per_vests)
    }

    async fn reward_stats(&self, _account: &str) -> Result<AccrualStats, GatewayError> {
        Ok(self.inner.read().stats)
    }

    async fn rewards_between(
        &self,
        _account: &str,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<f64, GatewayError> {
        Ok(self.inner.read().range_total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn stub_serves_events_after_the_cutoff() {
        let old = DelegationEvent {
            delegator: "old".to_string(),
            vests: 10.0,
            block_num: 1,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let fresh = DelegationEvent {
            delegator: "fresh".to_string(),
            vests: 20.0,
            block_num: 2,
            timestamp: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        };
        let stub = StubChainGateway::new().with_events(vec![old, fresh]);

        let cutoff = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
        let events = stub
            .delegation_events("curator", cutoff)
            .await
            .expect("stub fetch succeeds");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].delegator, "fresh");
    }

    #[tokio::test]
    async fn stub_conversion_applies_the_ratio_or_fails_on_demand() {
        let stub = StubChainGateway::new().with_hp_per_vests(0.5);
        assert_eq!(stub.vests_to_hp(100.0).await.unwrap(), 50.0);

        let failing = StubChainGateway::new().with_conversion_failure();
        assert!(matches!(
            failing.vests_to_hp(100.0).await,
            Err(GatewayError::Transport(_))
        ));
    }
}
