//! HTTP implementation of the engine's chain gateway, backed by a
//! delegation index service.

use crate::asset::parse_asset;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use hivesplit_engine::{ChainGateway, GatewayError};
use hivesplit_types::{AccrualStats, BlockNum, DelegationEvent};
use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

const DEFAULT_RATIO_TTL: Duration = Duration::from_secs(300);

/// Chain gateway talking to a delegation index over HTTP.
///
/// The vesting ratio is cached with a short TTL; ratio drift between
/// conversions inside one run is accepted by the engine's contract.
#[derive(Clone)]
pub struct HttpChainGateway {
    client: reqwest::Client,
    base_url: String,
    ratio_cache: Arc<RwLock<Option<CachedRatio>>>,
    ratio_ttl: Duration,
}

#[derive(Clone, Copy)]
struct CachedRatio {
    hp_per_vests: f64,
    fetched_at: Instant,
}

impl HttpChainGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            ratio_cache: Arc::new(RwLock::new(None)),
            ratio_ttl: DEFAULT_RATIO_TTL,
        }
    }

    pub fn with_ratio_ttl(mut self, ttl: Duration) -> Self {
        self.ratio_ttl = ttl;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        match response.status() {
            StatusCode::OK => response
                .json::<T>()
                .await
                .map_err(|err| GatewayError::MalformedResponse(err.to_string())),
            status => {
                let message = response.text().await.unwrap_or_default();
                Err(GatewayError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    async fn current_ratio(&self) -> Result<f64, GatewayError> {
        if let Some(cached) = *self.ratio_cache.read() {
            if cached.fetched_at.elapsed() < self.ratio_ttl {
                return Ok(cached.hp_per_vests);
            }
        }

        let url = self.endpoint("chain/vesting-ratio");
        let props: VestingRatioResponse = self.get_json(url).await?;
        let hp_per_vests = ratio_from(&props)?;
        debug!(hp_per_vests, "refreshed vesting ratio");

        *self.ratio_cache.write() = Some(CachedRatio {
            hp_per_vests,
            fetched_at: Instant::now(),
        });
        Ok(hp_per_vests)
    }
}

#[async_trait]
impl ChainGateway for HttpChainGateway {
    async fn delegation_events(
        &self,
        account: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<DelegationEvent>, GatewayError> {
        let since = cutoff.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut events = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut url =
                self.endpoint(&format!("accounts/{account}/delegations?since={since}"));
            if let Some(cursor) = &cursor {
                url.push_str("&cursor=");
                url.push_str(cursor);
            }

            let page: DelegationsPage = self.get_json(url).await?;
            for dto in page.delegations {
                events.push(dto.into_event()?);
            }

            match page.next {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(account, events = events.len(), "fetched delegation history");
        Ok(events)
    }

    async fn vests_to_hp(&self, vests: f64) -> Result<f64, GatewayError> {
        let ratio = self.current_ratio().await?;
        Ok(vests * ratio)
    }

    async fn reward_stats(&self, account: &str) -> Result<AccrualStats, GatewayError> {
        let url = self.endpoint(&format!("accounts/{account}/reward-stats"));
        self.get_json(url).await
    }

    async fn rewards_between(
        &self,
        account: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<f64, GatewayError> {
        let url = self.endpoint(&format!(
            "accounts/{account}/rewards?from={}&to={}",
            from.to_rfc3339_opts(SecondsFormat::Secs, true),
            to.to_rfc3339_opts(SecondsFormat::Secs, true),
        ));
        let total: RangeRewardsResponse = self.get_json(url).await?;
        Ok(total.total_hp)
    }
}

fn ratio_from(props: &VestingRatioResponse) -> Result<f64, GatewayError> {
    let fund_hive = parse_asset(&props.total_vesting_fund_hive, "HIVE")
        .map_err(|err| GatewayError::MalformedResponse(err.to_string()))?;
    let shares_vests = parse_asset(&props.total_vesting_shares, "VESTS")
        .map_err(|err| GatewayError::MalformedResponse(err.to_string()))?;
    if shares_vests <= 0.0 {
        return Err(GatewayError::MalformedResponse(
            "total vesting shares must be positive".to_string(),
        ));
    }
    Ok(fund_hive / shares_vests)
}

/// One page of the delegation history feed.
#[derive(Debug, Deserialize)]
struct DelegationsPage {
    delegations: Vec<DelegationDto>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DelegationDto {
    delegator: String,
    vesting_shares: String,
    block_num: BlockNum,
    timestamp: DateTime<Utc>,
}

impl DelegationDto {
    fn into_event(self) -> Result<DelegationEvent, GatewayError> {
        let vests = parse_asset(&self.vesting_shares, "VESTS")
            .map_err(|err| GatewayError::MalformedResponse(err.to_string()))?;
        Ok(DelegationEvent {
            delegator: self.delegator,
            vests,
            block_num: self.block_num,
            timestamp: self.timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VestingRatioResponse {
    total_vesting_fund_hive: String,
    total_vesting_shares: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeRewardsResponse {
    total_hp: f64,
}
