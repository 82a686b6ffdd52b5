//! Dynamic payout rate: what fraction of recent accrual to redistribute.

use crate::config::PaymentConfig;
use crate::filter::Filter;
use crate::ports::{ChainGateway, GatewayError};
use chrono::{DateTime, Duration, Utc};
use hivesplit_types::{AccrualStats, AccrualWindow};
use tracing::debug;

/// Outcome of one rate derivation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RateOutcome {
    pub rate_percent: f64,
    pub accrual_hp: f64,
    pub stats: AccrualStats,
}

/// Fixed accrual window covering a look-back period of `days`, if any.
///
/// Selection is tiered on the filter's look-back period, not on its
/// `accrual_window` field, and is deliberately not a continuous function:
/// up to 1 day reads the 24h bucket, up to 7 the weekly one, up to 30 the
/// monthly one. Wider periods have no fixed bucket and need a range fetch.
pub fn window_for_period(days: u32) -> Option<AccrualWindow> {
    match days {
        0..=1 => Some(AccrualWindow::Day),
        2..=7 => Some(AccrualWindow::Week),
        8..=30 => Some(AccrualWindow::Month),
        _ => None,
    }
}

/// Derive the payout rate from an accrual figure.
///
/// The base rate is scaled by itself: `rate = base * (base / 100)` when
/// accrual is positive, and `0` when it is not, after which the configured
/// bounds clamp the result. Squaring the base rate and collapsing to the
/// minimum on zero accrual are both intentional rules, not rounding
/// artifacts.
pub fn derive_rate(payment: &PaymentConfig, accrual_hp: f64) -> f64 {
    let factor = if accrual_hp > 0.0 {
        payment.base_rate_percent() / 100.0
    } else {
        0.0
    };
    (payment.base_rate_percent() * factor)
        .clamp(payment.min_rate_percent(), payment.max_rate_percent())
}

/// Select the accrual figure for the filter's period and derive the payout
/// rate for the configured account.
///
/// The fixed-window stats are always fetched, so the outcome can report
/// them; periods wider than the widest bucket additionally fetch the exact
/// range total, which then drives the rate.
pub async fn dynamic_rate(
    gateway: &dyn ChainGateway,
    filter: &Filter,
    payment: &PaymentConfig,
    now: DateTime<Utc>,
) -> Result<RateOutcome, GatewayError> {
    let account = payment.account();
    let stats = gateway.reward_stats(account).await?;
    let accrual_hp = match window_for_period(filter.window_days) {
        Some(window) => stats.window_total(window),
        None => {
            let from = now - Duration::days(i64::from(filter.window_days));
            gateway.rewards_between(account, from, now).await?
        }
    };

    let rate_percent = derive_rate(payment, accrual_hp);
    debug!(account, rate_percent, accrual_hp, "derived dynamic payout rate");
    Ok(RateOutcome {
        rate_percent,
        accrual_hp,
        stats,
    })
}
