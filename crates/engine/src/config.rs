//! Payment configuration with atomic, list-valued validation.

use crate::errors::{ConfigViolation, PaymentConfigError};
use serde::Serialize;

/// Validated dynamic-payout configuration.
///
/// Fields stay private behind accessors: a `PaymentConfig` in hand always
/// satisfies the rate-bound invariants checked by [`PaymentConfig::new`],
/// which is what lets the rate derivation clamp without further checks.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConfig {
    account: String,
    base_rate_percent: f64,
    min_rate_percent: f64,
    max_rate_percent: f64,
}

impl PaymentConfig {
    /// Validate and construct. Every violated constraint is collected before
    /// failing, so a caller can report all problems at once; any violation
    /// fails the construction as a whole.
    pub fn new(
        account: impl Into<String>,
        base_rate_percent: f64,
        min_rate_percent: f64,
        max_rate_percent: f64,
    ) -> Result<Self, PaymentConfigError> {
        let account = account.into();
        let mut violations = Vec::new();

        if account.trim().is_empty() {
            violations.push(ConfigViolation::EmptyAccount);
        }
        // Negated comparisons so NaN fails the bound checks too.
        if !(0.0..=100.0).contains(&base_rate_percent) {
            violations.push(ConfigViolation::BaseRateOutOfRange(base_rate_percent));
        }
        if !(min_rate_percent >= 0.0) {
            violations.push(ConfigViolation::MinRateTooLow(min_rate_percent));
        }
        if !(max_rate_percent <= 100.0) {
            violations.push(ConfigViolation::MaxRateTooHigh(max_rate_percent));
        }
        if min_rate_percent > max_rate_percent {
            violations.push(ConfigViolation::MinAboveMax {
                min: min_rate_percent,
                max: max_rate_percent,
            });
        }

        if violations.is_empty() {
            Ok(Self {
                account,
                base_rate_percent,
                min_rate_percent,
                max_rate_percent,
            })
        } else {
            Err(PaymentConfigError { violations })
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn base_rate_percent(&self) -> f64 {
        self.base_rate_percent
    }

    pub fn min_rate_percent(&self) -> f64 {
        self.min_rate_percent
    }

    pub fn max_rate_percent(&self) -> f64 {
        self.max_rate_percent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_config_constructs() {
        let config = PaymentConfig::new("curator", 50.0, 5.0, 75.0).unwrap();
        assert_eq!(config.account(), "curator");
        assert_eq!(config.base_rate_percent(), 50.0);
        assert_eq!(config.min_rate_percent(), 5.0);
        assert_eq!(config.max_rate_percent(), 75.0);
    }

    #[test]
    fn min_above_max_is_rejected() {
        let err = PaymentConfig::new("curator", 50.0, 20.0, 10.0).unwrap_err();
        assert_eq!(
            err.violations,
            vec![ConfigViolation::MinAboveMax {
                min: 20.0,
                max: 10.0
            }]
        );
    }

    #[test]
    fn every_violation_is_reported_at_once() {
        let err = PaymentConfig::new("  ", 150.0, -5.0, 120.0).unwrap_err();
        assert_eq!(err.violations.len(), 4);
        assert!(err.violations.contains(&ConfigViolation::EmptyAccount));
        assert!(err
            .violations
            .contains(&ConfigViolation::BaseRateOutOfRange(150.0)));
        assert!(err.violations.contains(&ConfigViolation::MinRateTooLow(-5.0)));
        assert!(err
            .violations
            .contains(&ConfigViolation::MaxRateTooHigh(120.0)));
    }

    #[test]
    fn nan_rates_never_validate() {
        assert!(PaymentConfig::new("curator", f64::NAN, 0.0, 100.0).is_err());
        assert!(PaymentConfig::new("curator", 50.0, f64::NAN, 100.0).is_err());
        assert!(PaymentConfig::new("curator", 50.0, 0.0, f64::NAN).is_err());
    }

    #[test]
    fn boundary_rates_are_accepted() {
        assert!(PaymentConfig::new("curator", 0.0, 0.0, 100.0).is_ok());
        assert!(PaymentConfig::new("curator", 100.0, 100.0, 100.0).is_ok());
    }
}
