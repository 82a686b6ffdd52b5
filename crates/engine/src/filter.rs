//! Filter normalization: untrusted transport payloads into bounded,
//! always-well-formed eligibility filters.

use crate::errors::FilterDecodeError;
use chrono::{DateTime, Duration, Utc};
use hivesplit_types::AccrualWindow;
use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

pub const DEFAULT_WINDOW_DAYS: u32 = 30;
pub const DEFAULT_MIN_STAKE_HP: f64 = 50.0;
pub const MAX_WINDOW_DAYS: u32 = 365;

/// Eligibility filter for one distribution run.
///
/// Construction repairs invalid fields to their defaults instead of failing,
/// so a `Filter` in hand always satisfies its bounds: `window_days` in
/// `[1, 365]`, `min_stake_hp` and `accrual_override_hive` finite and
/// non-negative, `excluded` holding only non-empty trimmed account names.
/// Immutable once built; one filter snapshot serves one run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Filter {
    #[serde(rename = "timePeriodDays")]
    pub window_days: u32,
    #[serde(rename = "minimumStake")]
    pub min_stake_hp: f64,
    #[serde(rename = "excludedAccounts")]
    pub excluded: BTreeSet<String>,
    pub applied: bool,
    #[serde(rename = "accrualWindow")]
    pub accrual_window: AccrualWindow,
    #[serde(rename = "accrualValue")]
    pub accrual_override_hive: f64,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            min_stake_hp: DEFAULT_MIN_STAKE_HP,
            excluded: BTreeSet::new(),
            applied: true,
            accrual_window: AccrualWindow::Month,
            accrual_override_hive: 0.0,
        }
    }
}

impl Filter {
    /// Full defaults flagged as not applied. The caller-side fallback when
    /// the transport payload cannot be decoded at all.
    pub fn unapplied() -> Self {
        Self {
            applied: false,
            ..Self::default()
        }
    }

    /// Decode a percent-encoded JSON payload and normalize it.
    ///
    /// Only the transport steps can fail here (bad UTF-8 after decoding,
    /// bad JSON). Anything that parses is handed to [`Filter::from_value`]
    /// and repaired field by field.
    pub fn from_encoded(raw: &str) -> Result<Self, FilterDecodeError> {
        let decoded = percent_decode_str(raw).decode_utf8()?;
        let value: Value = serde_json::from_str(&decoded)?;
        Ok(Self::from_value(&value))
    }

    /// Normalize an arbitrary decoded payload. Total: never fails.
    ///
    /// Each field is taken from the payload when present, well-typed and in
    /// range, and falls back to its default on its own otherwise. A payload
    /// that is not a JSON object yields full defaults.
    pub fn from_value(value: &Value) -> Self {
        let defaults = Self::default();

        let window_days = value
            .get("timePeriodDays")
            .and_then(Value::as_u64)
            .and_then(|days| u32::try_from(days).ok())
            .filter(|days| (1..=MAX_WINDOW_DAYS).contains(days))
            .unwrap_or(defaults.window_days);

        let min_stake_hp = value
            .get("minimumStake")
            .and_then(Value::as_f64)
            .filter(|stake| stake.is_finite() && *stake >= 0.0)
            .unwrap_or(defaults.min_stake_hp);

        let excluded = value
            .get("excludedAccounts")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let applied = value
            .get("applied")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.applied);

        let accrual_window = value
            .get("accrualWindow")
            .and_then(Value::as_str)
            .and_then(AccrualWindow::from_literal)
            .unwrap_or(defaults.accrual_window);

        let accrual_override_hive = value
            .get("accrualValue")
            .and_then(Value::as_f64)
            .filter(|hive| hive.is_finite() && *hive >= 0.0)
            .unwrap_or(defaults.accrual_override_hive);

        Self {
            window_days,
            min_stake_hp,
            excluded,
            applied,
            accrual_window,
            accrual_override_hive,
        }
    }

    /// Lower time bound for delegation events considered in a run.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(i64::from(self.window_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn empty_payload_yields_defaults() {
        let filter = Filter::from_value(&json!({}));
        assert_eq!(filter, Filter::default());
        assert_eq!(filter.window_days, 30);
        assert_eq!(filter.min_stake_hp, 50.0);
        assert!(filter.excluded.is_empty());
        assert!(filter.applied);
        assert_eq!(filter.accrual_window, AccrualWindow::Month);
        assert_eq!(filter.accrual_override_hive, 0.0);
    }

    #[test]
    fn valid_fields_are_preserved() {
        let filter = Filter::from_value(&json!({
            "timePeriodDays": 7,
            "minimumStake": 10.5,
            "excludedAccounts": ["spammer", "bot"],
            "applied": false,
            "accrualWindow": "7d",
            "accrualValue": 123.0,
        }));
        assert_eq!(filter.window_days, 7);
        assert_eq!(filter.min_stake_hp, 10.5);
        assert_eq!(filter.excluded.len(), 2);
        assert!(filter.excluded.contains("spammer"));
        assert!(!filter.applied);
        assert_eq!(filter.accrual_window, AccrualWindow::Week);
        assert_eq!(filter.accrual_override_hive, 123.0);
    }

    #[test]
    fn invalid_fields_fall_back_individually() {
        let filter = Filter::from_value(&json!({
            "timePeriodDays": 400,
            "minimumStake": -3.0,
            "excludedAccounts": "not-an-array",
            "accrualWindow": "14d",
            "accrualValue": 55.0,
        }));
        assert_eq!(filter.window_days, 30);
        assert_eq!(filter.min_stake_hp, 50.0);
        assert!(filter.excluded.is_empty());
        assert_eq!(filter.accrual_window, AccrualWindow::Month);
        // The one valid field survives the repair of its neighbours.
        assert_eq!(filter.accrual_override_hive, 55.0);
    }

    #[test]
    fn window_days_rejects_zero_negatives_and_fractions() {
        for bad in [json!(0), json!(-5), json!(7.5), json!("30")] {
            let filter = Filter::from_value(&json!({ "timePeriodDays": bad }));
            assert_eq!(filter.window_days, 30, "payload {bad} should fall back");
        }
        let filter = Filter::from_value(&json!({ "timePeriodDays": 365 }));
        assert_eq!(filter.window_days, 365);
    }

    #[test]
    fn excluded_accounts_are_trimmed_and_deduplicated() {
        let filter = Filter::from_value(&json!({
            "excludedAccounts": ["  alice ", "", "bob", "   ", "alice", 42],
        }));
        let names: Vec<&str> = filter.excluded.iter().map(String::as_str).collect();
        assert_eq!(names, ["alice", "bob"]);
    }

    #[test]
    fn non_object_json_normalizes_to_defaults() {
        assert_eq!(Filter::from_value(&json!(42)), Filter::default());
        assert_eq!(Filter::from_value(&json!(null)), Filter::default());
        assert_eq!(Filter::from_value(&json!(["a", "b"])), Filter::default());
    }

    #[test]
    fn from_encoded_decodes_percent_encoding() {
        let filter =
            Filter::from_encoded("%7B%22timePeriodDays%22%3A%205%2C%20%22applied%22%3A%20false%7D")
                .unwrap();
        assert_eq!(filter.window_days, 5);
        assert!(!filter.applied);
    }

    #[test]
    fn from_encoded_accepts_plain_json() {
        // Percent-decoding plain JSON is the identity.
        let filter = Filter::from_encoded(r#"{"minimumStake": 1.0}"#).unwrap();
        assert_eq!(filter.min_stake_hp, 1.0);
        assert_eq!(filter.window_days, 30);
    }

    #[test]
    fn from_encoded_rejects_garbage() {
        assert!(matches!(
            Filter::from_encoded("not json at all"),
            Err(FilterDecodeError::InvalidJson(_))
        ));
        // %FF decodes to a lone continuation byte.
        assert!(matches!(
            Filter::from_encoded("%FF%FE"),
            Err(FilterDecodeError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn unapplied_is_defaults_with_the_flag_down() {
        let filter = Filter::unapplied();
        assert!(!filter.applied);
        assert_eq!(filter.window_days, Filter::default().window_days);
        assert_eq!(filter.min_stake_hp, Filter::default().min_stake_hp);
    }

    #[test]
    fn cutoff_subtracts_the_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        let filter = Filter {
            window_days: 30,
            ..Filter::default()
        };
        assert_eq!(
            filter.cutoff(now),
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
        let week = Filter {
            window_days: 7,
            ..Filter::default()
        };
        assert_eq!(
            week.cutoff(now),
            Utc.with_ymd_and_hms(2024, 3, 24, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let value = serde_json::to_value(Filter::default()).unwrap();
        assert_eq!(value["timePeriodDays"], 30);
        assert_eq!(value["minimumStake"], 50.0);
        assert_eq!(value["accrualWindow"], "30d");
        assert_eq!(value["accrualValue"], 0.0);
        assert_eq!(value["applied"], true);
        assert!(value["excludedAccounts"].as_array().unwrap().is_empty());
    }
}
