use chrono::{DateTime, TimeZone, Utc};
use hivesplit_engine::{allocate, latest_stakes, Filter};
use hivesplit_types::{DelegationEvent, DelegatorStake};
use proptest::prelude::*;
use serde_json::{json, Value};

// Property-based tests for the distribution core.
// Invariants here must hold for arbitrary inputs, not just the scenario
// fixtures in the unit tests.

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap()
}

fn arbitrary_stakes() -> impl Strategy<Value = Vec<DelegatorStake>> {
    prop::collection::vec(0.01f64..10_000.0, 1..25).prop_map(|hps| {
        hps.into_iter()
            .enumerate()
            .map(|(index, hp)| DelegatorStake {
                delegator: format!("delegator{index}"),
                vests: hp * 1000.0,
                hp,
                block_num: index as u64,
                timestamp: fixed_time(),
            })
            .collect()
    })
}

fn arbitrary_events() -> impl Strategy<Value = Vec<DelegationEvent>> {
    prop::collection::vec(
        (
            0usize..6,
            prop_oneof![Just(0.0f64), 0.000001f64..50_000.0],
            0u64..5_000,
        ),
        0..40,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(who, vests, block_num)| DelegationEvent {
                delegator: format!("delegator{who}"),
                vests,
                block_num,
                timestamp: fixed_time(),
            })
            .collect()
    })
}

fn arbitrary_filter_payload() -> impl Strategy<Value = Value> {
    (
        prop::option::of(-500i64..500),
        prop::option::of(-1e6f64..1e6),
        prop::option::of(prop::collection::vec("[ a-z]{0,8}", 0..5)),
        prop::option::of(any::<bool>()),
        prop::option::of("[a-z0-9]{1,4}"),
        prop::option::of(-1e6f64..1e6),
    )
        .prop_map(|(days, min_stake, excluded, applied, window, accrual)| {
            let mut object = serde_json::Map::new();
            if let Some(days) = days {
                object.insert("timePeriodDays".to_string(), json!(days));
            }
            if let Some(min_stake) = min_stake {
                object.insert("minimumStake".to_string(), json!(min_stake));
            }
            if let Some(excluded) = excluded {
                object.insert("excludedAccounts".to_string(), json!(excluded));
            }
            if let Some(applied) = applied {
                object.insert("applied".to_string(), json!(applied));
            }
            if let Some(window) = window {
                object.insert("accrualWindow".to_string(), json!(window));
            }
            if let Some(accrual) = accrual {
                object.insert("accrualValue".to_string(), json!(accrual));
            }
            Value::Object(object)
        })
}

proptest! {
    #[test]
    fn shares_sum_to_one_hundred_and_payouts_to_the_pool(
        stakes in arbitrary_stakes(),
        pool in 0.1f64..10_000.0,
        interest in 0.0f64..100.0,
    ) {
        let filter = Filter { min_stake_hp: 0.0, ..Filter::default() };
        let result = allocate("curator", stakes, &filter, pool, interest, fixed_time(), 0);

        prop_assert!(!result.contributions.is_empty());
        let share_sum: f64 = result.contributions.iter().map(|c| c.share_percent).sum();
        prop_assert!((share_sum - 100.0).abs() < 1e-6);

        let payout_sum: f64 = result.contributions.iter().map(|c| c.payout_hive).sum();
        let tolerance = 1e-9 * result.payout_pool_hive.max(1.0);
        prop_assert!((payout_sum - result.payout_pool_hive).abs() < tolerance);
    }
}

proptest! {
    #[test]
    fn contributions_are_sorted_non_increasing(
        stakes in arbitrary_stakes(),
        pool in 0.1f64..10_000.0,
    ) {
        let filter = Filter { min_stake_hp: 0.0, ..Filter::default() };
        let result = allocate("curator", stakes, &filter, pool, 0.0, fixed_time(), 0);

        for pair in result.contributions.windows(2) {
            prop_assert!(pair[0].stake_hp >= pair[1].stake_hp);
        }
    }
}

proptest! {
    #[test]
    fn allocation_is_idempotent(
        stakes in arbitrary_stakes(),
        pool in 0.1f64..10_000.0,
        interest in 0.0f64..100.0,
    ) {
        let filter = Filter { min_stake_hp: 0.0, ..Filter::default() };
        let first = allocate("curator", stakes.clone(), &filter, pool, interest, fixed_time(), 0);
        let second = allocate("curator", stakes, &filter, pool, interest, fixed_time(), 0);
        prop_assert_eq!(first, second);
    }
}

proptest! {
    #[test]
    fn reduced_snapshot_never_holds_a_zero_stake(events in arbitrary_events()) {
        let snapshot = latest_stakes(&events);

        for (delegator, entry) in &snapshot {
            prop_assert!(entry.vests > 0.0);

            let highest = events
                .iter()
                .filter(|event| &event.delegator == delegator)
                .map(|event| event.block_num)
                .max()
                .expect("snapshot entries come from the event stream");
            prop_assert_eq!(entry.block_num, highest);
        }
    }
}

proptest! {
    #[test]
    fn reduction_is_deterministic(events in arbitrary_events()) {
        prop_assert_eq!(latest_stakes(&events), latest_stakes(&events));
    }
}

proptest! {
    #[test]
    fn normalized_filters_always_satisfy_their_bounds(payload in arbitrary_filter_payload()) {
        let filter = Filter::from_value(&payload);

        prop_assert!((1..=365).contains(&filter.window_days));
        prop_assert!(filter.min_stake_hp.is_finite());
        prop_assert!(filter.min_stake_hp >= 0.0);
        prop_assert!(filter.accrual_override_hive.is_finite());
        prop_assert!(filter.accrual_override_hive >= 0.0);
        for name in &filter.excluded {
            prop_assert!(!name.is_empty());
            prop_assert_eq!(name.trim(), name.as_str());
        }
    }
}

proptest! {
    #[test]
    fn valid_payload_fields_survive_normalization(
        days in 1i64..=365,
        min_stake in 0.0f64..1e6,
    ) {
        let filter = Filter::from_value(&json!({
            "timePeriodDays": days,
            "minimumStake": min_stake,
        }));
        prop_assert_eq!(filter.window_days as i64, days);
        prop_assert_eq!(filter.min_stake_hp, min_stake);
    }
}
