#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashMap;

use chrono::{Duration, TimeZone, Utc};
use webhook_retry::retry::{
    Provider, RetryConfig, RetryPolicies, RetryPolicy, next_retry_at, retry_delay_ms,
};

fn policy(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        initial_delay_ms,
        max_delay_ms,
    }
}

#[test]
fn delay_doubles_until_capped() {
    let policy = policy(5, 1_000, 8_000);

    let delays: Vec<u64> = (0..=4).map(|count| retry_delay_ms(count, &policy)).collect();

    assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 8_000]);
}

#[test]
fn delay_never_exceeds_cap_for_huge_retry_counts() {
    let policy = policy(5, 5_000, 3_600_000);

    for count in [20, 63, 64, 200, u32::MAX] {
        assert_eq!(retry_delay_ms(count, &policy), 3_600_000, "retry_count {count}");
    }
}

#[test]
fn next_retry_at_adds_delay_to_now() {
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mux = RetryPolicy::MUX;

    assert_eq!(next_retry_at(now, 0, &mux), now + Duration::milliseconds(2_000));
    assert_eq!(next_retry_at(now, 1, &mux), now + Duration::milliseconds(4_000));
    assert_eq!(next_retry_at(now, 10, &mux), now + Duration::milliseconds(60_000));
}

#[test]
fn provider_parses_case_insensitively() {
    assert_eq!("stripe".parse::<Provider>().unwrap(), Provider::Stripe);
    assert_eq!(" MUX ".parse::<Provider>().unwrap(), Provider::Mux);
    assert_eq!("Twilio".parse::<Provider>().unwrap(), Provider::Twilio);

    let err = "paypal".parse::<Provider>().unwrap_err();
    assert_eq!(err.to_string(), "unknown provider: paypal");
}

#[test]
fn provider_round_trips_through_as_str() {
    for provider in Provider::ALL {
        assert_eq!(provider.as_str().parse::<Provider>().unwrap(), provider);
    }
}

#[test]
fn unknown_provider_falls_back_to_stripe_policy() {
    let policies = RetryPolicies::default();

    assert_eq!(policies.for_name("mux"), RetryPolicy::MUX);
    assert_eq!(policies.for_name("twilio"), RetryPolicy::TWILIO);
    assert_eq!(policies.for_name("paypal"), RetryPolicy::STRIPE);
    assert_eq!(policies.for_name(""), policies.fallback());
}

#[test]
fn default_config_values() {
    let config = RetryConfig::default();

    assert_eq!(config.policies.get(Provider::Stripe).max_retries, 5);
    assert_eq!(config.policies.get(Provider::Mux).initial_delay_ms, 2_000);
    assert_eq!(config.policies.get(Provider::Twilio).max_delay_ms, 30_000);
    assert_eq!(config.handler_timeout_ms, 30_000);
    assert_eq!(config.batch_limit, 50);
    assert_eq!(config.stale_processing_ms, 900_000);
}

#[test]
fn config_lookup_overrides_and_clamps() {
    let vars: HashMap<&str, &str> = [
        ("RETRY_HANDLER_TIMEOUT_MS", "0"),
        ("RETRY_BATCH_LIMIT", "25"),
        ("RETRY_STALE_PROCESSING_MS", "60000"),
        ("RETRY_MUX_MAX_RETRIES", "0"),
        ("RETRY_MUX_INITIAL_DELAY_MS", "500"),
        ("RETRY_TWILIO_INITIAL_DELAY_MS", "90000"),
        ("RETRY_STRIPE_MAX_DELAY_MS", "not-a-number"),
    ]
    .into_iter()
    .collect();

    let config = RetryConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()));

    assert_eq!(config.handler_timeout_ms, 1);
    assert_eq!(config.batch_limit, 25);
    assert_eq!(config.stale_processing_ms, 60_000);
    assert_eq!(config.policies.mux, policy(1, 500, 60_000));
    // max delay is raised to the initial delay when configured below it
    assert_eq!(config.policies.twilio, policy(3, 90_000, 90_000));
    assert_eq!(config.policies.stripe, RetryPolicy::STRIPE);
}
