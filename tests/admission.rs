//! End-to-end behavior of the shared admission controller: concurrent
//! spacing, fail-fast capacity errors, throttle feedback, and the
//! registry. Long waits (minute-cap blocking, decay) are covered by unit
//! tests with synthetic timestamps; everything here finishes in well under
//! a second.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use pacer::{
    AdmissionConfig, AdmissionController, AdmissionError, ControllerRegistry, ThrottleSeverity,
    WindowKind,
};
use pretty_assertions::assert_eq;

/// A config with tight spacing and caps that stay out of the way
fn quick() -> AdmissionConfig {
    AdmissionConfig {
        base_min_interval: Duration::from_millis(25),
        max_min_interval: Duration::from_millis(200),
        max_per_minute: 100,
        max_per_hour: None,
        max_per_day: None,
        ..AdmissionConfig::default()
    }
}

#[tokio::test]
async fn concurrent_callers_keep_the_minimum_spacing() {
    let controller = Arc::new(AdmissionController::new(quick()));

    let handles = (0..4).map(|_| {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            controller.acquire().await.unwrap();
            Instant::now()
        })
    });
    let mut stamps: Vec<Instant> = join_all(handles)
        .await
        .into_iter()
        .map(|handle| handle.unwrap())
        .collect();
    stamps.sort();

    // The stamps are taken just after each grant, so allow a little
    // scheduling slack below the configured 25ms
    for pair in stamps.windows(2) {
        assert!(
            pair[1].duration_since(pair[0]) >= Duration::from_millis(20),
            "grants spaced closer than the minimum interval"
        );
    }
}

#[tokio::test]
async fn every_grant_lands_in_all_three_windows() {
    let controller = AdmissionController::new(quick());

    for _ in 0..3 {
        controller.acquire().await.unwrap();
    }

    let stats = controller.stats().await;
    assert_eq!(stats.usage(WindowKind::Minute).unwrap().used, 3);
    assert_eq!(stats.usage(WindowKind::Hour).unwrap().used, 3);
    assert_eq!(stats.usage(WindowKind::Day).unwrap().used, 3);
}

#[tokio::test]
async fn hour_cap_fails_fast_instead_of_blocking() {
    let controller = AdmissionController::new(AdmissionConfig {
        max_per_hour: Some(1),
        ..quick()
    });

    controller.acquire().await.unwrap();

    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(1), controller.acquire())
        .await
        .expect("exhausted hour cap must fail, not block");
    let error = result.unwrap_err();

    match error {
        AdmissionError::CapacityExceeded {
            window,
            retry_after,
        } => {
            assert_eq!(window, WindowKind::Hour);
            assert!(retry_after <= Duration::from_secs(3600));
            assert!(retry_after > Duration::from_secs(3590));
        }
    }
    assert_eq!(error.minutes_until_reset(), 60);
    assert!(started.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn day_cap_fails_fast_instead_of_blocking() {
    let controller = AdmissionController::new(AdmissionConfig {
        max_per_day: Some(1),
        ..quick()
    });

    controller.acquire().await.unwrap();

    let error = tokio::time::timeout(Duration::from_secs(1), controller.acquire())
        .await
        .expect("exhausted day cap must fail, not block")
        .unwrap_err();

    assert!(matches!(
        error,
        AdmissionError::CapacityExceeded {
            window: WindowKind::Day,
            ..
        }
    ));
}

#[tokio::test]
async fn throttle_feedback_starts_a_backoff() {
    let controller = AdmissionController::new(quick());
    controller.acquire().await.unwrap();

    // With a 200ms interval ceiling the raw penalty is tiny, so the 45s
    // severity floor wins
    let penalty = controller.record_throttle(ThrottleSeverity::High).await;
    assert_eq!(penalty, Duration::from_secs(45));

    let stats = controller.stats().await;
    assert!(stats.is_throttled());
    assert!(stats.cooldown_remaining > Duration::from_secs(40));
    assert!(stats.min_interval > stats.base_min_interval);
}

#[tokio::test]
async fn repeated_throttles_escalate_monotonically() {
    let controller = AdmissionController::new(quick());

    controller.record_throttle(ThrottleSeverity::Low).await;
    let first = controller.stats().await.min_interval;
    controller.record_throttle(ThrottleSeverity::Low).await;
    let second = controller.stats().await.min_interval;

    assert!(second >= first);
}

#[tokio::test]
async fn reset_returns_to_a_clean_baseline() {
    let controller = AdmissionController::new(quick());

    controller.acquire().await.unwrap();
    controller.record_throttle(ThrottleSeverity::High).await;
    controller.reset().await;

    let stats = controller.stats().await;
    assert!(stats.windows.iter().all(|usage| usage.used == 0));
    assert_eq!(stats.min_interval, stats.base_min_interval);
    assert_eq!(stats.cooldown_remaining, Duration::ZERO);
    assert_eq!(stats.since_last_grant, None);
    assert!(!stats.is_throttled());
}

#[tokio::test]
async fn collectors_share_one_controller_through_the_registry() {
    let registry = Arc::new(ControllerRegistry::new(quick()));

    // Simulate two collectors constructed with the same registry
    let handles = (0..2).map(|_| {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let controller = registry.get();
            controller.acquire().await.unwrap();
            controller
        })
    });
    let controllers: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|handle| handle.unwrap())
        .collect();

    assert!(Arc::ptr_eq(&controllers[0], &controllers[1]));

    // Both grants are visible in the single shared state
    let stats = registry.get().stats().await;
    assert_eq!(stats.usage(WindowKind::Minute).unwrap().used, 2);

    registry.reset().await;
    let stats = registry.get().stats().await;
    assert_eq!(stats.usage(WindowKind::Minute).unwrap().used, 0);
}
