//! Pipeline runs against a file-backed store, across simulated launches.

mod common;

use std::time::Duration;

use riglaunch::pipeline::{NoopProgress, PipelineWarning, ProgressEvent, Step};
use riglaunch::{DataStore, GatewayError, Outcome, PermissionDecision};

use common::{AttributionBuilder, RecordingProgress, TestHarness};

#[tokio::test]
async fn test_first_launch_resolves_then_second_launch_degrades_to_stored_url() {
    let harness = TestHarness::new();
    harness
        .store
        .save_attribution(&AttributionBuilder::non_organic().build())
        .unwrap();
    harness
        .gateway
        .push_destination(Ok("https://dest.example.com/landing".to_string()));

    let first = harness.pipeline().run(&NoopProgress).await;
    assert_eq!(
        first.outcome(),
        &Outcome::ShowPermission("https://dest.example.com/landing".to_string())
    );

    // The user allowed notifications, then the next launch cannot reach the server.
    let (granted, blocked) = PermissionDecision::Allowed.flags();
    harness.store.save_permission(granted, blocked).unwrap();
    harness
        .gateway
        .push_destination(Err(GatewayError::RequestFailed("timeout".to_string())));

    let second = harness.pipeline().run(&NoopProgress).await;
    assert_eq!(
        second.outcome(),
        &Outcome::GoToWeb("https://dest.example.com/landing".to_string())
    );
    assert!(!second.is_first_run);
    assert!(matches!(
        second.warnings.as_slice(),
        [PipelineWarning::StaleDestination { .. }]
    ));
}

#[tokio::test]
async fn test_resolved_state_survives_reopening_the_database() {
    let harness = TestHarness::new();
    harness
        .store
        .save_attribution(&AttributionBuilder::non_organic().build())
        .unwrap();
    harness
        .gateway
        .push_destination(Ok("https://dest.example.com/a".to_string()));

    harness.pipeline().run(&NoopProgress).await;

    let data = harness.reopen_store().load().unwrap();
    assert_eq!(data.url.as_deref(), Some("https://dest.example.com/a"));
    assert_eq!(data.mode.as_deref(), Some("Active"));
    assert!(!data.is_first_run);
    assert_eq!(data.attribution.get("af_status").map(String::as_str), Some("Non-organic"));
}

#[tokio::test]
async fn test_no_attribution_and_no_saved_url_skips_network() {
    let harness = TestHarness::new();
    let progress = RecordingProgress::new();

    let ctx = harness.pipeline().run(&progress).await;

    assert_eq!(ctx.outcome(), &Outcome::GoToMain);
    assert_eq!(harness.gateway.validate_calls(), 0);
    assert!(harness.gateway.sent_attribution().is_empty());
    assert!(progress.events().contains(&ProgressEvent::StepHalted {
        step: Step::SavedUrl,
        outcome: Outcome::GoToMain,
    }));
}

#[tokio::test]
async fn test_notification_url_wins_over_network_and_is_used_once() {
    let harness = TestHarness::new();
    harness
        .store
        .save_attribution(&AttributionBuilder::non_organic().build())
        .unwrap();
    harness
        .store
        .save_temp_url("https://push.example.com/offer")
        .unwrap();
    harness
        .gateway
        .push_destination(Ok("https://dest.example.com/landing".to_string()));

    let first = harness.pipeline().run(&NoopProgress).await;
    assert_eq!(
        first.outcome(),
        &Outcome::ShowPermission("https://push.example.com/offer".to_string())
    );
    assert!(harness.gateway.sent_attribution().is_empty());

    let second = harness.pipeline().run(&NoopProgress).await;
    assert_eq!(
        second.outcome(),
        &Outcome::ShowPermission("https://dest.example.com/landing".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_organic_install_refetches_after_grace_and_forwards_deeplink() {
    let harness = TestHarness::new();
    harness
        .store
        .save_attribution(&AttributionBuilder::organic().build())
        .unwrap();
    harness
        .store
        .save_deeplink(&AttributionBuilder::new().field("deep_link_value", "rig-7").build())
        .unwrap();
    harness.gateway.push_attribution(Ok(AttributionBuilder::non_organic()
        .field("deep_deep_link_value", "from-server")
        .build()));
    harness
        .gateway
        .push_destination(Ok("https://dest.example.com/rig-7".to_string()));

    let started = tokio::time::Instant::now();
    let ctx = harness.pipeline().run(&NoopProgress).await;

    assert!(started.elapsed() >= Duration::from_secs(5));
    assert_eq!(harness.gateway.attribution_calls(), 1);
    let sent = &harness.gateway.sent_attribution()[0];
    assert_eq!(sent.get("af_status").map(String::as_str), Some("Non-organic"));
    // Server data keeps its own prefixed key.
    assert_eq!(
        sent.get("deep_deep_link_value").map(String::as_str),
        Some("from-server")
    );
    assert_eq!(ctx.resolved_url.as_deref(), Some("https://dest.example.com/rig-7"));
}

#[tokio::test]
async fn test_cooldown_blocks_prompt_right_after_deferral() {
    let harness = TestHarness::new();
    harness
        .store
        .save_url("https://dest.example.com/saved")
        .unwrap();
    let (granted, blocked) = PermissionDecision::Deferred.flags();
    harness.store.save_permission(granted, blocked).unwrap();

    let ctx = harness.pipeline().run(&NoopProgress).await;

    assert_eq!(
        ctx.outcome(),
        &Outcome::GoToWeb("https://dest.example.com/saved".to_string())
    );
}
