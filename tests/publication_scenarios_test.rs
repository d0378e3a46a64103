//! End-to-end publication flows against the in-memory store.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{product, success_for, TestHarness, TENANT};
use publisher_core::models::{NewPublicationRun, Platform, StepKind};
use publisher_core::orchestration::{ResultOutcome, StepReport};
use publisher_core::providers::{AccountPolicy, StaticPolicyProvider};
use publisher_core::{OrchestratorError, PublisherConfig, RunStatus, StepStatus};
use serde_json::json;

#[tokio::test]
async fn test_two_image_publish_runs_uploads_then_listing() {
    let harness = TestHarness::new();
    let product_id = harness.add_product(product("sku-1", 2));

    let first = harness.start(Platform::Vinted, &product_id).await;
    assert_eq!(first.label, "upload_image_1");
    assert_eq!(first.path, "/api/v2/photos");
    let run_id = first.run_id;

    let outcome = harness
        .orchestrator
        .report_result(first.id, success_for(&first, 101))
        .await
        .unwrap();
    let ResultOutcome::Advanced { next_step_id, label } = outcome else {
        panic!("expected advance, got {outcome:?}");
    };
    assert_eq!(label, "upload_image_2");

    let second = harness.orchestrator.find_step(next_step_id).await.unwrap();
    let outcome = harness
        .orchestrator
        .report_result(second.id, success_for(&second, 102))
        .await
        .unwrap();
    let ResultOutcome::Advanced { next_step_id, label } = outcome else {
        panic!("expected advance, got {outcome:?}");
    };
    assert_eq!(label, "create_listing");

    let create = harness.orchestrator.find_step(next_step_id).await.unwrap();
    assert_eq!(
        create.payload["item"]["assigned_photos"],
        json!([{ "id": 101, "orientation": 0 }, { "id": 102, "orientation": 0 }])
    );
    assert_eq!(create.payload["item"]["catalog_id"], "1907");
    assert_eq!(create.payload["item"]["price"], "25.00");

    let outcome = harness
        .orchestrator
        .report_result(create.id, success_for(&create, 555))
        .await
        .unwrap();
    assert_eq!(outcome, ResultOutcome::Completed);

    let status = harness.orchestrator.run_status(run_id).await.unwrap();
    assert_eq!(status.status, RunStatus::Completed);
    assert_eq!(status.current_step_label.as_deref(), Some("completed"));
    assert_eq!(
        status.accumulated_data.photo_ids().unwrap(),
        &[json!(101), json!(102)]
    );
    assert_eq!(status.accumulated_data.get("listing_id"), Some(&json!(555)));
    assert!(status.accumulated_data.listing_created());
    assert!(status.error_message.is_none());

    let steps = harness.orchestrator.steps_for_run(run_id).await.unwrap();
    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|s| s.status == StepStatus::Success));
}

#[tokio::test]
async fn test_product_without_images_goes_straight_to_listing() {
    let harness = TestHarness::new();
    let product_id = harness.add_product(product("sku-bare", 0));

    let first = harness.start(Platform::Vinted, &product_id).await;
    assert_eq!(first.label, "create_listing");
    let StepKind::CreateListing(listing) = &first.kind else {
        panic!("expected listing creation, got {:?}", first.kind);
    };
    assert!(listing.photo_ids.is_empty());
    assert_eq!(first.payload["item"]["assigned_photos"], json!([]));

    let outcome = harness
        .orchestrator
        .report_result(first.id, success_for(&first, 9))
        .await
        .unwrap();
    assert_eq!(outcome, ResultOutcome::Completed);
}

#[tokio::test]
async fn test_upload_failing_three_times_fails_the_run() {
    let harness = TestHarness::new();
    let product_id = harness.add_product(product("sku-flaky", 1));
    let step = harness.start(Platform::Vinted, &product_id).await;

    for expected_retry in 1..=2 {
        let outcome = harness
            .orchestrator
            .report_result(step.id, StepReport::failure("HTTP 503"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ResultOutcome::Requeued {
                step_id: step.id,
                retry_count: expected_retry,
            }
        );

        // Redelivered verbatim under the same id
        let requeued = harness.orchestrator.find_step(step.id).await.unwrap();
        assert_eq!(requeued.status, StepStatus::Pending);
        assert_eq!(requeued.payload, step.payload);

        let status = harness.orchestrator.run_status(step.run_id).await.unwrap();
        assert_eq!(
            status.current_step_label,
            Some(format!("upload_image_1 (retry {expected_retry}/3)"))
        );
    }

    let outcome = harness
        .orchestrator
        .report_result(step.id, StepReport::failure("HTTP 503"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ResultOutcome::Failed {
            error_message: "HTTP 503".to_string()
        }
    );

    let failed = harness.orchestrator.find_step(step.id).await.unwrap();
    assert_eq!(failed.status, StepStatus::Failed);
    assert_eq!(failed.retry_count, 3);

    let status = harness.orchestrator.run_status(step.run_id).await.unwrap();
    assert_eq!(status.status, RunStatus::Failed);
    assert_eq!(status.error_message.as_deref(), Some("HTTP 503"));
    assert_eq!(
        status.current_step_label.as_deref(),
        Some("upload_image_1 (failed)")
    );
    assert!(harness.pending_for_run(step.run_id).await.is_empty());
}

#[tokio::test]
async fn test_stale_step_is_requeued_by_the_sweeper() {
    let harness = TestHarness::new();
    let product_id = harness.add_product(product("sku-slow", 1));
    let step = harness.start(Platform::Vinted, &product_id).await;

    // Nothing is stale yet
    let report = harness.orchestrator.sweep_stale(Utc::now()).await.unwrap();
    assert_eq!(report.examined, 0);

    let later = Utc::now() + Duration::seconds(3600 + 60);
    let report = harness.orchestrator.sweep_stale(later).await.unwrap();
    assert_eq!(report.examined, 1);
    assert_eq!(report.requeued, 1);

    let requeued = harness.orchestrator.find_step(step.id).await.unwrap();
    assert_eq!(requeued.status, StepStatus::Pending);
    assert_eq!(requeued.retry_count, 1);
    assert_eq!(requeued.enqueued_at, later);
    assert!(requeued.last_error.unwrap().contains("not reported"));

    // Requeued at `later`, so the same sweep instant finds nothing
    let report = harness.orchestrator.sweep_stale(later).await.unwrap();
    assert_eq!(report.examined, 0);

    // A late success still advances the run
    let outcome = harness
        .orchestrator
        .report_result(step.id, success_for(&step, 77))
        .await
        .unwrap();
    assert!(matches!(outcome, ResultOutcome::Advanced { .. }));
}

#[tokio::test]
async fn test_timeouts_exhaust_into_timeout_status() {
    let harness = TestHarness::new();
    let product_id = harness.add_product(product("sku-gone", 1));
    let step = harness.start(Platform::Ebay, &product_id).await;

    let mut now = Utc::now();
    for _ in 0..3 {
        now += Duration::seconds(3601);
        harness.orchestrator.sweep_stale(now).await.unwrap();
    }

    let timed_out = harness.orchestrator.find_step(step.id).await.unwrap();
    assert_eq!(timed_out.status, StepStatus::Timeout);
    assert_eq!(timed_out.retry_count, 3);

    let status = harness.orchestrator.run_status(step.run_id).await.unwrap();
    assert_eq!(status.status, RunStatus::Failed);
    assert_eq!(
        status.current_step_label.as_deref(),
        Some("upload_image_1 (timeout)")
    );
}

#[tokio::test]
async fn test_duplicate_success_report_is_ignored() {
    let harness = TestHarness::new();
    let product_id = harness.add_product(product("sku-dup", 2));
    let step = harness.start(Platform::Vinted, &product_id).await;

    let first = harness
        .orchestrator
        .report_result(step.id, success_for(&step, 101))
        .await
        .unwrap();
    assert!(matches!(first, ResultOutcome::Advanced { .. }));

    let second = harness
        .orchestrator
        .report_result(step.id, success_for(&step, 999))
        .await
        .unwrap();
    assert!(second.is_ignored());

    let status = harness.orchestrator.run_status(step.run_id).await.unwrap();
    assert_eq!(status.accumulated_data.photo_ids().unwrap(), &[json!(101)]);
    assert_eq!(
        harness
            .orchestrator
            .steps_for_run(step.run_id)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn test_concurrent_duplicate_reports_advance_once() {
    let harness = Arc::new(TestHarness::new());
    let product_id = harness.add_product(product("sku-race", 3));
    let step = harness.start(Platform::Vinted, &product_id).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        let harness = Arc::clone(&harness);
        let report = success_for(&step, 101);
        let step_id = step.id;
        handles.push(tokio::spawn(async move {
            harness.orchestrator.report_result(step_id, report).await
        }));
    }

    let mut advanced = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            ResultOutcome::Advanced { .. } => advanced += 1,
            ResultOutcome::Ignored { .. } => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(advanced, 1);
    assert_eq!(harness.pending_for_run(step.run_id).await.len(), 1);
    let status = harness.orchestrator.run_status(step.run_id).await.unwrap();
    assert_eq!(status.accumulated_data.photo_ids().unwrap().len(), 1);
}

#[tokio::test]
async fn test_unmapped_category_fails_run_at_creation() {
    let policy = StaticPolicyProvider::new().with_policy(
        TENANT,
        Platform::Vinted,
        AccountPolicy::new("EUR").map_category("shoes", "16"),
    );
    let harness = TestHarness::with_policy(PublisherConfig::default(), policy);
    let product_id = harness.add_product(product("sku-odd", 0));

    let creation = harness
        .orchestrator
        .create_run(NewPublicationRun::publish_product(
            TENANT,
            Platform::Vinted,
            &product_id,
        ))
        .await
        .unwrap();

    assert!(creation.first_step.is_none());
    assert_eq!(creation.run.status, RunStatus::Failed);
    assert!(creation
        .run
        .error_message
        .as_deref()
        .unwrap()
        .contains("category"));

    // Persisted so status polling can explain the failure
    let status = harness.orchestrator.run_status(creation.run.id).await.unwrap();
    assert_eq!(status.status, RunStatus::Failed);
    assert_eq!(status.current_step_label.as_deref(), Some("failed"));
}

/// Create a run that must fail before any upload is handed out
async fn assert_fails_before_upload(harness: &TestHarness, product_id: &str, reason: &str) {
    let creation = harness
        .orchestrator
        .create_run(NewPublicationRun::publish_product(
            TENANT,
            Platform::Vinted,
            product_id,
        ))
        .await
        .unwrap();

    assert!(creation.first_step.is_none(), "upload was emitted");
    assert_eq!(creation.run.status, RunStatus::Failed);
    let message = creation.run.error_message.clone().unwrap_or_default();
    assert!(message.contains(reason), "unexpected error: {message}");

    assert!(harness
        .orchestrator
        .steps_for_run(creation.run.id)
        .await
        .unwrap()
        .is_empty());
    assert!(harness
        .orchestrator
        .pending_steps(Platform::Vinted, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_unmapped_category_with_images_fails_before_upload() {
    let policy = StaticPolicyProvider::new().with_policy(
        TENANT,
        Platform::Vinted,
        AccountPolicy::new("EUR").map_category("shoes", "16"),
    );
    let harness = TestHarness::with_policy(PublisherConfig::default(), policy);
    let product_id = harness.add_product(product("sku-jacket", 2));

    assert_fails_before_upload(&harness, &product_id, "category").await;
}

#[tokio::test]
async fn test_missing_category_with_images_fails_before_upload() {
    let harness = TestHarness::new();
    let mut uncategorized = product("sku-uncategorized", 1);
    uncategorized.category = None;
    let product_id = harness.add_product(uncategorized);

    assert_fails_before_upload(&harness, &product_id, "category").await;
}

#[tokio::test]
async fn test_non_positive_adjusted_price_fails_before_upload() {
    let policy = StaticPolicyProvider::new().with_policy(
        TENANT,
        Platform::Vinted,
        AccountPolicy::new("EUR")
            .with_price_adjustment(-150)
            .map_category("jackets", "1907")
            .map_brand("Levi's", "304")
            .map_color("blue", "9")
            .map_size("M", "207")
            .map_condition("good", "3"),
    );
    let harness = TestHarness::with_policy(PublisherConfig::default(), policy);
    let product_id = harness.add_product(product("sku-discounted", 2));

    assert_fails_before_upload(&harness, &product_id, "price").await;
}

#[tokio::test]
async fn test_unusable_upload_result_counts_as_failure() {
    let harness = TestHarness::new();
    let product_id = harness.add_product(product("sku-bad-result", 1));
    let step = harness.start(Platform::Vinted, &product_id).await;

    let outcome = harness
        .orchestrator
        .report_result(step.id, StepReport::success(json!({ "status": "ok" })))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        ResultOutcome::Requeued {
            step_id: step.id,
            retry_count: 1
        }
    );
}

#[tokio::test]
async fn test_reports_after_run_failure_are_ignored() {
    let harness = TestHarness::new();
    let product_id = harness.add_product(product("sku-late", 1));
    let step = harness.start(Platform::Vinted, &product_id).await;

    for _ in 0..3 {
        harness
            .orchestrator
            .report_result(step.id, StepReport::failure("HTTP 500"))
            .await
            .unwrap();
    }

    let late = harness
        .orchestrator
        .report_result(step.id, success_for(&step, 1))
        .await
        .unwrap();
    assert!(late.is_ignored());

    let status = harness.orchestrator.run_status(step.run_id).await.unwrap();
    assert_eq!(status.status, RunStatus::Failed);
    assert!(status.accumulated_data.photo_ids().unwrap().is_empty());
}

#[tokio::test]
async fn test_polling_hands_out_one_step_per_run_and_starts_processing() {
    let harness = TestHarness::new();
    let a = harness.add_product(product("sku-a", 1));
    let b = harness.add_product(product("sku-b", 1));
    let c = harness.add_product(product("sku-c", 1));

    let step_a = harness.start(Platform::Vinted, &a).await;
    let step_b = harness.start(Platform::Vinted, &b).await;
    harness.start(Platform::Etsy, &c).await;

    let limited = harness
        .orchestrator
        .pending_steps(Platform::Vinted, Some(1))
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);
    assert_eq!(limited[0].id, step_a.id);

    let vinted = harness
        .orchestrator
        .pending_steps(Platform::Vinted, None)
        .await
        .unwrap();
    let ids: Vec<_> = vinted.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![step_a.id, step_b.id]);

    let status = harness.orchestrator.run_status(step_a.run_id).await.unwrap();
    assert_eq!(status.status, RunStatus::Processing);

    let etsy = harness
        .orchestrator
        .pending_steps(Platform::Etsy, None)
        .await
        .unwrap();
    assert_eq!(etsy.len(), 1);
    assert_eq!(etsy[0].payload["image_url"], "https://cdn.example.com/sku-c/1.jpg");
}

#[tokio::test]
async fn test_missing_product_and_unknown_step_are_not_found() {
    let harness = TestHarness::new();

    let err = harness
        .orchestrator
        .create_run(NewPublicationRun::publish_product(
            TENANT,
            Platform::Vinted,
            "does-not-exist",
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound { .. }));

    let err = harness
        .orchestrator
        .report_result(uuid::Uuid::new_v4(), StepReport::failure("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound { .. }));
}

#[tokio::test]
async fn test_lifecycle_events_are_published() {
    let harness = TestHarness::new();
    let mut events = harness.orchestrator.subscribe_events();
    let product_id = harness.add_product(product("sku-events", 0));

    let step = harness.start(Platform::Vinted, &product_id).await;
    harness
        .orchestrator
        .report_result(step.id, success_for(&step, 5))
        .await
        .unwrap();

    let mut names = Vec::new();
    while let Ok(event) = events.try_recv() {
        names.push(event.name);
    }
    assert_eq!(
        names,
        vec!["run.created", "step.created", "step.succeeded", "run.completed"]
    );
}
