mod common;

use chrono::Utc;
use common::{contains_placeholder, default_policy, product, success_for, TestHarness};
use proptest::prelude::*;
use publisher_core::models::{
    Accumulator, ImageSource, ListingTemplate, NewPublicationRun, Platform, PublicationIntent,
    PublicationRun, StepKind,
};
use publisher_core::orchestration::{NextStep, ResultOutcome, StepGenerator, StepReport};
use publisher_core::{RunStatus, StepStatus};
use serde_json::json;
use std::sync::Arc;

fn platform_strategy() -> impl Strategy<Value = Platform> {
    prop::sample::select(Platform::ALL.to_vec())
}

fn run_with_progress(platform: Platform, images: usize, uploaded: usize) -> PublicationRun {
    let intent = PublicationIntent::new(
        (1..=images)
            .map(|i| ImageSource::new(format!("https://cdn.example.com/{i}.jpg")))
            .collect(),
        ListingTemplate {
            title: "Denim jacket".to_string(),
            price_cents: Some(2500),
            category: Some("jackets".to_string()),
            condition: Some("good".to_string()),
            ..Default::default()
        },
    );
    let mut run = PublicationRun::new(
        NewPublicationRun::publish_product(common::TENANT, platform, "sku-prop"),
        intent,
        Utc::now(),
    );
    let mut accumulated = Accumulator::new();
    for id in 0..uploaded {
        accumulated.append_photo_id(json!(1000 + id)).unwrap();
    }
    run.accumulated_data = accumulated;
    run
}

/// Drive one run with `script` (true = success, false = failure) applied to
/// whatever step is pending, checking the run-level invariants after every
/// report. Returns the labels of the steps that succeeded, in order.
async fn drive(platform: Platform, images: usize, script: Vec<bool>) -> Vec<String> {
    let harness = TestHarness::new();
    let product_id = harness.add_product(product("sku-prop", images));
    let first = harness.start(platform, &product_id).await;
    let run_id = first.run_id;

    let mut succeeded = Vec::new();
    let mut next_id = 1u64;

    for success in script {
        let pending = harness.pending_for_run(run_id).await;
        assert!(pending.len() <= 1, "run has {} pending steps", pending.len());
        let Some(step) = pending.into_iter().next() else {
            break;
        };

        assert!(!contains_placeholder(&step.payload), "placeholder in {}", step.payload);
        let report = if success {
            next_id += 1;
            success_for(&step, next_id)
        } else {
            StepReport::failure("HTTP 502")
        };

        let outcome = harness
            .orchestrator
            .report_result(step.id, report)
            .await
            .unwrap();
        if success && !outcome.is_ignored() {
            succeeded.push(step.label.clone());
        }

        for s in harness.orchestrator.steps_for_run(run_id).await.unwrap() {
            assert!(s.retry_count <= 3, "retry_count {} over ceiling", s.retry_count);
        }
    }

    let status = harness.orchestrator.run_status(run_id).await.unwrap();
    if status.status.is_terminal() {
        // Nothing moves a finished run
        let before = harness.orchestrator.find_run(run_id).await.unwrap();
        for step in harness.orchestrator.steps_for_run(run_id).await.unwrap() {
            let outcome = harness
                .orchestrator
                .report_result(step.id, success_for(&step, 1))
                .await
                .unwrap();
            assert!(matches!(outcome, ResultOutcome::Ignored { .. }));
        }
        let after = harness.orchestrator.find_run(run_id).await.unwrap();
        assert_eq!(before, after);
        assert!(harness.pending_for_run(run_id).await.is_empty());
    }

    succeeded
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Same run record, same step description
    #[test]
    fn generation_is_idempotent(
        platform in platform_strategy(),
        images in 0usize..6,
        uploaded_seed in 0usize..6,
    ) {
        let uploaded = uploaded_seed.min(images);
        let generator = StepGenerator::with_default_strategies(Arc::new(default_policy()));
        let run = run_with_progress(platform, images, uploaded);

        let first = generator.next_step(&run).unwrap();
        let second = generator.next_step(&run).unwrap();
        prop_assert_eq!(&first, &second);

        let NextStep::Step(draft) = first else {
            return Err(TestCaseError::fail("incomplete run must yield a step"));
        };
        if uploaded < images {
            prop_assert_eq!(draft.label, format!("upload_image_{}", uploaded + 1));
        } else {
            prop_assert!(matches!(draft.kind, StepKind::CreateListing(_)));
        }
        prop_assert!(!contains_placeholder(&draft.request.payload));
    }

    /// Uploads strictly precede listing creation and run in image order, and
    /// the single-flight, retry ceiling and terminal immutability invariants
    /// hold throughout
    #[test]
    fn steps_succeed_in_protocol_order(
        platform in platform_strategy(),
        images in 0usize..4,
        script in prop::collection::vec(prop::bool::weighted(0.7), 1..16),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let succeeded = runtime.block_on(drive(platform, images, script));

        let expected: Vec<String> = (1..=images)
            .map(|i| format!("upload_image_{i}"))
            .chain(std::iter::once("create_listing".to_string()))
            .collect();
        prop_assert!(succeeded.len() <= expected.len());
        prop_assert_eq!(&succeeded[..], &expected[..succeeded.len()]);
    }
}

#[tokio::test]
async fn test_all_success_script_completes_every_platform() {
    for platform in Platform::ALL {
        let harness = TestHarness::new();
        let product_id = harness.add_product(product("sku-all", 2));
        let mut step = harness.start(platform, &product_id).await;
        let run_id = step.run_id;

        let mut id = 10;
        loop {
            id += 1;
            match harness
                .orchestrator
                .report_result(step.id, success_for(&step, id))
                .await
                .unwrap()
            {
                ResultOutcome::Advanced { next_step_id, .. } => {
                    step = harness.orchestrator.find_step(next_step_id).await.unwrap();
                }
                ResultOutcome::Completed => break,
                other => panic!("{platform}: unexpected outcome {other:?}"),
            }
        }

        let status = harness.orchestrator.run_status(run_id).await.unwrap();
        assert_eq!(status.status, RunStatus::Completed, "{platform}");
        let steps = harness.orchestrator.steps_for_run(run_id).await.unwrap();
        assert_eq!(steps.len(), 3, "{platform}");
        assert!(steps.iter().all(|s| s.status == StepStatus::Success));
    }
}
