//! PgPublicationStore against a real database.
//!
//! Run with `DATABASE_URL=postgresql://... cargo test -- --ignored`.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{default_policy, product, success_for, TENANT};
use publisher_core::config::PublisherConfig;
use publisher_core::models::{
    NewPublicationRun, Platform, PublicationIntent, PublicationRun, PublicationStep, StepDraft,
    StepKind, StepRequest, UploadImagePayload,
};
use publisher_core::models::{HttpMethod, ImageSource, ListingTemplate};
use publisher_core::orchestration::{PublicationOrchestrator, ResultOutcome, StepReport};
use publisher_core::providers::InMemoryProductCatalog;
use publisher_core::store::{PgPublicationStore, PublicationStore, RunTransition};
use publisher_core::{OrchestratorError, RunStatus, StepStatus};
use serde_json::json;
use sqlx::PgPool;

fn sample_run() -> PublicationRun {
    PublicationRun::new(
        NewPublicationRun::publish_product(TENANT, Platform::Vinted, "sku-pg"),
        PublicationIntent::new(
            vec![ImageSource::new("https://cdn.example.com/1.jpg")],
            ListingTemplate {
                title: "Jacket".to_string(),
                price_cents: Some(1000),
                ..Default::default()
            },
        ),
        Utc::now(),
    )
}

fn upload_step(run: &PublicationRun, position: usize) -> PublicationStep {
    let draft = StepDraft {
        kind: StepKind::UploadImage(UploadImagePayload {
            image_url: format!("https://cdn.example.com/{position}.jpg"),
            position,
            total: 2,
        }),
        label: format!("upload_image_{position}"),
        request: StepRequest {
            method: HttpMethod::Post,
            path: "/api/v2/photos".to_string(),
            payload: json!({ "photo": { "type": "item" } }),
        },
    };
    PublicationStep::from_draft(run.id, run.platform, draft, Utc::now())
}

#[sqlx::test(migrator = "publisher_core::database::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_run_and_step_round_trip(pool: PgPool) {
    let store = PgPublicationStore::new(pool);
    let run = sample_run();
    let step = upload_step(&run, 1);

    store.insert_run(&run, Some(&step)).await.unwrap();

    let loaded = store.find_run(run.id).await.unwrap().unwrap();
    assert_eq!(loaded.id, run.id);
    assert_eq!(loaded.status, RunStatus::Queued);
    assert_eq!(loaded.intent, run.intent);

    let loaded_step = store.find_step(step.id).await.unwrap().unwrap();
    assert_eq!(loaded_step.kind, step.kind);
    assert_eq!(loaded_step.payload, step.payload);
    assert_eq!(loaded_step.status, StepStatus::Pending);

    let pending = store
        .pending_steps_for_platform(Platform::Vinted, 10)
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);

    assert_eq!(store.mark_runs_processing(&[run.id], Utc::now()).await.unwrap(), 1);
    assert_eq!(store.mark_runs_processing(&[run.id], Utc::now()).await.unwrap(), 0);
}

#[sqlx::test(migrator = "publisher_core::database::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_second_pending_step_is_rejected(pool: PgPool) {
    let store = PgPublicationStore::new(pool);
    let run = sample_run();
    store.insert_run(&run, Some(&upload_step(&run, 1))).await.unwrap();

    let transition = RunTransition::new(run.clone()).with_new_step(Some(upload_step(&run, 2)));
    let err = store.commit_transition(&transition).await.unwrap_err();
    assert!(matches!(err, OrchestratorError::SingleFlightViolation { .. }));
    assert_eq!(store.steps_for_run(run.id).await.unwrap().len(), 1);
}

#[sqlx::test(migrator = "publisher_core::database::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_stale_step_expectation_is_a_conflict(pool: PgPool) {
    let store = PgPublicationStore::new(pool);
    let run = sample_run();
    let step = upload_step(&run, 1);
    store.insert_run(&run, Some(&step)).await.unwrap();

    let mut succeeded = step.clone();
    succeeded.status = StepStatus::Success;
    let transition = RunTransition::new(run.clone()).with_step_change(succeeded.clone(), &step);
    store.commit_transition(&transition).await.unwrap();

    // Computed from the same stale read
    let err = store.commit_transition(&transition).await.unwrap_err();
    assert!(err.is_conflict());

    let stale = store
        .stale_pending_steps(Utc::now() + Duration::hours(2), 10)
        .await
        .unwrap();
    assert!(stale.is_empty());
}

#[sqlx::test(migrator = "publisher_core::database::MIGRATOR")]
#[ignore = "requires DATABASE_URL"]
async fn test_orchestrator_over_postgres(pool: PgPool) {
    let catalog = Arc::new(InMemoryProductCatalog::new());
    catalog.insert(TENANT, product("sku-pg-flow", 1));
    let orchestrator = PublicationOrchestrator::from_parts(
        &PublisherConfig::default(),
        Arc::new(PgPublicationStore::new(pool)),
        catalog,
        Arc::new(default_policy()),
        None,
    )
    .unwrap();

    let creation = orchestrator
        .create_run(NewPublicationRun::publish_product(
            TENANT,
            Platform::Vinted,
            "sku-pg-flow",
        ))
        .await
        .unwrap();
    let upload = creation.first_step.unwrap();

    let outcome = orchestrator
        .report_result(upload.id, StepReport::failure("HTTP 503"))
        .await
        .unwrap();
    assert!(matches!(outcome, ResultOutcome::Requeued { .. }));

    let outcome = orchestrator
        .report_result(upload.id, success_for(&upload, 101))
        .await
        .unwrap();
    let ResultOutcome::Advanced { next_step_id, .. } = outcome else {
        panic!("expected advance, got {outcome:?}");
    };

    let create = orchestrator.find_step(next_step_id).await.unwrap();
    let outcome = orchestrator
        .report_result(create.id, success_for(&create, 555))
        .await
        .unwrap();
    assert_eq!(outcome, ResultOutcome::Completed);

    let status = orchestrator.run_status(creation.run.id).await.unwrap();
    assert_eq!(status.status, RunStatus::Completed);
    assert_eq!(status.accumulated_data.get("listing_id"), Some(&json!(555)));
}
