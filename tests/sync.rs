//! Sync Service Integration Tests
//!
//! End-to-end runs over the in-memory store and emissions source.

mod common;

use std::sync::Arc;

use common::*;
use footprint_sync::core::{RetryPolicy, SkipReason, SyncMode, SyncOutcome, SyncService};
use footprint_sync::domain::{Metadata, Scope, Scope1, Vocabulary};

fn service(store: &Arc<FakeStore>, emissions: &Arc<FakeEmissions>) -> SyncService {
    SyncService::new(store.clone(), emissions.clone(), Vocabulary::default())
}

#[tokio::test]
async fn test_sync_publishes_verified_figures() {
    let store = Arc::new(FakeStore::new(Vocabulary::default()));
    let emissions = Arc::new(FakeEmissions::new().with_record(&entity(), verified_record()));
    let service = service(&store, &emissions);

    let outcome = service.sync_entity(&entity(), SyncMode::Apply).await.unwrap();

    let SyncOutcome::Reconciled { diff } = outcome else {
        panic!("expected reconciliation, got {:?}", outcome);
    };
    // Scope 1, scope 2 MB + LB, scope 3 categories 1 and 6 (16 is never published)
    assert_eq!(diff.add.len(), 5);
    assert!(diff.remove.is_empty());
    assert_eq!(
        store.calls(),
        vec![StoreCall::EditClaims {
            added: 5,
            removed: vec![]
        }]
    );
    assert_eq!(store.claims(&entity()).len(), 5);
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let store = Arc::new(FakeStore::new(Vocabulary::default()));
    let emissions = Arc::new(FakeEmissions::new().with_record(&entity(), verified_record()));
    let service = service(&store, &emissions);

    service.sync_entity(&entity(), SyncMode::Apply).await.unwrap();
    let outcome = service.sync_entity(&entity(), SyncMode::Apply).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Reconciled { ref diff } if diff.is_empty()));
    // Only the first run wrote
    assert_eq!(store.calls().len(), 1);
}

#[tokio::test]
async fn test_new_year_replaces_previous_series() {
    let vocabulary = Vocabulary::default();
    let store = Arc::new(FakeStore::new(vocabulary.clone()));
    let emissions = Arc::new(FakeEmissions::new().with_record(&entity(), verified_record()));
    let service = service(&store, &emissions);

    service.sync_entity(&entity(), SyncMode::Apply).await.unwrap();

    let mut next_year = verified_record();
    next_year.reporting_period.start_date = Some(date(2024, 1, 1));
    next_year.reporting_period.end_date = Some(date(2024, 12, 31));
    emissions.set_record(&entity(), next_year);

    let outcome = service.sync_entity(&entity(), SyncMode::Apply).await.unwrap();
    let SyncOutcome::Reconciled { diff } = outcome else {
        panic!("expected reconciliation");
    };
    assert_eq!(diff.add.len(), 5);
    assert_eq!(diff.remove.len(), 5);

    let published = store.claims(&entity());
    assert_eq!(published.len(), 5);
    let scope1 = series(&vocabulary, &published, Scope::Scope1, None);
    assert_eq!(scope1.len(), 1);
    assert_eq!(
        scope1[0]
            .qualifiers
            .first_value(&vocabulary.properties.end_time)
            .and_then(|v| v.as_time()),
        Some("+2024-12-31T00:00:00Z")
    );
}

#[tokio::test]
async fn test_dry_run_does_not_write() {
    let store = Arc::new(FakeStore::new(Vocabulary::default()));
    let emissions = Arc::new(FakeEmissions::new().with_record(&entity(), verified_record()));
    let service = service(&store, &emissions);

    let outcome = service.sync_entity(&entity(), SyncMode::DryRun).await.unwrap();

    assert!(matches!(outcome, SyncOutcome::Reconciled { ref diff } if diff.add.len() == 5));
    assert!(store.calls().is_empty());
    assert_eq!(store.reads(), 1);
}

#[tokio::test]
async fn test_skips_without_record() {
    let store = Arc::new(FakeStore::new(Vocabulary::default()));
    let emissions = Arc::new(FakeEmissions::new());
    let service = service(&store, &emissions);

    let outcome = service.sync_entity(&entity(), SyncMode::Apply).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::NoEmissions));
    assert_eq!(store.reads(), 0);
}

#[tokio::test]
async fn test_skips_incomplete_period_silently() {
    let mut record = verified_record();
    record.reporting_period.start_date = None;

    let store = Arc::new(FakeStore::new(Vocabulary::default()));
    let emissions = Arc::new(FakeEmissions::new().with_record(&entity(), record));
    let service = service(&store, &emissions);

    let outcome = service.sync_entity(&entity(), SyncMode::Apply).await.unwrap();

    assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::MissingPeriod));
    assert_eq!(store.reads(), 0);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn test_unverified_figure_not_published() {
    let mut record = verified_record();
    record.scope1 = Some(Scope1 {
        total: Some(999.0),
        metadata: Metadata::default(),
    });

    let store = Arc::new(FakeStore::new(Vocabulary::default()));
    let emissions = Arc::new(FakeEmissions::new().with_record(&entity(), record));
    let service = service(&store, &emissions);

    service.sync_entity(&entity(), SyncMode::Apply).await.unwrap();

    let vocabulary = Vocabulary::default();
    assert!(series(&vocabulary, &store.claims(&entity()), Scope::Scope1, None).is_empty());
}

#[tokio::test]
async fn test_write_failure_propagates_and_rerun_converges() {
    let store = Arc::new(FakeStore::new(Vocabulary::default()));
    let emissions = Arc::new(FakeEmissions::new().with_record(&entity(), verified_record()));
    let service = service(&store, &emissions);

    store.fail_next_writes(1);
    let err = service
        .sync_entity(&entity(), SyncMode::Apply)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("simulated write failure"));
    assert!(store.claims(&entity()).is_empty());

    let policy = RetryPolicy {
        max_attempts: 3,
        initial_delay_ms: 1,
        max_delay_ms: 5,
        backoff_multiplier: 2.0,
    };
    store.fail_next_writes(1);
    emissions.fail_next_reads(1);

    let target = entity();
    let outcome = policy
        .run("Q42", || service.sync_entity(&target, SyncMode::Apply))
        .await
        .unwrap();

    assert!(matches!(outcome, SyncOutcome::Reconciled { .. }));
    assert_eq!(store.claims(&entity()).len(), 5);
}
