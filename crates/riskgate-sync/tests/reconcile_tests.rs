//! Reconciliation cycles against in-memory collaborators.

mod helpers;

use std::collections::BTreeSet;

use chrono::Utc;
use helpers::{config, Harness, HIGH, LOW, MEDIUM};
use riskgate_core::{ExpectedState, RiskTier, SnapshotStore, SyncState};
use riskgate_sync::testing::record;
use riskgate_sync::{ReconcileMethod, SyncError};

fn set(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

#[tokio::test]
async fn test_first_cycle_populates_every_list() {
    let h = Harness::new(vec![
        record("a@x.com", RiskTier::Low),
        record("b@x.com", RiskTier::Medium),
        record("c@x.com", RiskTier::High),
        record("d@x.com", RiskTier::High),
    ]);

    let report = h.service.run_cycle().await;

    assert!(report.success, "{report:?}");
    assert_eq!(report.records_fetched, 4);
    assert_eq!(report.tiers.len(), 3);
    assert_eq!(h.lists.values(LOW), vec!["a@x.com"]);
    assert_eq!(h.lists.values(MEDIUM), vec!["b@x.com"]);
    assert_eq!(h.lists.values(HIGH), vec!["c@x.com", "d@x.com"]);

    let high = report.outcome(RiskTier::High).unwrap();
    assert_eq!(high.method, ReconcileMethod::Incremental);
    assert_eq!(high.added, 2);
    assert_eq!(high.removed, 0);
    assert_eq!(high.state, Some(SyncState::Synced));
    assert!(!high.drift_detected);
}

#[tokio::test]
async fn test_appended_items_carry_description() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::Low)]);

    h.service.run_cycle().await;

    let items = h.lists.items(LOW);
    let description = items[0].description.as_deref().unwrap();
    assert!(
        description.starts_with("riskgate:low risk user (synced "),
        "{description}"
    );
    assert!(description.ends_with("Z)"), "{description}");
}

#[tokio::test]
async fn test_second_cycle_is_idempotent() {
    let h = Harness::new(vec![
        record("a@x.com", RiskTier::Low),
        record("b@x.com", RiskTier::High),
    ]);

    h.service.run_cycle().await;
    let writes = h.lists.write_count();
    let report = h.service.run_cycle().await;

    assert!(report.success);
    assert_eq!(h.lists.write_count(), writes);
    assert!(report
        .tiers
        .iter()
        .all(|t| t.method == ReconcileMethod::None && t.added == 0 && t.removed == 0));
}

#[tokio::test]
async fn test_diff_adds_and_removes_in_one_patch() {
    let h = Harness::new(vec![
        record("a@x.com", RiskTier::Low),
        record("b@x.com", RiskTier::Low),
    ]);
    h.lists.set_items(LOW, &["b@x.com", "c@x.com"]);

    let report = h.service.run_cycle().await;

    let low = report.outcome(RiskTier::Low).unwrap();
    assert!(low.success);
    assert_eq!((low.added, low.removed), (1, 1));
    assert_eq!(h.lists.values(LOW), vec!["a@x.com", "b@x.com"]);

    let patches: Vec<_> = h
        .lists
        .patches()
        .into_iter()
        .filter(|(list, _)| list == LOW)
        .collect();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].1.append[0].value, "a@x.com");
    assert_eq!(patches[0].1.remove, vec!["c@x.com".to_string()]);
}

#[tokio::test]
async fn test_empty_tier_drives_remote_list_to_empty() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::Low)]);
    h.lists.set_items(MEDIUM, &["d@x.com"]);

    let report = h.service.run_cycle().await;

    let medium = report.outcome(RiskTier::Medium).unwrap();
    assert!(medium.success);
    assert_eq!(medium.total_expected, 0);
    assert_eq!(medium.removed, 1);
    assert!(h.lists.values(MEDIUM).is_empty());
}

#[tokio::test]
async fn test_tier_change_moves_user_between_lists() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::High)]);
    h.service.run_cycle().await;
    assert_eq!(h.lists.values(HIGH), vec!["a@x.com"]);

    h.risk.set_records(vec![record("a@x.com", RiskTier::Low)]);
    let report = h.service.run_cycle().await;

    assert!(report.success);
    assert_eq!(h.lists.values(LOW), vec!["a@x.com"]);
    assert!(h.lists.values(HIGH).is_empty());
}

#[tokio::test]
async fn test_duplicate_identifier_last_record_wins() {
    let h = Harness::new(vec![
        record("a@x.com", RiskTier::High),
        record("a@x.com", RiskTier::Medium),
    ]);

    h.service.run_cycle().await;

    assert_eq!(h.lists.values(MEDIUM), vec!["a@x.com"]);
    assert!(h.lists.values(HIGH).is_empty());
}

#[tokio::test]
async fn test_risk_fetch_failure_aborts_cycle_without_writes() {
    let records = (0..150)
        .map(|i| record(&format!("user{i}@x.com"), RiskTier::Low))
        .collect();
    let h = Harness::new(records);
    h.risk.fail_on_page(2);

    let report = h.service.run_cycle().await;

    assert!(!report.success);
    assert!(report.error.is_some());
    assert!(report.tiers.is_empty());
    assert_eq!(h.lists.write_count(), 0);
    assert_eq!(h.store.keys(), vec!["cycle:last".to_string()]);
}

#[tokio::test]
async fn test_rejected_write_fails_only_that_tier() {
    let h = Harness::new(vec![
        record("a@x.com", RiskTier::Low),
        record("b@x.com", RiskTier::Medium),
    ]);
    h.lists.reject_writes(LOW);

    let report = h.service.run_cycle().await;

    assert!(!report.success);
    let low = report.outcome(RiskTier::Low).unwrap();
    assert!(!low.success);
    assert_eq!(low.added, 1);
    assert!(low.error.as_deref().unwrap().contains("list list-low is read-only"));
    assert!(matches!(low.state, Some(SyncState::PendingWrite { .. })));

    let medium = report.outcome(RiskTier::Medium).unwrap();
    assert!(medium.success);
    assert_eq!(h.lists.values(MEDIUM), vec!["b@x.com"]);
}

#[tokio::test]
async fn test_partial_list_fetch_fails_tier_without_mutation() {
    let mut config = config();
    config.list_pagination.page_size = 2;
    let h = Harness::with_config(vec![record("a@x.com", RiskTier::Low)], config);
    h.lists.set_items(LOW, &["b@x.com", "c@x.com", "d@x.com"]);
    h.lists.fail_fetch_page(LOW, 2);

    let report = h.service.run_cycle().await;

    let low = report.outcome(RiskTier::Low).unwrap();
    assert!(!low.success);
    assert!(low.error.as_deref().unwrap().contains("incomplete fetch"));
    assert!(h.lists.patches().iter().all(|(list, _)| list != LOW));
    assert_eq!(h.lists.values(LOW), vec!["b@x.com", "c@x.com", "d@x.com"]);
}

#[tokio::test]
async fn test_list_pagination_bound_fails_tier() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::High)]);
    h.lists.endless_pages(HIGH);

    let report = h.service.run_cycle().await;

    let high = report.outcome(RiskTier::High).unwrap();
    assert!(!high.success);
    assert!(high.error.as_deref().unwrap().contains("page limit of 50"));
    // Low and medium: one page each.
    assert_eq!(h.lists.fetch_count(), 52);
}

#[tokio::test]
async fn test_non_converging_store_marks_drift() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::High)]);
    h.lists.ignore_writes(HIGH);

    let report = h.service.run_cycle().await;

    let high = report.outcome(RiskTier::High).unwrap();
    assert!(high.success);
    assert!(high.drift_detected);
    assert!(matches!(high.state, Some(SyncState::Drifted { .. })));

    // One patch only: no retry after a verification mismatch.
    let high_patches = h.lists.patches().iter().filter(|(l, _)| l == HIGH).count();
    assert_eq!(high_patches, 1);
}

#[tokio::test]
async fn test_drift_is_sticky_until_recheck() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::High)]);
    h.lists.ignore_writes(HIGH);
    h.service.run_cycle().await;

    // The list catches up on its own; a normal pass does not clear drift.
    h.lists.set_items(HIGH, &["a@x.com"]);
    let report = h.service.run_cycle().await;
    let high = report.outcome(RiskTier::High).unwrap();
    assert_eq!(high.method, ReconcileMethod::None);
    assert!(matches!(high.state, Some(SyncState::Drifted { .. })));

    let recheck = h.service.recheck_drift(RiskTier::High).await.unwrap();
    assert!(recheck.consistent);
    assert!(!recheck.drift_flagged);

    let state = h
        .service
        .repository()
        .load_expected(RiskTier::High)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.sync, SyncState::Synced);
}

#[tokio::test]
async fn test_drifted_tier_records_later_attempts() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::High)]);
    h.lists.ignore_writes(HIGH);
    h.service.run_cycle().await;

    let first = h.service.repository().load_expected(RiskTier::High).await.unwrap().unwrap();
    h.service.run_cycle().await;
    let second = h.service.repository().load_expected(RiskTier::High).await.unwrap().unwrap();

    let (
        SyncState::Drifted { detected_at: d1, .. },
        SyncState::Drifted { detected_at: d2, last_reconciliation_attempt },
    ) = (&first.sync, &second.sync)
    else {
        panic!("expected drifted state, got {:?} / {:?}", first.sync, second.sync);
    };
    assert_eq!(d1, d2);
    assert!(*last_reconciliation_attempt >= *d1);
}

#[tokio::test]
async fn test_unverified_write_is_trusted_when_verification_disabled() {
    let mut config = config();
    config.verify_after_write = false;
    let h = Harness::with_config(vec![record("a@x.com", RiskTier::Low)], config);
    h.lists.ignore_writes(LOW);

    let report = h.service.run_cycle().await;

    let low = report.outcome(RiskTier::Low).unwrap();
    assert!(low.success);
    assert!(!low.drift_detected);
    assert_eq!(low.state, Some(SyncState::Synced));
}

#[tokio::test]
async fn test_interrupted_write_settles_when_remote_already_matches() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::Low)]);
    let mut pending = ExpectedState::new(RiskTier::Low, set(&["a@x.com"]), Utc::now());
    pending.begin_write(Utc::now());
    h.service.repository().save_expected(&pending).await.unwrap();
    h.lists.set_items(LOW, &["a@x.com"]);

    let report = h.service.run_cycle().await;

    let low = report.outcome(RiskTier::Low).unwrap();
    assert_eq!(low.method, ReconcileMethod::None);
    assert_eq!(low.state, Some(SyncState::Synced));
}

#[tokio::test]
async fn test_held_lease_skips_only_that_tier() {
    let h = Harness::new(vec![
        record("a@x.com", RiskTier::Low),
        record("b@x.com", RiskTier::Medium),
    ]);
    h.store
        .put("lease:medium", "other-holder".into(), None)
        .await
        .unwrap();

    let report = h.service.run_cycle().await;

    let medium = report.outcome(RiskTier::Medium).unwrap();
    assert!(!medium.success);
    assert!(medium.error.as_deref().unwrap().contains("locked"));
    assert!(h.lists.values(MEDIUM).is_empty());
    assert_eq!(h.lists.values(LOW), vec!["a@x.com"]);

    let err = h
        .service
        .reconcile_with_lease(RiskTier::Medium, set(&["b@x.com"]))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::LeaseHeld(RiskTier::Medium)));
}

#[tokio::test]
async fn test_leases_are_released_after_cycle() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::Low)]);

    h.service.run_cycle().await;

    assert!(h.store.keys().iter().all(|k| !k.starts_with("lease:")));
}

#[tokio::test]
async fn test_replace_tier_restores_list_from_snapshot() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::Low)]);
    h.service.run_cycle().await;
    h.lists.set_items(LOW, &["a@x.com", "intruder@x.com"]);

    let outcome = h.service.replace_tier(RiskTier::Low).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.method, ReconcileMethod::FullReplace);
    assert_eq!(outcome.state, Some(SyncState::Synced));
    assert_eq!(h.lists.values(LOW), vec!["a@x.com"]);

    let replacements = h.lists.replacements();
    assert_eq!(replacements.len(), 1);
    assert_eq!(replacements[0].1.name, "riskgate-low");
}

#[tokio::test]
async fn test_replace_tier_flags_drift_on_mismatch() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::Low)]);
    h.service.run_cycle().await;
    h.lists.ignore_writes(LOW);
    h.lists.set_items(LOW, &[]);

    let outcome = h.service.replace_tier(RiskTier::Low).await.unwrap();

    assert!(outcome.drift_detected);
    assert!(matches!(outcome.state, Some(SyncState::Drifted { .. })));
}

#[tokio::test]
async fn test_replace_tier_requires_snapshot() {
    let h = Harness::new(Vec::new());

    let err = h.service.replace_tier(RiskTier::High).await.unwrap_err();

    assert!(matches!(err, SyncError::MissingExpectedState(RiskTier::High)));
}

#[tokio::test]
async fn test_cycle_report_and_metrics_are_recorded() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::Low)]);
    h.lists.reject_writes(HIGH);
    h.lists.set_items(HIGH, &["stale@x.com"]);

    let first = h.service.run_cycle().await;
    h.service.run_cycle().await;

    let last = h.service.last_cycle().await.unwrap().unwrap();
    assert_ne!(last.cycle_id, first.cycle_id);

    let metrics = h.service.metrics_snapshot();
    assert_eq!(metrics.total, 2);
    assert_eq!(metrics.failed, 2);
    assert_eq!(metrics.succeeded, 0);
    assert_eq!(metrics.last_run_at, Some(last.finished_at));
}

#[tokio::test]
async fn test_unreadable_snapshot_is_overwritten() {
    let h = Harness::new(vec![record("a@x.com", RiskTier::Low)]);
    h.store
        .put("expected_state:low", "{not json".into(), None)
        .await
        .unwrap();

    let report = h.service.run_cycle().await;

    let low = report.outcome(RiskTier::Low).unwrap();
    assert!(low.success, "{low:?}");
    assert_eq!(low.added, 1);
    assert_eq!(h.lists.values(LOW), vec!["a@x.com"]);
    let state = h
        .service
        .repository()
        .load_expected(RiskTier::Low)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.sync, SyncState::Synced);

    let again = h.service.run_cycle().await;
    assert!(again.success, "{again:?}");
    assert_eq!(again.outcome(RiskTier::Low).unwrap().added, 0);
}

#[tokio::test]
async fn test_risk_pagination_bound_aborts_cycle() {
    let h = Harness::new(Vec::new());
    h.risk.endless_pages();
    h.lists.set_items(LOW, &["user150@example.com"]);

    let report = h.service.run_cycle().await;

    assert_eq!(h.risk.pages_requested(), 100);
    assert!(!report.success);
    assert!(report.tiers.is_empty());
    let error = report.error.as_deref().unwrap();
    assert!(error.contains("page limit of 100"), "{error}");
    assert_eq!(h.lists.write_count(), 0);
    assert_eq!(h.lists.values(LOW), vec!["user150@example.com"]);
    assert!(h
        .service
        .repository()
        .load_expected(RiskTier::Low)
        .await
        .unwrap()
        .is_none());
}
