use std::time::Duration;

use faxlog_engine::BatchDriver;
use faxlog_engine::EngineConfig;
use faxlog_engine::EngineError;
use faxlog_engine::RetryWindow;
use faxlog_engine::Stage;
use faxlog_engine::StageSchedule;
use faxlog_engine::StageStatus;
use faxlog_engine::invoke;
use faxlog_engine::invoke_sqlite;
use pretty_assertions::assert_eq;

use super::support::ACME;
use super::support::Faults;
use super::support::FaultyStore;
use super::support::TestStore;
use super::support::answered_call;
use super::support::missed_call;
use super::support::reception;

#[tokio::test]
async fn concurrent_pass_reports_every_stage_in_launch_order() {
    let store = TestStore::new().await;
    store
        .insert(&[missed_call(0, ACME), reception(5, 2, Some("busy"))])
        .await;

    let report = invoke(store.store(), EngineConfig::default())
        .await
        .expect("pass runs");

    assert!(report.succeeded(), "{report}");
    assert_eq!(
        report
            .stages
            .iter()
            .map(|stage| stage.stage)
            .collect::<Vec<_>>(),
        Stage::ALL.to_vec()
    );
    assert_eq!(
        report
            .stage(Stage::ClassifyIncomplete)
            .map(|stage| stage.status.clone()),
        Some(StageStatus::Updated(1))
    );

    store.cleanup().await;
}

#[tokio::test]
async fn concurrent_passes_converge_on_phased_result() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[missed_call(0, ACME), answered_call(45, ACME)])
        .await;

    // Classification and correlation race within a pass, so the retry may
    // only be picked up by a later one.
    for _ in 0..3 {
        let report = invoke(store.store(), EngineConfig::default())
            .await
            .expect("pass runs");
        assert!(report.succeeded(), "{report}");
    }

    let missed = store.event(ids[0]).await;
    assert_eq!(missed.retry_latency_minutes, Some(45));
    assert_eq!(missed.next_success_id, Some(ids[1]));
    let summary = store.runtime.summary().await.expect("summary");
    assert_eq!(summary.missed_log_rows, 1);

    store.cleanup().await;
}

#[tokio::test]
async fn idle_pass_reports_no_eligible_rows() {
    let store = TestStore::new().await;

    let report = invoke(store.store(), EngineConfig::default())
        .await
        .expect("pass runs");

    assert!(report.succeeded());
    assert_eq!(report.rows_updated(), 0);
    assert!(
        report
            .stages
            .iter()
            .all(|stage| stage.status == StageStatus::NoEligibleRows),
        "{report}"
    );

    store.cleanup().await;
}

#[tokio::test]
async fn failing_stage_does_not_stop_its_siblings() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[missed_call(0, ACME), reception(5, 2, Some("busy"))])
        .await;
    let faulty = FaultyStore::new(
        store.runtime.clone(),
        Faults {
            fail_correlation: true,
            ..Faults::default()
        },
    );

    let report = invoke(faulty, EngineConfig::default())
        .await
        .expect("failures stay inside the report");

    assert!(!report.succeeded());
    assert_eq!(report.failed_stages(), vec![Stage::Correlate]);
    match report.stage(Stage::Correlate).map(|stage| &stage.status) {
        Some(StageStatus::Failed(message)) => {
            assert!(message.contains("statement timeout"), "{message}");
        }
        other => panic!("unexpected correlate status: {other:?}"),
    }
    assert!(report.to_string().contains("failures in [correlate]"));
    assert_eq!(store.event(ids[0]).await.missed, Some(true));
    assert_eq!(store.event(ids[1]).await.incomplete, Some(true));

    store.cleanup().await;
}

#[tokio::test]
async fn panicking_stage_is_reported_as_failed() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[missed_call(0, ACME), reception(5, 2, Some("busy"))])
        .await;
    let faulty = FaultyStore::new(
        store.runtime.clone(),
        Faults {
            panic_on_incomplete: true,
            ..Faults::default()
        },
    );

    let report = BatchDriver::new(faulty, EngineConfig::default())
        .run_pass()
        .await;

    assert_eq!(report.failed_stages(), vec![Stage::ClassifyIncomplete]);
    assert_eq!(store.event(ids[0]).await.missed, Some(true));
    assert_eq!(store.event(ids[1]).await.incomplete, None);

    store.cleanup().await;
}

#[tokio::test]
async fn stalled_stage_is_abandoned_at_timeout() {
    let store = TestStore::new().await;
    store.insert(&[missed_call(0, ACME)]).await;
    let faulty = FaultyStore::new(
        store.runtime.clone(),
        Faults {
            stall_missed_log: Some(Duration::from_secs(30)),
            ..Faults::default()
        },
    );
    let config = EngineConfig {
        stage_timeout: Some(Duration::from_secs(2)),
        schedule: StageSchedule::Phased,
        ..EngineConfig::default()
    };

    let report = invoke(faulty, config).await.expect("pass runs");

    assert_eq!(report.failed_stages(), vec![Stage::MissedLog]);
    assert_eq!(
        report.stage(Stage::MissedLog).map(|stage| stage.status.clone()),
        Some(StageStatus::TimedOut(Duration::from_secs(2)))
    );
    assert_eq!(
        report.stage(Stage::Correlate).map(|stage| stage.status.clone()),
        Some(StageStatus::Updated(1))
    );

    store.cleanup().await;
}

#[tokio::test]
async fn unreachable_store_aborts_before_any_stage() {
    let store = TestStore::new().await;
    let ids = store.insert(&[missed_call(0, ACME)]).await;
    let faulty = FaultyStore::new(
        store.runtime.clone(),
        Faults {
            fail_ping: true,
            ..Faults::default()
        },
    );

    let err = invoke(faulty, EngineConfig::default())
        .await
        .expect_err("ping failure aborts the invocation");

    assert!(matches!(err, EngineError::Connectivity { .. }), "{err}");
    assert!(err.to_string().contains("connection refused"), "{err}");
    assert_eq!(store.event(ids[0]).await.missed, None);

    store.cleanup().await;
}

#[tokio::test]
async fn invalid_config_is_rejected_before_any_stage() {
    let store = TestStore::new().await;
    let ids = store.insert(&[missed_call(0, ACME)]).await;
    let config = EngineConfig {
        retry_window: RetryWindow::from_minutes(0),
        ..EngineConfig::default()
    };

    let err = invoke(store.store(), config)
        .await
        .expect_err("zero window is rejected");

    assert!(matches!(err, EngineError::InvalidConfig(_)), "{err}");
    assert_eq!(store.event(ids[0]).await.missed, None);

    store.cleanup().await;
}

#[tokio::test]
async fn invoke_sqlite_reports_unopenable_path() {
    let store = TestStore::new().await;

    // The home directory itself is not a database file.
    let err = invoke_sqlite(store.home().to_path_buf(), EngineConfig::default())
        .await
        .expect_err("directory cannot be opened as a database");

    assert!(matches!(err, EngineError::Connectivity { .. }), "{err}");

    store.cleanup().await;
}

#[tokio::test]
async fn invoke_sqlite_rejects_config_before_creating_database() {
    let store = TestStore::new().await;
    let db_path = store.home().join("untouched.sqlite");

    let err = invoke_sqlite(
        db_path.clone(),
        EngineConfig {
            classify_limit: 0,
            ..EngineConfig::default()
        },
    )
    .await
    .expect_err("zero batch limit is rejected");

    assert!(matches!(err, EngineError::InvalidConfig(_)), "{err}");
    assert!(!db_path.exists());

    store.cleanup().await;
}

#[tokio::test]
async fn invoke_sqlite_runs_against_database_file() {
    let store = TestStore::new().await;
    let ids = store.insert(&[missed_call(0, ACME)]).await;
    let config = EngineConfig {
        schedule: StageSchedule::Phased,
        ..EngineConfig::default()
    };

    let report = invoke_sqlite(store.runtime.db_path().to_path_buf(), config)
        .await
        .expect("pass runs");

    assert!(report.succeeded(), "{report}");
    assert_eq!(store.event(ids[0]).await.retry_latency_minutes, Some(360));

    store.cleanup().await;
}

#[tokio::test]
async fn out_of_range_window_fails_cleanly() {
    let store = TestStore::new().await;
    let ids = store.insert(&[missed_call(0, ACME)]).await;

    let err = invoke(
        store.store(),
        EngineConfig {
            retry_window: RetryWindow::from_minutes(i64::MAX / 2),
            schedule: StageSchedule::Phased,
            ..EngineConfig::default()
        },
    )
    .await
    .expect_err("window beyond the duration range is rejected");
    assert!(matches!(err, EngineError::InvalidConfig(_)), "{err}");

    // Representable as a duration, but not once added to a timestamp.
    let report = invoke(
        store.store(),
        EngineConfig {
            retry_window: RetryWindow::from_minutes(i64::MAX / 120_000),
            schedule: StageSchedule::Phased,
            ..EngineConfig::default()
        },
    )
    .await
    .expect("pass runs");

    assert_eq!(report.failed_stages(), vec![Stage::Correlate]);
    match report.stage(Stage::Correlate).map(|stage| &stage.status) {
        Some(StageStatus::Failed(message)) => {
            assert!(message.contains("overflows"), "{message}");
        }
        other => panic!("unexpected correlate status: {other:?}"),
    }
    let missed = store.event(ids[0]).await;
    assert_eq!(missed.missed, Some(true));
    assert_eq!(missed.retry_latency_minutes, None);

    store.cleanup().await;
}
