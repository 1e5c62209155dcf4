use faxlog_engine::EngineConfig;
use faxlog_engine::RetryWindow;
use faxlog_engine::classifier;
use faxlog_engine::correlator;
use faxlog_engine::invoke;
use faxlog_state::BatchOrder;
use faxlog_state::DerivedFlag;
use faxlog_state::EventKind;
use faxlog_state::FlagUpdate;
use pretty_assertions::assert_eq;

use super::support::ACME;
use super::support::GLOBEX;
use super::support::TestStore;
use super::support::answered_call;
use super::support::event;
use super::support::missed_call;
use super::support::phased_config;
use super::support::reception;

const WINDOW: RetryWindow = RetryWindow::from_minutes(360);

#[tokio::test]
async fn classification_is_idempotent() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[
            missed_call(0, ACME),
            answered_call(1, ACME),
            reception(2, 4, Some("timeout")),
        ])
        .await;
    let backend = store.store();

    for flag in [DerivedFlag::Missed, DerivedFlag::Incomplete] {
        let first = classifier::classify(backend.as_ref(), flag, BatchOrder::NewestFirst, 100)
            .await
            .expect("first classify");
        assert!(first > 0, "{flag:?} had pending rows");
        let second = classifier::classify(backend.as_ref(), flag, BatchOrder::NewestFirst, 100)
            .await
            .expect("second classify");
        assert_eq!(second, 0, "{flag:?} writes nothing the second time");
    }

    assert_eq!(store.event(ids[0]).await.missed, Some(true));
    assert_eq!(store.event(ids[1]).await.missed, Some(false));
    assert_eq!(store.event(ids[2]).await.incomplete, Some(true));

    store.cleanup().await;
}

#[tokio::test]
async fn retry_latency_is_write_once() {
    let store = TestStore::new().await;
    let ids = store.insert(&[missed_call(0, ACME)]).await;

    invoke(store.store(), phased_config())
        .await
        .expect("first pass");
    assert_eq!(store.event(ids[0]).await.retry_latency_minutes, Some(360));

    // A closer success ingested afterwards does not revise the stored value.
    let late = store.insert(&[answered_call(10, ACME)]).await;
    invoke(store.store(), phased_config())
        .await
        .expect("second pass");

    let missed = store.event(ids[0]).await;
    assert_eq!(missed.retry_latency_minutes, Some(360));
    assert_eq!(missed.next_success_id, None);
    assert_eq!(store.event(late[0]).await.missed, Some(false));

    store.cleanup().await;
}

#[tokio::test]
async fn latencies_never_exceed_window() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[
            missed_call(0, ACME),
            answered_call(360, ACME),
            missed_call(1_000, ACME),
            answered_call(1_361, ACME),
            missed_call(2_000, GLOBEX),
            answered_call(2_001, GLOBEX),
        ])
        .await;

    invoke(store.store(), phased_config())
        .await
        .expect("pass runs");

    let on_bound = store.event(ids[0]).await;
    assert_eq!(on_bound.retry_latency_minutes, Some(360));
    assert_eq!(on_bound.next_success_id, Some(ids[1]));

    let past_bound = store.event(ids[2]).await;
    assert_eq!(past_bound.retry_latency_minutes, Some(360));
    assert_eq!(past_bound.next_success_id, None);

    let quick = store.event(ids[4]).await;
    assert_eq!(quick.retry_latency_minutes, Some(1));
    assert_eq!(quick.next_success_id, Some(ids[5]));

    store.cleanup().await;
}

#[tokio::test]
async fn earliest_qualifying_success_is_the_retry() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[
            missed_call(0, ACME),
            answered_call(90, ACME),
            answered_call(30, GLOBEX),
            missed_call(40, ACME),
            answered_call(60, ACME),
        ])
        .await;

    invoke(store.store(), phased_config())
        .await
        .expect("pass runs");

    let first = store.event(ids[0]).await;
    assert_eq!(first.retry_latency_minutes, Some(60));
    assert_eq!(first.next_success_id, Some(ids[4]));

    let second = store.event(ids[3]).await;
    assert_eq!(second.retry_latency_minutes, Some(20));
    assert_eq!(second.next_success_id, Some(ids[4]));

    store.cleanup().await;
}

#[tokio::test]
async fn other_kinds_never_receive_flags() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[
            event(EventKind::Send, 0, ACME, Some("busy"), 2),
            event(EventKind::Page, 1, ACME, Some("busy"), 1),
            event(EventKind::Poll, 2, ACME, None, 0),
        ])
        .await;

    let report = invoke(store.store(), phased_config())
        .await
        .expect("pass runs");
    assert_eq!(report.rows_updated(), 0);

    for id in ids {
        let stored = store.event(id).await;
        assert_eq!(stored.missed, None, "{:?}", stored.kind);
        assert_eq!(stored.incomplete, None, "{:?}", stored.kind);
        assert_eq!(stored.retry_latency_minutes, None, "{:?}", stored.kind);
    }

    store.cleanup().await;
}

#[tokio::test]
async fn correlation_waits_for_unclassified_retry() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[missed_call(0, ACME), answered_call(15, ACME)])
        .await;
    let backend = store.store();

    // Only the missed call is labeled; the answered call is still pending.
    backend
        .write_flags(
            DerivedFlag::Missed,
            &[FlagUpdate {
                id: ids[0],
                value: true,
            }],
        )
        .await
        .expect("write flag");

    let written = correlator::correlate(backend.as_ref(), WINDOW, BatchOrder::NewestFirst, 100)
        .await
        .expect("correlate");
    assert_eq!(written, 0);
    let missed = store.event(ids[0]).await;
    assert_eq!(missed.retry_latency_minutes, None);
    assert_eq!(missed.next_success_id, None);

    classifier::classify(backend.as_ref(), DerivedFlag::Missed, BatchOrder::NewestFirst, 100)
        .await
        .expect("classify");
    let written = correlator::correlate(backend.as_ref(), WINDOW, BatchOrder::NewestFirst, 100)
        .await
        .expect("correlate");
    assert_eq!(written, 1);
    let missed = store.event(ids[0]).await;
    assert_eq!(missed.retry_latency_minutes, Some(15));
    assert_eq!(missed.next_success_id, Some(ids[1]));

    store.cleanup().await;
}

#[tokio::test]
async fn batch_order_never_changes_the_recorded_latency() {
    for order in [BatchOrder::NewestFirst, BatchOrder::OldestFirst] {
        let store = TestStore::new().await;
        let ids = store
            .insert(&[
                missed_call(0, ACME),
                answered_call(45, ACME),
                missed_call(100, GLOBEX),
                missed_call(200, GLOBEX),
            ])
            .await;
        let config = EngineConfig {
            classify_limit: 1,
            batch_order: order,
            ..phased_config()
        };

        for _ in 0..5 {
            let report = invoke(store.store(), config.clone())
                .await
                .expect("pass runs");
            assert!(report.succeeded(), "{report}");
        }

        let first = store.event(ids[0]).await;
        assert_eq!(
            (first.retry_latency_minutes, first.next_success_id),
            (Some(45), Some(ids[1])),
            "{order:?}"
        );
        let second = store.event(ids[2]).await;
        assert_eq!(
            (second.retry_latency_minutes, second.next_success_id),
            (Some(360), None),
            "{order:?}"
        );

        store.cleanup().await;
    }
}

#[tokio::test]
async fn batch_limit_bounds_each_round() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[
            missed_call(0, ACME),
            missed_call(1, ACME),
            missed_call(2, ACME),
            missed_call(3, ACME),
            missed_call(4, ACME),
        ])
        .await;
    let backend = store.store();

    let mut rounds = Vec::new();
    for _ in 0..4 {
        rounds.push(
            classifier::classify(backend.as_ref(), DerivedFlag::Missed, BatchOrder::OldestFirst, 2)
                .await
                .expect("classify"),
        );
    }
    assert_eq!(rounds, vec![2, 2, 1, 0]);

    for id in ids {
        assert_eq!(store.event(id).await.missed, Some(true));
    }

    store.cleanup().await;
}

#[tokio::test]
async fn batch_order_selects_which_rows_go_first() {
    let store = TestStore::new().await;
    let ids = store
        .insert(&[
            missed_call(0, ACME),
            missed_call(10, ACME),
            missed_call(20, ACME),
        ])
        .await;
    let backend = store.store();

    classifier::classify(backend.as_ref(), DerivedFlag::Missed, BatchOrder::NewestFirst, 1)
        .await
        .expect("classify newest");
    classifier::classify(backend.as_ref(), DerivedFlag::Missed, BatchOrder::OldestFirst, 1)
        .await
        .expect("classify oldest");

    assert_eq!(store.event(ids[0]).await.missed, Some(true));
    assert_eq!(store.event(ids[1]).await.missed, None);
    assert_eq!(store.event(ids[2]).await.missed, Some(true));

    store.cleanup().await;
}
