//! Retry correlation for missed calls.
//!
//! For a missed call `m` the retry is the earliest successful event `n` with
//! the same endpoint key and `m.timestamp < n.timestamp <= m.timestamp +
//! window`. The latency is the gap in whole minutes, truncated toward zero.
//! Without such an `n` the latency is censored at the window itself.
//!
//! Latencies are write-once, so a call is only correlated once no
//! unclassified call for its endpoint could still turn out to be the retry.

use chrono::DateTime;
use chrono::Utc;
use faxlog_state::BatchOrder;
use faxlog_state::Event;
use faxlog_state::RecordStore;
use faxlog_state::RetryLatencyUpdate;
use tracing::debug;

use crate::RetryWindow;

/// Last instant at which a success still counts as the retry of a call
/// made at `at`.
pub fn window_end(at: DateTime<Utc>, window: RetryWindow) -> anyhow::Result<DateTime<Utc>> {
    window
        .duration()
        .and_then(|duration| at.checked_add_signed(duration))
        .ok_or_else(|| {
            anyhow::anyhow!(
                "retry window of {} minutes overflows the timestamp range from {at}",
                window.minutes()
            )
        })
}

/// True when `candidate` may serve as the retry of `missed`.
fn qualifies(missed: &Event, candidate: &Event, until: DateTime<Utc>) -> bool {
    candidate.id != missed.id
        && candidate.missed == Some(false)
        && candidate.endpoint == missed.endpoint
        && candidate.timestamp > missed.timestamp
        && candidate.timestamp <= until
}

/// Compute the latency for `missed` from candidate `successors`. Candidates
/// that do not qualify are ignored, and the earliest qualifying one wins
/// (ties go to the lower id).
///
/// `unclassified` is the earliest call in the window whose outcome is still
/// unknown. Returns `Ok(None)` when that call precedes every qualifying
/// success, since it may yet be the retry.
pub fn retry_latency(
    missed: &Event,
    successors: &[Event],
    unclassified: Option<&Event>,
    window: RetryWindow,
) -> anyhow::Result<Option<RetryLatencyUpdate>> {
    let until = window_end(missed.timestamp, window)?;
    let next = successors
        .iter()
        .filter(|candidate| qualifies(missed, candidate, until))
        .min_by_key(|candidate| (candidate.timestamp, candidate.id));
    let undecided = unclassified.filter(|pending| {
        pending.id != missed.id
            && pending.endpoint == missed.endpoint
            && pending.timestamp > missed.timestamp
            && pending.timestamp <= until
    });
    if let Some(pending) = undecided
        && next.is_none_or(|next| (pending.timestamp, pending.id) < (next.timestamp, next.id))
    {
        return Ok(None);
    }
    let update = match next {
        Some(next) => {
            let elapsed = (next.timestamp - missed.timestamp).num_minutes();
            RetryLatencyUpdate {
                id: missed.id,
                latency_minutes: elapsed.min(window.minutes()),
                next_success_id: Some(next.id),
            }
        }
        None => RetryLatencyUpdate {
            id: missed.id,
            latency_minutes: window.minutes(),
            next_success_id: None,
        },
    };
    Ok(Some(update))
}

/// Correlate up to `limit` missed calls that have no latency yet. Returns the
/// number of rows written.
///
/// Only already-classified answered calls count as retries. A missed call
/// whose window still holds an unclassified call that could be its retry is
/// left for a later pass.
pub async fn correlate(
    store: &dyn RecordStore,
    window: RetryWindow,
    order: BatchOrder,
    limit: usize,
) -> anyhow::Result<u64> {
    let pending = store.pending_correlation(order, limit).await?;
    if pending.is_empty() {
        return Ok(0);
    }
    let mut updates = Vec::with_capacity(pending.len());
    for missed in &pending {
        let until = window_end(missed.timestamp, window)?;
        let successors = store
            .successors(&missed.endpoint, missed.timestamp, until)
            .await?;
        let unclassified = store
            .earliest_unclassified_call(&missed.endpoint, missed.timestamp, until)
            .await?;
        let Some(update) = retry_latency(missed, &successors, unclassified.as_ref(), window)?
        else {
            debug!(
                event_id = missed.id,
                endpoint = %missed.endpoint,
                "deferred until the calls in its window are classified"
            );
            continue;
        };
        debug!(
            event_id = missed.id,
            endpoint = %missed.endpoint,
            latency_minutes = update.latency_minutes,
            next_success_id = ?update.next_success_id,
            "correlated missed call"
        );
        updates.push(update);
    }
    store.write_retry_latencies(&updates).await
}
