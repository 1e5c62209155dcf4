//! Missed-call and incomplete-reception labeling.
//!
//! Both rules are total over the `reason` column: an absent reason and an
//! empty reason are the same thing, and any other text is a failure reason.

use faxlog_state::BatchOrder;
use faxlog_state::DerivedFlag;
use faxlog_state::Event;
use faxlog_state::FlagUpdate;
use faxlog_state::RecordStore;
use tracing::debug;

fn has_failure_reason(reason: Option<&str>) -> bool {
    reason.is_some_and(|reason| !reason.is_empty())
}

/// A CALL is missed iff it carries a failure reason.
pub fn is_missed(reason: Option<&str>) -> bool {
    has_failure_reason(reason)
}

/// A RECV is incomplete iff pages were involved and it carries a failure
/// reason. Zero-page receptions are probes, never incomplete.
pub fn is_incomplete(page_count: i64, reason: Option<&str>) -> bool {
    page_count != 0 && has_failure_reason(reason)
}

/// Label one event for `flag`. Returns `None` when the event's kind does not
/// carry that flag.
pub fn classify_event(flag: DerivedFlag, event: &Event) -> Option<FlagUpdate> {
    if event.kind != flag.kind() {
        return None;
    }
    let reason = event.reason.as_deref();
    let value = match flag {
        DerivedFlag::Missed => is_missed(reason),
        DerivedFlag::Incomplete => is_incomplete(event.page_count, reason),
    };
    Some(FlagUpdate {
        id: event.id,
        value,
    })
}

/// Classify up to `limit` rows whose `flag` is still unknown. Returns the
/// number of rows written.
pub async fn classify(
    store: &dyn RecordStore,
    flag: DerivedFlag,
    order: BatchOrder,
    limit: usize,
) -> anyhow::Result<u64> {
    let pending = store.pending_classification(flag, order, limit).await?;
    if pending.is_empty() {
        return Ok(0);
    }
    let updates = pending
        .iter()
        .filter_map(|event| classify_event(flag, event))
        .collect::<Vec<_>>();
    let flagged = updates.iter().filter(|update| update.value).count();
    debug!(
        kind = %flag.kind(),
        examined = pending.len(),
        flagged,
        "classified batch"
    );
    store.write_flags(flag, &updates).await
}
