use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::BatchOrder;
use crate::DerivedFlag;
use crate::EndpointKey;
use crate::Event;
use crate::FlagUpdate;
use crate::RetryLatencyUpdate;

/// Read/write contract the engine needs from the event log.
///
/// Every write is guarded by the target field still being unset, so callers
/// can retry any operation without double-deriving a value.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Cheap round trip used to fail an invocation before any stage runs.
    async fn ping(&self) -> anyhow::Result<()>;

    /// Rows of `flag.kind()` whose flag is still NULL, at most `limit`.
    async fn pending_classification(
        &self,
        flag: DerivedFlag,
        order: BatchOrder,
        limit: usize,
    ) -> anyhow::Result<Vec<Event>>;

    /// Returns the number of rows actually written.
    async fn write_flags(&self, flag: DerivedFlag, updates: &[FlagUpdate]) -> anyhow::Result<u64>;

    /// Missed rows without a retry latency, at most `limit`.
    async fn pending_correlation(
        &self,
        order: BatchOrder,
        limit: usize,
    ) -> anyhow::Result<Vec<Event>>;

    /// Successful (`missed = false`) rows for `endpoint` with
    /// `after < timestamp <= until`, oldest first.
    async fn successors(
        &self,
        endpoint: &EndpointKey,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Event>>;

    /// Earliest CALL for `endpoint` with `after < timestamp <= until` whose
    /// `missed` flag is still unknown.
    async fn earliest_unclassified_call(
        &self,
        endpoint: &EndpointKey,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Option<Event>>;

    /// Returns the number of rows actually written.
    async fn write_retry_latencies(&self, updates: &[RetryLatencyUpdate]) -> anyhow::Result<u64>;

    /// Copies up to `limit` correlated missed calls into the derived
    /// `missed_log` table. Returns the number of rows inserted.
    async fn sync_missed_log(&self, order: BatchOrder, limit: usize) -> anyhow::Result<u64>;
}
