use super::*;
use crate::MissedLogEntry;
use crate::model::MissedLogRow;

impl StateRuntime {
    /// Mirror correlated missed calls into `missed_log`. Rows already present
    /// are skipped, so the operation can be repeated freely.
    pub async fn sync_missed_log(&self, order: BatchOrder, limit: usize) -> anyhow::Result<u64> {
        let direction = order.sql_direction();
        let result = sqlx::query(&format!(
            r#"
INSERT OR IGNORE INTO missed_log (
    event_id,
    local_number,
    cid_name,
    ts,
    retry_latency_minutes,
    censored
)
SELECT id, local_number, cid_name, ts, retry_latency_minutes, next_success_id IS NULL
FROM events
WHERE kind = ?
  AND missed = 1
  AND retry_latency_minutes IS NOT NULL
  AND NOT EXISTS (SELECT 1 FROM missed_log WHERE missed_log.event_id = events.id)
ORDER BY ts {direction}, id {direction}
LIMIT ?
            "#
        ))
        .bind(DerivedFlag::Missed.kind().as_str())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .execute(self.pool.as_ref())
        .await?;
        Ok(result.rows_affected())
    }

    /// Most recent entries of the derived table.
    pub async fn list_missed_log(&self, limit: usize) -> anyhow::Result<Vec<MissedLogEntry>> {
        let rows = sqlx::query_as::<_, MissedLogRow>(
            r#"
SELECT id, event_id, local_number, cid_name, ts, retry_latency_minutes, censored
FROM missed_log
ORDER BY ts DESC, id DESC
LIMIT ?
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(self.pool.as_ref())
        .await?;
        rows.into_iter().map(MissedLogEntry::try_from).collect()
    }
}
