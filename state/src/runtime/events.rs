use super::*;
use crate::EventSummary;
use crate::NewEvent;

impl StateRuntime {
    /// Append one imported event. Returns the id assigned by the store.
    pub async fn insert_event(&self, event: &NewEvent) -> anyhow::Result<i64> {
        let ids = self.insert_events(std::slice::from_ref(event)).await?;
        ids.first()
            .copied()
            .ok_or_else(|| anyhow::anyhow!("insert returned no id"))
    }

    /// Append a batch of imported events in one transaction, preserving input
    /// order in the returned ids.
    pub async fn insert_events(&self, events: &[NewEvent]) -> anyhow::Result<Vec<i64>> {
        let mut ids = Vec::with_capacity(events.len());
        if events.is_empty() {
            return Ok(ids);
        }
        let mut tx = self.pool.begin().await?;
        for event in events {
            let result = sqlx::query(
                r#"
INSERT INTO events (ts, kind, local_number, cid_name, reason, page_count)
VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(event.timestamp.timestamp())
            .bind(event.kind.as_str())
            .bind(event.endpoint.local_number.as_str())
            .bind(event.endpoint.cid_name.as_str())
            .bind(event.reason.as_deref())
            .bind(event.page_count)
            .execute(&mut *tx)
            .await?;
            ids.push(result.last_insert_rowid());
        }
        tx.commit().await?;
        Ok(ids)
    }

    pub async fn get_event(&self, id: i64) -> anyhow::Result<Option<Event>> {
        let mut builder = select_events("id = ");
        builder.push_bind(id);
        let row = builder
            .build_query_as::<EventRow>()
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.map(Event::try_from).transpose()
    }

    /// Counts per derived state, for reporting.
    pub async fn summary(&self) -> anyhow::Result<EventSummary> {
        let summary = sqlx::query_as::<_, EventSummary>(
            r#"
SELECT
    COUNT(*) AS total_events,
    COALESCE(SUM(kind = 'CALL' AND missed IS NULL), 0) AS unclassified_calls,
    COALESCE(SUM(kind = 'CALL' AND missed = 1), 0) AS missed_calls,
    COALESCE(SUM(kind = 'CALL' AND missed = 0), 0) AS answered_calls,
    COALESCE(SUM(kind = 'RECV' AND incomplete IS NULL), 0) AS unclassified_receptions,
    COALESCE(SUM(kind = 'RECV' AND incomplete = 1), 0) AS incomplete_receptions,
    COALESCE(SUM(kind = 'RECV' AND incomplete = 0), 0) AS complete_receptions,
    COALESCE(SUM(missed = 1 AND retry_latency_minutes IS NULL), 0) AS pending_correlation,
    COALESCE(SUM(retry_latency_minutes IS NOT NULL), 0) AS correlated,
    COALESCE(SUM(retry_latency_minutes IS NOT NULL AND next_success_id IS NULL), 0) AS censored,
    (SELECT COUNT(*) FROM missed_log) AS missed_log_rows
FROM events
            "#,
        )
        .fetch_one(self.pool.as_ref())
        .await?;
        Ok(summary)
    }
}
