use super::*;

impl StateRuntime {
    pub async fn pending_correlation(
        &self,
        order: BatchOrder,
        limit: usize,
    ) -> anyhow::Result<Vec<Event>> {
        let mut builder = select_events("kind = ");
        builder.push_bind(DerivedFlag::Missed.kind().as_str());
        builder.push(" AND missed = 1 AND retry_latency_minutes IS NULL");
        push_batch_order_and_limit(&mut builder, order, limit);
        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(self.pool.as_ref())
            .await?;
        rows_to_events(rows)
    }

    pub async fn successors(
        &self,
        endpoint: &EndpointKey,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Event>> {
        let mut builder = select_events("local_number = ");
        builder.push_bind(endpoint.local_number.as_str());
        builder.push(" AND cid_name = ");
        builder.push_bind(endpoint.cid_name.as_str());
        builder.push(" AND missed = 0 AND ts > ");
        builder.push_bind(after.timestamp());
        builder.push(" AND ts <= ");
        builder.push_bind(until.timestamp());
        builder.push(" ORDER BY ts ASC, id ASC");
        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(self.pool.as_ref())
            .await?;
        rows_to_events(rows)
    }

    /// Earliest CALL for `endpoint` with `after < ts <= until` that has not
    /// been classified yet.
    pub async fn earliest_unclassified_call(
        &self,
        endpoint: &EndpointKey,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Option<Event>> {
        let mut builder = select_events("kind = ");
        builder.push_bind(DerivedFlag::Missed.kind().as_str());
        builder.push(" AND local_number = ");
        builder.push_bind(endpoint.local_number.as_str());
        builder.push(" AND cid_name = ");
        builder.push_bind(endpoint.cid_name.as_str());
        builder.push(" AND missed IS NULL AND ts > ");
        builder.push_bind(after.timestamp());
        builder.push(" AND ts <= ");
        builder.push_bind(until.timestamp());
        builder.push(" ORDER BY ts ASC, id ASC LIMIT 1");
        let row = builder
            .build_query_as::<EventRow>()
            .fetch_optional(self.pool.as_ref())
            .await?;
        row.map(Event::try_from).transpose()
    }

    /// Record retry latencies. Rows that already carry a latency are left
    /// untouched.
    pub async fn write_retry_latencies(
        &self,
        updates: &[RetryLatencyUpdate],
    ) -> anyhow::Result<u64> {
        if updates.is_empty() {
            return Ok(0);
        }
        let mut written = 0_u64;
        let mut tx = self.pool.begin().await?;
        for update in updates {
            let result = sqlx::query(
                r#"
UPDATE events
SET retry_latency_minutes = ?, next_success_id = ?
WHERE id = ?
  AND missed = 1
  AND retry_latency_minutes IS NULL
                "#,
            )
            .bind(update.latency_minutes)
            .bind(update.next_success_id)
            .bind(update.id)
            .execute(&mut *tx)
            .await?;
            written = written.saturating_add(result.rows_affected());
        }
        tx.commit().await?;
        Ok(written)
    }
}
