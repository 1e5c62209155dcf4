use super::*;

impl StateRuntime {
    pub async fn pending_classification(
        &self,
        flag: DerivedFlag,
        order: BatchOrder,
        limit: usize,
    ) -> anyhow::Result<Vec<Event>> {
        let column = flag.column();
        let mut builder = select_events("kind = ");
        builder.push_bind(flag.kind().as_str());
        builder.push(format!(" AND {column} IS NULL"));
        push_batch_order_and_limit(&mut builder, order, limit);
        let rows = builder
            .build_query_as::<EventRow>()
            .fetch_all(self.pool.as_ref())
            .await?;
        rows_to_events(rows)
    }

    /// Write classification results. A row is only touched while its flag is
    /// still NULL and its kind matches the flag, so replays write nothing.
    pub async fn write_flags(
        &self,
        flag: DerivedFlag,
        updates: &[FlagUpdate],
    ) -> anyhow::Result<u64> {
        if updates.is_empty() {
            return Ok(0);
        }
        let column = flag.column();
        let mut written = 0_u64;
        let mut tx = self.pool.begin().await?;
        for value in [true, false] {
            let ids = updates
                .iter()
                .filter(|update| update.value == value)
                .map(|update| update.id)
                .collect::<Vec<_>>();
            for chunk in ids.chunks(UPDATE_CHUNK_SIZE) {
                let mut builder =
                    QueryBuilder::<Sqlite>::new(format!("UPDATE events SET {column} = "));
                builder.push_bind(i64::from(value));
                builder.push(" WHERE kind = ");
                builder.push_bind(flag.kind().as_str());
                builder.push(format!(" AND {column} IS NULL AND id IN ("));
                let mut separated = builder.separated(", ");
                for id in chunk {
                    separated.push_bind(*id);
                }
                separated.push_unseparated(")");
                let result = builder.build().execute(&mut *tx).await?;
                written = written.saturating_add(result.rows_affected());
            }
        }
        tx.commit().await?;
        Ok(written)
    }
}
