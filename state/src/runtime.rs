use crate::BatchOrder;
use crate::DerivedFlag;
use crate::EndpointKey;
use crate::Event;
use crate::FlagUpdate;
use crate::RecordStore;
use crate::RetryLatencyUpdate;
use crate::migrations::MIGRATOR;
use crate::model::EVENT_COLUMNS;
use crate::model::EventRow;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use log::LevelFilter;
use sqlx::ConnectOptions;
use sqlx::QueryBuilder;
use sqlx::Sqlite;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::sqlite::SqliteJournalMode;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::sqlite::SqliteSynchronous;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing::warn;

mod classification;
mod correlation;
mod events;
mod missed_log;

pub const STATE_DB_FILENAME: &str = "faxlog";
pub const STATE_DB_VERSION: u32 = 1;

/// Bound on ids per `IN (...)` list so a batch never approaches SQLite's
/// host-parameter limit.
const UPDATE_CHUNK_SIZE: usize = 500;

#[derive(Clone)]
pub struct StateRuntime {
    db_path: PathBuf,
    pool: Arc<sqlx::SqlitePool>,
}

impl StateRuntime {
    /// Initialize the runtime under `faxlog_home`.
    ///
    /// This opens (and migrates) the SQLite database at
    /// `faxlog_home/faxlog_<version>.sqlite`.
    pub async fn init(faxlog_home: PathBuf) -> anyhow::Result<Arc<Self>> {
        tokio::fs::create_dir_all(&faxlog_home).await?;
        Self::open(state_db_path(faxlog_home.as_path())).await
    }

    /// Open (and migrate) the database at an explicit path.
    pub async fn open(db_path: PathBuf) -> anyhow::Result<Arc<Self>> {
        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let pool = match open_sqlite(&db_path).await {
            Ok(db) => Arc::new(db),
            Err(err) => {
                warn!("failed to open state db at {}: {err}", db_path.display());
                return Err(err);
            }
        };
        debug!("opened state db at {}", db_path.display());
        Ok(Arc::new(Self { db_path, pool }))
    }

    /// Path of the backing SQLite file.
    pub fn db_path(&self) -> &Path {
        self.db_path.as_path()
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for StateRuntime {
    async fn ping(&self) -> anyhow::Result<()> {
        StateRuntime::ping(self).await
    }

    async fn pending_classification(
        &self,
        flag: DerivedFlag,
        order: BatchOrder,
        limit: usize,
    ) -> anyhow::Result<Vec<Event>> {
        StateRuntime::pending_classification(self, flag, order, limit).await
    }

    async fn write_flags(&self, flag: DerivedFlag, updates: &[FlagUpdate]) -> anyhow::Result<u64> {
        StateRuntime::write_flags(self, flag, updates).await
    }

    async fn pending_correlation(
        &self,
        order: BatchOrder,
        limit: usize,
    ) -> anyhow::Result<Vec<Event>> {
        StateRuntime::pending_correlation(self, order, limit).await
    }

    async fn successors(
        &self,
        endpoint: &EndpointKey,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Event>> {
        StateRuntime::successors(self, endpoint, after, until).await
    }

    async fn earliest_unclassified_call(
        &self,
        endpoint: &EndpointKey,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> anyhow::Result<Option<Event>> {
        StateRuntime::earliest_unclassified_call(self, endpoint, after, until).await
    }

    async fn write_retry_latencies(&self, updates: &[RetryLatencyUpdate]) -> anyhow::Result<u64> {
        StateRuntime::write_retry_latencies(self, updates).await
    }

    async fn sync_missed_log(&self, order: BatchOrder, limit: usize) -> anyhow::Result<u64> {
        StateRuntime::sync_missed_log(self, order, limit).await
    }
}

async fn open_sqlite(path: &Path) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true)
        .log_statements(LevelFilter::Off);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

pub fn state_db_filename() -> String {
    format!("{STATE_DB_FILENAME}_{STATE_DB_VERSION}.sqlite")
}

pub fn state_db_path(faxlog_home: &Path) -> PathBuf {
    faxlog_home.join(state_db_filename())
}

fn select_events<'a>(filter: &str) -> QueryBuilder<'a, Sqlite> {
    QueryBuilder::<Sqlite>::new(format!("SELECT {EVENT_COLUMNS} FROM events WHERE {filter}"))
}

fn push_batch_order_and_limit(
    builder: &mut QueryBuilder<'_, Sqlite>,
    order: BatchOrder,
    limit: usize,
) {
    let direction = order.sql_direction();
    builder.push(format!(" ORDER BY ts {direction}, id {direction}"));
    builder.push(" LIMIT ");
    builder.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
}

fn rows_to_events(rows: Vec<EventRow>) -> anyhow::Result<Vec<Event>> {
    rows.into_iter().map(Event::try_from).collect()
}
