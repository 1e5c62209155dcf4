use std::path::PathBuf;
use std::sync::Arc;

use faxlog_state::RecordStore;
use faxlog_state::StateRuntime;
use tracing::info;
use tracing::warn;

use crate::BatchDriver;
use crate::EngineConfig;
use crate::EngineError;
use crate::PassReport;
use crate::error::Result;

/// Run one pass against an already-opened store.
///
/// The store is pinged first; if that fails no stage is attempted.
pub async fn invoke(store: Arc<dyn RecordStore>, config: EngineConfig) -> Result<PassReport> {
    config.validate()?;
    run_validated(store, config).await
}

/// Open the SQLite store at `db_path` and run one pass against it.
///
/// The configuration is checked before the database file is touched.
pub async fn invoke_sqlite(db_path: PathBuf, config: EngineConfig) -> Result<PassReport> {
    config.validate()?;
    let store = StateRuntime::open(db_path.clone())
        .await
        .map_err(|error| EngineError::Connectivity {
            target: db_path.display().to_string(),
            error,
        })?;
    run_validated(store, config).await
}

async fn run_validated(store: Arc<dyn RecordStore>, config: EngineConfig) -> Result<PassReport> {
    if let Err(error) = store.ping().await {
        let err = EngineError::Connectivity {
            target: "record store".to_string(),
            error,
        };
        warn!("{err}");
        return Err(err);
    }
    info!(
        window_minutes = config.retry_window.minutes(),
        schedule = config.schedule.as_str(),
        batch_order = config.batch_order.as_str(),
        "starting batch pass"
    );
    let report = BatchDriver::new(store, config).run_pass().await;
    if report.succeeded() {
        info!(rows = report.rows_updated(), "batch pass complete");
    } else {
        warn!(failed = ?report.failed_stages(), "batch pass finished with failures");
    }
    Ok(report)
}
