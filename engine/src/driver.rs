use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use faxlog_state::DerivedFlag;
use faxlog_state::RecordStore;
use tracing::info;
use tracing::warn;

use crate::EngineConfig;
use crate::EngineError;
use crate::StageSchedule;
use crate::classifier;
use crate::correlator;

/// One bounded unit of work within a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Label CALL rows as missed or answered.
    ClassifyMissed,
    /// Label RECV rows as incomplete or complete.
    ClassifyIncomplete,
    /// Compute retry latencies for missed calls.
    Correlate,
    /// Mirror correlated missed calls into `missed_log`.
    MissedLog,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::ClassifyMissed,
        Stage::ClassifyIncomplete,
        Stage::Correlate,
        Stage::MissedLog,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::ClassifyMissed => "classify-missed",
            Stage::ClassifyIncomplete => "classify-incomplete",
            Stage::Correlate => "correlate",
            Stage::MissedLog => "missed-log",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Updated(u64),
    /// Nothing was eligible this round. Not a failure.
    NoEligibleRows,
    Failed(String),
    TimedOut(Duration),
}

impl StageStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, StageStatus::Failed(_) | StageStatus::TimedOut(_))
    }

    pub fn rows_updated(&self) -> u64 {
        match self {
            StageStatus::Updated(rows) => *rows,
            StageStatus::NoEligibleRows | StageStatus::Failed(_) | StageStatus::TimedOut(_) => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    pub elapsed: Duration,
}

impl fmt::Display for StageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed_ms = self.elapsed.as_millis();
        match &self.status {
            StageStatus::Updated(rows) => {
                write!(f, "{}: updated {rows} rows in {elapsed_ms}ms", self.stage)
            }
            StageStatus::NoEligibleRows => {
                write!(f, "{}: no eligible rows ({elapsed_ms}ms)", self.stage)
            }
            StageStatus::Failed(message) => write!(f, "{}: failed: {message}", self.stage),
            StageStatus::TimedOut(limit) => write!(
                f,
                "{}: abandoned after {}ms timeout",
                self.stage,
                limit.as_millis()
            ),
        }
    }
}

/// Per-stage outcome of one pass, in launch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassReport {
    pub stages: Vec<StageReport>,
}

impl PassReport {
    pub fn succeeded(&self) -> bool {
        self.stages.iter().all(|report| !report.status.is_failure())
    }

    pub fn failed_stages(&self) -> Vec<Stage> {
        self.stages
            .iter()
            .filter(|report| report.status.is_failure())
            .map(|report| report.stage)
            .collect()
    }

    pub fn rows_updated(&self) -> u64 {
        self.stages
            .iter()
            .map(|report| report.status.rows_updated())
            .sum()
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.stages {
            writeln!(f, "{report}")?;
        }
        if self.succeeded() {
            write!(f, "pass complete: {} rows updated", self.rows_updated())
        } else {
            let failed = self
                .failed_stages()
                .into_iter()
                .map(Stage::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            write!(
                f,
                "pass finished with failures in [{failed}]: {} rows updated",
                self.rows_updated()
            )
        }
    }
}

/// Runs the classification and correlation stages against one shared store
/// handle.
#[derive(Clone)]
pub struct BatchDriver {
    store: Arc<dyn RecordStore>,
    config: EngineConfig,
}

impl BatchDriver {
    pub fn new(store: Arc<dyn RecordStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Run every stage once and wait for all of them. A failing stage never
    /// stops its siblings.
    pub async fn run_pass(&self) -> PassReport {
        let stages = match self.config.schedule {
            StageSchedule::Concurrent => self.run_stages(&Stage::ALL).await,
            StageSchedule::Phased => {
                let mut stages = self
                    .run_stages(&[Stage::ClassifyMissed, Stage::ClassifyIncomplete])
                    .await;
                stages.extend(self.run_stages(&[Stage::Correlate]).await);
                stages.extend(self.run_stages(&[Stage::MissedLog]).await);
                stages
            }
        };
        PassReport { stages }
    }

    /// Launch one task per stage and wait for all of them.
    async fn run_stages(&self, stages: &[Stage]) -> Vec<StageReport> {
        let handles = stages
            .iter()
            .map(|stage| {
                let stage = *stage;
                let store = Arc::clone(&self.store);
                let config = self.config.clone();
                let handle =
                    tokio::spawn(async move { run_stage(store.as_ref(), stage, &config).await });
                (stage, handle)
            })
            .collect::<Vec<_>>();

        let mut reports = Vec::with_capacity(handles.len());
        for (stage, handle) in handles {
            let report = match handle.await {
                Ok(report) => report,
                Err(err) => {
                    warn!("{stage} stage task aborted: {err}");
                    StageReport {
                        stage,
                        status: StageStatus::Failed(format!("stage task aborted: {err}")),
                        elapsed: Duration::ZERO,
                    }
                }
            };
            reports.push(report);
        }
        reports
    }
}

async fn run_stage(store: &dyn RecordStore, stage: Stage, config: &EngineConfig) -> StageReport {
    let started = Instant::now();
    let work = execute_stage(store, stage, config);
    let outcome = match config.stage_timeout {
        Some(limit) => tokio::time::timeout(limit, work).await.map_err(|_| limit),
        None => Ok(work.await),
    };
    let elapsed = started.elapsed();
    let status = match outcome {
        Ok(Ok(0)) => {
            info!(stage = %stage, elapsed = ?elapsed, "no eligible rows");
            StageStatus::NoEligibleRows
        }
        Ok(Ok(rows)) => {
            info!(stage = %stage, rows, elapsed = ?elapsed, "stage executed");
            StageStatus::Updated(rows)
        }
        Ok(Err(error)) => {
            let err = EngineError::Statement { stage, error };
            warn!("{err}");
            StageStatus::Failed(err.to_string())
        }
        Err(limit) => {
            warn!(
                "{stage} stage abandoned after {}ms; applied writes are kept",
                limit.as_millis()
            );
            StageStatus::TimedOut(limit)
        }
    };
    StageReport {
        stage,
        status,
        elapsed,
    }
}

async fn execute_stage(
    store: &dyn RecordStore,
    stage: Stage,
    config: &EngineConfig,
) -> anyhow::Result<u64> {
    match stage {
        Stage::ClassifyMissed => {
            classifier::classify(
                store,
                DerivedFlag::Missed,
                config.batch_order,
                config.classify_limit,
            )
            .await
        }
        Stage::ClassifyIncomplete => {
            classifier::classify(
                store,
                DerivedFlag::Incomplete,
                config.batch_order,
                config.classify_limit,
            )
            .await
        }
        Stage::Correlate => {
            correlator::correlate(
                store,
                config.retry_window,
                config.batch_order,
                config.correlate_limit,
            )
            .await
        }
        Stage::MissedLog => {
            store
                .sync_missed_log(config.batch_order, config.missed_log_limit)
                .await
        }
    }
}
