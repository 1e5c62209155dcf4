use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use faxlog_engine::DEFAULT_CLASSIFY_LIMIT;
use faxlog_engine::DEFAULT_CORRELATE_LIMIT;
use faxlog_engine::DEFAULT_MISSED_LOG_LIMIT;
use faxlog_engine::DEFAULT_RETRY_WINDOW_MINUTES;
use faxlog_engine::EngineConfig;
use faxlog_engine::RetryWindow;
use faxlog_engine::StageSchedule;
use faxlog_engine::invoke_sqlite;
use faxlog_state::BatchOrder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub(crate) enum OrderArg {
    Newest,
    Oldest,
}

impl From<OrderArg> for BatchOrder {
    fn from(value: OrderArg) -> Self {
        match value {
            OrderArg::Newest => BatchOrder::NewestFirst,
            OrderArg::Oldest => BatchOrder::OldestFirst,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub(crate) enum ScheduleArg {
    Concurrent,
    Phased,
}

impl From<ScheduleArg> for StageSchedule {
    fn from(value: ScheduleArg) -> Self {
        match value {
            ScheduleArg::Concurrent => StageSchedule::Concurrent,
            ScheduleArg::Phased => StageSchedule::Phased,
        }
    }
}

#[derive(Debug, clap::Args)]
pub(crate) struct RunArgs {
    /// Minutes after a missed call within which a success counts as its retry.
    #[arg(
        long,
        env = "FAXLOG_RETRY_WINDOW_MINUTES",
        default_value_t = DEFAULT_RETRY_WINDOW_MINUTES,
        allow_negative_numbers = true
    )]
    window_minutes: i64,

    /// Rows labeled per classification stage and pass.
    #[arg(long, env = "FAXLOG_CLASSIFY_LIMIT", default_value_t = DEFAULT_CLASSIFY_LIMIT)]
    classify_limit: usize,

    /// Missed calls correlated per pass.
    #[arg(long, env = "FAXLOG_CORRELATE_LIMIT", default_value_t = DEFAULT_CORRELATE_LIMIT)]
    correlate_limit: usize,

    /// Rows copied into missed_log per pass.
    #[arg(long, env = "FAXLOG_MISSED_LOG_LIMIT", default_value_t = DEFAULT_MISSED_LOG_LIMIT)]
    missed_log_limit: usize,

    /// Which pending rows each stage takes first.
    #[arg(long, env = "FAXLOG_BATCH_ORDER", value_enum, default_value_t = OrderArg::Newest)]
    order: OrderArg,

    /// Launch all stages at once or classification before correlation.
    #[arg(long, env = "FAXLOG_SCHEDULE", value_enum, default_value_t = ScheduleArg::Concurrent)]
    schedule: ScheduleArg,

    /// Abandon a stage still running after this many seconds.
    #[arg(long, env = "FAXLOG_STAGE_TIMEOUT_SECS")]
    stage_timeout_secs: Option<u64>,
}

impl RunArgs {
    pub(crate) fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let config = EngineConfig {
            retry_window: RetryWindow::from_minutes(self.window_minutes),
            classify_limit: self.classify_limit,
            correlate_limit: self.correlate_limit,
            missed_log_limit: self.missed_log_limit,
            batch_order: self.order.into(),
            schedule: self.schedule.into(),
            stage_timeout: self.stage_timeout_secs.map(Duration::from_secs),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Returns whether every stage succeeded.
pub(crate) async fn run(db_path: PathBuf, args: RunArgs) -> anyhow::Result<bool> {
    let config = args.engine_config()?;
    let report = invoke_sqlite(db_path, config).await?;
    println!("{report}");
    Ok(report.succeeded())
}
