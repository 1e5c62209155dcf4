use std::time::Duration;

use faxlog_state::BatchOrder;

use crate::error::EngineError;
use crate::error::Result;

pub const DEFAULT_RETRY_WINDOW_MINUTES: i64 = 360;
pub const DEFAULT_CLASSIFY_LIMIT: usize = 5_000;
pub const DEFAULT_CORRELATE_LIMIT: usize = 2_500;
pub const DEFAULT_MISSED_LOG_LIMIT: usize = 5_000;

/// Horizon after a missed call within which a successful contact counts as
/// its retry. Latencies are capped at this bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryWindow {
    minutes: i64,
}

impl RetryWindow {
    pub const fn from_minutes(minutes: i64) -> Self {
        Self { minutes }
    }

    pub const fn minutes(self) -> i64 {
        self.minutes
    }

    /// `None` when the window does not fit in a `chrono::Duration`.
    pub fn duration(self) -> Option<chrono::Duration> {
        chrono::Duration::try_minutes(self.minutes)
    }
}

impl Default for RetryWindow {
    fn default() -> Self {
        Self::from_minutes(DEFAULT_RETRY_WINDOW_MINUTES)
    }
}

/// How the driver launches stages within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageSchedule {
    /// Every stage starts at once. Missed calls classified in this pass are
    /// correlated by a later pass.
    #[default]
    Concurrent,
    /// Classification, then correlation, then the missed-log sync.
    Phased,
}

impl StageSchedule {
    pub const fn as_str(self) -> &'static str {
        match self {
            StageSchedule::Concurrent => "concurrent",
            StageSchedule::Phased => "phased",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub retry_window: RetryWindow,
    /// Row cap for each classification stage.
    pub classify_limit: usize,
    pub correlate_limit: usize,
    pub missed_log_limit: usize,
    pub batch_order: BatchOrder,
    pub schedule: StageSchedule,
    /// Stages still running after this long are abandoned.
    pub stage_timeout: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retry_window: RetryWindow::default(),
            classify_limit: DEFAULT_CLASSIFY_LIMIT,
            correlate_limit: DEFAULT_CORRELATE_LIMIT,
            missed_log_limit: DEFAULT_MISSED_LOG_LIMIT,
            batch_order: BatchOrder::default(),
            schedule: StageSchedule::default(),
            stage_timeout: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.retry_window.minutes() <= 0 {
            return Err(EngineError::InvalidConfig(format!(
                "retry window must be positive, got {} minutes",
                self.retry_window.minutes()
            )));
        }
        if self.retry_window.duration().is_none() {
            return Err(EngineError::InvalidConfig(format!(
                "retry window of {} minutes is out of range",
                self.retry_window.minutes()
            )));
        }
        for (name, limit) in [
            ("classify_limit", self.classify_limit),
            ("correlate_limit", self.correlate_limit),
            ("missed_log_limit", self.missed_log_limit),
        ] {
            if limit == 0 {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be at least 1"
                )));
            }
        }
        if self.stage_timeout == Some(Duration::ZERO) {
            return Err(EngineError::InvalidConfig(
                "stage timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
