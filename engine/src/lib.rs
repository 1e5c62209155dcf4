//! Missed-event classification and retry correlation over the fax event log.
//!
//! One invocation is one [`BatchDriver`] pass: each stage picks up a bounded
//! slice of pending rows, derives its values and writes them back through the
//! [`faxlog_state::RecordStore`] contract. Every write is idempotent or
//! write-once, so an abandoned or repeated pass never corrupts a row.

pub mod classifier;
mod config;
pub mod correlator;
mod driver;
mod error;
mod invoke;

pub use config::DEFAULT_CLASSIFY_LIMIT;
pub use config::DEFAULT_CORRELATE_LIMIT;
pub use config::DEFAULT_MISSED_LOG_LIMIT;
pub use config::DEFAULT_RETRY_WINDOW_MINUTES;
pub use config::EngineConfig;
pub use config::RetryWindow;
pub use config::StageSchedule;
pub use driver::BatchDriver;
pub use driver::PassReport;
pub use driver::Stage;
pub use driver::StageReport;
pub use driver::StageStatus;
pub use error::EngineError;
pub use error::Result;
pub use invoke::invoke;
pub use invoke::invoke_sqlite;
