//! SQLite-backed record store for the fax/telephony event log.
//!
//! The store owns the `events` table (imported rows plus the fields derived by
//! the engine) and the `missed_log` derived table. Classification and
//! correlation rules live in `faxlog-engine`; this crate only exposes the
//! guarded reads and writes those rules need through [`RecordStore`].

mod migrations;
mod model;
mod runtime;
mod store;

/// Preferred entrypoint: owns the connection pool.
pub use runtime::StateRuntime;
pub use store::RecordStore;

pub use model::BatchOrder;
pub use model::DerivedFlag;
pub use model::EndpointKey;
pub use model::Event;
pub use model::EventKind;
pub use model::EventSummary;
pub use model::FlagUpdate;
pub use model::MissedLogEntry;
pub use model::NewEvent;
pub use model::RetryLatencyUpdate;
pub use runtime::STATE_DB_FILENAME;
pub use runtime::STATE_DB_VERSION;
pub use runtime::state_db_filename;
pub use runtime::state_db_path;
