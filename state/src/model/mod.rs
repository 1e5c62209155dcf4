mod event;
mod missed_log;
mod summary;
mod work;

pub use event::EndpointKey;
pub use event::Event;
pub use event::EventKind;
pub use event::NewEvent;
pub use missed_log::MissedLogEntry;
pub use summary::EventSummary;
pub use work::BatchOrder;
pub use work::DerivedFlag;
pub use work::FlagUpdate;
pub use work::RetryLatencyUpdate;

pub(crate) use event::EVENT_COLUMNS;
pub(crate) use event::EventRow;
pub(crate) use missed_log::MissedLogRow;
