
use super::EventKind;

/// Boolean column derived by classification. Each flag belongs to exactly one
/// event kind and stays NULL on every other kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedFlag {
    /// `missed` on CALL rows.
    Missed,
    /// `incomplete` on RECV rows.
    Incomplete,
}

impl DerivedFlag {
    pub const fn kind(self) -> EventKind {
        match self {
            DerivedFlag::Missed => EventKind::Call,
            DerivedFlag::Incomplete => EventKind::Recv,
        }
    }

    pub(crate) const fn column(self) -> &'static str {
        match self {
            DerivedFlag::Missed => "missed",
            DerivedFlag::Incomplete => "incomplete",
        }
    }
}

/// Classification result for one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagUpdate {
    pub id: i64,
    pub value: bool,
}

/// Correlation result for one missed row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryLatencyUpdate {
    pub id: i64,
    pub latency_minutes: i64,
    /// `None` when no successor was found and the latency is the window bound.
    pub next_success_id: Option<i64>,
}

/// Order in which a bounded batch of pending rows is picked.
///
/// Only affects which rows a run gets to first; per-row results do not
/// depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

impl BatchOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            BatchOrder::NewestFirst => "newest",
            BatchOrder::OldestFirst => "oldest",
        }
    }

    pub(crate) const fn sql_direction(self) -> &'static str {
        match self {
            BatchOrder::NewestFirst => "DESC",
            BatchOrder::OldestFirst => "ASC",
        }
    }
}
