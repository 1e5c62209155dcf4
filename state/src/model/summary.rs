use serde::Serialize;

/// Aggregate counts over the event log and the derived table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct EventSummary {
    pub total_events: i64,
    pub unclassified_calls: i64,
    pub missed_calls: i64,
    pub answered_calls: i64,
    pub unclassified_receptions: i64,
    pub incomplete_receptions: i64,
    pub complete_receptions: i64,
    pub pending_correlation: i64,
    pub correlated: i64,
    pub censored: i64,
    pub missed_log_rows: i64,
}
