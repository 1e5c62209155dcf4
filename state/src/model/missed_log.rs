use anyhow::Result;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::EndpointKey;
use super::event::epoch_seconds_to_datetime;

/// A correlated missed call mirrored into the `missed_log` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissedLogEntry {
    pub id: i64,
    pub event_id: i64,
    pub endpoint: EndpointKey,
    pub timestamp: DateTime<Utc>,
    pub retry_latency_minutes: i64,
    pub censored: bool,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct MissedLogRow {
    pub(crate) id: i64,
    pub(crate) event_id: i64,
    pub(crate) local_number: String,
    pub(crate) cid_name: String,
    pub(crate) ts: i64,
    pub(crate) retry_latency_minutes: i64,
    pub(crate) censored: i64,
}

impl TryFrom<MissedLogRow> for MissedLogEntry {
    type Error = anyhow::Error;

    fn try_from(value: MissedLogRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            event_id: value.event_id,
            endpoint: EndpointKey {
                local_number: value.local_number,
                cid_name: value.cid_name,
            },
            timestamp: epoch_seconds_to_datetime(value.ts)?,
            retry_latency_minutes: value.retry_latency_minutes,
            censored: value.censored != 0,
        })
    }
}
