use anyhow::Result;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Transaction type recorded by the fax gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    Call,
    Send,
    Recv,
    Poll,
    Page,
    Unsent,
    Submit,
    Proxy,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            EventKind::Call => "CALL",
            EventKind::Send => "SEND",
            EventKind::Recv => "RECV",
            EventKind::Poll => "POLL",
            EventKind::Page => "PAGE",
            EventKind::Unsent => "UNSENT",
            EventKind::Submit => "SUBMIT",
            EventKind::Proxy => "PROXY",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value {
            "CALL" => Ok(Self::Call),
            "SEND" => Ok(Self::Send),
            "RECV" => Ok(Self::Recv),
            "POLL" => Ok(Self::Poll),
            "PAGE" => Ok(Self::Page),
            "UNSENT" => Ok(Self::Unsent),
            "SUBMIT" => Ok(Self::Submit),
            "PROXY" => Ok(Self::Proxy),
            _ => Err(anyhow::anyhow!("invalid event kind: {value}")),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The (local number, counterpart name) pair that identifies one
/// conversation relationship across events.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointKey {
    pub local_number: String,
    pub cid_name: String,
}

impl EndpointKey {
    pub fn new(local_number: impl Into<String>, cid_name: impl Into<String>) -> Self {
        Self {
            local_number: local_number.into(),
            cid_name: cid_name.into(),
        }
    }
}

impl std::fmt::Display for EndpointKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {:?})", self.local_number, self.cid_name)
    }
}

/// One row of the event log, including the fields derived by the engine.
///
/// `missed`, `incomplete` and `retry_latency_minutes` are `None` until the
/// corresponding stage has looked at the row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub endpoint: EndpointKey,
    pub reason: Option<String>,
    pub page_count: i64,
    pub missed: Option<bool>,
    pub incomplete: Option<bool>,
    pub retry_latency_minutes: Option<i64>,
    /// Successful event the latency was measured against. `None` on a
    /// correlated row means the latency is censored at the window bound.
    pub next_success_id: Option<i64>,
}

impl Event {
    pub fn is_censored(&self) -> bool {
        self.retry_latency_minutes.is_some() && self.next_success_id.is_none()
    }
}

/// An already-typed event as handed over by ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    #[serde(flatten)]
    pub endpoint: EndpointKey,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub page_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub(crate) id: i64,
    pub(crate) ts: i64,
    pub(crate) kind: String,
    pub(crate) local_number: String,
    pub(crate) cid_name: String,
    pub(crate) reason: Option<String>,
    pub(crate) page_count: i64,
    pub(crate) missed: Option<i64>,
    pub(crate) incomplete: Option<i64>,
    pub(crate) retry_latency_minutes: Option<i64>,
    pub(crate) next_success_id: Option<i64>,
}

impl TryFrom<EventRow> for Event {
    type Error = anyhow::Error;

    fn try_from(value: EventRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            timestamp: epoch_seconds_to_datetime(value.ts)?,
            kind: EventKind::parse(value.kind.as_str())?,
            endpoint: EndpointKey {
                local_number: value.local_number,
                cid_name: value.cid_name,
            },
            reason: value.reason,
            page_count: value.page_count,
            missed: value.missed.map(|flag| flag != 0),
            incomplete: value.incomplete.map(|flag| flag != 0),
            retry_latency_minutes: value.retry_latency_minutes,
            next_success_id: value.next_success_id,
        })
    }
}

pub(crate) const EVENT_COLUMNS: &str = r#"
    id,
    ts,
    kind,
    local_number,
    cid_name,
    reason,
    page_count,
    missed,
    incomplete,
    retry_latency_minutes,
    next_success_id
"#;

pub(crate) fn epoch_seconds_to_datetime(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| anyhow::anyhow!("invalid unix timestamp: {secs}"))
}
