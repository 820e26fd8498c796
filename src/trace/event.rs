//! Trace events recorded as exchanges pass a traced node

use chrono::{DateTime, Utc};
use std::fmt;
use strum_macros::{Display, EnumString};

/// What happened to the exchange at the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TraceKind {
    /// Arrived at the node, before processing
    Received,
    /// Processor returned successfully
    Completed,
    /// Processor returned an error; `detail` holds its message
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    /// Route-wide trace number, starting at 1
    pub uid: u64,
    pub timestamp: DateTime<Utc>,
    pub route: String,
    pub node: String,
    pub kind: TraceKind,
    pub exchange_id: u64,
    /// Sequence header value, if the exchange carried one
    pub sequence: Option<String>,
    /// Body for received events, error message for failures
    pub detail: String,
}

impl TraceEvent {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "uid": self.uid,
            "timestamp": self.timestamp.to_rfc3339(),
            "route": self.route,
            "node": self.node,
            "kind": self.kind.to_string(),
            "exchange": self.exchange_id,
            "sequence": self.sequence,
            "detail": self.detail,
        })
    }
}

// "#3 12:00:00.120 orders/sink received exchange 17 (seq 2): B"
impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {}/{} {} exchange {}",
            self.uid,
            self.timestamp.format("%H:%M:%S%.3f"),
            self.route,
            self.node,
            self.kind,
            self.exchange_id
        )?;
        if let Some(sequence) = &self.sequence {
            write!(f, " (seq {})", sequence)?;
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}
