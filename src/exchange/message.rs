//! Exchange type carried through routes
//!
//! An exchange has a fixed identity assigned on creation, string headers used
//! for routing decisions (such as the sequence number read by the resequencer)
//! and a string body. Exchanges move between stages by value, so only the stage
//! currently holding one can mutate it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

static NEXT_EXCHANGE_ID: AtomicU64 = AtomicU64::new(1);

/// Unit of work flowing through a route
///
/// # Example
///
/// ```rust
/// use seqroute::exchange::Exchange;
///
/// let exchange = Exchange::new("order #42").with_header("seqno", 42);
/// assert_eq!(exchange.header("seqno"), Some("42"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    id: u64,
    created: SystemTime,
    /// Routing metadata
    pub headers: BTreeMap<String, String>,
    /// Payload (application-specific data)
    pub body: String,
}

impl Exchange {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            id: NEXT_EXCHANGE_ID.fetch_add(1, Ordering::Relaxed),
            created: SystemTime::now(),
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    /// Builder-style header setter
    pub fn with_header(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl ToString) {
        self.headers.insert(name.into(), value.to_string());
    }

    pub fn remove_header(&mut self, name: &str) -> Option<String> {
        self.headers.remove(name)
    }
}
