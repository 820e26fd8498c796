//! SEDA endpoint configuration
//!
//! Deserialised from the `[seda]` table of a route configuration file.

use crate::core::validation::require_non_zero;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct SedaConfig {
    /// Queue bound; unbounded when absent
    pub size: Option<usize>,
    /// Number of worker threads polling the queue
    pub concurrent_consumers: usize,
    pub poll_timeout_ms: u64,
    /// Block producers on a full queue instead of failing the submit
    pub block_when_full: bool,
    /// Upper bound on a blocking submit; waits indefinitely when absent
    pub offer_timeout_ms: Option<u64>,
    /// How long a stopping worker may wait to requeue a polled exchange
    pub shutdown_grace_ms: u64,
}

impl Default for SedaConfig {
    fn default() -> Self {
        Self {
            size: None,
            concurrent_consumers: 1,
            poll_timeout_ms: 1000,
            block_when_full: false,
            offer_timeout_ms: None,
            shutdown_grace_ms: 5000,
        }
    }
}

impl SedaConfig {
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn offer_timeout(&self) -> Option<Duration> {
        self.offer_timeout_ms.map(Duration::from_millis)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(size) = self.size {
            require_non_zero("seda.size", size as u64)?;
        }
        require_non_zero("seda.concurrent-consumers", self.concurrent_consumers as u64)?;
        require_non_zero("seda.poll-timeout-ms", self.poll_timeout_ms)?;
        require_non_zero("seda.shutdown-grace-ms", self.shutdown_grace_ms)?;
        if let Some(timeout) = self.offer_timeout_ms {
            require_non_zero("seda.offer-timeout-ms", timeout)?;
        }
        Ok(())
    }
}
