//! Resequencer configuration
//!
//! Deserialised from the `[resequencer]` table of a route configuration file.
//! Keys use kebab-case, durations are milliseconds.

use crate::core::validation::{require_non_zero, validate_header_name};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use strum_macros::{Display, EnumString};

/// What to do when an element arrives with a key that is already buffered
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Refuse the newer element with `DuplicateKey`
    #[default]
    Reject,
    /// Replace the buffered element, keeping its original arrival time
    Overwrite,
}

/// What happens to buffered elements when the resequencer stops
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StopPolicy {
    /// Forward everything still buffered in key order, ignoring gaps
    #[default]
    Flush,
    /// Drop everything still buffered (the count is logged)
    Discard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResequencerConfig {
    /// Maximum number of buffered elements before producers wait
    pub capacity: usize,
    /// Gap timeout and delivery interval in milliseconds
    pub timeout_ms: u64,
    pub duplicate_policy: DuplicatePolicy,
    /// Reject elements at or below the last delivered key on insert
    pub reject_old: bool,
    /// Drop elements without a sequence key instead of failing the insert
    pub ignore_invalid: bool,
    pub stop_policy: StopPolicy,
    /// Seed for the last-delivered cursor; the element after it is delivered immediately
    pub initial_sequence: Option<i64>,
    /// Header carrying the sequence number on exchanges
    pub sequence_header: String,
}

impl Default for ResequencerConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            timeout_ms: 1000,
            duplicate_policy: DuplicatePolicy::default(),
            reject_old: false,
            ignore_invalid: false,
            stop_policy: StopPolicy::default(),
            initial_sequence: None,
            sequence_header: "seqno".to_string(),
        }
    }
}

impl ResequencerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        require_non_zero("resequencer.capacity", self.capacity as u64)?;
        require_non_zero("resequencer.timeout-ms", self.timeout_ms)?;
        validate_header_name(&self.sequence_header)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResequencerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.stop_policy, StopPolicy::Flush);
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let config = ResequencerConfig {
            capacity: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate().unwrap_err(),
            "'resequencer.capacity' must be greater than 0"
        );
    }

    #[test]
    fn test_policies_parse_from_kebab_case() {
        assert_eq!(
            DuplicatePolicy::from_str("overwrite").unwrap(),
            DuplicatePolicy::Overwrite
        );
        assert_eq!(StopPolicy::from_str("discard").unwrap(), StopPolicy::Discard);
        assert_eq!(StopPolicy::Flush.to_string(), "flush");
        assert!(StopPolicy::from_str("keep").is_err());
    }

    #[test]
    fn test_deserialize_partial_table() {
        let config: ResequencerConfig = toml::from_str(
            r#"
            capacity = 5
            timeout-ms = 250
            duplicate-policy = "overwrite"
            initial-sequence = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.capacity, 5);
        assert_eq!(config.timeout(), Duration::from_millis(250));
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Overwrite);
        assert_eq!(config.initial_sequence, Some(0));
        assert_eq!(config.sequence_header, "seqno");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result: Result<ResequencerConfig, _> = toml::from_str("batch-size = 10");
        assert!(result.is_err());
    }
}
