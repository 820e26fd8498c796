//! Validation utilities for route settings
//!
//! Used both as clap value parsers for CLI flags and by the configuration
//! loader when checking values read from a TOML file.

/// Validate positive integer value
pub fn validate_positive_int(value: &str) -> Result<usize, String> {
    match value.trim().parse::<usize>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Validate a named setting that must be non-zero
pub fn require_non_zero(name: &str, value: u64) -> Result<u64, String> {
    if value == 0 {
        Err(format!("'{}' must be greater than 0", name))
    } else {
        Ok(value)
    }
}

/// Validate a header name used to carry sequence numbers
pub fn validate_header_name(name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Header name cannot be empty".to_string());
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(format!("Header name '{}' cannot contain whitespace", trimmed));
    }
    Ok(trimmed.to_string())
}
