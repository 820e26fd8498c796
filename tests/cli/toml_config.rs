//! CLI TOML configuration tests
//!
//! Configuration files are written to temporary directories and loaded the
//! same way the binary loads them.

use clap::Parser;
use seqroute::app::cli::args::Args;
use seqroute::app::cli::config::{ConfigError, RouteSettings};
use seqroute::core::error_handling::ContextualError;
use seqroute::resequencer::{DuplicatePolicy, StopPolicy};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_load_full_file() {
    let file = write_config(
        r#"
schema-version = 1
log-level = "debug"
log-format = "ext"
color = false

[route]
name = "orders"
count = 200
drop-every = 17
trace = true

[resequencer]
capacity = 50
timeout-ms = 250
duplicate-policy = "overwrite"
stop-policy = "discard"
sequence-header = "position"

[seda]
size = 100
concurrent-consumers = 4
block-when-full = true
offer-timeout-ms = 500
"#,
    );

    let (settings, path) = RouteSettings::load(Some(file.path())).await.unwrap();

    assert_eq!(path.as_deref(), Some(file.path()));
    assert_eq!(settings.log_level.as_deref(), Some("debug"));
    assert_eq!(settings.color, Some(false));
    assert_eq!(settings.route.name, "orders");
    assert_eq!(settings.route.drop_every, Some(17));
    assert!(settings.route.trace);
    assert_eq!(settings.resequencer.capacity, 50);
    assert_eq!(settings.resequencer.duplicate_policy, DuplicatePolicy::Overwrite);
    assert_eq!(settings.resequencer.stop_policy, StopPolicy::Discard);
    assert_eq!(settings.resequencer.sequence_header, "position");
    assert_eq!(settings.seda.size, Some(100));
    assert_eq!(settings.seda.concurrent_consumers, 4);
    assert!(settings.seda.block_when_full);
    assert!(settings.validate().is_ok());
}

#[tokio::test]
async fn test_missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let err = RouteSettings::load(Some(&missing)).await.unwrap_err();
    assert!(err.is_user_actionable());
    assert!(err.to_string().contains("does not exist"), "got: {}", err);
}

#[tokio::test]
async fn test_parse_error_names_file() {
    let file = write_config("[resequencer]\ncapacity = \"many\"\n");

    let err = RouteSettings::load(Some(file.path())).await.unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
    assert!(err
        .to_string()
        .contains(&file.path().display().to_string()));
}

#[tokio::test]
async fn test_command_line_overrides_file() {
    let file = write_config(
        r#"
[route]
count = 200

[resequencer]
capacity = 50
timeout-ms = 250

[seda]
concurrent-consumers = 4
"#,
    );
    let (mut settings, _) = RouteSettings::load(Some(file.path())).await.unwrap();
    let args = Args::try_parse_from(["seqroute", "--capacity", "7", "--consumers", "2"]).unwrap();

    settings.apply_args(&args).unwrap();

    assert_eq!(settings.route.count, 200);
    assert_eq!(settings.resequencer.capacity, 7);
    assert_eq!(settings.resequencer.timeout_ms, 250);
    assert_eq!(settings.seda.concurrent_consumers, 2);
}

#[tokio::test]
async fn test_invalid_values_fail_validation() {
    let file = write_config("[resequencer]\ncapacity = 0\n");
    let (settings, _) = RouteSettings::load(Some(file.path())).await.unwrap();

    let err = settings.validate().unwrap_err();
    assert_eq!(
        err.user_message(),
        Some("'resequencer.capacity' must be greater than 0")
    );
}
