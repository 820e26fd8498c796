//! CLI argument parsing tests

use clap::{CommandFactory, Parser};
use seqroute::app::cli::args::*;
use std::path::PathBuf;

#[test]
fn test_command_definition_is_consistent() {
    Args::command().debug_assert();
}

#[test]
fn test_short_and_long_forms_agree() {
    let short = Args::try_parse_from([
        "seqroute", "-c", "route.toml", "-n", "10", "-w", "3", "-b", "5", "-t", "100",
    ])
    .unwrap();
    let long = Args::try_parse_from([
        "seqroute",
        "--config-file=route.toml",
        "--count=10",
        "--consumers=3",
        "--capacity=5",
        "--timeout-ms=100",
    ])
    .unwrap();

    for args in [&short, &long] {
        assert_eq!(args.config_file, Some(PathBuf::from("route.toml")));
        assert_eq!(args.count, Some(10));
        assert_eq!(args.consumers, Some(3));
        assert_eq!(args.capacity, Some(5));
        assert_eq!(args.timeout_ms, Some(100));
    }
}

#[test]
fn test_unknown_flag_rejected() {
    let err = Args::try_parse_from(["seqroute", "--repo", "."]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
}

#[test]
fn test_version_flag() {
    let err = Args::try_parse_from(["seqroute", "--version"]).unwrap_err();
    assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
}

#[test]
fn test_negative_count_rejected() {
    assert!(Args::try_parse_from(["seqroute", "--count", "-5"]).is_err());
    assert!(Args::try_parse_from(["seqroute", "--queue-size", "0"]).is_err());
    assert!(Args::try_parse_from(["seqroute", "--drop-every", "0"]).is_err());
}

#[test]
fn test_flags_default_off() {
    let args = Args::try_parse_from(["seqroute"]).unwrap();

    assert!(!args.trace);
    assert!(!args.block_when_full);
    assert!(!args.color);
    assert!(!args.no_color);
    assert!(args.config_file.is_none());
}
