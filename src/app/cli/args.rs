//! Command line arguments for the route runner
//!
//! Every route setting can also come from the TOML configuration file; a
//! flag given on the command line always wins over the file.

use crate::core::validation::validate_positive_int;
use clap::{ArgAction, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    validate_positive_int(value).map(|n| n as u64)
}

// Global arguments structure with all command-line options
#[derive(Parser, Debug, Clone)]
#[command(name = "seqroute")]
#[command(about = "Run a staged route: SEDA workers -> stream resequencer -> console")]
#[command(version, long_version = crate::core::version::long_version())]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Route name used for thread names and log lines
    #[arg(long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// Number of exchanges to produce
    #[arg(short = 'n', long = "count", value_name = "COUNT", value_parser = parse_positive_u64)]
    pub count: Option<u64>,

    /// Skip every Nth sequence number to create permanent gaps
    #[arg(long = "drop-every", value_name = "N", value_parser = parse_positive_u64)]
    pub drop_every: Option<u64>,

    /// SEDA worker threads
    #[arg(
        short = 'w',
        long = "consumers",
        value_name = "COUNT",
        value_parser = validate_positive_int
    )]
    pub consumers: Option<usize>,

    /// SEDA queue bound (unbounded unless set here or in the config file)
    #[arg(
        short = 'q',
        long = "queue-size",
        value_name = "COUNT",
        value_parser = validate_positive_int
    )]
    pub queue_size: Option<usize>,

    /// Block producers on a full SEDA queue instead of rejecting exchanges
    #[arg(long = "block-when-full", action = ArgAction::SetTrue)]
    pub block_when_full: bool,

    /// Resequencer buffer capacity
    #[arg(
        short = 'b',
        long = "capacity",
        value_name = "COUNT",
        value_parser = validate_positive_int
    )]
    pub capacity: Option<usize>,

    /// Resequencer gap timeout in milliseconds
    #[arg(
        short = 't',
        long = "timeout-ms",
        value_name = "MILLIS",
        value_parser = parse_positive_u64
    )]
    pub timeout_ms: Option<u64>,

    /// What to do with buffered exchanges on stop
    #[arg(long = "stop-policy", value_name = "POLICY", value_parser = ["flush", "discard"])]
    pub stop_policy: Option<String>,

    /// Record trace events and print them as JSON lines when the route ends
    #[arg(long = "trace", action = ArgAction::SetTrue)]
    pub trace: bool,

    /// Trace events retained per node
    #[arg(long = "trace-size", value_name = "COUNT", value_parser = validate_positive_int)]
    pub trace_size: Option<usize>,

    /// Force colored output
    #[arg(long = "color", action = ArgAction::SetTrue, conflicts_with = "no_color")]
    pub color: bool,

    /// Disable colored output
    #[arg(long = "no-color", action = ArgAction::SetTrue)]
    pub no_color: bool,

    /// Log level
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "LEVEL",
        value_parser = ["trace", "debug", "info", "warn", "error", "off"]
    )]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(
        short = 'o',
        long = "log-format",
        value_name = "FORMAT",
        value_parser = ["text", "ext", "json"]
    )]
    pub log_format: Option<String>,

    /// Log file path (use 'none' to disable file logging)
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve colour output
    ///
    /// `--no-color` beats `--color`, which beats the config file value;
    /// otherwise colour follows `NO_COLOR` and whether stderr is a terminal.
    pub fn use_color(&self, configured: Option<bool>) -> bool {
        if self.no_color {
            return false;
        }
        if self.color {
            return true;
        }
        configured.unwrap_or_else(|| {
            std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal()
        })
    }

    /// Log file from the command line; `none` or `-` explicitly disables it
    pub fn log_file_override(&self) -> Option<Option<PathBuf>> {
        self.log_file.as_ref().map(|path| {
            let text = path.to_string_lossy();
            if text.eq_ignore_ascii_case("none") || text == "-" {
                None
            } else {
                Some(path.clone())
            }
        })
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config_file: None,
            name: None,
            count: None,
            drop_every: None,
            consumers: None,
            queue_size: None,
            block_when_full: false,
            capacity: None,
            timeout_ms: None,
            stop_policy: None,
            trace: false,
            trace_size: None,
            color: false,
            no_color: false,
            log_level: None,
            log_format: None,
            log_file: None,
        }
    }
}
