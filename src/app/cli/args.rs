//! Command line arguments for the `loopbus` binary
//!
//! Every option is optional so that values from the configuration file can
//! fill the gaps; see [`crate::app::cli::config`] for the merge order.

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "loopbus")]
#[command(about = "Drive a named message loop with concurrent producers")]
#[command(version, long_version = crate::core::version::long_version())]
pub struct Args {
    /// Number of producer threads
    #[arg(short = 'p', long = "producers", value_name = "COUNT")]
    pub producers: Option<usize>,

    /// Messages sent by each producer
    #[arg(short = 'm', long = "messages", value_name = "COUNT")]
    pub messages: Option<usize>,

    /// Number of observers registered with the loop
    #[arg(short = 'O', long = "observers", value_name = "COUNT")]
    pub observers: Option<usize>,

    /// Exit code requested from the loop when the demo finishes
    #[arg(short = 'x', long = "exit-code", value_name = "CODE")]
    pub exit_code: Option<i32>,

    /// Upper bound for each drain, in milliseconds
    #[arg(long = "drain-timeout-ms", value_name = "MILLIS")]
    pub drain_timeout_ms: Option<u64>,

    /// Configuration file path
    #[arg(short = 'c', long = "config-file", visible_alias = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Force coloured output
    #[arg(long = "color", conflicts_with = "no_color")]
    pub color: bool,

    /// Disable coloured output
    #[arg(long = "no-color", conflicts_with = "color")]
    pub no_color: bool,

    /// Log level
    #[arg(short = 'l', long = "log-level", value_name = "LEVEL", value_parser = ["trace", "debug", "info", "warn", "error", "off"])]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(short = 'o', long = "log-format", value_name = "FORMAT", value_parser = ["text", "ext", "json"])]
    pub log_format: Option<String>,

    /// Log file path
    #[arg(short = 'f', long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

impl Args {
    /// Resolve colour output: explicit flags win, otherwise follow the terminal
    pub fn use_color(&self, is_terminal: bool) -> bool {
        if self.no_color {
            false
        } else {
            self.color || is_terminal
        }
    }
}
