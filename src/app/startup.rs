//! Binary entry point: arguments, configuration, logging, demo run

use super::cli::config::DEFAULT_LOG_LEVEL;
use super::cli::{Args, FileConfig, Settings};
use super::demo::{run_demo, DemoReport};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::{init_logging, reconfigure_logging};
use clap::Parser;
use colored::Colorize;
use std::io::IsTerminal;
use std::process::ExitCode;

/// Initialize application startup and run the demo
///
/// Logging starts from the command line alone so that configuration
/// problems are reported through it; the level from the configuration file
/// is applied once the file has been merged. The process exit code is the
/// one the loop returned, clamped to the portable `0..=255` range.
pub fn startup() -> ExitCode {
    let args = Args::parse();

    let use_color = args.use_color(std::io::stdout().is_terminal());
    colored::control::set_override(use_color);

    let log_file = args
        .log_file
        .as_ref()
        .map(|path| path.to_string_lossy().into_owned());
    if let Err(e) = init_logging(
        Some(args.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)),
        args.log_format.as_deref(),
        log_file.as_deref(),
        use_color,
    ) {
        eprintln!("{} failed to initialise logging: {}", "error:".red().bold(), e);
        return ExitCode::FAILURE;
    }

    let settings = match FileConfig::load(args.config_file.as_deref())
        .and_then(|file_config| Settings::resolve(&args, &file_config))
    {
        Ok(settings) => settings,
        Err(e) => {
            log_error_with_context(&e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    if args.log_level.is_none() && settings.log_level != DEFAULT_LOG_LEVEL {
        if let Err(e) = reconfigure_logging(&settings.log_level) {
            log::warn!("Ignoring log level '{}' from configuration: {}", settings.log_level, e);
        }
    }

    log::info!("loopbus {} starting", env!("CARGO_PKG_VERSION"));
    log::debug!("Resolved settings: {:?}", settings);

    match run_demo(&settings.demo) {
        Ok(report) => {
            print_report(&report);
            if !report.is_consistent() {
                log::error!("Delivery check failed for loop '{}'", report.loop_id);
                return ExitCode::FAILURE;
            }
            exit_code(report.exit_code)
        }
        Err(e) => {
            log_error_with_context(&e, "Message loop demo failed");
            ExitCode::FAILURE
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    match u8::try_from(code) {
        Ok(code) => ExitCode::from(code),
        Err(_) => {
            log::warn!("Exit code {} is outside 0..=255; reporting failure", code);
            ExitCode::FAILURE
        }
    }
}

fn print_report(report: &DemoReport) {
    println!(
        "{} {} ({} messages in {:.1?})",
        "Loop".bold(),
        report.loop_id.cyan(),
        report.sent,
        report.elapsed
    );
    for (name, delivered) in &report.delivered {
        let count = if *delivered == report.sent as u64 {
            delivered.to_string().green()
        } else {
            delivered.to_string().red()
        };
        println!("  {:<14} {}", name, count);
    }
    println!(
        "  {:<14} {}",
        "out of order",
        if report.out_of_order == 0 {
            "0".green()
        } else {
            report.out_of_order.to_string().red()
        }
    );
    println!(
        "  {:<14} {} dispatched, {} handled, {} failures, {} rejected",
        "stats",
        report.stats.dispatched,
        report.stats.handled,
        report.stats.observer_failures,
        report.stats.rejected_sends
    );
    println!("  {:<14} {}", "exit code", report.exit_code.to_string().yellow());
}
