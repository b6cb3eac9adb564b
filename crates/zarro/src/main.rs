//! zarro - task runner for .NET projects

mod cli;
mod exit_codes;

use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use zarro_core::env::known::{DEBUG, ZARRO_DEBUG};
use zarro_core::EnvironmentRegistry;

use cli::Cli;

fn main() {
    let cli = Cli::parse();
    let guard = init_tracing(cli.verbose, cli.quiet);

    let code = match cli.execute() {
        Ok(code) => code,
        Err(err) => {
            report_error(&err);
            exit_codes::for_error(&err)
        }
    };

    // process::exit skips destructors; flush the file log first
    drop(guard);
    std::process::exit(code);
}

/// Print an error that ended the run. Errors raised by zarro itself print
/// their whole cause chain; anything else prints its top-level message
/// unless DEBUG or ZARRO_DEBUG is set.
fn report_error(err: &anyhow::Error) {
    let env = EnvironmentRegistry::new();
    let debug = env.resolve_flag(ZARRO_DEBUG) || env.resolve_flag(DEBUG);

    let message = if debug {
        format!("{:?}", err)
    } else if exit_codes::is_internal(err) {
        format!("{:#}", err)
    } else {
        err.to_string()
    };
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Set up tracing with two layers:
/// - Console: controlled by RUST_LOG (default: warn, debug with -v)
/// - File: always debug-level JSON to ~/.zarro/logs/
fn init_tracing(
    verbose: bool,
    quiet: bool,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_level = match (verbose, quiet) {
        (true, _) => "debug",
        (false, true) => "error",
        (false, false) => "warn",
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(log_dir) = log_directory() {
        let file_appender = tracing_appender::rolling::daily(&log_dir, "zarro.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_filter(console_filter),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_target(true)
                    .with_filter(EnvFilter::new("debug")),
            )
            .init();

        return Some(guard);
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .init();

    None
}

/// Returns the log directory path, creating it if needed.
fn log_directory() -> Option<std::path::PathBuf> {
    let log_dir = dirs::home_dir()?.join(".zarro").join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;
    Some(log_dir)
}
