// cpx/src/main.rs
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use colored::Colorize;
use cpx_common::config::Config;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::CliArgs;

fn main() {
    let cli_args = CliArgs::parse();

    let log_dir = cli_args
        .log_dir
        .clone()
        .or_else(|| env::var_os("CPX_LOG_DIR").map(PathBuf::from));
    init_logging(cli_args.verbose, log_dir);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            process::exit(1);
        }
    };

    match cli_args.command.run(config, cli_args.verbose) {
        Ok(true) => debug!("Command completed successfully."),
        Ok(false) => {
            debug!("Command completed with failed tasks.");
            process::exit(1);
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8, log_dir: Option<PathBuf>) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("CPX_LOG")
        .from_env_lossy();

    let Some(log_dir) = log_dir else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    };

    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "{} Failed to create log directory {}: {}",
            "Warning:".yellow().bold(),
            log_dir.display(),
            e
        );
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "cpx.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);
    let stderr_writer = std::io::stderr.with_max_level(max_log_level);
    let file_writer = non_blocking_appender.with_max_level(max_log_level);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(stderr_writer.and(file_writer))
        .with_ansi(true)
        .without_time()
        .try_init();

    // The guard flushes the file writer; it has to outlive every log call.
    Box::leak(Box::new(guard));

    debug!("Writing logs to: {}/cpx.log", log_dir.display());
}
