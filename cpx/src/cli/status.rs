// cpx/src/cli/status.rs
//! Renders scheduler events as a progress bar and prints the final report.
use std::thread::{self, JoinHandle};
use std::time::Duration;

use colored::Colorize;
use cpx_common::pipeline::{RunReport, SchedulerEvent};
use crossbeam_channel::Receiver;
use indicatif::{ProgressBar, ProgressStyle};

/// Creates and configures a default spinner.
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue.bold} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Consumes events until every sender is gone. The bar stays hidden when
/// `show_bar` is false, failures are still printed.
pub fn spawn_progress(events: Receiver<SchedulerEvent>, show_bar: bool) -> JoinHandle<()> {
    thread::spawn(move || {
        let pb = if show_bar {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.blue.bold} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
        );

        for event in events {
            match event {
                SchedulerEvent::RunStarted { total, .. } => {
                    pb.set_length(total as u64);
                    pb.enable_steady_tick(Duration::from_millis(100));
                }
                SchedulerEvent::TaskDispatched { .. } => {}
                SchedulerEvent::TaskStarted { name } => pb.set_message(name),
                SchedulerEvent::TaskSucceeded { .. } => pb.inc(1),
                SchedulerEvent::TaskFailed { name, error } => {
                    pb.suspend(|| {
                        eprintln!("{} {}: {}", "✗".red().bold(), name.bold(), error);
                    });
                    pb.inc(1);
                }
                SchedulerEvent::RunFinished { .. } => pb.finish_and_clear(),
            }
        }
    })
}

pub fn print_report(report: &RunReport) {
    let secs = report.elapsed.as_secs_f64();
    if report.is_success() {
        println!(
            "{}{}",
            "==> ".bold().blue(),
            format!(
                "Installed {} package(s) in {:.1}s",
                report.succeeded.len(),
                secs
            )
            .bold()
        );
        return;
    }

    println!(
        "{}{}",
        "==> ".bold().blue(),
        format!(
            "Installed {} package(s), {} failed in {:.1}s",
            report.succeeded.len(),
            report.failures.len(),
            secs
        )
        .bold()
    );
    for failure in &report.failures {
        println!("  {} {}: {}", "✗".red().bold(), failure.name, failure.error);
    }
}
