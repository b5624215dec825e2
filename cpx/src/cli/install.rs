// cpx/src/cli/install.rs
use std::sync::Arc;

use clap::Args;
use colored::Colorize;
use cpx_common::config::Config;
use cpx_common::error::Result;
use cpx_core::{CommandInstaller, DryRunInstaller, Installer, Scheduler};
use tracing::{debug, instrument};

use super::resolve::resolve_manifest;
use super::status::{print_report, spawn_progress};
use super::SourceArgs;

#[derive(Debug, Args)]
pub struct InstallArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of packages installed at the same time
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Installer command line; the download URL is appended
    #[arg(long, value_name = "CMD")]
    pub install_cmd: Option<String>,

    /// Resolve and schedule, but only log what would be installed
    #[arg(long)]
    pub dry_run: bool,
}

impl InstallArgs {
    pub fn apply(&self, config: &mut Config) {
        self.source.apply(config);
        if let Some(workers) = self.workers {
            config.worker_count = workers;
        }
        if let Some(cmd) = &self.install_cmd {
            config.install_command = cmd.clone();
        }
    }

    /// Everything that can fail on configuration alone, checked before any
    /// registry traffic.
    fn prepare(&self, config: &Config) -> Result<(Arc<dyn Installer>, Scheduler)> {
        config.validate()?;
        let installer: Arc<dyn Installer> = if self.dry_run {
            Arc::new(DryRunInstaller)
        } else {
            Arc::new(CommandInstaller::from_command_line(&config.install_command)?)
        };
        Ok((installer, Scheduler::new(config.worker_count)?))
    }

    #[instrument(skip_all, fields(dry_run = self.dry_run))]
    pub fn run(&self, mut config: Config, verbose: u8) -> Result<bool> {
        self.apply(&mut config);
        let (installer, scheduler) = self.prepare(&config)?;
        let graph = resolve_manifest(&config)?;
        println!(
            "{}{}",
            "==> ".bold().blue(),
            format!(
                "Resolved {} package(s), {} unresolved",
                graph.reachable_count(),
                graph.unresolved().len()
            )
            .bold()
        );

        if graph.is_empty() {
            println!("{}{}", "==> ".bold().blue(), "Nothing to install".bold());
            return Ok(true);
        }

        println!(
            "{}{}",
            "==> ".bold().blue(),
            format!(
                "Installing with {} worker(s)",
                scheduler.worker_limit()
            )
            .bold()
        );

        // Log lines and a live bar fight over stderr, so verbose runs go without.
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let progress = spawn_progress(event_rx, verbose == 0);
        let report = scheduler.with_events(event_tx).run(&graph, installer);
        if progress.join().is_err() {
            debug!("Progress display thread panicked");
        }

        print_report(&report);
        Ok(report.is_success())
    }
}
