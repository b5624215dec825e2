// cpx/src/cli.rs
//! Command-line argument structure.
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};
use cpx_common::config::Config;
use cpx_common::error::Result;

pub mod install;
pub mod resolve;
pub mod status;

use crate::cli::install::InstallArgs;
use crate::cli::resolve::ResolveArgs;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, name = "cpx", bin_name = "cpx")]
#[command(propagate_version = true)]
pub struct CliArgs {
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write logs to a daily rotated cpx.log in this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the manifest and install every package in parallel
    Install(InstallArgs),
    /// Resolve the manifest and print the dependency graph
    Resolve(ResolveArgs),
}

impl Command {
    /// Returns `Ok(false)` when the command ran but some work failed.
    pub fn run(&self, config: Config, verbose: u8) -> Result<bool> {
        match self {
            Self::Install(command) => command.run(config, verbose),
            Self::Resolve(command) => command.run(config),
        }
    }
}

/// Where requirements come from and how the registry is reached.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Path to the cpanfile [default: ./cpanfile]
    pub manifest: Option<PathBuf>,

    #[arg(short = 'm', long = "manifest", value_name = "PATH", conflicts_with = "manifest")]
    pub manifest_flag: Option<PathBuf>,

    /// Cache registry responses on disk
    #[arg(long)]
    pub cache: bool,

    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Registry API base URL
    #[arg(long, value_name = "URL")]
    pub registry: Option<String>,

    /// Module names to never resolve or install (repeatable, comma separated)
    #[arg(long, value_name = "MODULE", value_delimiter = ',')]
    pub ignore: Vec<String>,
}

impl SourceArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = self.manifest.as_ref().or(self.manifest_flag.as_ref()) {
            config.manifest_path = path.clone();
        }
        if self.cache {
            config.use_cache = true;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        if let Some(url) = &self.registry {
            config.registry_url = url.trim_end_matches('/').to_string();
        }
        config.extra_ignores.extend(self.ignore.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_flags_parse() {
        let args = CliArgs::try_parse_from([
            "cpx",
            "-vv",
            "install",
            "deps/cpanfile",
            "-w",
            "8",
            "--cache",
            "--ignore",
            "Moose,Moo",
            "--ignore",
            "DBI",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(args.verbose, 2);
        let Command::Install(install) = args.command else {
            panic!("expected install");
        };
        assert_eq!(install.workers, Some(8));
        assert!(install.dry_run);

        let mut config = Config::default();
        install.apply(&mut config);
        assert_eq!(config.manifest_path, PathBuf::from("deps/cpanfile"));
        assert_eq!(config.worker_count, 8);
        assert!(config.use_cache);
        assert_eq!(config.extra_ignores, vec!["Moose", "Moo", "DBI"]);
    }

    #[test]
    fn manifest_can_be_given_as_flag() {
        let args = CliArgs::try_parse_from(["cpx", "resolve", "-m", "other/cpanfile"]).unwrap();
        let Command::Resolve(resolve) = args.command else {
            panic!("expected resolve");
        };
        let mut config = Config::default();
        resolve.source.apply(&mut config);
        assert_eq!(config.manifest_path, PathBuf::from("other/cpanfile"));
    }

    #[test]
    fn resolve_defaults_keep_config() {
        let args = CliArgs::try_parse_from(["cpx", "resolve", "--json"]).unwrap();
        let Command::Resolve(resolve) = args.command else {
            panic!("expected resolve");
        };
        assert!(resolve.json);

        let mut config = Config::default();
        resolve.source.apply(&mut config);
        assert_eq!(config.manifest_path, Config::default().manifest_path);
        assert!(!config.use_cache);
    }
}
