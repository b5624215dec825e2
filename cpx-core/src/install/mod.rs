// cpx-core/src/install/mod.rs
//! The unit of work run once per resolved package.

use cpx_common::dependency::PackageNode;
use cpx_common::error::Result;

pub mod command;
pub mod dry_run;

pub use command::CommandInstaller;
pub use dry_run::DryRunInstaller;

/// Installs a single resolved package. Called from worker threads, at most
/// once per package per run; a failure is reported back and never stops other
/// tasks.
pub trait Installer: Send + Sync {
    fn install(&self, node: &PackageNode) -> Result<()>;
}

impl<F> Installer for F
where
    F: Fn(&PackageNode) -> Result<()> + Send + Sync,
{
    fn install(&self, node: &PackageNode) -> Result<()> {
        self(node)
    }
}
