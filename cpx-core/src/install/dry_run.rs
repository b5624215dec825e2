// cpx-core/src/install/dry_run.rs
use cpx_common::dependency::PackageNode;
use cpx_common::error::Result;
use tracing::info;

use super::Installer;

/// Logs what would be installed and reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunInstaller;

impl Installer for DryRunInstaller {
    fn install(&self, node: &PackageNode) -> Result<()> {
        if node.version_constraint.is_empty() {
            info!("would install {} from {}", node.name, node.download_url);
        } else {
            info!(
                "would install {} ({}) from {}",
                node.name, node.version_constraint, node.download_url
            );
        }
        Ok(())
    }
}
