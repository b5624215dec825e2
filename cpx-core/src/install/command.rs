// cpx-core/src/install/command.rs
use std::path::PathBuf;
use std::process::{Command, Stdio};

use cpx_common::dependency::PackageNode;
use cpx_common::error::{CpxError, Result};
use tracing::{debug, instrument};

use super::Installer;

const STDERR_TAIL_LINES: usize = 20;

/// Runs an external installer (by default `cpanm`) once per package.
///
/// `{name}` and `{url}` in the argument list are replaced with the package
/// name and its download URL. Without placeholders the download URL (or the
/// name, when the registry gave no URL) is appended as the last argument.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandInstaller {
    pub fn from_command_line(command_line: &str) -> Result<Self> {
        let mut parts = command_line.split_whitespace();
        let program_name = parts
            .next()
            .ok_or_else(|| CpxError::Config("install command is empty".to_string()))?;
        let program = which::which(program_name).map_err(|e| {
            CpxError::Config(format!(
                "install program '{program_name}' not found on PATH: {e}"
            ))
        })?;
        debug!("Using install program {}", program.display());
        Ok(Self {
            program,
            args: parts.map(str::to_string).collect(),
        })
    }

    fn arguments_for(&self, node: &PackageNode) -> Vec<String> {
        let target = if node.download_url.is_empty() {
            node.name.as_str()
        } else {
            node.download_url.as_str()
        };
        let has_placeholder = self
            .args
            .iter()
            .any(|a| a.contains("{name}") || a.contains("{url}"));

        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|a| a.replace("{name}", &node.name).replace("{url}", target))
            .collect();
        if !has_placeholder {
            args.push(target.to_string());
        }
        args
    }
}

impl Installer for CommandInstaller {
    #[instrument(skip_all, fields(package = %node.name))]
    fn install(&self, node: &PackageNode) -> Result<()> {
        let args = self.arguments_for(node);
        debug!("Running {} {:?}", self.program.display(), args);

        let output = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                CpxError::InstallError(format!(
                    "failed to start {} for '{}': {e}",
                    self.program.display(),
                    node.name
                ))
            })?;

        if output.status.success() {
            debug!("Installed '{}'", node.name);
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
        Err(CpxError::InstallError(format!(
            "'{}' failed ({}): {}",
            node.name,
            output.status,
            tail.trim()
        )))
    }
}
