// cpx-core/src/lib.rs

pub mod install;
pub mod pipeline;

pub use install::{CommandInstaller, DryRunInstaller, Installer};
pub use pipeline::Scheduler;
