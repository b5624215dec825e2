// cpx-core/src/pipeline/mod.rs
mod engine;
pub mod scheduler;
mod worker;

pub use scheduler::Scheduler;
