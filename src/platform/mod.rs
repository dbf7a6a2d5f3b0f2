use std::collections::HashMap;

use crate::error::CommandError;
use crate::model::{ProcessSnapshot, SnapshotFields};

pub mod command;
pub mod process;

pub use command::{CommandSpec, HelperElevator, SystemRunner};
pub use process::{attach_snapshots, SysinfoEnricher};

/// Runs an external diagnostic command and returns its captured stdout.
///
/// A nonzero exit is a `CommandError`, never a panic.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &CommandSpec, elevate: bool) -> Result<String, CommandError>;
}

/// Re-invokes a command with superuser rights, prompting out-of-band.
pub trait Elevator: Send + Sync {
    fn elevate(&self, command: &CommandSpec) -> Result<String, CommandError>;
}

/// Snapshots every visible process once per refresh.
pub trait ProcessEnricher: Send + Sync {
    fn snapshot_all(&self, fields: SnapshotFields) -> HashMap<u32, ProcessSnapshot>;
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Elevation helper invoked as `<helper> <command...>`.
    pub elevator: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            elevator: "pkexec".to_string(),
        }
    }
}

pub fn is_superuser() -> bool {
    nix::unistd::geteuid().is_root()
}

pub fn create_runner(config: RunnerConfig) -> Box<dyn CommandRunner> {
    let elevator = HelperElevator::new(config.elevator);
    Box::new(SystemRunner::new(Box::new(elevator), is_superuser()))
}

pub fn create_enricher() -> Box<dyn ProcessEnricher> {
    Box::new(SysinfoEnricher::new())
}
