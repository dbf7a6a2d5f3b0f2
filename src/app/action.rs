use log::info;

use crate::error::{PortsError, Result};
use crate::platform::{CommandRunner, CommandSpec};

/// Send one terminate signal to `pid` through the elevated `kill` command.
///
/// PID 0 is refused: `kill 0` would signal our own process group.
pub fn stop_process(runner: &dyn CommandRunner, pid: u32) -> Result<()> {
    if pid == 0 {
        return Err(PortsError::InvalidPid(pid));
    }
    runner.run(&CommandSpec::kill(pid), true)?;
    info!("sent SIGTERM to process {}", pid);
    Ok(())
}
