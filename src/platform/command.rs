use std::fmt;
use std::path::Path;
use std::process::{Command, Stdio};

use log::debug;

use super::{CommandRunner, Elevator};
use crate::error::CommandError;

/// pkexec exit status when the authentication dialog was dismissed.
const EXIT_DISMISSED: i32 = 126;
/// pkexec exit status when authorization could not be obtained.
const EXIT_NOT_AUTHORIZED: i32 = 127;

/// Diagnostics helpers print when the target program does not exist
/// (`pkexec`: "Cannot run program netstat: No such file or directory",
/// `sudo`: "sudo: netstat: command not found").
const MISSING_PROGRAM_MARKERS: [&str; 2] = ["No such file or directory", "command not found"];

/// A program plus its arguments, resolved through `PATH` at invocation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn netstat_privileged() -> Self {
        Self::new("netstat", ["-plntu"])
    }

    pub fn netstat_unprivileged() -> Self {
        Self::new("netstat", ["-tun"])
    }

    pub fn ss() -> Self {
        Self::new("ss", ["-tuan"])
    }

    /// Default (SIGTERM) signal to one process.
    pub fn kill(pid: u32) -> Self {
        Self::new("kill", [pid.to_string()])
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Spawn `program`, drain stdout and stderr to completion, and map the outcome.
fn execute(program: &str, args: &[String], stdin: Stdio) -> Result<String, CommandError> {
    let output = Command::new(program)
        .args(args)
        .stdin(stdin)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CommandError::NotFound(program.to_string())
            } else {
                CommandError::Io(e)
            }
        })?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(CommandError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn is_missing_program(stderr: &str) -> bool {
    MISSING_PROGRAM_MARKERS
        .iter()
        .any(|marker| stderr.contains(marker))
}

/// Runs commands directly, or through an [`Elevator`] when elevation is
/// requested and the current user is not already root.
pub struct SystemRunner {
    elevator: Box<dyn Elevator>,
    is_superuser: bool,
}

impl SystemRunner {
    pub fn new(elevator: Box<dyn Elevator>, is_superuser: bool) -> Self {
        Self {
            elevator,
            is_superuser,
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, command: &CommandSpec, elevate: bool) -> Result<String, CommandError> {
        if elevate && !self.is_superuser {
            debug!("running `{}` through the elevation helper", command);
            return self.elevator.elevate(command);
        }
        debug!("running `{}`", command);
        execute(&command.program, &command.args, Stdio::null())
    }
}

/// Elevation through an external helper such as `pkexec` or `sudo`.
pub struct HelperElevator {
    helper: String,
}

impl HelperElevator {
    pub fn new(helper: impl Into<String>) -> Self {
        Self {
            helper: helper.into(),
        }
    }

    /// Helpers report refused or cancelled authentication either through the
    /// pkexec exit statuses or a diagnostic prefixed with their own name
    /// (`sudo: a password is required`).
    fn is_auth_failure(&self, exit_code: Option<i32>, stderr: &str) -> bool {
        if matches!(exit_code, Some(EXIT_DISMISSED) | Some(EXIT_NOT_AUTHORIZED)) {
            return true;
        }
        let name = Path::new(&self.helper)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.helper.clone());
        let prefix = format!("{}:", name);
        stderr.lines().any(|line| line.trim_start().starts_with(&prefix))
    }
}

impl Elevator for HelperElevator {
    fn elevate(&self, command: &CommandSpec) -> Result<String, CommandError> {
        let mut args = Vec::with_capacity(command.args.len() + 1);
        args.push(command.program.clone());
        args.extend(command.args.iter().cloned());

        // The helper may prompt on the terminal, so it keeps our stdin.
        match execute(&self.helper, &args, Stdio::inherit()) {
            // Checked first: a missing target also exits 127 with a `helper:` line.
            Err(CommandError::ExecutionFailed { stderr, .. }) if is_missing_program(&stderr) => {
                debug!("{} could not find `{}`: {}", self.helper, command.program, stderr.trim());
                Err(CommandError::NotFound(command.program.clone()))
            }
            Err(CommandError::ExecutionFailed { exit_code, stderr })
                if self.is_auth_failure(exit_code, &stderr) =>
            {
                debug!(
                    "{} refused `{}` (exit {:?}): {}",
                    self.helper,
                    command,
                    exit_code,
                    stderr.trim()
                );
                Err(CommandError::AuthFailed)
            }
            other => other,
        }
    }
}
