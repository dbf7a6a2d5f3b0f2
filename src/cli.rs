use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::app::AcquisitionConfig;
use crate::model::SnapshotFields;
use crate::parser::Dialect;
use crate::platform::RunnerConfig;

#[derive(Parser, Debug)]
#[command(
    name = "portsinfo",
    version,
    about = "List listening and connected sockets with their owning processes"
)]
pub struct CliArgs {
    /// Case-insensitive filter on protocol, port or process name
    #[arg(short = 's', long = "search", value_name = "TEXT")]
    pub search: Option<String>,

    /// Only show sockets of this protocol family
    #[arg(short = 'i', long = "inet", value_name = "FAMILY")]
    pub family: Option<FamilyArg>,

    /// Repeat mode interval in seconds
    #[arg(short = 'r', long = "repeat", value_name = "SECONDS")]
    pub repeat: Option<u64>,

    /// Terse output: unique local ports only
    #[arg(short = 't')]
    pub terse: bool,

    /// Field output mode (specify field characters)
    #[arg(short = 'F', value_name = "FIELDS")]
    pub field_output: Option<String>,

    /// Print process details under each socket
    #[arg(short = 'x', long = "details")]
    pub details: bool,

    /// Never ask for administrative rights; use ss/netstat as the current user
    #[arg(long = "no-elevate")]
    pub no_elevate: bool,

    /// Program used to run netstat and kill with administrative rights
    #[arg(long = "elevator", value_name = "PROGRAM", default_value = "pkexec")]
    pub elevator: String,

    /// Send SIGTERM to PID with administrative rights and exit
    #[arg(long = "stop", value_name = "PID", conflicts_with_all = ["replay", "repeat"])]
    pub stop: Option<u32>,

    /// Parse previously captured command output instead of running a command
    #[arg(long = "replay", value_name = "FILE", requires = "dialect")]
    pub replay: Option<PathBuf>,

    /// Output shape of the file given to --replay
    #[arg(long = "dialect", value_name = "DIALECT", requires = "replay")]
    pub dialect: Option<DialectArg>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectArg {
    /// `netstat -plntu` run as root
    NetstatPrivileged,
    /// `netstat -tun`
    Netstat,
    /// `ss -tuan`
    Ss,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::NetstatPrivileged => Dialect::NetstatPrivileged,
            DialectArg::Netstat => Dialect::NetstatUnprivileged,
            DialectArg::Ss => Dialect::Ss,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FamilyArg {
    Tcp,
    Udp,
}

impl CliArgs {
    pub fn acquisition_config(&self) -> AcquisitionConfig {
        // Gather only what gets printed; CPU sampling costs a full sysinfo interval.
        let wants_user = self
            .field_output
            .as_deref()
            .is_some_and(|fields| fields.contains('u'));
        let fields = if self.details {
            SnapshotFields::all()
        } else {
            SnapshotFields {
                user: wants_user,
                ..SnapshotFields::none()
            }
        };
        AcquisitionConfig {
            allow_elevation: !self.no_elevate,
            fields,
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            elevator: self.elevator.clone(),
        }
    }

    /// Log filter implied by `-v`, used when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
