use std::fmt;

use crate::parser::Dialect;

/// Unprivileged source that produced the current table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    Ss,
    Netstat,
}

impl Fallback {
    pub fn dialect(self) -> Dialect {
        match self {
            Fallback::Ss => Dialect::Ss,
            Fallback::Netstat => Dialect::NetstatUnprivileged,
        }
    }
}

/// Where the acquisition state machine stands between refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Uninitialized,
    AttemptingPrivileged,
    Privileged,
    Unprivileged(Fallback),
    Failed,
}

impl AcquisitionState {
    pub fn is_privileged(self) -> bool {
        self == AcquisitionState::Privileged
    }
}

impl fmt::Display for AcquisitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquisitionState::Uninitialized => write!(f, "uninitialized"),
            AcquisitionState::AttemptingPrivileged => write!(f, "attempting privileged"),
            AcquisitionState::Privileged => write!(f, "privileged"),
            AcquisitionState::Unprivileged(Fallback::Ss) => write!(f, "unprivileged (ss)"),
            AcquisitionState::Unprivileged(Fallback::Netstat) => {
                write!(f, "unprivileged (netstat)")
            }
            AcquisitionState::Failed => write!(f, "failed"),
        }
    }
}
