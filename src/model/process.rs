use chrono::{DateTime, Utc};

/// Point-in-time metadata for one PID, captured once per refresh.
///
/// Fields the caller did not request through [`SnapshotFields`] stay `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub cmdline: Option<Vec<String>>,
    pub user: Option<String>,
    pub cpu_percent: Option<f32>,
    /// Resident set size in bytes.
    pub memory_bytes: Option<u64>,
    pub started_at: Option<DateTime<Utc>>,
    pub status: Option<String>,
}

impl ProcessSnapshot {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cmdline: None,
            user: None,
            cpu_percent: None,
            memory_bytes: None,
            started_at: None,
            status: None,
        }
    }

    /// Command line joined with spaces, if captured and non-empty.
    pub fn command(&self) -> Option<String> {
        self.cmdline
            .as_ref()
            .filter(|c| !c.is_empty())
            .map(|c| c.join(" "))
    }

    pub fn memory_mb(&self) -> Option<f64> {
        self.memory_bytes.map(|b| b as f64 / 1024.0 / 1024.0)
    }
}

/// Which snapshot fields the enricher should gather.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotFields {
    pub cmdline: bool,
    pub user: bool,
    pub cpu: bool,
    pub memory: bool,
    pub start_time: bool,
    pub status: bool,
}

impl SnapshotFields {
    pub fn all() -> Self {
        Self {
            cmdline: true,
            user: true,
            cpu: true,
            memory: true,
            start_time: true,
            status: true,
        }
    }

    pub fn none() -> Self {
        Self {
            cmdline: false,
            user: false,
            cpu: false,
            memory: false,
            start_time: false,
            status: false,
        }
    }
}

impl Default for SnapshotFields {
    fn default() -> Self {
        Self::all()
    }
}
