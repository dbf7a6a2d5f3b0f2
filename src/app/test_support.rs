//! Scripted doubles for the command runner and process enricher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::CommandError;
use crate::model::{ProcessSnapshot, SnapshotFields};
use crate::platform::{CommandRunner, CommandSpec, ProcessEnricher};

pub const NETSTAT_PLNTU: &str = "\
Active Internet connections (only servers)
Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name
tcp        0      0 0.0.0.0:8080            0.0.0.0:*               LISTEN      1234/nginx: worker
tcp        0      0 127.0.0.1:5432          0.0.0.0:*               LISTEN      777/postgres
tcp6       0      0 :::22                   :::*                    LISTEN      -
udp        0      0 0.0.0.0:68              0.0.0.0:*                           845/dhclient
";

pub const SS_TUAN: &str = "\
Netid State  Recv-Q Send-Q Local Address:Port  Peer Address:Port Process
udp   UNCONN 0      0            0.0.0.0:68         0.0.0.0:*
tcp   LISTEN 0      128          0.0.0.0:22         0.0.0.0:*
";

pub const NETSTAT_TUN: &str = "\
Active Internet connections (w/o servers)
Proto Recv-Q Send-Q Local Address           Foreign Address         State
tcp        0     36 192.168.1.10:22         192.168.1.20:51234      ESTABLISHED
";

#[derive(Debug, Clone)]
pub enum Outcome {
    Output(&'static str),
    NotFound,
    AuthFailed,
    Exit(i32),
}

#[derive(Default)]
struct Script {
    outcomes: HashMap<String, Outcome>,
    calls: Vec<(String, bool)>,
}

/// Runner whose answers are keyed by the rendered command line.
/// Unscripted commands behave as if the binary were missing.
#[derive(Clone, Default)]
pub struct FakeRunner(Arc<Mutex<Script>>);

impl FakeRunner {
    pub fn set(&self, command: &str, outcome: Outcome) {
        self.0
            .lock()
            .unwrap()
            .outcomes
            .insert(command.to_string(), outcome);
    }

    pub fn calls(&self) -> Vec<(String, bool)> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.0.lock().unwrap().calls.clear();
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &CommandSpec, elevate: bool) -> Result<String, CommandError> {
        let mut script = self.0.lock().unwrap();
        let key = command.to_string();
        script.calls.push((key.clone(), elevate));
        match script.outcomes.get(&key).cloned().unwrap_or(Outcome::NotFound) {
            Outcome::Output(text) => Ok(text.to_string()),
            Outcome::NotFound => Err(CommandError::NotFound(command.program.clone())),
            Outcome::AuthFailed => Err(CommandError::AuthFailed),
            Outcome::Exit(code) => Err(CommandError::ExecutionFailed {
                exit_code: Some(code),
                stderr: format!("{} failed", command.program),
            }),
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeEnricher {
    snapshots: HashMap<u32, ProcessSnapshot>,
    calls: Arc<AtomicUsize>,
}

impl FakeEnricher {
    pub fn with_pids(pids: &[u32]) -> Self {
        let snapshots = pids
            .iter()
            .map(|&pid| {
                let mut snapshot = ProcessSnapshot::new(pid, format!("proc{}", pid));
                snapshot.user = Some("root".to_string());
                (pid, snapshot)
            })
            .collect();
        Self {
            snapshots,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProcessEnricher for FakeEnricher {
    fn snapshot_all(&self, _fields: SnapshotFields) -> HashMap<u32, ProcessSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.snapshots.clone()
    }
}
