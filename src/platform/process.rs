use std::collections::{BTreeSet, HashMap};
use std::thread;

use chrono::DateTime;
use log::{debug, trace};
use sysinfo::{ProcessStatus, System};

use super::ProcessEnricher;
use crate::model::{ProcessSnapshot, SnapshotFields, SocketRecord};

/// Process snapshots taken from a fresh `sysinfo::System` each time.
#[derive(Debug, Default)]
pub struct SysinfoEnricher;

impl SysinfoEnricher {
    pub fn new() -> Self {
        Self
    }
}

fn lookup_user(uid: u32) -> String {
    users::get_user_by_uid(uid)
        .map(|u| u.name().to_string_lossy().to_string())
        .unwrap_or_else(|| uid.to_string())
}

impl ProcessEnricher for SysinfoEnricher {
    fn snapshot_all(&self, fields: SnapshotFields) -> HashMap<u32, ProcessSnapshot> {
        let mut sys = System::new();
        sys.refresh_processes();
        if fields.cpu {
            // CPU usage is measured between two refreshes.
            thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
            sys.refresh_processes();
        }

        let mut user_names: HashMap<u32, String> = HashMap::new();
        let mut snapshots = HashMap::with_capacity(sys.processes().len());

        for (pid, proc_info) in sys.processes() {
            let pid = pid.as_u32();
            if matches!(proc_info.status(), ProcessStatus::Zombie) {
                trace!("skipping zombie process {}", pid);
                continue;
            }

            let mut snapshot = ProcessSnapshot::new(pid, proc_info.name());
            if fields.cmdline {
                snapshot.cmdline = Some(proc_info.cmd().to_vec());
            }
            if fields.user {
                snapshot.user = proc_info.user_id().map(|uid| {
                    let uid = **uid;
                    user_names
                        .entry(uid)
                        .or_insert_with(|| lookup_user(uid))
                        .clone()
                });
            }
            if fields.cpu {
                snapshot.cpu_percent = Some(proc_info.cpu_usage());
            }
            if fields.memory {
                snapshot.memory_bytes = Some(proc_info.memory());
            }
            if fields.start_time {
                let secs = proc_info.start_time();
                snapshot.started_at = if secs == 0 {
                    None
                } else {
                    i64::try_from(secs)
                        .ok()
                        .and_then(|s| DateTime::from_timestamp(s, 0))
                };
            }
            if fields.status {
                snapshot.status = Some(proc_info.status().to_string());
            }

            snapshots.insert(pid, snapshot);
        }

        debug!("captured {} process snapshots", snapshots.len());
        snapshots
    }
}

/// Outcome of joining socket records with process snapshots.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct JoinSummary {
    /// Distinct PIDs looked up in the snapshot map.
    pub lookups: usize,
    /// Records that received a snapshot.
    pub attached: usize,
    /// Distinct PIDs with no snapshot (process exited in between).
    pub missing: usize,
}

/// Attach each record's snapshot, looking every distinct PID up once.
///
/// Records without a PID, or whose PID has no snapshot, end up with
/// `process_info = None`.
pub fn attach_snapshots(
    records: &mut [SocketRecord],
    snapshots: &HashMap<u32, ProcessSnapshot>,
) -> JoinSummary {
    let pids: BTreeSet<u32> = records.iter().filter_map(|r| r.pid).collect();
    let mut summary = JoinSummary::default();
    let mut found: HashMap<u32, &ProcessSnapshot> = HashMap::with_capacity(pids.len());

    for pid in pids {
        summary.lookups += 1;
        match snapshots.get(&pid) {
            Some(snapshot) => {
                trace!("pid {} is {}", snapshot.pid, snapshot.name);
                found.insert(pid, snapshot);
            }
            None => {
                summary.missing += 1;
                debug!("no snapshot for pid {} (process gone?)", pid);
            }
        }
    }

    for record in records.iter_mut() {
        record.process_info = record
            .pid
            .and_then(|pid| found.get(&pid))
            .map(|snapshot| (*snapshot).clone());
        if record.process_info.is_some() {
            summary.attached += 1;
        }
    }

    summary
}
