use std::collections::HashSet;

use chrono::Local;

use crate::cli::CliArgs;
use crate::model::{ProcessSnapshot, SocketRecord};

pub const LIMITED_NOTICE: &str =
    "Limited port information: Running without administrative privileges";

const DEFAULT_FIELDS: &str = "pcPnT";

/// Formats the socket table for the terminal.
pub struct OutputFormatter {
    /// `-t` flag: terse output (unique ports only).
    pub terse: bool,
    /// `-F` flag: field-delimited output with the given field characters.
    pub field_output: Option<String>,
    /// `-x` flag: process detail lines under each socket.
    pub details: bool,
}

impl OutputFormatter {
    /// Build an `OutputFormatter` from parsed CLI arguments.
    pub fn from_cli(args: &CliArgs) -> Self {
        OutputFormatter {
            terse: args.terse,
            field_output: args.field_output.clone(),
            details: args.details,
        }
    }

    /// Print a whole table in the selected mode.
    pub fn print(&self, records: &[&SocketRecord]) {
        for line in self.render(records) {
            println!("{}", line);
        }
    }

    /// Render a whole table in the selected mode, one entry per line.
    pub fn render(&self, records: &[&SocketRecord]) -> Vec<String> {
        if self.terse {
            return unique_ports(records);
        }
        if self.field_output.is_some() {
            return records
                .iter()
                .flat_map(|r| self.field_lines(r))
                .collect();
        }

        let mut lines = vec![header_line()];
        for record in records {
            lines.push(record_line(record));
            if self.details {
                lines.extend(detail_lines(record).into_iter().map(|l| format!("    {}", l)));
            }
        }
        lines
    }

    /// Field-delimited output (`-F` mode).
    ///
    /// Each field is printed on its own line as a single-character tag
    /// followed by the value:
    ///   p = PID, c = process name, u = user, P = protocol,
    ///   n = local address, f = foreign address, T = state,
    ///   r = receive queue, s = send queue
    pub fn field_lines(&self, record: &SocketRecord) -> Vec<String> {
        let fields = self.field_output.as_deref().unwrap_or(DEFAULT_FIELDS);
        let mut lines = Vec::new();
        for ch in fields.chars() {
            match ch {
                'p' => {
                    if let Some(pid) = record.pid {
                        lines.push(format!("p{}", pid));
                    }
                }
                'c' => lines.push(format!("c{}", record.process_name)),
                'u' => {
                    if let Some(user) = record.process_info.as_ref().and_then(|p| p.user.as_ref())
                    {
                        lines.push(format!("u{}", user));
                    }
                }
                'P' => lines.push(format!("P{}", record.protocol)),
                'n' => lines.push(format!("n{}", record.local_address())),
                'f' => lines.push(format!("f{}", record.foreign_address)),
                'T' => lines.push(format!("T{}", record.state)),
                'r' => lines.push(format!("r{}", record.recv_q)),
                's' => lines.push(format!("s{}", record.send_q)),
                _ => {}
            }
        }
        lines
    }
}

/// Tell the user the table lacks process attribution. Goes to stderr so
/// piped output stays parseable.
pub fn print_limited_notice() {
    eprintln!("{}", LIMITED_NOTICE);
}

pub fn header_line() -> String {
    format!(
        "{:<6} {:<24} {:>6} {:<24} {:<12} {:>6} {:>6} {:>7} {}",
        "PROTO", "LOCAL", "PORT", "FOREIGN", "STATE", "RECV-Q", "SEND-Q", "PID", "PROCESS"
    )
}

pub fn record_line(record: &SocketRecord) -> String {
    format!(
        "{:<6} {:<24} {:>6} {:<24} {:<12} {:>6} {:>6} {:>7} {}",
        record.protocol.to_string(),
        record.local_ip,
        record.port,
        record.foreign_address,
        record.state,
        record.recv_q,
        record.send_q,
        record.pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string()),
        record.process_name,
    )
}

/// Detail lines for the process behind a socket. Empty when the record has
/// no PID at all.
pub fn detail_lines(record: &SocketRecord) -> Vec<String> {
    if record.pid.is_none() {
        return Vec::new();
    }
    match &record.process_info {
        Some(info) => snapshot_lines(info),
        None => vec!["Process information unavailable".to_string()],
    }
}

fn snapshot_lines(info: &ProcessSnapshot) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(command) = info.command() {
        lines.push(format!("Command: {}", command));
    }
    if let Some(user) = &info.user {
        lines.push(format!("User: {}", user));
    }
    if let Some(cpu) = info.cpu_percent {
        lines.push(format!("CPU Usage: {:.1}%", cpu));
    }
    if let Some(mb) = info.memory_mb() {
        lines.push(format!("Memory Usage: {:.1} MB", mb));
    }
    if let Some(started) = info.started_at {
        lines.push(format!(
            "Started: {}",
            started.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ));
    }
    if let Some(status) = &info.status {
        lines.push(format!("Status: {}", status));
    }
    lines
}

/// Local ports in first-seen order, without duplicates.
fn unique_ports(records: &[&SocketRecord]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ports = Vec::new();
    for &record in records {
        if seen.insert(record.port.as_str()) {
            ports.push(record.port.clone());
        }
    }
    ports
}
