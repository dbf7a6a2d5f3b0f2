use log::trace;

use crate::model::{Protocol, SocketRecord, ANY_ADDRESS};

/// Process name used when privileged output carries no usable PID/program token.
pub const UNKNOWN_PROCESS: &str = "Unknown";
/// Process name used for every record of an unprivileged acquisition.
pub const UNKNOWN_NO_PRIVILEGES: &str = "Unknown (no privileges)";

const WILDCARD_ADDRESSES: [&str; 3] = ["0.0.0.0", "::", "*"];

/// Output shape of the command that produced the text being parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// `netstat -plntu`, run with superuser rights.
    NetstatPrivileged,
    /// `netstat -tun`.
    NetstatUnprivileged,
    /// `ss -tuan`.
    Ss,
}

impl Dialect {
    pub fn header_lines(self) -> usize {
        match self {
            Dialect::NetstatPrivileged | Dialect::NetstatUnprivileged => 2,
            Dialect::Ss => 1,
        }
    }

    pub fn min_columns(self) -> usize {
        match self {
            Dialect::NetstatPrivileged | Dialect::NetstatUnprivileged => 4,
            Dialect::Ss => 5,
        }
    }

    pub fn default_process_name(self) -> &'static str {
        match self {
            Dialect::NetstatPrivileged => UNKNOWN_PROCESS,
            Dialect::NetstatUnprivileged | Dialect::Ss => UNKNOWN_NO_PRIVILEGES,
        }
    }
}

/// Column positions shared by the three dialects once a line is split.
struct Columns<'a> {
    state: Option<&'a str>,
    recv_q: &'a str,
    send_q: &'a str,
    local: &'a str,
    foreign: Option<&'a str>,
}

/// Parse the full stdout of a socket listing command.
///
/// Header lines are skipped, blank and malformed lines are dropped, and the
/// remaining records keep input order.
pub fn parse(dialect: Dialect, text: &str) -> Vec<SocketRecord> {
    text.lines()
        .skip(dialect.header_lines())
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let record = parse_line(dialect, line);
            if record.is_none() {
                trace!("skipped {:?} line: {}", dialect, line.trim_end());
            }
            record
        })
        .collect()
}

fn parse_line(dialect: Dialect, line: &str) -> Option<SocketRecord> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < dialect.min_columns() {
        return None;
    }

    let protocol = Protocol::from_token(parts[0]);
    let columns = match dialect {
        Dialect::Ss => {
            if !(protocol.is_tcp() || protocol.is_udp()) {
                return None;
            }
            Columns {
                state: Some(parts[1]),
                recv_q: parts[2],
                send_q: parts[3],
                local: parts[4],
                foreign: parts.get(5).copied(),
            }
        }
        Dialect::NetstatPrivileged | Dialect::NetstatUnprivileged => Columns {
            state: parts.get(5).copied(),
            recv_q: parts[1],
            send_q: parts[2],
            local: parts[3],
            foreign: parts.get(4).copied(),
        },
    };

    let (local_ip, port) = split_host_port(columns.local)?;
    if local_ip.is_empty() || port.is_empty() {
        return None;
    }

    let state = if protocol.is_tcp() {
        columns.state.unwrap_or("unknown").to_string()
    } else {
        "stateless".to_string()
    };

    let (pid, program) = match dialect {
        Dialect::NetstatPrivileged => privileged_pid_field(&parts)
            .map(|field| split_pid_program(&field))
            .unwrap_or((None, None)),
        // Neither `netstat -tun` nor `ss -tuan` prints a PID column we can trust.
        Dialect::NetstatUnprivileged | Dialect::Ss => (None, None),
    };

    Some(SocketRecord {
        protocol,
        local_ip: normalize_ip(local_ip),
        port: port.to_string(),
        foreign_address: normalize_foreign(columns.foreign.unwrap_or("*:*")),
        state,
        recv_q: columns.recv_q.to_string(),
        send_q: columns.send_q.to_string(),
        pid,
        process_name: program.unwrap_or_else(|| dialect.default_process_name().to_string()),
        process_info: None,
    })
}

/// Split `ip:port` on the last colon so bare IPv6 addresses survive.
fn split_host_port(addr: &str) -> Option<(&str, &str)> {
    let (ip, port) = addr.rsplit_once(':')?;
    Some((strip_brackets(ip), port))
}

fn strip_brackets(ip: &str) -> &str {
    ip.strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(ip)
}

fn normalize_ip(ip: &str) -> String {
    if WILDCARD_ADDRESSES.contains(&ip) {
        ANY_ADDRESS.to_string()
    } else {
        ip.to_string()
    }
}

/// Foreign addresses without a colon pass through untouched.
fn normalize_foreign(addr: &str) -> String {
    match split_host_port(addr) {
        Some((ip, port)) => format!("{}:{}", normalize_ip(ip), port),
        None => addr.to_string(),
    }
}

/// Locate the `PID/Program name` field of a privileged netstat line.
///
/// The program name may contain spaces and slashes, so the field starts at
/// the leftmost token after the address columns that looks like `-` or
/// `<digits>/...` and runs to the end of the line. The state column never
/// looks like that. Without such a token the last token is used.
fn privileged_pid_field(parts: &[&str]) -> Option<String> {
    if parts.len() <= 5 {
        return None;
    }
    let start = (5..parts.len())
        .find(|&i| looks_like_pid_token(parts[i]))
        .unwrap_or(parts.len() - 1);
    Some(parts[start..].join(" "))
}

fn looks_like_pid_token(token: &str) -> bool {
    if token == "-" {
        return true;
    }
    match token.split_once('/') {
        Some((pid, _)) => !pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

/// Split a `PID/name` token on the first `/`.
///
/// `-`, a token without `/`, and a non-numeric or zero PID all yield
/// `pid = None`. The program name is kept whenever it is non-empty.
pub fn split_pid_program(token: &str) -> (Option<u32>, Option<String>) {
    if token == "-" {
        return (None, None);
    }
    let Some((pid_str, name)) = token.split_once('/') else {
        return (None, None);
    };
    let pid = pid_str.parse::<u32>().ok().filter(|&p| p > 0);
    let name = if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    };
    (pid, name)
}
