use std::fmt;

use super::process::ProcessSnapshot;

/// Sentinel shown in place of a wildcard address (`0.0.0.0`, `::`, `*`).
pub const ANY_ADDRESS: &str = "Any";

/// One socket observed in `netstat`/`ss` output.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketRecord {
    pub protocol: Protocol,
    pub local_ip: String,
    /// Kept as text: some systems print service names instead of numbers.
    pub port: String,
    /// `ip:port`, wildcard-normalized like `local_ip`.
    pub foreign_address: String,
    pub state: String,
    pub recv_q: String,
    pub send_q: String,
    pub pid: Option<u32>,
    pub process_name: String,
    /// Attached only by a privileged acquisition.
    pub process_info: Option<ProcessSnapshot>,
}

impl SocketRecord {
    pub fn is_tcp(&self) -> bool {
        self.protocol.is_tcp()
    }

    /// `ip:port` of the local side.
    pub fn local_address(&self) -> String {
        format!("{}:{}", self.local_ip, self.port)
    }
}

/// Protocol as reported by the source command, lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Protocol {
    Tcp,
    Tcp6,
    Udp,
    Udp6,
    Other(String),
}

impl Protocol {
    /// Map a raw protocol column to a `Protocol`. The token is lower-cased first.
    pub fn from_token(token: &str) -> Self {
        let lower = token.to_lowercase();
        match lower.as_str() {
            "tcp" => Protocol::Tcp,
            "tcp6" => Protocol::Tcp6,
            "udp" => Protocol::Udp,
            "udp6" => Protocol::Udp6,
            _ => Protocol::Other(lower),
        }
    }

    pub fn is_tcp(&self) -> bool {
        match self {
            Protocol::Tcp | Protocol::Tcp6 => true,
            Protocol::Udp | Protocol::Udp6 => false,
            Protocol::Other(s) => s.starts_with("tcp"),
        }
    }

    pub fn is_udp(&self) -> bool {
        match self {
            Protocol::Udp | Protocol::Udp6 => true,
            Protocol::Tcp | Protocol::Tcp6 => false,
            Protocol::Other(s) => s.starts_with("udp"),
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Tcp6 => write!(f, "tcp6"),
            Protocol::Udp => write!(f, "udp"),
            Protocol::Udp6 => write!(f, "udp6"),
            Protocol::Other(s) => write!(f, "{}", s),
        }
    }
}
