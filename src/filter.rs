use crate::cli::{CliArgs, FamilyArg};
use crate::model::SocketRecord;

/// Row selection applied to the socket table before printing.
#[derive(Debug, Default)]
pub struct SocketFilter {
    /// Lower-cased search text. `None` or empty matches every record.
    pub query: Option<String>,
    pub family: Option<FamilyArg>,
}

impl SocketFilter {
    pub fn new(query: &str) -> Self {
        SocketFilter {
            query: normalize_query(query),
            family: None,
        }
    }

    /// Build a `SocketFilter` from parsed CLI arguments.
    pub fn from_cli(args: &CliArgs) -> Self {
        SocketFilter {
            family: args.family,
            ..Self::new(args.search.as_deref().unwrap_or(""))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.family.is_none()
    }

    /// A record matches when its family is allowed and the query is a
    /// substring of its protocol, port or process name.
    pub fn matches(&self, record: &SocketRecord) -> bool {
        let family_match = match self.family {
            Some(FamilyArg::Tcp) => record.is_tcp(),
            Some(FamilyArg::Udp) => record.protocol.is_udp(),
            None => true,
        };
        if !family_match {
            return false;
        }

        let Some(query) = &self.query else {
            return true;
        };
        record.protocol.to_string().contains(query.as_str())
            || record.port.to_lowercase().contains(query.as_str())
            || record.process_name.to_lowercase().contains(query.as_str())
    }

    /// Matching records, in table order.
    pub fn apply<'a>(&self, records: &'a [SocketRecord]) -> Vec<&'a SocketRecord> {
        if self.is_empty() {
            return records.iter().collect();
        }
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
