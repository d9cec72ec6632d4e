//! DHCP lease database parsing.
//!
//! The lease file is the ISC `dhcpd.leases` format the hypervisor's DHCP
//! server writes:
//!
//! ```text
//! lease 192.168.64.5 {
//!     starts 3 2023/01/01 00:00:00;
//!     ends 4 2023/01/02 00:00:00;
//!     hardware ethernet 00:50:56:2b:11:0e;
//!     client-hostname "foo";
//! }
//! ```
//!
//! Records end at `}`. Comments and unknown statements are skipped, and a
//! record missing a field just leaves it `None`.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::VmError;
use crate::outcome::Outcome;

const DATE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaseRecord {
    pub ip_address: Option<String>,
    pub mac_address: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl LeaseRecord {
    /// A lease with no end time never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.end.is_some_and(|end| end < now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Result of looking up a MAC address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseMatch {
    Found(LeaseRecord),
    Absent,
}

impl LeaseMatch {
    pub fn record(&self) -> Option<&LeaseRecord> {
        match self {
            LeaseMatch::Found(r) => Some(r),
            LeaseMatch::Absent => None,
        }
    }
}

/// One recognised statement inside a lease block.
#[derive(Debug, PartialEq, Eq)]
enum Statement<'a> {
    Lease { ip: &'a str },
    Starts { at: Option<DateTime<Utc>> },
    Ends { at: Option<DateTime<Utc>> },
    Hardware { mac: &'a str },
    Other,
}

fn parse_statement(line: &str) -> Statement<'_> {
    let line = line.strip_suffix(';').unwrap_or(line).trim_end();
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["lease", ip, ..] => Statement::Lease { ip: *ip },
        ["starts", _weekday, date, time, ..] => Statement::Starts {
            at: parse_time(date, time),
        },
        ["ends" | "end", _weekday, date, time, ..] => Statement::Ends {
            at: parse_time(date, time),
        },
        ["hardware", _kind, mac, ..] => Statement::Hardware { mac: *mac },
        _ => Statement::Other,
    }
}

/// Lease times are written in UTC. `never` and garbage parse to `None`.
fn parse_time(date: &str, time: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(&format!("{date} {time}"), DATE_FORMAT)
        .ok()
        .map(|t| t.and_utc())
}

/// Parse lease-file text into records, in file order.
///
/// Every `}`-delimited block yields a record, complete or not. Only blocks
/// holding nothing but comments and blank lines are skipped.
pub fn parse_leases(text: &str) -> Vec<LeaseRecord> {
    let mut records = Vec::new();

    for block in text.split('}') {
        let lines: Vec<&str> = block
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .collect();
        if lines.is_empty() {
            continue;
        }

        let mut record = LeaseRecord::default();
        for line in lines {
            match parse_statement(line) {
                Statement::Lease { ip } => record.ip_address = Some(ip.to_string()),
                Statement::Starts { at } => record.start = at,
                Statement::Ends { at } => record.end = at,
                Statement::Hardware { mac } => record.mac_address = Some(mac.to_string()),
                Statement::Other => {}
            }
        }
        records.push(record);
    }

    records
}

/// Read and parse the lease file at `path`.
///
/// A missing file is a failure (code 1) naming the path; any other read error
/// is unexpected and returned as `Err`.
pub fn parse(path: &Path) -> Result<Outcome<Vec<LeaseRecord>>, VmError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Outcome::internal(format!(
                "lease file {} does not exist",
                path.display()
            )));
        }
        Err(e) => {
            return Err(VmError::Io {
                context: format!("reading lease file {}", path.display()),
                source: e,
            });
        }
    };

    let records = parse_leases(&String::from_utf8_lossy(&bytes));
    tracing::debug!(path = %path.display(), records = records.len(), "parsed lease file");
    Ok(Outcome::success(records))
}

/// First record in file order whose MAC equals `mac` (ASCII case-insensitive).
pub fn find_by_mac(path: &Path, mac: &str) -> Result<Outcome<LeaseMatch>, VmError> {
    let parsed = parse(path)?;
    if !parsed.successful() {
        return Ok(parsed.failure_as());
    }

    let found = parsed
        .into_data()
        .unwrap_or_default()
        .into_iter()
        .find(|r| {
            r.mac_address
                .as_deref()
                .is_some_and(|m| m.eq_ignore_ascii_case(mac))
        });

    Ok(Outcome::success(match found {
        Some(record) => LeaseMatch::Found(record),
        None => LeaseMatch::Absent,
    }))
}
