//! Syslog PRI extraction and best-effort RFC 3164 / RFC 5424 field capture.
//!
//! The baseline `<PRI>` parse is always attempted and is the only thing this
//! pipeline requires to succeed; the richer per-format field capture is a
//! secondary, non-fatal pass (see `try_rfc5424`/`try_rfc3164`) in the same
//! spirit as `SyslogCollector::parse_message` layering identifier/pid
//! extraction on top of a baseline PRI parse.

use std::collections::HashMap;
use std::net::IpAddr;

use chrono::{DateTime, Utc};

use crate::error::CollectorError;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A decoded syslog message: the PRI-derived severity/facility, the message
/// body, and whatever named fields the optional structured capture found.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyslogEvent {
    pub received_at: DateTime<Utc>,
    pub source_ip: IpAddr,
    pub severity: u8,
    pub facility: u32,
    pub message: String,
    pub captures: HashMap<String, String>,
}

/// Parse the PRI, severity, facility, and message body from a syslog UDP
/// payload. Structured-field capture (RFC 5424, then RFC 3164) is attempted
/// afterward and never affects whether this function succeeds.
pub fn parse(
    data: &[u8],
    received_at: DateTime<Utc>,
    source_ip: IpAddr,
) -> Result<SyslogEvent, CollectorError> {
    if data.is_empty() {
        return Err(CollectorError::EmptyInput);
    }
    let text = String::from_utf8_lossy(data);

    if !text.starts_with('<') {
        return Err(CollectorError::InvalidFormat);
    }
    let close = text.find('>').ok_or(CollectorError::InvalidFormat)?;
    let priority: u32 = text[1..close]
        .parse()
        .map_err(|_| CollectorError::InvalidPriority)?;

    let severity = (priority & 0x7) as u8;
    let facility = priority >> 3;
    let body = text[close + 1..].trim_start();

    let mut captures = try_rfc5424(body).or_else(|| try_rfc3164(body)).unwrap_or_default();
    captures.retain(|_, v| !v.is_empty());

    Ok(SyslogEvent {
        received_at,
        source_ip,
        severity,
        facility,
        message: body.to_string(),
        captures,
    })
}

/// Split off the first `n` whitespace-delimited words, collapsing runs of
/// whitespace (BSD syslog often pads single-digit days with an extra space),
/// returning the words and the untouched remainder.
fn take_words(s: &str, n: usize) -> Option<(Vec<&str>, &str)> {
    let mut words = Vec::with_capacity(n);
    let mut rest = s;
    for _ in 0..n {
        let trimmed = rest.trim_start();
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        if end == 0 {
            return None;
        }
        words.push(&trimmed[..end]);
        rest = &trimmed[end..];
    }
    Some((words, rest.trim_start()))
}

fn try_rfc5424(body: &str) -> Option<HashMap<String, String>> {
    let (words, msg) = take_words(body, 7)?;
    let [version, timestamp, hostname, appname, procid, msgid, sd] = words.as_slice() else {
        return None;
    };
    if *version != "1" {
        return None;
    }

    let mut captures = HashMap::new();
    captures.insert("VER".to_string(), (*version).to_string());
    captures.insert("TIMESTAMP".to_string(), (*timestamp).to_string());
    captures.insert("HOSTNAME".to_string(), dash_to_empty(hostname));
    captures.insert("APPNAME".to_string(), dash_to_empty(appname));
    captures.insert("PROCID".to_string(), dash_to_empty(procid));
    captures.insert("MSGID".to_string(), dash_to_empty(msgid));
    captures.insert("SD".to_string(), dash_to_empty(sd));
    captures.insert("MSG".to_string(), msg.to_string());
    Some(captures)
}

fn try_rfc3164(body: &str) -> Option<HashMap<String, String>> {
    let (words, msg) = take_words(body, 4)?;
    let [month, day, time, hostname] = words.as_slice() else {
        return None;
    };
    if !MONTHS.contains(month) {
        return None;
    }
    if day.parse::<u8>().map(|d| (1..=31).contains(&d)) != Ok(true) {
        return None;
    }
    if !is_hms(time) {
        return None;
    }

    let mut captures = HashMap::new();
    captures.insert("MONTH".to_string(), (*month).to_string());
    captures.insert("DAY".to_string(), (*day).to_string());
    captures.insert("TIME".to_string(), (*time).to_string());
    captures.insert("HOSTNAME".to_string(), (*hostname).to_string());
    captures.insert("MSG".to_string(), msg.to_string());
    Some(captures)
}

fn is_hms(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 8
        && bytes[2] == b':'
        && bytes[5] == b':'
        && bytes.iter().enumerate().all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit())
}

fn dash_to_empty(field: &str) -> String {
    if field == "-" {
        String::new()
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn host() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
    }

    #[test]
    fn baseline_parse_extracts_severity_and_facility() {
        let event = parse(b"<13>Hello", Utc::now(), host()).unwrap();
        assert_eq!(event.severity, 5);
        assert_eq!(event.facility, 1);
        assert_eq!(event.message, "Hello");
    }

    #[test]
    fn rfc3164_capture_extracts_hostname() {
        let event = parse(b"<165>Aug 24 05:34:00 host1 app: msg", Utc::now(), host()).unwrap();
        assert_eq!(event.severity, 5);
        assert_eq!(event.facility, 20);
        assert_eq!(event.captures.get("HOSTNAME").unwrap(), "host1");
        assert!(event.message.starts_with("Aug 24"));
    }

    #[test]
    fn rfc5424_capture_extracts_structured_fields() {
        let body = "<34>1 2003-10-11T22:14:15.003Z host app - ID47 - BOM'Hello";
        let event = parse(body.as_bytes(), Utc::now(), host()).unwrap();
        assert_eq!(event.severity, 2);
        assert_eq!(event.facility, 4);
        assert_eq!(event.captures.get("VER").unwrap(), "1");
        assert_eq!(event.captures.get("HOSTNAME").unwrap(), "host");
        assert_eq!(event.captures.get("APPNAME").unwrap(), "app");
        assert_eq!(event.captures.get("MSGID").unwrap(), "ID47");
    }

    #[test]
    fn missing_pri_is_invalid_format() {
        assert!(matches!(
            parse(b"no-pri-here", Utc::now(), host()),
            Err(CollectorError::InvalidFormat)
        ));
    }

    #[test]
    fn non_numeric_priority_is_invalid_priority() {
        assert!(matches!(
            parse(b"<abc>body", Utc::now(), host()),
            Err(CollectorError::InvalidPriority)
        ));
    }

    #[test]
    fn empty_payload_is_empty_input() {
        assert!(matches!(parse(b"", Utc::now(), host()), Err(CollectorError::EmptyInput)));
    }

    #[test]
    fn idempotent_on_repeated_parse() {
        let body = b"<13>Hello";
        let first = parse(body, Utc::now(), host()).unwrap();
        let second = parse(body, Utc::now(), host()).unwrap();
        assert_eq!(first.severity, second.severity);
        assert_eq!(first.facility, second.facility);
        assert_eq!(first.message, second.message);
    }
}
