// Reply line definitions and parsing

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

lazy_static! {
    // [1700000000.123456] 64 bytes from example.com (93.184.216.34): icmp_seq=1 ttl=56 time=11.6 ms
    static ref REPLY_LINE: Regex = Regex::new(concat!(
        r"^(?:\[(?P<timestamp>\d+(?:\.\d+)?)\])?\s*",
        r"\d+ \w+ \w+ (?P<host>.+?)",
        r"(?: \((?P<ip>(?:\d{1,3}\.){3}\d{1,3}|[:\dA-Fa-f]+)\))?: ",
        r"icmp_(?:seq|req)=(?P<seq>\d+) ttl=(?P<ttl>\d+) ",
        r"time=(?P<time>\d+(?:\.\d+)?) ?ms\b.*$",
    ))
    .expect("reply line pattern is valid");
}

/// A single echo reply as printed by `ping`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReply {
    /// Only present when the log was captured with `ping -D`.
    pub timestamp: Option<DateTime<Utc>>,
    pub host: String,
    pub ip: Option<String>,
    pub seq: u32,
    pub ttl: u32,
    pub rtt_ms: f64,
}

impl ProbeReply {
    /// Parses one log line. Anything that isn't an echo reply yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = REPLY_LINE.captures(line.trim())?;

        let timestamp = match caps.name("timestamp") {
            Some(raw) => Some(parse_epoch(raw.as_str())?),
            None => None,
        };

        Some(ProbeReply {
            timestamp,
            host: caps["host"].to_string(),
            ip: caps.name("ip").map(|ip| ip.as_str().to_string()),
            seq: caps["seq"].parse().ok()?,
            ttl: caps["ttl"].parse().ok()?,
            rtt_ms: caps["time"].parse().ok()?,
        })
    }

    /// The address to show for this reply: the IP when ping printed one, the host otherwise.
    pub fn peer(&self) -> &str {
        self.ip.as_deref().unwrap_or(&self.host)
    }
}

/// `1700000000.123456` -> UTC instant. Fractions beyond nanoseconds are truncated.
fn parse_epoch(raw: &str) -> Option<DateTime<Utc>> {
    let (secs, fraction) = raw.split_once('.').unwrap_or((raw, ""));
    let secs: i64 = secs.parse().ok()?;

    let digits: String = fraction.chars().take(9).collect();
    let nanos = if digits.is_empty() {
        0
    } else {
        let scale = 10u32.pow(9 - digits.len() as u32);
        digits.parse::<u32>().ok()? * scale
    };

    DateTime::from_timestamp(secs, nanos)
}
