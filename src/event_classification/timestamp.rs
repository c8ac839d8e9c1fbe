use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone};
use regex::Regex;

const TIMESTAMP_PREFIX: &str = r"^(?:(?P<classic>[A-Z][a-z]{2}\s+\d{1,2}\s+\d{2}:\d{2}:\d{2})|(?P<iso>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?))";

/// Extracts the event time from the prefix of an auth log line.
///
/// Two shapes are recognized:
/// - classic syslog `Jun  1 10:00:00`, taken in the current year and in the
///   time zone of `now`;
/// - ISO-8601 `2024-06-01T10:00:00.123456+02:00`, fraction and offset
///   optional (no offset means the time zone of `now`).
///
/// Anything else, or a recognized stamp that does not make a valid date,
/// yields `now`.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    prefix: Regex,
}

impl TimestampParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            prefix: Regex::new(TIMESTAMP_PREFIX)?,
        })
    }

    /// Milliseconds since the Unix epoch of the line's timestamp.
    pub fn timestamp_ms<Tz: TimeZone>(&self, line: &str, now: &DateTime<Tz>) -> i64 {
        self.parse(line, now)
            .unwrap_or_else(|| now.timestamp_millis())
    }

    fn parse<Tz: TimeZone>(&self, line: &str, now: &DateTime<Tz>) -> Option<i64> {
        let caps = self.prefix.captures(line)?;
        if let Some(classic) = caps.name("classic") {
            return parse_classic(classic.as_str(), now);
        }
        parse_iso(caps.name("iso")?.as_str(), now)
    }
}

fn parse_classic<Tz: TimeZone>(stamp: &str, now: &DateTime<Tz>) -> Option<i64> {
    let stamp = stamp.split_whitespace().collect::<Vec<_>>().join(" ");
    let naive =
        NaiveDateTime::parse_from_str(&format!("{} {}", now.year(), stamp), "%Y %b %d %H:%M:%S")
            .ok()?;
    now.timezone()
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

fn parse_iso<Tz: TimeZone>(stamp: &str, now: &DateTime<Tz>) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(stamp) {
        return Some(dt.timestamp_millis());
    }
    let naive = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    now.timezone()
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}
