//! Clock abstraction and datetime parsing for the line protocol writer.
//!
//! Encoding a batch needs "now" whenever a batch carries no timestamp. Reading the wall clock
//! directly would make encoding untestable, so callers hand the encoder a [`TimeProvider`]
//! instead: [`SystemProvider`] in production and [`MockProvider`] in tests or for reproducible
//! output.

#![warn(clippy::explicit_iter_loop, clippy::use_self)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parking_lot::RwLock;

/// Naive datetime layouts accepted by [`Time::parse`], interpreted as UTC.
///
/// `%.f` also matches a missing fractional part.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// ISO 8601 layouts with a numeric offset that RFC 3339 parsing rejects, e.g. `+0200`.
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
];

const NANOS_PER_SEC: u32 = 1_000_000_000;

/// Error returned by [`Time::parse`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unrecognized datetime format: '{input}'")]
    Format { input: String },

    #[error("datetime '{input}' cannot be represented as nanoseconds since the epoch")]
    OutOfRange { input: String },
}

pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// A UTC Timestamp returned by a [`TimeProvider`]
///
/// Every `Time` is representable as an `i64` count of nanoseconds since the epoch, which is the
/// unit line protocol timestamps are written in.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Time(DateTime<Utc>);

impl std::fmt::Debug for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_rfc3339())
    }
}

impl Time {
    /// Makes a new `Time` from the number of non-leap nanoseconds
    /// since January 1, 1970 0:00:00 UTC (aka "UNIX timestamp").
    pub fn from_timestamp_nanos(nanos: i64) -> Self {
        Self(DateTime::from_timestamp_nanos(nanos))
    }

    /// Makes a new `Time` from the provided [`DateTime<Utc>`]
    ///
    /// Returns None if the instant does not fit in an `i64` of nanoseconds.
    pub fn from_datetime_opt(datetime: DateTime<Utc>) -> Option<Self> {
        datetime.timestamp_nanos_opt().map(|_| Self(datetime))
    }

    /// Parses a datetime string.
    ///
    /// Accepted forms, surrounding whitespace ignored:
    ///
    /// - RFC 3339, e.g. `2015-07-01T12:00:00Z` or `2015-07-01T12:00:00.5+02:00`
    /// - ISO 8601 with a `+hhmm` offset, optionally space separated, e.g.
    ///   `2015-07-01T12:00:00+0200` or `2015-07-01 12:00:00 +0200`
    /// - RFC 2822, e.g. `Wed, 01 Jul 2015 12:00:00 +0000`
    /// - `YYYY-MM-DD HH:MM[:SS[.fff]]` or `YYYY-MM-DDTHH:MM[:SS[.fff]]`, taken as UTC
    /// - `YYYY-MM-DD`, midnight UTC
    /// - `@<seconds>[.fff]` seconds since the epoch
    ///
    /// Sub-second digits are kept down to nanoseconds.
    pub fn parse(input: &str) -> Result<Self> {
        let s = input.trim();

        let datetime = if let Some(secs) = s.strip_prefix('@') {
            parse_unix_seconds(secs)
        } else if let Some(dt) = DateTime::parse_from_rfc3339(s)
            .ok()
            .or_else(|| {
                OFFSET_FORMATS
                    .iter()
                    .find_map(|format| DateTime::parse_from_str(s, format).ok())
            })
            .or_else(|| DateTime::parse_from_rfc2822(s).ok())
        {
            Some(dt.with_timezone(&Utc))
        } else if let Some(dt) = NAIVE_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(s, format).ok())
        {
            Some(dt.and_utc())
        } else {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        };

        let Some(datetime) = datetime else {
            return Err(ParseError::Format {
                input: input.to_string(),
            });
        };

        Self::from_datetime_opt(datetime).ok_or_else(|| ParseError::OutOfRange {
            input: input.to_string(),
        })
    }

    /// Returns an RFC 3339 and ISO 8601 date and time string such as `1996-12-19T16:39:57+00:00`.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Returns the number of non-leap-nanoseconds since January 1, 1970 UTC
    pub fn timestamp_nanos(&self) -> i64 {
        // every constructor checks the range
        self.0.timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

fn parse_unix_seconds(s: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = match s.split_once('.') {
        Some((_, "")) => return None,
        Some(parts) => parts,
        None => (s, ""),
    };
    let mut secs: i64 = secs.parse().ok()?;

    if frac.len() > 9 || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let mut nanos: u32 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}").parse().ok()?
    };

    // "-1.5" is half a second before "-1"
    if s.starts_with('-') && nanos > 0 {
        secs = secs.checked_sub(1)?;
        nanos = NANOS_PER_SEC - nanos;
    }

    DateTime::from_timestamp(secs, nanos)
}

pub trait TimeProvider: std::fmt::Debug + Send + Sync + 'static {
    /// Returns the current `Time`. No guarantees are made about monotonicity
    fn now(&self) -> Time;
}

/// A [`TimeProvider`] that uses [`Utc::now`] as a clock source
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemProvider {}

impl SystemProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeProvider for SystemProvider {
    fn now(&self) -> Time {
        Time(Utc::now())
    }
}

/// A [`TimeProvider`] that returns a fixed `Time` that can be set by [`MockProvider::set`]
#[derive(Debug)]
pub struct MockProvider {
    now: RwLock<Time>,
}

impl MockProvider {
    pub fn new(start: Time) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    pub fn set(&self, time: Time) {
        *self.now.write() = time
    }
}

impl TimeProvider for MockProvider {
    fn now(&self) -> Time {
        *self.now.read()
    }
}
