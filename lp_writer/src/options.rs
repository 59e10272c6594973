use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Tags;

/// The precision of the timestamps written into line protocol
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    #[serde(alias = "ns")]
    Nanosecond,
    #[serde(alias = "us")]
    Microsecond,
    #[serde(alias = "ms")]
    Millisecond,
    #[serde(alias = "s")]
    Second,
}

impl Precision {
    /// The short unit name, as used in the `precision` query parameter of write APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nanosecond => "ns",
            Self::Microsecond => "us",
            Self::Millisecond => "ms",
            Self::Second => "s",
        }
    }

    fn nanos_per_unit(&self) -> i64 {
        match self {
            Self::Nanosecond => 1,
            Self::Microsecond => 1_000,
            Self::Millisecond => 1_000_000,
            Self::Second => 1_000_000_000,
        }
    }

    /// Convert a nanosecond timestamp into this precision, rounding towards negative infinity.
    pub fn convert(&self, nanos: i64) -> i64 {
        nanos.div_euclid(self.nanos_per_unit())
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let p = match s {
            "ns" | "nanosecond" => Self::Nanosecond,
            "us" | "microsecond" => Self::Microsecond,
            "ms" | "millisecond" => Self::Millisecond,
            "s" | "second" => Self::Second,
            _ => return Err(format!("unrecognized precision unit: {s}")),
        };
        Ok(p)
    }
}

/// Writer-level configuration read by the [`LineProtocolEncoder`](crate::LineProtocolEncoder).
///
/// The defaults reproduce plain line protocol output: no default tags, integers without the `i`
/// suffix, nanosecond timestamps, no escaping and tags in merge order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Tags added to every batch. They override batch tags of the same name and are themselves
    /// overridden by point tags.
    default_tags: Tags,
    /// Write integer fields with the `i` suffix, e.g. `x=1i` instead of `x=1`
    force_integers: bool,
    precision: Precision,
    /// Escape [special characters] in measurements, tag keys and values, field keys and string
    /// field values.
    ///
    /// Off by default: without it a comma, space or equals sign in a name, or a double quote in
    /// a string value, produces a line the server will misread or reject.
    ///
    /// [special characters]: https://docs.influxdata.com/influxdb/cloud/reference/syntax/line-protocol/#special-characters
    escape_special_characters: bool,
    /// Write tags sorted by key rather than in merge order
    sort_tags: bool,
}

impl WriterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the default tags
    pub fn with_default_tags(mut self, tags: Tags) -> Self {
        self.default_tags = tags;
        self
    }

    /// Add a single default tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_tags.insert(key.into(), value.into());
        self
    }

    pub fn with_force_integers(mut self, force_integers: bool) -> Self {
        self.force_integers = force_integers;
        self
    }

    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_escaping(mut self, escape: bool) -> Self {
        self.escape_special_characters = escape;
        self
    }

    pub fn with_sorted_tags(mut self, sort_tags: bool) -> Self {
        self.sort_tags = sort_tags;
        self
    }

    pub fn default_tags(&self) -> &Tags {
        &self.default_tags
    }

    pub fn force_integers(&self) -> bool {
        self.force_integers
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }

    pub fn escape_special_characters(&self) -> bool {
        self.escape_special_characters
    }

    pub fn sort_tags(&self) -> bool {
        self.sort_tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn precision_parsing() {
        for (s, p) in [
            ("ns", Precision::Nanosecond),
            ("us", Precision::Microsecond),
            ("ms", Precision::Millisecond),
            ("s", Precision::Second),
            ("millisecond", Precision::Millisecond),
        ] {
            assert_eq!(s.parse::<Precision>(), Ok(p));
        }
        assert_eq!(
            "h".parse::<Precision>(),
            Err("unrecognized precision unit: h".to_string())
        );

        let p: Precision = serde_json::from_value(json!("ms")).unwrap();
        assert_eq!(p, Precision::Millisecond);
        let p: Precision = serde_json::from_value(json!("second")).unwrap();
        assert_eq!(p, Precision::Second);
    }

    #[test]
    fn precision_conversion() {
        let nanos = 1_435_752_000_123_456_789;
        assert_eq!(Precision::Nanosecond.convert(nanos), nanos);
        assert_eq!(
            Precision::Microsecond.convert(nanos),
            1_435_752_000_123_456
        );
        assert_eq!(Precision::Millisecond.convert(nanos), 1_435_752_000_123);
        assert_eq!(Precision::Second.convert(nanos), 1_435_752_000);

        // before the epoch, round down rather than towards zero
        assert_eq!(Precision::Second.convert(-1), -1);
        assert_eq!(Precision::Millisecond.convert(-1_000_000), -1);
    }

    #[test]
    fn options_from_json() {
        let options: WriterOptions = serde_json::from_value(json!({
            "default_tags": {"host": "a"},
            "force_integers": true,
            "precision": "s"
        }))
        .unwrap();

        assert_eq!(
            options,
            WriterOptions::new()
                .with_tag("host", "a")
                .with_force_integers(true)
                .with_precision(Precision::Second)
        );
        assert!(!options.escape_special_characters());
        assert!(!options.sort_tags());
    }
}
