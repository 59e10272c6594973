//! Rendering of the pieces of a line.
//!
//! Every piece is a [`fmt::Display`] so a whole line is written in one pass without intermediate
//! strings.

use std::fmt;

use crate::{FieldValue, Fields, Tags};

// https://docs.influxdata.com/influxdb/cloud/reference/syntax/line-protocol/#special-characters
const COMMA_EQ_SPACE: [char; 3] = [',', '=', ' '];
const COMMA_SPACE: [char; 2] = [',', ' '];
const DOUBLE_QUOTE: [char; 1] = ['"'];

/// One point, fully resolved, ready to be written as a line.
#[derive(Debug)]
pub(crate) struct Line<'a> {
    pub(crate) measurement: &'a str,
    pub(crate) tags: &'a Tags,
    pub(crate) fields: &'a Fields,
    pub(crate) timestamp: i64,
    pub(crate) force_integers: bool,
    pub(crate) escape: bool,
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the tag segment follows the measurement directly, its leading comma is the separator
        write!(f, "{}", escape(self.measurement, COMMA_SPACE, self.escape))?;

        for (key, value) in self.tags {
            write!(
                f,
                ",{}={}",
                escape(key, COMMA_EQ_SPACE, self.escape),
                escape(value, COMMA_EQ_SPACE, self.escape)
            )?;
        }

        for (i, (key, value)) in self.fields.iter().enumerate() {
            let separator = if i == 0 { " " } else { "," };
            write!(f, "{separator}")?;
            write!(
                f,
                "{}={}",
                escape(key, COMMA_EQ_SPACE, self.escape),
                FormattedValue {
                    value,
                    force_integers: self.force_integers,
                    escape: self.escape,
                }
            )?;
        }
        // an empty field set still gets its separating space
        if self.fields.is_empty() {
            write!(f, " ")?;
        }

        write!(f, " {}", self.timestamp)
    }
}

struct FormattedValue<'a> {
    value: &'a FieldValue,
    force_integers: bool,
    escape: bool,
}

impl fmt::Display for FormattedValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            FieldValue::String(s) => write!(f, "\"{}\"", escape(s, DOUBLE_QUOTE, self.escape)),
            FieldValue::Integer(i) if self.force_integers => write!(f, "{i}i"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
            FieldValue::Other(serde_json::Value::Null) => Ok(()),
            FieldValue::Other(serde_json::Value::String(s)) => write!(f, "{s}"),
            FieldValue::Other(v) => write!(f, "{v}"),
        }
    }
}

// Return a [`fmt::Display`] that renders `src`, escaping any characters in the
// `special_characters` array, and backslashes, with a `\` when `enabled`.
fn escape<const N: usize>(
    src: &str,
    special_characters: [char; N],
    enabled: bool,
) -> Escaped<'_, N> {
    Escaped {
        src,
        special_characters,
        enabled,
    }
}

struct Escaped<'a, const N: usize> {
    src: &'a str,
    special_characters: [char; N],
    enabled: bool,
}

impl<const N: usize> fmt::Display for Escaped<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            return f.write_str(self.src);
        }
        for ch in self.src.chars() {
            if self.special_characters.contains(&ch) || ch == '\\' {
                write!(f, "\\")?;
            }
            write!(f, "{ch}")?;
        }
        Ok(())
    }
}
