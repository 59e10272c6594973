use indexmap::IndexMap;
use lp_time::Time;
use serde::{Deserialize, Serialize};

use crate::{FieldValue, Result};

/// Tag key to tag value, in insertion order
pub type Tags = IndexMap<String, String>;

/// Field key to field value, in insertion order
pub type Fields = IndexMap<String, FieldValue>;

/// The timestamp of a [`Batch`] or [`Point`]
///
/// In JSON an integer is read as [`PointTime::Nanos`] and a string as [`PointTime::DateTime`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointTime {
    /// Nanoseconds since the epoch
    Nanos(i64),
    /// A datetime string, parsed by [`Time::parse`] when the batch is encoded
    DateTime(String),
}

impl PointTime {
    /// Resolve to nanoseconds since the epoch.
    pub fn to_nanos(&self) -> lp_time::Result<i64> {
        match self {
            Self::Nanos(nanos) => Ok(*nanos),
            Self::DateTime(s) => Time::parse(s).map(|t| t.timestamp_nanos()),
        }
    }
}

impl From<i64> for PointTime {
    fn from(nanos: i64) -> Self {
        Self::Nanos(nanos)
    }
}

impl From<Time> for PointTime {
    fn from(time: Time) -> Self {
        Self::Nanos(time.timestamp_nanos())
    }
}

impl From<&str> for PointTime {
    fn from(s: &str) -> Self {
        Self::DateTime(s.to_string())
    }
}

impl From<String> for PointTime {
    fn from(s: String) -> Self {
        Self::DateTime(s)
    }
}

/// One time-series sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub measurement: String,
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: Tags,
    /// Falls back to the batch time when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<PointTime>,
}

impl Point {
    /// Create a point without tags, fields or time.
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            fields: Fields::new(),
            tags: Tags::new(),
            time: None,
        }
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn time(mut self, time: impl Into<PointTime>) -> Self {
        self.time = Some(time.into());
        self
    }
}

/// A set of points written together, sharing default tags and an optional time.
///
/// `points: None` means the batch carries no points at all, which encodes to no output; an
/// empty list encodes to an empty payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<Point>>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tags: Tags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<PointTime>,
}

impl Batch {
    pub fn new(points: Vec<Point>) -> Self {
        Self {
            points: Some(points),
            ..Default::default()
        }
    }

    pub fn point(mut self, point: Point) -> Self {
        self.points.get_or_insert_with(Vec::new).push(point);
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn time(mut self, time: impl Into<PointTime>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Number of points, zero when the batch has none
    pub fn len(&self) -> usize {
        self.points.as_ref().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode a single batch from a JSON object.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Decode either a single JSON batch object or a JSON array of them.
    pub fn list_from_json(s: &str) -> Result<Vec<Self>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<Batch>),
            One(Batch),
        }

        Ok(match serde_json::from_str(s)? {
            OneOrMany::Many(batches) => batches,
            OneOrMany::One(batch) => vec![batch],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_batch() {
        let batch = Batch::from_json(
            r#"{
                "tags": {"dc": "eu"},
                "time": "2015-07-01T12:00:00Z",
                "points": [
                    {"measurement": "cpu", "fields": {"b": 1, "a": 0.5}, "tags": {"z": "1", "y": "2"}},
                    {"measurement": "mem", "fields": {"free": 10}, "time": 5}
                ]
            }"#,
        )
        .unwrap();

        let expected = Batch::new(vec![
            Point::new("cpu")
                .field("b", 1)
                .field("a", 0.5)
                .tag("z", "1")
                .tag("y", "2"),
            Point::new("mem").field("free", 10).time(5),
        ])
        .tag("dc", "eu")
        .time("2015-07-01T12:00:00Z");

        assert_eq!(batch, expected);

        // document order is kept
        let points = batch.points.unwrap();
        assert_eq!(points[0].fields.keys().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(points[0].tags.keys().collect::<Vec<_>>(), ["z", "y"]);
    }

    #[test]
    fn decode_batch_without_points() {
        let batch = Batch::from_json(r#"{"tags": {"a": "1"}}"#).unwrap();
        assert_eq!(batch.points, None);
        assert!(batch.is_empty());

        let batch = Batch::from_json(r#"{"points": []}"#).unwrap();
        assert_eq!(batch.points, Some(vec![]));
    }

    #[test]
    fn decode_point_without_fields_fails() {
        let err = Batch::from_json(r#"{"points": [{"measurement": "cpu"}]}"#).unwrap_err();
        assert!(err.to_string().contains("missing field `fields`"), "{err}");
    }

    #[test]
    fn decode_list() {
        let single = Batch::list_from_json(r#"{"points": []}"#).unwrap();
        assert_eq!(single.len(), 1);

        let many = Batch::list_from_json(
            r#"[{"points": []}, {"points": [{"measurement": "m", "fields": {"x": 1}}]}]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].len(), 1);

        assert!(Batch::list_from_json("42").is_err());
    }

    #[test]
    fn point_time_resolution() {
        assert_eq!(PointTime::from(42).to_nanos(), Ok(42));
        assert_eq!(
            PointTime::from("@1").to_nanos(),
            Ok(1_000_000_000)
        );
        assert!(PointTime::from("yesterday-ish").to_nanos().is_err());
        assert_eq!(
            PointTime::from(Time::from_timestamp_nanos(7)),
            PointTime::Nanos(7)
        );
    }

    #[test]
    fn batch_builder_appends_points() {
        let batch = Batch::default()
            .point(Point::new("a").field("x", 1))
            .point(Point::new("b").field("x", 2));
        assert_eq!(batch.len(), 2);
    }
}
