//! Encodes batches of time-series points into InfluxDB [line protocol].
//!
//! A [`Batch`] carries default tags, an optional timestamp and a list of [`Point`]s. The
//! [`LineProtocolEncoder`] resolves timestamps, merges the batch, writer and point tag scopes,
//! renders each field according to its [`FieldValue`] variant and joins one line per point:
//!
//! ```
//! use std::sync::Arc;
//! use lp_writer::{Batch, LineProtocolEncoder, MockProvider, Point, Time, WriterOptions};
//!
//! let encoder = LineProtocolEncoder::new(
//!     WriterOptions::new().with_tag("region", "us-west"),
//!     Arc::new(MockProvider::new(Time::from_timestamp_nanos(1_000))),
//! );
//!
//! let batch = Batch::new(vec![
//!     Point::new("cpu").tag("host", "a").field("usage", 0.5),
//!     Point::new("mem").field("free", 1024),
//! ]);
//!
//! assert_eq!(
//!     encoder.encode(&batch).unwrap().unwrap(),
//!     "cpu,region=us-west,host=a usage=0.5 1000\nmem,region=us-west free=1024 1000"
//! );
//! ```
//!
//! By default nothing is escaped and tags are written in merge order, not sorted. Both can be
//! switched on through [`WriterOptions`].
//!
//! Transmitting the payload is left to a [`Transport`]; [`Writer`] glues the two together.
//!
//! [line protocol]: https://docs.influxdata.com/influxdb/cloud/reference/syntax/line-protocol

#![warn(clippy::explicit_iter_loop, clippy::use_self)]

mod encoder;
mod field;
mod format;
mod options;
mod point;
mod writer;

pub use encoder::{LineProtocolEncoder, merge_tags};
pub use field::FieldValue;
pub use lp_time::{MockProvider, ParseError, SystemProvider, Time, TimeProvider};
pub use options::{Precision, WriterOptions};
pub use point::{Batch, Fields, Point, PointTime, Tags};
pub use writer::{IoTransport, MemoryTransport, Transport, WriteError, WriteOutcome, Writer};

use std::fmt;

/// Primary error type for encoding
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {scope} time: {source}")]
    Time {
        scope: TimeScope,
        #[source]
        source: ParseError,
    },

    #[error("failed to decode batch JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Where an unparseable timestamp was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeScope {
    Batch,
    /// Index of the point within the batch
    Point(usize),
}

impl fmt::Display for TimeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Batch => write!(f, "batch"),
            Self::Point(index) => write!(f, "point #{index}"),
        }
    }
}
