use std::sync::Arc;

use lp_time::{SystemProvider, TimeProvider};
use tracing::{debug, warn};

use crate::format::Line;
use crate::{Batch, Error, Point, Result, Tags, TimeScope, WriterOptions};

/// Overlay `overlay` onto `base`.
///
/// The result holds the union of both key sets. On a collision the value from `overlay` wins and
/// the key keeps its position from `base`; keys only present in `overlay` are appended in
/// `overlay` order.
pub fn merge_tags(base: &Tags, overlay: &Tags) -> Tags {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Converts a [`Batch`] into a line protocol payload.
///
/// Encoding never mutates the batch and reads the clock only when the batch has no time of its
/// own, so with a fixed [`TimeProvider`] the same batch always yields the same payload.
#[derive(Debug, Clone)]
pub struct LineProtocolEncoder {
    options: WriterOptions,
    time_provider: Arc<dyn TimeProvider>,
}

impl LineProtocolEncoder {
    pub fn new(options: WriterOptions, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            options,
            time_provider,
        }
    }

    /// Create an encoder that stamps untimed batches with the wall clock
    pub fn with_system_clock(options: WriterOptions) -> Self {
        Self::new(options, Arc::new(SystemProvider::new()))
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Encode `batch`, one line per point, lines separated by `\n` with no trailing newline.
    ///
    /// Returns `Ok(None)` when the batch has no points collection at all, which is distinct from
    /// `Ok(Some(""))` for an empty one. Timestamp resolution:
    ///
    /// - the batch time is its own time if set, otherwise "now" from the time provider
    /// - a point time is its own time if set, otherwise the batch time
    ///
    /// Tags resolve as batch tags, overridden by the writer's default tags, overridden by point
    /// tags.
    ///
    /// # Errors
    ///
    /// An unparseable datetime string on the batch or any point fails the whole batch; no
    /// partial payload is produced.
    pub fn encode(&self, batch: &Batch) -> Result<Option<String>> {
        let Some(points) = &batch.points else {
            debug!("batch has no points, nothing to encode");
            return Ok(None);
        };

        let batch_time = match &batch.time {
            Some(time) => time.to_nanos().map_err(|source| Error::Time {
                scope: TimeScope::Batch,
                source,
            })?,
            None => self.time_provider.now().timestamp_nanos(),
        };
        let batch_tags = merge_tags(&batch.tags, self.options.default_tags());

        debug!(
            points = points.len(),
            batch_time,
            tags = batch_tags.len(),
            "encoding batch"
        );

        let lines = points
            .iter()
            .enumerate()
            .map(|(index, point)| self.encode_point(index, point, &batch_tags, batch_time))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(lines.join("\n")))
    }

    fn encode_point(
        &self,
        index: usize,
        point: &Point,
        batch_tags: &Tags,
        batch_time: i64,
    ) -> Result<String> {
        let time = match &point.time {
            Some(time) => time.to_nanos().map_err(|source| Error::Time {
                scope: TimeScope::Point(index),
                source,
            })?,
            None => batch_time,
        };

        let mut tags = merge_tags(batch_tags, &point.tags);
        if self.options.sort_tags() {
            tags.sort_keys();
        }

        if point.fields.is_empty() {
            warn!(
                index,
                measurement = %point.measurement,
                "point has no fields, the server is likely to reject it"
            );
        }

        let line = Line {
            measurement: &point.measurement,
            tags: &tags,
            fields: &point.fields,
            timestamp: self.options.precision().convert(time),
            force_integers: self.options.force_integers(),
            escape: self.options.escape_special_characters(),
        };

        Ok(line.to_string())
    }
}
