//! Splits one value into a metadata blob plus out-of-band buffers.
//!
//! Sequences produce one record per element in order. Mappings produce one
//! record per value in sorted key order, and the inverse consumes buffers in
//! that same order. Any other value produces a single record.

use std::collections::VecDeque;

use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::canning::{Canning, DefaultCanning};
use crate::error::{Result, SerializeError};
use crate::object::{Namespace, Object};
use crate::record::{Record, RecordSet};

/// Record data larger than this many bytes travels out-of-band.
pub const DEFAULT_THRESHOLD: usize = 64;

/// Serializer bound to a canning implementation and a size threshold.
#[derive(Debug, Clone)]
pub struct ObjectSerializer<C = DefaultCanning> {
    canning: C,
    threshold: usize,
}

impl Default for ObjectSerializer<DefaultCanning> {
    fn default() -> Self {
        Self::new(DefaultCanning, DEFAULT_THRESHOLD)
    }
}

impl ObjectSerializer<DefaultCanning> {
    /// Default canning with a custom threshold.
    pub fn with_threshold(threshold: usize) -> Self {
        Self::new(DefaultCanning, threshold)
    }
}

impl<C: Canning> ObjectSerializer<C> {
    pub fn new(canning: C, threshold: usize) -> Self {
        Self { canning, threshold }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn canning(&self) -> &C {
        &self.canning
    }

    /// Serialize `value` into `(metadata, buffers)`.
    pub fn serialize(&self, value: &Object) -> Result<(Bytes, Vec<Bytes>)> {
        let mut records = self.records(value)?;
        let mut buffers = Vec::new();
        for record in records.records_mut() {
            if let Some(data) = record.strip(self.threshold) {
                trace!(size = data.len(), "moving record data out-of-band");
                buffers.push(data);
            }
        }
        let metadata = records.encode()?;
        debug!(
            metadata = metadata.len(),
            buffers = buffers.len(),
            "serialized object"
        );
        Ok((metadata, buffers))
    }

    /// Rebuild a value from `metadata` and its out-of-band buffers.
    ///
    /// Extra buffers beyond what the metadata needs are ignored.
    pub fn unserialize(
        &self,
        metadata: &[u8],
        buffers: impl IntoIterator<Item = Bytes>,
    ) -> Result<Object> {
        let mut queue = BufferQueue::new(buffers, false);
        let value = self.unserialize_from(metadata, &mut queue, None)?;
        queue.finish();
        Ok(value)
    }

    /// Canned records for `value`, data still inline.
    pub(crate) fn records(&self, value: &Object) -> Result<RecordSet> {
        let record = |v: &Object| Record::from_canned(self.canning.can(v));
        Ok(match value {
            Object::List(items) => RecordSet::Sequence(items.iter().map(record).collect::<Result<_>>()?),
            Object::Map(map) => RecordSet::Mapping(
                map.iter()
                    .map(|(k, v)| Ok((k.clone(), record(v)?)))
                    .collect::<Result<_>>()?,
            ),
            other => RecordSet::Single(record(other)?),
        })
    }

    /// Decode `metadata`, filling stripped records from `queue`.
    pub(crate) fn unserialize_from(
        &self,
        metadata: &[u8],
        queue: &mut BufferQueue,
        namespace: Option<&Namespace>,
    ) -> Result<Object> {
        let mut records = RecordSet::decode(metadata)?;
        queue.fill(&mut records)?;
        let uncan = |record: Record| self.canning.uncan(record.into_canned()?, namespace);
        Ok(match records {
            RecordSet::Single(record) => uncan(record)?,
            RecordSet::Sequence(records) => Object::List(
                records.into_iter().map(uncan).collect::<Result<_>>()?,
            ),
            RecordSet::Mapping(records) => Object::Map(
                records
                    .into_iter()
                    .map(|(k, r)| Ok((k, uncan(r)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

/// Out-of-band buffers consumed front to back.
pub(crate) struct BufferQueue {
    buffers: VecDeque<Bytes>,
    supplied: usize,
    copy: bool,
}

impl BufferQueue {
    pub(crate) fn new(buffers: impl IntoIterator<Item = Bytes>, copy: bool) -> Self {
        let buffers: VecDeque<Bytes> = buffers.into_iter().collect();
        Self {
            supplied: buffers.len(),
            buffers,
            copy,
        }
    }

    /// Fill every stripped record in buffer order.
    pub(crate) fn fill(&mut self, records: &mut RecordSet) -> Result<()> {
        for record in records.records_mut() {
            if !record.is_stripped() {
                continue;
            }
            let buffer = self.buffers.pop_front().ok_or(SerializeError::BufferUnderflow {
                supplied: self.supplied,
            })?;
            record.fill(buffer, self.copy)?;
        }
        Ok(())
    }

    /// Report buffers that no record claimed.
    pub(crate) fn finish(self) {
        if !self.buffers.is_empty() {
            warn!(
                leftover = self.buffers.len(),
                supplied = self.supplied,
                "ignoring unclaimed out-of-band buffers"
            );
        }
    }
}

/// Serialize `value` with the default canning.
pub fn serialize_object(value: &Object, threshold: usize) -> Result<(Bytes, Vec<Bytes>)> {
    ObjectSerializer::with_threshold(threshold).serialize(value)
}

/// Inverse of [`serialize_object`].
pub fn unserialize_object(
    metadata: &[u8],
    buffers: impl IntoIterator<Item = Bytes>,
) -> Result<Object> {
    ObjectSerializer::default().unserialize(metadata, buffers)
}
