//! Serialized object records and the metadata blob that carries them.
//!
//! ```text
//! Record { type_descriptor, array?, data?, data_size }
//!
//! data present  -> payload is inline in the metadata blob
//! data absent   -> payload is the next out-of-band buffer
//! ```

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::canning::{Canned, CannedArray};
use crate::error::{Result, SerializeError};
use crate::object::DType;

/// How a record's data bytes are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDescriptor {
    /// Raw bytes.
    Buffer,
    /// Little-endian array elements; layout in [`Record::array`].
    Ndarray,
    /// A MessagePack-encoded [`Canned`] value.
    Encoded,
}

/// Layout of an `ndarray` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayLayout {
    pub dtype: DType,
    pub shape: Vec<usize>,
}

/// One serialized value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub type_descriptor: TypeDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub array: Option<ArrayLayout>,
    #[serde(default)]
    pub data: Option<Bytes>,
    pub data_size: usize,
}

impl Record {
    /// Build the record for a canned value.
    pub fn from_canned(canned: Canned) -> Result<Self> {
        let (type_descriptor, array, data) = match canned {
            Canned::Binary(data) => (TypeDescriptor::Buffer, None, data),
            Canned::Array(CannedArray { dtype, shape, data }) => (
                TypeDescriptor::Ndarray,
                Some(ArrayLayout { dtype, shape }),
                data,
            ),
            other => (
                TypeDescriptor::Encoded,
                None,
                Bytes::from(rmp_serde::to_vec_named(&other)?),
            ),
        };
        Ok(Self {
            type_descriptor,
            array,
            data_size: data.len(),
            data: Some(data),
        })
    }

    /// Rebuild the canned value. The record must carry its data.
    pub fn into_canned(self) -> Result<Canned> {
        let data = self.data.ok_or_else(|| {
            SerializeError::Decode("record has neither inline data nor a buffer".to_string())
        })?;
        match self.type_descriptor {
            TypeDescriptor::Buffer => Ok(Canned::Binary(data)),
            TypeDescriptor::Ndarray => {
                let layout = self.array.ok_or_else(|| {
                    SerializeError::Decode("ndarray record is missing its layout".to_string())
                })?;
                Ok(Canned::Array(CannedArray {
                    dtype: layout.dtype,
                    shape: layout.shape,
                    data,
                }))
            }
            TypeDescriptor::Encoded => Ok(rmp_serde::from_slice(&data)?),
        }
    }

    /// Remove the data if it is larger than `threshold`, returning it.
    pub fn strip(&mut self, threshold: usize) -> Option<Bytes> {
        if self.data_size > threshold {
            self.data.take()
        } else {
            None
        }
    }

    /// True when the data travels out-of-band.
    pub fn is_stripped(&self) -> bool {
        self.data.is_none()
    }

    /// Restore stripped data from an out-of-band buffer.
    ///
    /// With `copy` set, `buffer` and `ndarray` payloads are copied into a
    /// fresh allocation; otherwise the buffer is adopted as-is. Encoded
    /// records are decoded straight from the buffer and never copied.
    pub fn fill(&mut self, buffer: Bytes, copy: bool) -> Result<()> {
        if buffer.len() != self.data_size {
            return Err(SerializeError::BufferLength {
                expected: self.data_size,
                actual: buffer.len(),
            });
        }
        let data = match self.type_descriptor {
            TypeDescriptor::Buffer | TypeDescriptor::Ndarray if copy => {
                Bytes::copy_from_slice(&buffer)
            }
            _ => buffer,
        };
        self.data = Some(data);
        Ok(())
    }
}

/// Records produced for one top-level value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecordSet {
    Single(Record),
    Sequence(Vec<Record>),
    Mapping(BTreeMap<String, Record>),
}

impl RecordSet {
    /// Records in buffer order: sequence order, or sorted key order.
    pub fn records_mut(&mut self) -> Box<dyn Iterator<Item = &mut Record> + '_> {
        match self {
            RecordSet::Single(record) => Box::new(std::iter::once(record)),
            RecordSet::Sequence(records) => Box::new(records.iter_mut()),
            RecordSet::Mapping(records) => Box::new(records.values_mut()),
        }
    }

    /// Number of records whose data travels out-of-band.
    pub fn stripped_count(&self) -> usize {
        match self {
            RecordSet::Single(record) => usize::from(record.is_stripped()),
            RecordSet::Sequence(records) => records.iter().filter(|r| r.is_stripped()).count(),
            RecordSet::Mapping(records) => records.values().filter(|r| r.is_stripped()).count(),
        }
    }

    /// Encode as a metadata blob.
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(rmp_serde::to_vec_named(self)?))
    }

    /// Decode a metadata blob.
    pub fn decode(metadata: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(metadata)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canning::Scalar;

    #[test]
    fn binary_records_keep_raw_bytes() {
        let record = Record::from_canned(Canned::Binary(Bytes::from_static(b"abc"))).unwrap();
        assert_eq!(record.type_descriptor, TypeDescriptor::Buffer);
        assert_eq!(record.data.as_deref(), Some(&b"abc"[..]));
        assert_eq!(record.data_size, 3);
    }

    #[test]
    fn strip_only_above_threshold() {
        let mut small = Record::from_canned(Canned::Binary(Bytes::from(vec![1; 4]))).unwrap();
        assert!(small.strip(4).is_none());
        assert!(!small.is_stripped());

        let mut large = Record::from_canned(Canned::Binary(Bytes::from(vec![1; 5]))).unwrap();
        assert_eq!(large.strip(4).unwrap().len(), 5);
        assert!(large.is_stripped());
        assert_eq!(large.data_size, 5);
    }

    #[test]
    fn fill_checks_length() {
        let mut record = Record::from_canned(Canned::Binary(Bytes::from(vec![7; 8]))).unwrap();
        record.strip(0);
        let err = record.fill(Bytes::from(vec![7; 3]), false).unwrap_err();
        assert!(matches!(
            err,
            SerializeError::BufferLength {
                expected: 8,
                actual: 3
            }
        ));
    }

    #[test]
    fn fill_without_copy_adopts_buffer() {
        let buffer = Bytes::from(vec![9u8; 16]);
        let mut record = Record::from_canned(Canned::Binary(buffer.clone())).unwrap();
        record.strip(0);
        record.fill(buffer.clone(), false).unwrap();
        assert_eq!(record.data.as_ref().unwrap().as_ptr(), buffer.as_ptr());

        record.strip(0);
        record.fill(buffer.clone(), true).unwrap();
        assert_ne!(record.data.as_ref().unwrap().as_ptr(), buffer.as_ptr());
        assert_eq!(record.data.as_ref().unwrap(), &buffer);
    }

    #[test]
    fn encoded_record_roundtrip() {
        let canned = Canned::Sequence(vec![
            Canned::Scalar(Scalar::Int(-3)),
            Canned::Scalar(Scalar::Str("x".to_string())),
        ]);
        let record = Record::from_canned(canned.clone()).unwrap();
        assert_eq!(record.type_descriptor, TypeDescriptor::Encoded);
        assert_eq!(record.into_canned().unwrap(), canned);
    }

    #[test]
    fn missing_data_is_decode_error() {
        let mut record = Record::from_canned(Canned::Binary(Bytes::from(vec![0; 2]))).unwrap();
        record.strip(0);
        assert!(record.into_canned().unwrap_err().is_decode());
    }

    #[test]
    fn record_set_metadata_roundtrip() {
        let mut records = BTreeMap::new();
        records.insert(
            "b".to_string(),
            Record::from_canned(Canned::Binary(Bytes::from_static(b"bb"))).unwrap(),
        );
        records.insert(
            "a".to_string(),
            Record::from_canned(Canned::Scalar(Scalar::Bool(true))).unwrap(),
        );
        let set = RecordSet::Mapping(records);
        let decoded = RecordSet::decode(&set.encode().unwrap()).unwrap();
        assert_eq!(decoded, set);
    }
}
