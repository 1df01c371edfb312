//! Canonical, always-serializable stand-ins for [`Object`] values.
//!
//! A [`Canning`] implementation turns a value into a [`Canned`] tree that the
//! metadata encoder can represent without loss, and turns it back again.
//! Functions travel as [`Reference`]s and are resolved on the receiving side
//! against an optional [`Namespace`].

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::object::{Callable, DType, Namespace, NdArray, Object};

/// Leaf values that need no special treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Bulk array in canned form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CannedArray {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub data: Bytes,
}

/// Named reference to a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub name: String,
}

/// Canned form of an [`Object`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Canned {
    Scalar(Scalar),
    Binary(Bytes),
    Array(CannedArray),
    Sequence(Vec<Canned>),
    Mapping(BTreeMap<String, Canned>),
    Reference(Reference),
}

/// Converts values to and from their canned representation.
pub trait Canning {
    /// Produce the canned stand-in for `value`.
    fn can(&self, value: &Object) -> Canned;

    /// Rebuild a value, resolving references against `namespace` when given.
    fn uncan(&self, canned: Canned, namespace: Option<&Namespace>) -> Result<Object>;
}

/// Built-in canning for every [`Object`] variant.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCanning;

impl Canning for DefaultCanning {
    fn can(&self, value: &Object) -> Canned {
        match value {
            Object::Null => Canned::Scalar(Scalar::Null),
            Object::Bool(b) => Canned::Scalar(Scalar::Bool(*b)),
            Object::Int(i) => Canned::Scalar(Scalar::Int(*i)),
            Object::Float(f) => Canned::Scalar(Scalar::Float(*f)),
            Object::Str(s) => Canned::Scalar(Scalar::Str(s.clone())),
            Object::Bytes(b) => Canned::Binary(b.clone()),
            Object::Array(arr) => Canned::Array(CannedArray {
                dtype: arr.dtype(),
                shape: arr.shape().to_vec(),
                data: arr.data().clone(),
            }),
            Object::List(items) => Canned::Sequence(items.iter().map(|v| self.can(v)).collect()),
            Object::Map(map) => Canned::Mapping(
                map.iter()
                    .map(|(k, v)| (k.clone(), self.can(v)))
                    .collect(),
            ),
            Object::Function(f) => Canned::Reference(Reference {
                name: f.name().to_string(),
            }),
        }
    }

    fn uncan(&self, canned: Canned, namespace: Option<&Namespace>) -> Result<Object> {
        Ok(match canned {
            Canned::Scalar(Scalar::Null) => Object::Null,
            Canned::Scalar(Scalar::Bool(b)) => Object::Bool(b),
            Canned::Scalar(Scalar::Int(i)) => Object::Int(i),
            Canned::Scalar(Scalar::Float(f)) => Object::Float(f),
            Canned::Scalar(Scalar::Str(s)) => Object::Str(s),
            Canned::Binary(b) => Object::Bytes(b),
            Canned::Array(arr) => Object::Array(NdArray::new(arr.dtype, arr.shape, arr.data)?),
            Canned::Sequence(items) => Object::List(
                items
                    .into_iter()
                    .map(|c| self.uncan(c, namespace))
                    .collect::<Result<_>>()?,
            ),
            Canned::Mapping(map) => Object::Map(
                map.into_iter()
                    .map(|(k, c)| Ok((k, self.uncan(c, namespace)?)))
                    .collect::<Result<_>>()?,
            ),
            Canned::Reference(Reference { name }) => {
                let resolved = namespace.and_then(|ns| ns.resolve(&name));
                if resolved.is_none() {
                    tracing::debug!(name = %name, "callable not found in namespace, keeping reference");
                }
                Object::Function(resolved.unwrap_or_else(|| Callable::named(name)))
            }
        })
    }
}
