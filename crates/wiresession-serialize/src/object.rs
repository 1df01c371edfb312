//! Runtime values that can be shipped to a remote peer.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SerializeError};

/// Keyword arguments, always iterated in sorted key order.
pub type Kwargs = BTreeMap<String, Object>;

/// Signature of a function that can be resolved from a [`Namespace`].
pub type NativeFn = Arc<dyn Fn(Vec<Object>, Kwargs) -> Result<Object> + Send + Sync>;

/// A value the serializer understands.
///
/// Mappings are `BTreeMap`s so that iteration is always in sorted key order;
/// out-of-band buffer order depends on it.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Raw binary payload.
    Bytes(Bytes),
    /// Bulk numeric array.
    Array(NdArray),
    List(Vec<Object>),
    Map(BTreeMap<String, Object>),
    /// A function, shipped by reference.
    Function(Callable),
}

impl Object {
    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Null => "null",
            Object::Bool(_) => "bool",
            Object::Int(_) => "int",
            Object::Float(_) => "float",
            Object::Str(_) => "str",
            Object::Bytes(_) => "bytes",
            Object::Array(_) => "ndarray",
            Object::List(_) => "list",
            Object::Map(_) => "map",
            Object::Function(_) => "function",
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Object::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Object::Bool(v)
    }
}

impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Object::Int(v)
    }
}

impl From<i32> for Object {
    fn from(v: i32) -> Self {
        Object::Int(i64::from(v))
    }
}

impl From<f64> for Object {
    fn from(v: f64) -> Self {
        Object::Float(v)
    }
}

impl From<&str> for Object {
    fn from(v: &str) -> Self {
        Object::Str(v.to_string())
    }
}

impl From<String> for Object {
    fn from(v: String) -> Self {
        Object::Str(v)
    }
}

impl From<Bytes> for Object {
    fn from(v: Bytes) -> Self {
        Object::Bytes(v)
    }
}

impl From<Vec<u8>> for Object {
    fn from(v: Vec<u8>) -> Self {
        Object::Bytes(Bytes::from(v))
    }
}

impl From<NdArray> for Object {
    fn from(v: NdArray) -> Self {
        Object::Array(v)
    }
}

impl From<Vec<Object>> for Object {
    fn from(v: Vec<Object>) -> Self {
        Object::List(v)
    }
}

impl From<BTreeMap<String, Object>> for Object {
    fn from(v: BTreeMap<String, Object>) -> Self {
        Object::Map(v)
    }
}

impl From<Callable> for Object {
    fn from(v: Callable) -> Self {
        Object::Function(v)
    }
}

/// Element type of an [`NdArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    U8,
    I32,
    I64,
    F32,
    F64,
}

impl DType {
    /// Size of one element in bytes.
    pub fn item_size(self) -> usize {
        match self {
            DType::U8 => 1,
            DType::I32 | DType::F32 => 4,
            DType::I64 | DType::F64 => 8,
        }
    }
}

/// Dense array of little-endian elements.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    dtype: DType,
    shape: Vec<usize>,
    data: Bytes,
}

impl NdArray {
    /// Build an array, checking that `data` holds exactly `shape` elements.
    pub fn new(dtype: DType, shape: Vec<usize>, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let elements = shape
            .iter()
            .try_fold(1usize, |acc, dim| acc.checked_mul(*dim))
            .ok_or_else(|| SerializeError::InvalidArray(format!("shape {shape:?} overflows")))?;
        let expected = elements
            .checked_mul(dtype.item_size())
            .ok_or_else(|| SerializeError::InvalidArray(format!("shape {shape:?} overflows")))?;
        if data.len() != expected {
            return Err(SerializeError::InvalidArray(format!(
                "{dtype:?} array of shape {shape:?} needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self { dtype, shape, data })
    }

    /// One-dimensional `f64` array.
    pub fn from_f64(values: &[f64]) -> Self {
        let mut buf = BytesMut::with_capacity(values.len() * 8);
        for v in values {
            buf.put_f64_le(*v);
        }
        Self {
            dtype: DType::F64,
            shape: vec![values.len()],
            data: buf.freeze(),
        }
    }

    /// One-dimensional `i64` array.
    pub fn from_i64(values: &[i64]) -> Self {
        let mut buf = BytesMut::with_capacity(values.len() * 8);
        for v in values {
            buf.put_i64_le(*v);
        }
        Self {
            dtype: DType::I64,
            shape: vec![values.len()],
            data: buf.freeze(),
        }
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Raw element bytes.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len() / self.dtype.item_size()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A function shipped by name.
///
/// A callable decoded on the receiving side is resolved against a
/// [`Namespace`]; if the name is unknown it stays an unresolved reference and
/// [`Callable::call`] fails with [`SerializeError::Unresolved`].
#[derive(Clone)]
pub struct Callable {
    name: String,
    func: Option<NativeFn>,
}

impl Callable {
    /// A reference to a function by name, with no local implementation.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            func: None,
        }
    }

    /// A function with a local implementation.
    pub fn native<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Vec<Object>, Kwargs) -> Result<Object> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Some(Arc::new(func)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when a local implementation is attached.
    pub fn is_resolved(&self) -> bool {
        self.func.is_some()
    }

    /// Invoke the function.
    pub fn call(&self, args: Vec<Object>, kwargs: Kwargs) -> Result<Object> {
        match &self.func {
            Some(func) => func(args, kwargs),
            None => Err(SerializeError::Unresolved(self.name.clone())),
        }
    }
}

/// Callables compare by name; the attached implementation is not part of
/// their identity.
impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("resolved", &self.func.is_some())
            .finish()
    }
}

/// Functions available for resolving callables by name.
#[derive(Clone, Default)]
pub struct Namespace {
    functions: HashMap<String, NativeFn>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a function under `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(Vec<Object>, Kwargs) -> Result<Object> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(func));
        self
    }

    /// Look up `name`, returning a resolved callable.
    pub fn resolve(&self, name: &str) -> Option<Callable> {
        self.functions.get(name).map(|func| Callable {
            name: name.to_string(),
            func: Some(Arc::clone(func)),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.functions.keys().collect();
        names.sort();
        f.debug_struct("Namespace").field("functions", &names).finish()
    }
}
