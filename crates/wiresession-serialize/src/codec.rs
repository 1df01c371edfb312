//! Pluggable message codec.
//!
//! A [`Codec`] is a matched `pack` / `unpack` pair over structured values
//! (mappings, sequences, strings, numbers, booleans, null). Headers, parent
//! headers, and mapping content travel through it; out-of-band buffers never
//! do.
//!
//! The built-in choice is explicit rather than probed: [`CodecChoice::Preferred`]
//! is compact JSON, [`CodecChoice::Fallback`] is MessagePack with named
//! fields.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::error::{Result, SerializeError};

/// Encoder half of a codec.
pub type PackFn = Arc<dyn Fn(&Value) -> Result<Vec<u8>> + Send + Sync>;

/// Decoder half of a codec.
pub type UnpackFn = Arc<dyn Fn(&[u8]) -> Result<Value> + Send + Sync>;

/// MessagePack encoding of an empty map.
const MSGPACK_EMPTY_MAP: &[u8] = &[0x80];

/// Which built-in codec a session uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodecChoice {
    /// Compact JSON.
    #[default]
    Preferred,
    /// MessagePack (`rmp-serde`, struct-as-map).
    Fallback,
}

impl CodecChoice {
    /// Short name used in configuration and diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            CodecChoice::Preferred => "json",
            CodecChoice::Fallback => "msgpack",
        }
    }
}

impl fmt::Display for CodecChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CodecChoice {
    type Err = SerializeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" | "preferred" => Ok(CodecChoice::Preferred),
            "msgpack" | "fallback" => Ok(CodecChoice::Fallback),
            other => Err(SerializeError::Configuration(format!(
                "unknown codec '{other}' (expected 'json' or 'msgpack')"
            ))),
        }
    }
}

/// A matched `pack` / `unpack` pair plus the precomputed packed empty mapping.
#[derive(Clone)]
pub struct Codec {
    name: String,
    pack: PackFn,
    unpack: UnpackFn,
    none: Bytes,
}

impl Codec {
    /// Build one of the built-in codecs.
    pub fn new(choice: CodecChoice) -> Self {
        match choice {
            CodecChoice::Preferred => Self::json(),
            CodecChoice::Fallback => Self::msgpack(),
        }
    }

    /// Compact JSON codec.
    pub fn json() -> Self {
        Self {
            name: CodecChoice::Preferred.name().to_string(),
            pack: Arc::new(|value| {
                serde_json::to_vec(value)
                    .map_err(|err| SerializeError::Encode(format!("json: {err}")))
            }),
            unpack: Arc::new(|bytes| {
                serde_json::from_slice(bytes)
                    .map_err(|err| SerializeError::Decode(format!("json: {err}")))
            }),
            none: Bytes::from_static(b"{}"),
        }
    }

    /// MessagePack codec.
    pub fn msgpack() -> Self {
        Self {
            name: CodecChoice::Fallback.name().to_string(),
            pack: Arc::new(|value| {
                rmp_serde::to_vec_named(value)
                    .map_err(|err| SerializeError::Encode(format!("msgpack: {err}")))
            }),
            unpack: Arc::new(|bytes| {
                rmp_serde::from_slice(bytes)
                    .map_err(|err| SerializeError::Decode(format!("msgpack: {err}")))
            }),
            none: Bytes::from_static(MSGPACK_EMPTY_MAP),
        }
    }

    /// Wire up a caller-supplied codec.
    ///
    /// Both halves must be present. The pair is checked once by packing an
    /// empty mapping and unpacking it again; the packed form becomes
    /// [`Codec::none`].
    pub fn custom(
        name: impl Into<String>,
        pack: Option<PackFn>,
        unpack: Option<UnpackFn>,
    ) -> Result<Self> {
        let name = name.into();
        let (pack, unpack) = match (pack, unpack) {
            (Some(pack), Some(unpack)) => (pack, unpack),
            (None, _) => {
                return Err(SerializeError::Configuration(format!(
                    "codec '{name}' is missing its pack function"
                )))
            }
            (_, None) => {
                return Err(SerializeError::Configuration(format!(
                    "codec '{name}' is missing its unpack function"
                )))
            }
        };

        let empty = Value::Object(Map::new());
        let none = pack(&empty).map_err(|err| {
            SerializeError::Configuration(format!(
                "codec '{name}' cannot pack an empty mapping: {err}"
            ))
        })?;
        let echoed = unpack(&none).map_err(|err| {
            SerializeError::Configuration(format!(
                "codec '{name}' cannot unpack its own output: {err}"
            ))
        })?;
        if echoed != empty {
            return Err(SerializeError::Configuration(format!(
                "codec '{name}' does not round-trip an empty mapping"
            )));
        }

        Ok(Self {
            name,
            pack,
            unpack,
            none: Bytes::from(none),
        })
    }

    /// Encode a value.
    pub fn pack(&self, value: &Value) -> Result<Bytes> {
        (self.pack)(value).map(Bytes::from)
    }

    /// Decode bytes produced by [`Codec::pack`].
    pub fn unpack(&self, bytes: &[u8]) -> Result<Value> {
        (self.unpack)(bytes)
    }

    /// Packed empty mapping, sent when a message has no content.
    pub fn none(&self) -> Bytes {
        self.none.clone()
    }

    /// Codec name for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(CodecChoice::default())
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").field("name", &self.name).finish()
    }
}
