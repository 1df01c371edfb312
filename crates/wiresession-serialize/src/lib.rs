//! Value encoding for wiresession.
//!
//! - [`codec`]: the pluggable `pack` / `unpack` pair used for headers and
//!   mapping content
//! - [`serializer`]: splits one [`Object`] into a metadata blob plus
//!   out-of-band buffers, keeping large payloads out of the metadata
//! - [`apply`]: remote-call payloads built on the serializer
//!
//! Mapping values are always visited in sorted key order. Out-of-band buffers
//! are matched to records purely by position, so both sides of the wire rely
//! on that order.

pub mod apply;
pub mod canning;
pub mod codec;
pub mod error;
pub mod object;
pub mod record;
pub mod serializer;

pub use apply::{pack_apply_message, unpack_apply_message, ApplyRequest};
pub use canning::{Canned, Canning, DefaultCanning};
pub use codec::{Codec, CodecChoice, PackFn, UnpackFn};
pub use error::{Result, SerializeError};
pub use object::{Callable, DType, Kwargs, Namespace, NdArray, Object};
pub use serializer::{serialize_object, unserialize_object, ObjectSerializer, DEFAULT_THRESHOLD};
