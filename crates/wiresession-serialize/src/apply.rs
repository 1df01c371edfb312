//! Remote-call payloads.
//!
//! Chunk layout:
//!
//! ```text
//! [callable, args_metadata, kwargs_metadata, args_buffers..., kwargs_buffers...]
//! ```

use bytes::Bytes;
use tracing::debug;

use crate::canning::{Canned, Canning};
use crate::error::{Result, SerializeError};
use crate::object::{Callable, Kwargs, Namespace, Object};
use crate::serializer::{BufferQueue, ObjectSerializer};

/// A decoded remote call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyRequest {
    pub function: Callable,
    pub args: Vec<Object>,
    pub kwargs: Kwargs,
}

impl ApplyRequest {
    /// Invoke the function with the decoded arguments.
    pub fn call(self) -> Result<Object> {
        self.function.call(self.args, self.kwargs)
    }
}

impl<C: Canning> ObjectSerializer<C> {
    /// Pack a call to `function` into wire chunks.
    pub fn pack_apply(
        &self,
        function: &Callable,
        args: &[Object],
        kwargs: &Kwargs,
    ) -> Result<Vec<Bytes>> {
        let callable = self.canning().can(&Object::Function(function.clone()));
        let callable = Bytes::from(rmp_serde::to_vec_named(&callable)?);
        let (args_meta, args_buffers) = self.serialize(&Object::List(args.to_vec()))?;
        let (kwargs_meta, kwargs_buffers) = self.serialize(&Object::Map(kwargs.clone()))?;

        let mut chunks = Vec::with_capacity(3 + args_buffers.len() + kwargs_buffers.len());
        chunks.push(callable);
        chunks.push(args_meta);
        chunks.push(kwargs_meta);
        chunks.extend(args_buffers);
        chunks.extend(kwargs_buffers);
        debug!(function = function.name(), chunks = chunks.len(), "packed apply message");
        Ok(chunks)
    }

    /// Decode chunks produced by [`ObjectSerializer::pack_apply`].
    ///
    /// The callable is resolved against `namespace` when given. With `copy`
    /// unset, binary and array payloads share the chunk allocations.
    pub fn unpack_apply(
        &self,
        chunks: impl IntoIterator<Item = Bytes>,
        namespace: Option<&Namespace>,
        copy: bool,
    ) -> Result<ApplyRequest> {
        let mut chunks = chunks.into_iter();
        let (Some(callable), Some(args_meta), Some(kwargs_meta)) =
            (chunks.next(), chunks.next(), chunks.next())
        else {
            return Err(SerializeError::MalformedPayload(
                "apply message needs at least 3 chunks".to_string(),
            ));
        };

        let canned: Canned = rmp_serde::from_slice(&callable)?;
        let function = match self.canning().uncan(canned, namespace)? {
            Object::Function(function) => function,
            other => {
                return Err(SerializeError::MalformedPayload(format!(
                    "first chunk decodes to {}, not a function",
                    other.kind()
                )))
            }
        };

        let mut queue = BufferQueue::new(chunks, copy);
        let args = match self.unserialize_from(&args_meta, &mut queue, namespace)? {
            Object::List(args) => args,
            other => {
                return Err(SerializeError::MalformedPayload(format!(
                    "args decode to {}, not a sequence",
                    other.kind()
                )))
            }
        };
        let kwargs = match self.unserialize_from(&kwargs_meta, &mut queue, namespace)? {
            Object::Map(kwargs) => kwargs,
            other => {
                return Err(SerializeError::MalformedPayload(format!(
                    "kwargs decode to {}, not a mapping",
                    other.kind()
                )))
            }
        };
        queue.finish();

        Ok(ApplyRequest {
            function,
            args,
            kwargs,
        })
    }
}

/// Pack a remote call with the default canning.
pub fn pack_apply_message(
    function: &Callable,
    args: &[Object],
    kwargs: &Kwargs,
    threshold: usize,
) -> Result<Vec<Bytes>> {
    ObjectSerializer::with_threshold(threshold).pack_apply(function, args, kwargs)
}

/// Inverse of [`pack_apply_message`].
pub fn unpack_apply_message(
    chunks: impl IntoIterator<Item = Bytes>,
    namespace: Option<&Namespace>,
    copy: bool,
) -> Result<ApplyRequest> {
    ObjectSerializer::default().unpack_apply(chunks, namespace, copy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canning::DefaultCanning;
    use crate::serializer::{serialize_object, DEFAULT_THRESHOLD};

    fn blob(byte: u8, len: usize) -> Bytes {
        Bytes::from(vec![byte; len])
    }

    #[test]
    fn chunk_order_is_callable_args_kwargs_then_buffers() {
        let f = Callable::named("work");
        let args = vec![Object::Bytes(blob(b'a', 90))];
        let mut kwargs = Kwargs::new();
        kwargs.insert("k".to_string(), Object::Bytes(blob(b'k', 90)));

        let chunks = pack_apply_message(&f, &args, &kwargs, DEFAULT_THRESHOLD).unwrap();
        assert_eq!(chunks.len(), 5);
        assert_eq!(chunks[3], blob(b'a', 90));
        assert_eq!(chunks[4], blob(b'k', 90));
    }

    #[test]
    fn too_few_chunks_is_malformed() {
        let err = unpack_apply_message(vec![Bytes::new(), Bytes::new()], None, true).unwrap_err();
        assert!(matches!(err, SerializeError::MalformedPayload(_)));
    }

    #[test]
    fn non_function_first_chunk_is_malformed() {
        let chunks = pack_apply_message(&Callable::named("f"), &[], &Kwargs::new(), 64).unwrap();
        let (not_a_function, _) = serialize_object(&Object::Int(1), 64).unwrap();
        let canned = rmp_serde::to_vec_named(&DefaultCanning.can(&Object::Int(5))).unwrap();
        let mut swapped = chunks.clone();
        swapped[0] = Bytes::from(canned);
        let err = unpack_apply_message(swapped, None, true).unwrap_err();
        assert!(matches!(err, SerializeError::MalformedPayload(_)));

        let mut swapped = chunks;
        swapped[1] = not_a_function;
        let err = unpack_apply_message(swapped, None, true).unwrap_err();
        assert!(matches!(err, SerializeError::MalformedPayload(_)));
    }

    #[test]
    fn resolved_call_runs() {
        let mut ns = Namespace::new();
        ns.register("len", |args, kwargs| {
            let n = args
                .iter()
                .chain(kwargs.values())
                .map(|o| o.as_bytes().map_or(0, |b| b.len() as i64))
                .sum::<i64>();
            Ok(Object::Int(n))
        });
        let mut kwargs = Kwargs::new();
        kwargs.insert("extra".to_string(), Object::Bytes(blob(0, 100)));
        let chunks = pack_apply_message(
            &Callable::named("len"),
            &[Object::Bytes(blob(1, 200))],
            &kwargs,
            DEFAULT_THRESHOLD,
        )
        .unwrap();

        let request = unpack_apply_message(chunks, Some(&ns), false).unwrap();
        assert!(request.function.is_resolved());
        assert_eq!(request.call().unwrap(), Object::Int(300));
    }

    #[test]
    fn kwargs_underflow() {
        let mut kwargs = Kwargs::new();
        kwargs.insert("k".to_string(), Object::Bytes(blob(1, 100)));
        let mut chunks =
            pack_apply_message(&Callable::named("f"), &[], &kwargs, DEFAULT_THRESHOLD).unwrap();
        chunks.pop();
        let err = unpack_apply_message(chunks, None, true).unwrap_err();
        assert!(matches!(err, SerializeError::BufferUnderflow { supplied: 0 }));
    }
}
