//! Property-based tests for identity stripping and envelope framing.

use bytes::Bytes;
use proptest::prelude::*;
use serde_json::Value;
use wiresession_serialize::CodecChoice;
use wiresession_session::{feed_identities, JsonMap, Outgoing, Session, SessionConfig, DELIM};
use wiresession_transport::{MemorySocket, MultipartSocket, RecvFlags};

// Identity frames never equal the delimiter.
fn identity_strategy() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 1..16)
        .prop_filter("not the delimiter", |v| v.as_slice() != DELIM)
        .prop_map(Bytes::from)
}

fn body_strategy() -> impl Strategy<Value = Vec<Bytes>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..32), 3..8)
        .prop_map(|frames| frames.into_iter().map(Bytes::from).collect())
}

// Content leaves covering strings and every JSON number representation.
fn leaf_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        ".{0,40}".prop_map(Value::String),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::from),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
    ]
}

#[test]
fn prop_identities_split_at_delimiter() {
    proptest!(|(
        idents in prop::collection::vec(identity_strategy(), 0..5),
        body in body_strategy(),
    )| {
        let mut frames = idents.clone();
        frames.push(Bytes::from_static(DELIM));
        frames.extend(body.iter().cloned());

        let (got_idents, rest) = feed_identities(frames, true).unwrap();
        prop_assert_eq!(got_idents, idents);
        prop_assert_eq!(rest, body);
    });
}

#[test]
fn prop_envelope_survives_transport() {
    proptest!(|(
        idents in prop::collection::vec(identity_strategy(), 0..3),
        entries in prop::collection::btree_map("[a-z]{1,8}", leaf_strategy(), 0..6),
        buffers in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..4),
        fallback in any::<bool>(),
    )| {
        let codec = if fallback { CodecChoice::Fallback } else { CodecChoice::Preferred };
        let mut session = Session::new(SessionConfig { codec, ..SessionConfig::default() });
        let (mut a, mut b) = MemorySocket::pair();

        let content: JsonMap = entries.into_iter().collect();
        let buffers: Vec<Bytes> = buffers.into_iter().map(Bytes::from).collect();
        let sent = session
            .send(
                &mut a,
                "prop",
                Outgoing::default()
                    .content(content)
                    .buffers(buffers)
                    .identities(idents.clone()),
            )
            .unwrap();

        let frames = b.recv_multipart(RecvFlags::empty()).unwrap();
        let (got_idents, rest) = session.feed_identities(frames).unwrap();
        prop_assert_eq!(got_idents, idents);
        let got = session.unpack_message(rest, true).unwrap();
        prop_assert_eq!(got, sent);
    });
}
