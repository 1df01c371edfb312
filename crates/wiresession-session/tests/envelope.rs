//! Envelopes over real transports: routed pairs, byte streams, relaying.

use bytes::Bytes;
use serde_json::{json, Value};
use wiresession_serialize::{
    pack_apply_message, unpack_apply_message, Callable, CodecChoice, Kwargs, Object,
};
use wiresession_session::{
    ensure_success, wrap_error, Content, JsonMap, Outgoing, Session, SessionConfig, SessionError,
    DELIM,
};
use wiresession_transport::{MemorySocket, MultipartSocket, RecvFlags, SendFlags};

fn mapping(value: Value) -> JsonMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a mapping, got {other}"),
    }
}

fn session(name: &str) -> Session {
    Session::new(SessionConfig {
        username: name.to_string(),
        ..SessionConfig::default()
    })
}

#[test]
fn routed_request_reply_keeps_identities_and_parent() {
    let (mut dealer, mut router) = MemorySocket::routed_pair(Bytes::from_static(b"client-1"));
    let mut client = session("client");
    let mut server = session("server");

    let request = client
        .send(
            &mut dealer,
            "execute_request",
            Outgoing::default().content(mapping(json!({"code": "x = 1"}))),
        )
        .unwrap();

    let (idents, received) = server
        .recv(&mut router, RecvFlags::empty(), true)
        .unwrap()
        .unwrap();
    assert_eq!(idents, vec![Bytes::from_static(b"client-1")]);
    assert_eq!(received, request);
    assert_eq!(received.header.username, "client");

    let reply = server
        .send(
            &mut router,
            "execute_reply",
            Outgoing::default()
                .content(mapping(json!({"status": "ok"})))
                .parent(&received)
                .identities(idents),
        )
        .unwrap();

    let (idents, got) = client
        .recv(&mut dealer, RecvFlags::empty(), true)
        .unwrap()
        .unwrap();
    assert!(idents.is_empty());
    assert_eq!(got, reply);
    assert_eq!(got.parent_id(), Some(request.msg_id()));
    assert_eq!(got.parent_header, request.header.to_map());
    assert!(ensure_success(got.content.as_mapping().unwrap()).is_ok());
}

#[test]
fn numeric_content_survives_both_codecs() {
    for codec in [CodecChoice::Preferred, CodecChoice::Fallback] {
        let (mut a, mut b) = MemorySocket::pair();
        let mut s = Session::new(SessionConfig {
            codec,
            ..SessionConfig::default()
        });
        let content = mapping(json!({
            "tiny": 1.0715660391465826e-75,
            "third": 1.0 / 3.0,
            "neg": i64::MIN,
            "big": u64::MAX,
        }));
        let sent = s
            .send(&mut a, "numbers", Outgoing::default().content(content))
            .unwrap();
        let (_, got) = s.recv(&mut b, RecvFlags::empty(), true).unwrap().unwrap();
        assert_eq!(got, sent, "codec {codec:?}");
    }
}

#[test]
fn frames_on_the_wire_follow_layout() {
    let (mut a, mut b) = MemorySocket::pair();
    let mut s = session("layout");
    let buffers = vec![Bytes::from_static(b"b0"), Bytes::from_static(b"b1")];
    s.send(
        &mut a,
        "data",
        Outgoing::default()
            .buffers(buffers.clone())
            .identities(vec![Bytes::from_static(b"route")]),
    )
    .unwrap();

    let frames = b.recv_multipart(RecvFlags::empty()).unwrap();
    assert_eq!(frames.len(), 1 + 1 + 3 + 2);
    assert_eq!(frames[0], Bytes::from_static(b"route"));
    assert_eq!(frames[1].as_ref(), DELIM);
    assert_eq!(frames[4], s.codec().none());
    assert_eq!(&frames[5..], &buffers[..]);
}

#[test]
fn lazy_content_relays_unchanged() {
    let (mut a, mut b) = MemorySocket::pair();
    let (mut c, mut d) = MemorySocket::pair();
    let mut origin = session("origin");
    let relay = session("relay");

    origin
        .send(
            &mut a,
            "stream",
            Outgoing::default().content(mapping(json!({"text": "hello", "n": [1, 2, 3]}))),
        )
        .unwrap();

    let (_, lazy) = relay.recv(&mut b, RecvFlags::empty(), false).unwrap().unwrap();
    let Content::Encoded(raw) = &lazy.content else {
        panic!("expected encoded content");
    };
    let raw = raw.clone();
    relay.send_message(&mut c, &lazy, &[]).unwrap();

    let frames = d.recv_multipart(RecvFlags::empty()).unwrap();
    assert_eq!(frames[3], raw);
    let decoded = relay.unpack_message(frames[1..].to_vec(), true).unwrap();
    assert_eq!(decoded.content.as_mapping().unwrap()["text"], json!("hello"));
    assert_eq!(decoded.header, lazy.header);
}

#[test]
fn remote_call_travels_in_buffers() {
    let (mut a, mut b) = MemorySocket::pair();
    let mut client = Session::new(SessionConfig {
        codec: CodecChoice::Fallback,
        ..SessionConfig::default()
    });
    let server = Session::new(SessionConfig {
        codec: CodecChoice::Fallback,
        ..SessionConfig::default()
    });

    let big = Bytes::from(vec![3u8; 10_000]);
    let mut kwargs = Kwargs::new();
    kwargs.insert("scale".to_string(), Object::Float(0.5));
    let chunks = pack_apply_message(
        &Callable::named("compute"),
        &[Object::Bytes(big.clone())],
        &kwargs,
        client.config().threshold,
    )
    .unwrap();

    client
        .send(&mut a, "apply_request", Outgoing::default().buffers(chunks))
        .unwrap();
    let (_, msg) = server.recv(&mut b, RecvFlags::empty(), true).unwrap().unwrap();
    let request = unpack_apply_message(msg.buffers, None, false).unwrap();
    assert_eq!(request.function.name(), "compute");
    assert_eq!(request.args, vec![Object::Bytes(big)]);
    assert_eq!(request.kwargs, kwargs);
}

#[test]
fn error_reply_surfaces_as_remote_execution() {
    let (mut a, mut b) = MemorySocket::pair();
    let mut s = session("worker");
    s.send(
        &mut a,
        "apply_reply",
        Outgoing::default().content(wrap_error(
            "ValueError",
            "bad input",
            &["frame 1", "frame 2"],
        )),
    )
    .unwrap();

    let (_, reply) = s.recv(&mut b, RecvFlags::empty(), true).unwrap().unwrap();
    match ensure_success(reply.content.as_mapping().unwrap()) {
        Err(SessionError::RemoteExecution(err)) => {
            assert_eq!(err.etype, "ValueError");
            assert_eq!(err.evalue, "bad input");
            assert_eq!(err.traceback, "frame 1\nframe 2");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn strict_session_rejects_identities_without_delimiter() {
    let (mut a, mut b) = MemorySocket::pair();
    a.send_multipart(
        vec![
            Bytes::from_static(b"id"),
            Bytes::from_static(b"{}"),
            Bytes::from_static(b"{}"),
            Bytes::from_static(b"{}"),
        ],
        SendFlags::empty(),
    )
    .unwrap();
    let err = session("strict")
        .recv(&mut b, RecvFlags::empty(), true)
        .unwrap_err();
    assert!(matches!(err, SessionError::MissingDelimiter { scanned: 1 }));
}

#[cfg(unix)]
#[test]
fn envelope_roundtrip_over_unix_stream() {
    use std::os::unix::net::UnixStream;
    use wiresession_transport::StreamSocket;

    let (left, right) = UnixStream::pair().unwrap();
    let mut tx = StreamSocket::from_unix(left).unwrap();
    let mut rx = StreamSocket::from_unix(right).unwrap();

    let mut s = session("stream");
    let sent = s
        .send(
            &mut tx,
            "status",
            Outgoing::default()
                .content(mapping(json!({"state": "busy"})))
                .buffers(vec![Bytes::from(vec![0u8; 4096])]),
        )
        .unwrap();
    let (_, got) = s.recv(&mut rx, RecvFlags::empty(), true).unwrap().unwrap();
    assert_eq!(got, sent);
}
