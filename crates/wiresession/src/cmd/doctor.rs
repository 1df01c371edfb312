use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Serialize;
use serde_json::{json, Value};
use wiresession_serialize::{
    pack_apply_message, serialize_object, unpack_apply_message, unserialize_object, Callable,
    Codec, CodecChoice, Kwargs, NdArray, Object, DEFAULT_THRESHOLD,
};
use wiresession_session::{Outgoing, Session, SessionConfig};
use wiresession_transport::{MemorySocket, RecvFlags};

use crate::cmd::DoctorArgs;
use crate::exit::{CliResult, HEALTH_CHECK_FAILED, SUCCESS};
use crate::output::OutputFormat;

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Pass,
    Fail,
    Info,
    #[cfg_attr(unix, allow(dead_code))]
    Skip,
}

#[derive(Debug, Serialize)]
struct CheckResult {
    name: String,
    status: CheckStatus,
    detail: String,
}

impl CheckResult {
    fn from_outcome(name: &str, outcome: Result<String, String>) -> Self {
        let (status, detail) = match outcome {
            Ok(detail) => (CheckStatus::Pass, detail),
            Err(detail) => (CheckStatus::Fail, detail),
        };
        Self {
            name: name.to_string(),
            status,
            detail,
        }
    }
}

#[derive(Debug, Serialize)]
struct DoctorOutput {
    kind: &'static str,
    checks: Vec<CheckResult>,
    overall: &'static str,
}

pub fn run(_args: DoctorArgs, format: OutputFormat) -> CliResult<i32> {
    let checks = vec![
        codec_check(CodecChoice::Preferred),
        codec_check(CodecChoice::Fallback),
        serializer_check(),
        apply_check(),
        envelope_check(),
        unix_stream_check(),
        compiled_features_check(),
    ];

    let has_fail = checks.iter().any(|c| matches!(c.status, CheckStatus::Fail));
    let overall = if has_fail { "fail" } else { "pass" };

    let output = DoctorOutput {
        kind: "doctor-report",
        checks,
        overall,
    };

    print_doctor(&output, format);

    if has_fail {
        Ok(HEALTH_CHECK_FAILED)
    } else {
        Ok(SUCCESS)
    }
}

fn print_doctor(output: &DoctorOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => {
            println!("wiresession doctor\n");
            for c in &output.checks {
                println!(
                    "  [{:>4}] {:<22} {}",
                    status_text(c.status),
                    c.name,
                    c.detail
                );
            }
            if output.overall == "pass" {
                println!("\n  Result: all checks passed");
            } else {
                println!("\n  Result: one or more checks failed");
            }
        }
        OutputFormat::Raw => {
            println!("{}", output.overall);
        }
    }
}

fn status_text(status: CheckStatus) -> &'static str {
    match status {
        CheckStatus::Pass => "PASS",
        CheckStatus::Fail => "FAIL",
        CheckStatus::Info => "INFO",
        CheckStatus::Skip => "SKIP",
    }
}

fn codec_check(choice: CodecChoice) -> CheckResult {
    let name = format!("codec_{}", choice.name());
    let outcome = (|| -> Result<String, String> {
        let codec = Codec::new(choice);
        let sample = json!({"msg_id": "doctor", "n": [1, 2.5, null], "ok": true});
        let packed = codec.pack(&sample).map_err(|err| err.to_string())?;
        let unpacked = codec.unpack(&packed).map_err(|err| err.to_string())?;
        if unpacked != sample {
            return Err("decoded value differs from input".to_string());
        }
        if codec.unpack(&codec.none()).map_err(|err| err.to_string())? != json!({}) {
            return Err("packed empty mapping does not decode to {}".to_string());
        }
        Ok(format!("{} byte sample round-trips", packed.len()))
    })();
    CheckResult::from_outcome(&name, outcome)
}

fn serializer_check() -> CheckResult {
    let outcome = (|| -> Result<String, String> {
        let mut map = BTreeMap::new();
        map.insert("b".to_string(), Object::Bytes(Bytes::from(vec![b'X'; 256])));
        map.insert("a".to_string(), Object::Array(NdArray::from_f64(&[0.25; 32])));
        map.insert("small".to_string(), Object::Int(1));
        let value = Object::Map(map);

        let (metadata, buffers) =
            serialize_object(&value, DEFAULT_THRESHOLD).map_err(|err| err.to_string())?;
        if buffers.len() != 2 || buffers[0].len() != 256 || buffers[1][0] != b'X' {
            return Err("out-of-band buffers are not in sorted key order".to_string());
        }
        let decoded = unserialize_object(&metadata, buffers).map_err(|err| err.to_string())?;
        if decoded != value {
            return Err("decoded value differs from input".to_string());
        }
        Ok(format!("{} byte metadata, 2 buffers", metadata.len()))
    })();
    CheckResult::from_outcome("serializer_roundtrip", outcome)
}

fn apply_check() -> CheckResult {
    let outcome = (|| -> Result<String, String> {
        let f = Callable::named("doctor.echo");
        let args = vec![Object::Bytes(Bytes::from(vec![1u8; 128]))];
        let mut kwargs = Kwargs::new();
        kwargs.insert("k".to_string(), Object::Bytes(Bytes::from(vec![2u8; 128])));

        let chunks = pack_apply_message(&f, &args, &kwargs, DEFAULT_THRESHOLD)
            .map_err(|err| err.to_string())?;
        let count = chunks.len();
        let request = unpack_apply_message(chunks, None, false).map_err(|err| err.to_string())?;
        if request.function != f || request.args != args || request.kwargs != kwargs {
            return Err("decoded call differs from input".to_string());
        }
        Ok(format!("{count} chunks"))
    })();
    CheckResult::from_outcome("apply_roundtrip", outcome)
}

fn envelope_check() -> CheckResult {
    let outcome = (|| -> Result<String, String> {
        let (mut dealer, mut router) = MemorySocket::routed_pair(Bytes::from_static(b"doctor"));
        let mut session = Session::new(SessionConfig::default());
        let Value::Object(content) = json!({"check": "envelope"}) else {
            return Err("content is not a mapping".to_string());
        };
        let sent = session
            .send(
                &mut dealer,
                "doctor_request",
                Outgoing::default()
                    .content(content)
                    .buffers(vec![Bytes::from_static(b"buffer")]),
            )
            .map_err(|err| err.to_string())?;
        let (identities, received) = session
            .recv(&mut router, RecvFlags::NOBLOCK, true)
            .map_err(|err| err.to_string())?
            .ok_or_else(|| "no message received".to_string())?;
        if identities.len() != 1 || received != sent {
            return Err("received envelope differs from sent".to_string());
        }
        Ok("routed send/recv with identity stripping".to_string())
    })();
    CheckResult::from_outcome("envelope_framing", outcome)
}

fn unix_stream_check() -> CheckResult {
    #[cfg(unix)]
    {
        use std::os::unix::net::UnixStream;
        use wiresession_transport::StreamSocket;

        let outcome = (|| -> Result<String, String> {
            let (left, right) = UnixStream::pair().map_err(|err| err.to_string())?;
            let mut tx = StreamSocket::from_unix(left).map_err(|err| err.to_string())?;
            let mut rx = StreamSocket::from_unix(right).map_err(|err| err.to_string())?;
            let mut session = Session::new(SessionConfig::default());
            let sent = session
                .send(&mut tx, "doctor_stream", Outgoing::default())
                .map_err(|err| err.to_string())?;
            let (_, received) = session
                .recv(&mut rx, RecvFlags::empty(), true)
                .map_err(|err| err.to_string())?
                .ok_or_else(|| "no message received".to_string())?;
            if received != sent {
                return Err("received envelope differs from sent".to_string());
            }
            Ok("Unix socket pair carries framed messages".to_string())
        })();
        CheckResult::from_outcome("unix_stream", outcome)
    }

    #[cfg(not(unix))]
    {
        CheckResult {
            name: "unix_stream".to_string(),
            status: CheckStatus::Skip,
            detail: "Unix sockets unavailable on this platform".to_string(),
        }
    }
}

fn compiled_features_check() -> CheckResult {
    let mut features = vec!["cli"];
    if cfg!(feature = "async") {
        features.push("async");
    }

    CheckResult {
        name: "compiled_features".to_string(),
        status: CheckStatus::Info,
        detail: features.join(", "),
    }
}
