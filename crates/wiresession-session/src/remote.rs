//! Error reply content.
//!
//! A failed request is answered with content of the form
//! `{status: "error", traceback: [..], etype, evalue}`.

use std::error::Error as StdError;
use std::fmt;

use serde_json::Value;

use crate::error::{Result, SessionError};
use crate::message::JsonMap;

pub const STATUS_OK: &str = "ok";
pub const STATUS_ERROR: &str = "error";

/// A failure reported by the remote side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    /// Remote error type name.
    pub etype: String,
    /// Remote error message.
    pub evalue: String,
    /// Traceback lines joined with newlines.
    pub traceback: String,
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "remote {}: {}", self.etype, self.evalue)
    }
}

impl StdError for RemoteError {}

/// Error content for a failure.
pub fn wrap_error<S: AsRef<str>>(etype: &str, evalue: &str, traceback: &[S]) -> JsonMap {
    let mut content = JsonMap::new();
    content.insert("status".to_string(), Value::from(STATUS_ERROR));
    content.insert(
        "traceback".to_string(),
        Value::Array(traceback.iter().map(|l| Value::from(l.as_ref())).collect()),
    );
    content.insert("etype".to_string(), Value::from(etype));
    content.insert("evalue".to_string(), Value::from(evalue));
    content
}

/// Error content for a local error; the source chain becomes the traceback.
pub fn wrap_std_error(etype: &str, err: &(dyn StdError + 'static)) -> JsonMap {
    let mut traceback = Vec::new();
    let mut source = err.source();
    while let Some(cause) = source {
        traceback.push(format!("caused by: {cause}"));
        source = cause.source();
    }
    wrap_error(etype, &err.to_string(), &traceback)
}

/// Rebuild a [`RemoteError`] from error content.
///
/// Missing fields are tolerated; the traceback may be a list of lines or a
/// single string.
pub fn unwrap_error(content: &JsonMap) -> RemoteError {
    let field = |key: &str| {
        content
            .get(key)
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    };
    let traceback = match content.get("traceback") {
        Some(Value::Array(lines)) => lines
            .iter()
            .map(|line| match line {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    let etype = field("etype");
    RemoteError {
        etype: if etype.is_empty() {
            "UnknownError".to_string()
        } else {
            etype
        },
        evalue: field("evalue"),
        traceback,
    }
}

/// `Ok(())` unless `content` reports an error status.
pub fn ensure_success(content: &JsonMap) -> Result<()> {
    match content.get("status").and_then(Value::as_str) {
        Some(STATUS_ERROR) => Err(SessionError::RemoteExecution(unwrap_error(content))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn wrap_unwrap_roundtrip() {
        let content = wrap_error("ZeroDivisionError", "division by zero", &["line 1", "line 2"]);
        assert_eq!(content["status"], json!("error"));
        assert_eq!(content["traceback"], json!(["line 1", "line 2"]));

        let err = unwrap_error(&content);
        assert_eq!(err.etype, "ZeroDivisionError");
        assert_eq!(err.evalue, "division by zero");
        assert_eq!(err.traceback, "line 1\nline 2");
        assert_eq!(err.to_string(), "remote ZeroDivisionError: division by zero");
    }

    #[test]
    fn ensure_success_by_status() {
        let mut ok = JsonMap::new();
        ok.insert("status".to_string(), json!("ok"));
        assert!(ensure_success(&ok).is_ok());
        assert!(ensure_success(&JsonMap::new()).is_ok());

        let err = ensure_success(&wrap_error::<&str>("KeyError", "'a'", &[])).unwrap_err();
        match err {
            SessionError::RemoteExecution(remote) => {
                assert_eq!(remote.etype, "KeyError");
                assert!(remote.traceback.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn sparse_content_is_tolerated() {
        let Value::Object(content) = json!({"status": "error", "traceback": "single"}) else {
            unreachable!()
        };
        let err = unwrap_error(&content);
        assert_eq!(err.etype, "UnknownError");
        assert_eq!(err.evalue, "");
        assert_eq!(err.traceback, "single");
    }

    #[test]
    fn std_error_chain_becomes_traceback() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let outer = SessionError::Transport(io.into());
        let content = wrap_std_error("TransportError", &outer);
        let remote = unwrap_error(&content);
        assert_eq!(remote.evalue, outer.to_string());
        assert!(remote.traceback.contains("disk gone"));
    }
}
