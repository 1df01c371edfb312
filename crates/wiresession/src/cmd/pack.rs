use std::fs::{self, OpenOptions};
use std::io::{self, Write};

use bytes::Bytes;
use serde_json::Value;
use tracing::info;
use wiresession_session::{Content, JsonMap, Outgoing, Session};
use wiresession_transport::StreamSocket;

use crate::cmd::PackArgs;
use crate::exit::{io_error, session_error, CliError, CliResult, SUCCESS, USAGE};

pub fn run(args: PackArgs) -> CliResult<i32> {
    let mut session = Session::new(args.session.config());
    let outgoing = resolve_outgoing(&args)?;

    let writer: Box<dyn Write> = match &args.out {
        Some(path) => Box::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let mut socket = StreamSocket::new(io::empty(), writer);

    let message = session
        .send(&mut socket, &args.msg_type, outgoing)
        .map_err(|err| session_error("pack failed", err))?;
    info!(
        msg_type = %message.msg_type,
        msg_id = %message.msg_id(),
        buffers = message.buffers.len(),
        "packed message"
    );

    Ok(SUCCESS)
}

fn resolve_outgoing(args: &PackArgs) -> CliResult<Outgoing> {
    let content = match (&args.content, &args.content_file) {
        (Some(text), _) => Some(parse_json("--content", text)?),
        (None, Some(path)) => {
            let text = fs::read_to_string(path).map_err(|err| {
                io_error(&format!("failed reading {}", path.display()), err)
            })?;
            Some(parse_json("--content-file", &text)?)
        }
        (None, None) => None,
    };
    let content = content
        .map(Content::try_from)
        .transpose()
        .map_err(|err| CliError::new(USAGE, format!("--content: {err}")))?;

    let parent = args
        .parent
        .as_deref()
        .map(|text| parse_json("--parent", text))
        .transpose()?;

    let extra_header = match args.header.as_deref() {
        Some(text) => match parse_json("--header", text)? {
            Value::Object(map) => Some(map),
            _ => {
                return Err(CliError::new(USAGE, "--header must be a JSON mapping"));
            }
        },
        None => None::<JsonMap>,
    };

    let buffers = args
        .buffers
        .iter()
        .map(|path| {
            fs::read(path)
                .map(Bytes::from)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
        })
        .collect::<CliResult<Vec<_>>>()?;

    let identities = args
        .identities
        .iter()
        .map(|id| Bytes::from(id.clone().into_bytes()))
        .collect();

    Ok(Outgoing {
        content,
        parent,
        extra_header,
        buffers,
        identities,
    })
}

fn parse_json(flag: &str, text: &str) -> CliResult<Value> {
    serde_json::from_str(text)
        .map_err(|err| CliError::new(USAGE, format!("{flag} is not valid JSON: {err}")))
}
