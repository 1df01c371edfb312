use std::fs::File;
use std::io::{self, Read};

use tracing::debug;
use wiresession_session::{Session, SessionError};
use wiresession_transport::{RecvFlags, StreamSocket, TransportError};

use crate::cmd::InspectArgs;
use crate::exit::{io_error, session_error, CliResult, SUCCESS};
use crate::output::{print_messages, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let session = Session::new(args.session.config());
    let reader: Box<dyn Read> = match &args.input {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(io::stdin().lock()),
    };
    let mut socket = StreamSocket::new(reader, io::sink());

    let mut messages = Vec::new();
    while args.count.is_none_or(|limit| messages.len() < limit) {
        match session.recv(&mut socket, RecvFlags::empty(), !args.lazy) {
            Ok(Some(received)) => messages.push(received),
            Ok(None) => break,
            Err(SessionError::Transport(TransportError::Shutdown)) => break,
            Err(err) => return Err(session_error("inspect failed", err)),
        }
    }
    debug!(messages = messages.len(), "decoded framed input");

    print_messages(&messages, format);
    Ok(SUCCESS)
}
