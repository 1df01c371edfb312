use clap::{Args, Subcommand};
use std::path::PathBuf;

use wiresession_serialize::CodecChoice;
use wiresession_session::SessionConfig;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod doctor;
pub mod inspect;
pub mod pack;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Frame one message and write it to a file or stdout.
    Pack(PackArgs),
    /// Decode framed messages from a file or stdin.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Run codec, serializer, and framing self-checks.
    Doctor(DoctorArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Pack(args) => pack::run(args),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Doctor(args) => doctor::run(args, format),
    }
}

/// Session settings shared by commands that build or decode messages.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Codec for headers and content (json or msgpack).
    #[arg(long, env = "WIRESESSION_CODEC", default_value = "json", value_parser = parse_codec)]
    pub codec: CodecChoice,
    /// Username stamped on outgoing headers. Defaults to $USER.
    #[arg(long, env = "WIRESESSION_USERNAME")]
    pub username: Option<String>,
    /// Session token stamped on outgoing headers. Defaults to a fresh UUID.
    #[arg(long, env = "WIRESESSION_SESSION")]
    pub session: Option<String>,
    /// Accept identity frames that are not followed by a delimiter.
    #[arg(long)]
    pub lenient: bool,
}

impl SessionArgs {
    pub fn config(&self) -> SessionConfig {
        let mut config = SessionConfig {
            codec: self.codec,
            strict_identities: !self.lenient,
            ..SessionConfig::default()
        };
        if let Some(username) = &self.username {
            config.username = username.clone();
        }
        if let Some(session) = &self.session {
            config.session = session.clone();
        }
        config
    }
}

fn parse_codec(input: &str) -> Result<CodecChoice, String> {
    input.parse::<CodecChoice>().map_err(|err| err.to_string())
}

#[derive(Args, Debug)]
pub struct PackArgs {
    /// Message type.
    pub msg_type: String,
    /// JSON content (a mapping).
    #[arg(long, conflicts_with = "content_file")]
    pub content: Option<String>,
    /// Read JSON content from a file.
    #[arg(long, value_name = "PATH", conflicts_with = "content")]
    pub content_file: Option<PathBuf>,
    /// JSON parent message or header.
    #[arg(long)]
    pub parent: Option<String>,
    /// Extra header fields as a JSON mapping.
    #[arg(long, value_name = "JSON")]
    pub header: Option<String>,
    /// File to attach as an out-of-band buffer (repeatable).
    #[arg(long = "buffer", value_name = "PATH")]
    pub buffers: Vec<PathBuf>,
    /// Routing identity placed before the delimiter (repeatable).
    #[arg(long = "identity", value_name = "ID")]
    pub identities: Vec<String>,
    /// Output file. Appends when the file exists. Default: stdout.
    #[arg(long, short = 'o', value_name = "PATH")]
    pub out: Option<PathBuf>,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Framed input file. Default: stdin.
    pub input: Option<PathBuf>,
    /// Stop after N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Leave content encoded instead of decoding it.
    #[arg(long)]
    pub lazy: bool,
    #[command(flatten)]
    pub session: SessionArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct DoctorArgs {}
