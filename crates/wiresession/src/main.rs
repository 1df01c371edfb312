mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "wiresession", version, about = "Multipart session message tool")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use wiresession_serialize::CodecChoice;

    use super::*;

    #[test]
    fn parses_pack_subcommand() {
        let cli = Cli::try_parse_from([
            "wiresession",
            "pack",
            "execute_request",
            "--content",
            "{\"code\":\"1\"}",
            "--identity",
            "peer-a",
            "--codec",
            "msgpack",
        ])
        .expect("pack args should parse");

        let Command::Pack(args) = cli.command else {
            panic!("expected pack");
        };
        assert_eq!(args.msg_type, "execute_request");
        assert_eq!(args.identities, vec!["peer-a".to_string()]);
        assert_eq!(args.session.codec, CodecChoice::Fallback);
    }

    #[test]
    fn rejects_conflicting_content_args() {
        let err = Cli::try_parse_from([
            "wiresession",
            "pack",
            "status",
            "--content",
            "{}",
            "--content-file",
            "/tmp/content.json",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn rejects_unknown_codec() {
        let err = Cli::try_parse_from(["wiresession", "inspect", "--codec", "pickle"])
            .expect_err("unknown codec should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn parses_inspect_subcommand() {
        let cli = Cli::try_parse_from([
            "wiresession",
            "--format",
            "json",
            "inspect",
            "/tmp/frames.bin",
            "--count",
            "2",
            "--lenient",
        ])
        .expect("inspect args should parse");
        let Command::Inspect(args) = cli.command else {
            panic!("expected inspect");
        };
        assert_eq!(args.count, Some(2));
        assert!(!args.session.config().strict_identities);
    }
}
