use std::io::{IsTerminal, Write};

use bytes::Bytes;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use wiresession_session::{Content, Message};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'static str,
    identities: Vec<String>,
    msg_type: &'a str,
    msg_id: &'a str,
    parent_id: Option<&'a str>,
    message: Value,
}

/// Print decoded messages, one record per message.
pub fn print_messages(messages: &[(Vec<Bytes>, Message)], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for (identities, message) in messages {
                let out = MessageOutput {
                    kind: "message",
                    identities: identities.iter().map(|i| preview(i)).collect(),
                    msg_type: &message.msg_type,
                    msg_id: message.msg_id(),
                    parent_id: message.parent_id(),
                    message: message.to_value(),
                };
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec![
                    "MSG_TYPE",
                    "MSG_ID",
                    "PARENT",
                    "IDENTITIES",
                    "BUFFERS",
                    "CONTENT",
                ]);
            for (identities, message) in messages {
                table.add_row(vec![
                    message.msg_type.clone(),
                    message.msg_id().to_string(),
                    message.parent_id().unwrap_or("-").to_string(),
                    identities
                        .iter()
                        .map(|i| preview(i))
                        .collect::<Vec<_>>()
                        .join(","),
                    message.buffers.len().to_string(),
                    content_preview(&message.content),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (identities, message) in messages {
                if !identities.is_empty() {
                    let names: Vec<String> = identities.iter().map(|i| preview(i)).collect();
                    println!("identities: {}", names.join(", "));
                }
                println!("{message}");
            }
        }
        OutputFormat::Raw => {
            for (_, message) in messages {
                match &message.content {
                    Content::Encoded(bytes) => print_raw(bytes),
                    Content::Mapping(map) => println!(
                        "{}",
                        serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
                    ),
                }
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn content_preview(content: &Content) -> String {
    match content {
        Content::Mapping(map) => serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string()),
        Content::Encoded(bytes) => format!("<encoded {} bytes>", bytes.len()),
    }
}

fn preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}
