use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use ecnwire_client::Exchange;
use ecnwire_frame::{kind_name, Response};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ExchangeOutput<'a> {
    command: &'a str,
    version: u8,
    msg_type: u8,
    msg_type_name: &'static str,
    payload_len: u16,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_name: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_len: Option<u32>,
    data: String,
    clipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_token: Option<String>,
}

impl<'a> ExchangeOutput<'a> {
    fn new(command: &'a str, exchange: &Exchange) -> Self {
        let header = &exchange.header;
        let (status, error_code, error_name, data_len, data, clipped) = match &exchange.response {
            Response::Envelope(envelope) => (
                if envelope.is_success() {
                    "success"
                } else {
                    "failed"
                },
                Some(u8::from(envelope.error_code)),
                Some(envelope.error_code.name()),
                Some(envelope.declared_len),
                hex(&envelope.data),
                envelope.is_clipped(),
            ),
            Response::NoBody(raw) => ("no-body", None, None, None, hex(raw), false),
        };

        Self {
            command,
            version: header.version,
            msg_type: header.msg_type,
            msg_type_name: kind_name(header.msg_type),
            payload_len: header.payload_len,
            status,
            error_code,
            error_name,
            data_len,
            data,
            clipped,
            session_token: None,
        }
    }
}

/// Print one exchange. `session_token` is shown when the command produced one.
pub fn print_exchange(
    command: &str,
    exchange: &Exchange,
    session_token: Option<&[u8]>,
    format: OutputFormat,
) {
    let mut out = ExchangeOutput::new(command, exchange);
    out.session_token = session_token.map(hex);

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["command".to_string(), out.command.to_string()]);
            table.add_row(vec!["version".to_string(), out.version.to_string()]);
            table.add_row(vec![
                "type".to_string(),
                format!("{} ({})", out.msg_type, out.msg_type_name),
            ]);
            table.add_row(vec!["payload_len".to_string(), out.payload_len.to_string()]);
            table.add_row(vec!["status".to_string(), out.status.to_string()]);
            if let (Some(code), Some(name)) = (out.error_code, out.error_name) {
                table.add_row(vec!["error_code".to_string(), format!("{code} ({name})")]);
            }
            if let Some(len) = out.data_len {
                let shown = if out.clipped {
                    format!("{len} (clipped to {})", out.data.len() / 2)
                } else {
                    len.to_string()
                };
                table.add_row(vec!["data_len".to_string(), shown]);
            }
            if !out.data.is_empty() {
                table.add_row(vec!["data".to_string(), out.data.clone()]);
            }
            if let Some(token) = &out.session_token {
                table.add_row(vec!["session_token".to_string(), token.clone()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => print_pretty(&out),
    }
}

fn print_pretty(out: &ExchangeOutput<'_>) {
    println!(
        "Response header: version={}, type={} ({}), payload_len={}",
        out.version, out.msg_type, out.msg_type_name, out.payload_len
    );
    match (out.error_code, out.error_name) {
        (Some(code), Some(name)) => {
            println!(
                "Response: error_code={code} ({name}), data_len={}",
                out.data_len.unwrap_or_default()
            );
            if code == 0 {
                println!("{} successful", out.command);
            } else {
                println!("{} failed with error code: {code}", out.command);
            }
            if !out.data.is_empty() {
                let suffix = if out.clipped { " (clipped)" } else { "" };
                println!("Additional data{suffix}: {}", out.data);
            }
        }
        _ if out.payload_len == 0 => println!("No response payload"),
        _ => println!("Invalid response payload format: {}", out.data),
    }
    if let Some(token) = &out.session_token {
        println!("Session token: {token}");
    }
}

/// Lowercase hex, no separators.
pub fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{b:02x}");
    }
    out
}
