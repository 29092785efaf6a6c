use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use pushpull_frame::{Message, PayloadMode};
use pushpull_relay::{SendReport, SinkEvent};
use serde::Serialize;

use crate::config::RelaySettings;

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
struct EventOutput<'a> {
    kind: &'static str,
    index: usize,
    mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hex: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: String,
}

impl<'a> EventOutput<'a> {
    fn new(event: &'a SinkEvent, mode: PayloadMode) -> Self {
        let mut out = EventOutput {
            kind: event_kind(event),
            index: 0,
            mode: mode.as_str(),
            size: None,
            text: None,
            hex: None,
            error: None,
            timestamp: now_unix_seconds(),
        };
        match event {
            SinkEvent::Message { index, message } => {
                out.index = *index;
                out.size = Some(message.len());
                match message {
                    Message::Text(text) => out.text = Some(text),
                    Message::Binary(bytes) => out.hex = Some(hex::encode(bytes)),
                }
            }
            SinkEvent::DecodeError { index, error } => {
                out.index = *index;
                out.error = Some(error.to_string());
            }
        }
        out
    }
}

/// Print one received message (or decode failure).
pub fn print_event(event: &SinkEvent, mode: PayloadMode, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = EventOutput::new(event, mode);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let (index, size, payload) = event_columns(event);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["INDEX", "KIND", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    index.to_string(),
                    event_kind(event).to_string(),
                    size,
                    payload,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => match event {
            SinkEvent::Message { index, message } => {
                println!(
                    "#{index} {mode} size={} {}",
                    message.len(),
                    message_preview(message)
                );
            }
            SinkEvent::DecodeError { index, error } => {
                println!("#{index} {mode} decode error: {error}");
            }
        },
        OutputFormat::Raw => match event {
            SinkEvent::Message { message, .. } => print_raw(message),
            SinkEvent::DecodeError { index, error } => {
                eprintln!("frame #{index}: {error}");
            }
        },
    }
}

#[derive(Serialize)]
struct SendSummary<'a> {
    kind: &'static str,
    endpoint: String,
    role: &'static str,
    mode: &'static str,
    sent: usize,
    cancelled: bool,
    timestamp: &'a str,
}

/// Print the outcome of a push.
pub fn print_send_report(report: &SendReport, settings: &RelaySettings, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let timestamp = now_unix_seconds();
            let out = SendSummary {
                kind: "summary",
                endpoint: settings.endpoint.to_string(),
                role: settings.role.as_str(),
                mode: settings.mode.as_str(),
                sent: report.sent,
                cancelled: report.cancelled,
                timestamp: &timestamp,
            };
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
                .set_header(vec!["ENDPOINT", "ROLE", "MODE", "SENT", "CANCELLED"])
                .add_row(vec![
                    settings.endpoint.to_string(),
                    settings.role.to_string(),
                    settings.mode.to_string(),
                    report.sent.to_string(),
                    report.cancelled.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let suffix = if report.cancelled { " (cancelled)" } else { "" };
            println!(
                "sent {} message(s) to {} as {} [{}]{suffix}",
                report.sent, settings.endpoint, settings.role, settings.mode
            );
        }
        OutputFormat::Raw => {}
    }
}

/// Text is written as a line; bytes go out untouched.
pub fn print_raw(message: &Message) {
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(message.as_bytes());
    if message.as_text().is_some() {
        let _ = out.write_all(b"\n");
    }
    let _ = out.flush();
}

fn event_kind(event: &SinkEvent) -> &'static str {
    match event {
        SinkEvent::Message { .. } => "message",
        SinkEvent::DecodeError { .. } => "decode-error",
    }
}

fn event_columns(event: &SinkEvent) -> (usize, String, String) {
    match event {
        SinkEvent::Message { index, message } => {
            (*index, message.len().to_string(), message_preview(message))
        }
        SinkEvent::DecodeError { index, error } => (*index, "-".to_string(), error.to_string()),
    }
}

/// Text as-is, bytes as lowercase hex.
pub fn message_preview(message: &Message) -> String {
    match message {
        Message::Text(text) => text.clone(),
        Message::Binary(bytes) => hex::encode(bytes),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
