use std::io::BufRead;
use std::path::Path;

use pushpull_frame::{Message, PayloadMode};
use pushpull_relay::{push, CancelToken, SendOptions};
use pushpull_transport::{Role, TransportContext};
use tracing::info;

use crate::cmd::{install_ctrlc_handler, PushArgs, DEMO_MESSAGES};
use crate::config::{
    resolve_delay, resolve_stdin_input, resolve_transform, FileConfig, RelaySettings,
};
use crate::exit::{
    io_error, relay_error, transport_error, CliError, CliResult, INTERRUPTED, SUCCESS,
};
use crate::output::{print_send_report, OutputFormat};

pub fn run(args: PushArgs, format: OutputFormat, config: Option<&Path>) -> CliResult<i32> {
    let file = FileConfig::load(config)?;
    let settings = RelaySettings::resolve(&args.relay, &file, Role::Passive)?;
    let delay = resolve_delay(args.delay, &file);
    let transform = resolve_transform(&args.transform, &file)?;

    let inputs = if resolve_stdin_input(args.stdin, &args.messages, &file)? {
        let lines = read_message_lines(std::io::stdin().lock())?;
        if lines.is_empty() {
            return Err(CliError::usage("no messages on stdin"));
        }
        lines
    } else {
        args.messages.clone()
    };
    let messages = resolve_messages(&inputs, args.hex, settings.mode)?;

    let cancel = CancelToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let ctx = TransportContext::with_config(settings.transport.clone());
    let channel = ctx
        .establish(settings.role, &settings.endpoint, &cancel)
        .map_err(|err| transport_error("establish failed", err))?;

    info!(
        endpoint = %settings.endpoint,
        role = %settings.role,
        mode = %settings.mode,
        count = messages.len(),
        transforms = ?transform.names(),
        "pushing messages"
    );
    let report = push(
        channel,
        settings.mode,
        settings.frame.clone(),
        messages,
        SendOptions::paced(delay).with_transform(transform),
        &cancel,
    )
    .map_err(|err| relay_error("send failed", err))?;
    ctx.shutdown();

    print_send_report(&report, &settings, format);

    if report.cancelled {
        Ok(INTERRUPTED)
    } else {
        Ok(SUCCESS)
    }
}

/// One message per non-empty line, surrounding whitespace trimmed.
pub fn read_message_lines<R: BufRead>(reader: R) -> CliResult<Vec<String>> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|err| io_error("failed reading stdin", err))?;
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    Ok(lines)
}

/// Turn command-line message arguments into messages for `mode`.
///
/// With no arguments the demo sequence is sent. `--hex` decodes each
/// argument to bytes, which only the byte-carrying modes accept.
pub fn resolve_messages(args: &[String], hex: bool, mode: PayloadMode) -> CliResult<Vec<Message>> {
    if hex && mode == PayloadMode::Text {
        return Err(CliError::usage(
            "--hex needs a byte mode (--mode raw-binary or typed-envelope)",
        ));
    }

    if args.is_empty() {
        return Ok(DEMO_MESSAGES.into_iter().map(Message::from).collect());
    }

    args.iter()
        .map(|arg| {
            if hex {
                hex::decode(arg.trim())
                    .map(Message::from)
                    .map_err(|err| CliError::usage(format!("invalid hex message {arg:?}: {err}")))
            } else {
                Ok(Message::from(arg.as_str()))
            }
        })
        .collect()
}
