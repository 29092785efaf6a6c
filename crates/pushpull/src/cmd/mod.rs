use std::path::Path;
use std::time::Duration;

use clap::{Args, Subcommand};
use pushpull_frame::{Base64Direction, PayloadMode};
use pushpull_relay::CancelToken;
use pushpull_transport::{Endpoint, Role};

use crate::config::parse_duration;
use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod pull;
pub mod push;
pub mod version;

/// Messages pushed when none are given on the command line.
pub const DEMO_MESSAGES: [&str; 3] = ["Hello, world!", "This is a PUSH/PULL demo.", "Goodbye!"];

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a sequence of messages, one frame each.
    Push(PushArgs),
    /// Receive messages and print them until the sender hangs up.
    Pull(PullArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: Option<&Path>) -> CliResult<i32> {
    match command {
        Command::Push(args) => push::run(args, format, config),
        Command::Pull(args) => pull::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

/// Connection flags shared by `push` and `pull`.
#[derive(Args, Debug, Clone)]
pub struct RelayArgs {
    /// Endpoint to bind or connect (host:port, tcp://host:port; `*` binds all
    /// interfaces). Default: 127.0.0.1:5555.
    #[arg(value_name = "ENDPOINT")]
    pub endpoint: Option<Endpoint>,
    /// Connect to the peer (active/connect) or wait for it (passive/bind).
    #[arg(long, value_name = "ROLE")]
    pub role: Option<Role>,
    /// Payload mode: text, raw-binary or typed-envelope (GNU Radio PMT u8vector).
    #[arg(long, short = 'm', value_name = "MODE")]
    pub mode: Option<PayloadMode>,
}

/// Content transforms shared by `push` and `pull`.
///
/// `push` runs XOR then base64; `pull` runs the same stages in reverse order,
/// so the receiver names the inverse base64 direction.
#[derive(Args, Debug, Clone, Default)]
pub struct TransformArgs {
    /// XOR message content with this hex key (e.g. abcd1234).
    #[arg(long, value_name = "HEX")]
    pub xor_key: Option<String>,
    /// Hex byte XORed past the end of the key instead of repeating the key.
    #[arg(long, value_name = "HEX")]
    pub xor_pad: Option<String>,
    /// Base64 stage: encode or decode.
    #[arg(long, value_name = "DIRECTION")]
    pub base64: Option<Base64Direction>,
    /// Base64 without trailing `=` padding.
    #[arg(long)]
    pub no_base64_padding: bool,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub relay: RelayArgs,
    #[command(flatten)]
    pub transform: TransformArgs,
    /// Pause between messages (e.g. 1s, 250ms, 0). Default: 1s.
    #[arg(long, value_parser = parse_duration)]
    pub delay: Option<Duration>,
    /// Treat each message as hex-encoded bytes.
    #[arg(long)]
    pub hex: bool,
    /// Read messages from stdin, one per line (same as a lone `-` message).
    #[arg(long)]
    pub stdin: bool,
    /// Messages to send, in order, after `--`. Default: a short demo sequence.
    #[arg(value_name = "MESSAGE", last = true)]
    pub messages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct PullArgs {
    #[command(flatten)]
    pub relay: RelayArgs,
    #[command(flatten)]
    pub transform: TransformArgs,
    /// Stop at the first frame that does not decode instead of skipping it.
    #[arg(long)]
    pub fail_fast: bool,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Cancel `token` on Ctrl-C.
pub fn install_ctrlc_handler(token: CancelToken) -> CliResult<()> {
    ctrlc::set_handler(move || {
        token.cancel();
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
