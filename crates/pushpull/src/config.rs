//! Settings resolution for the relay commands.
//!
//! Every knob is looked up in order: command-line flag, then the optional
//! JSON config file, then the built-in default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use pushpull_frame::{
    Base64Direction, Base64Transform, FrameConfig, PayloadMode, Pipeline, XorTransform,
    DEFAULT_MAX_PAYLOAD,
};
use pushpull_relay::DecodePolicy;
use pushpull_transport::{Endpoint, Role, TransportConfig};
use serde::Deserialize;

use crate::cmd::{RelayArgs, TransformArgs};
use crate::exit::{io_error, CliError, CliResult, USAGE};

/// Pause between pushed messages when neither flag nor file sets one.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(1);

/// Contents of a `--config` file. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub role: Option<String>,
    pub mode: Option<String>,
    pub delay_ms: Option<u64>,
    pub max_frame_size_kb: Option<usize>,
    pub connect_timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub write_timeout_ms: Option<u64>,
    pub decode_policy: Option<String>,
    /// `args` (default) or `stdin`; only read by `push`.
    pub input_type: Option<String>,
    pub xor_enabled: Option<bool>,
    pub xor_key: Option<String>,
    pub xor_pad: Option<String>,
    pub base64_enabled: Option<bool>,
    pub base64_mode: Option<String>,
    pub base64_padding: Option<bool>,
}

impl FileConfig {
    /// Load the file at `path`, or return an empty config when no path was
    /// given.
    pub fn load(path: Option<&Path>) -> CliResult<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = fs::read_to_string(path).map_err(|err| {
            io_error(&format!("failed reading config {}", path.display()), err)
        })?;
        Self::parse(&text)
            .map_err(|err| CliError::usage(format!("invalid config {}: {err}", path.display())))
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Everything needed to establish a channel and frame messages over it.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub endpoint: Endpoint,
    pub role: Role,
    pub mode: PayloadMode,
    pub transport: TransportConfig,
    pub frame: FrameConfig,
}

impl RelaySettings {
    /// Merge flags over the file over defaults. `default_role` differs per
    /// command.
    pub fn resolve(args: &RelayArgs, file: &FileConfig, default_role: Role) -> CliResult<Self> {
        let endpoint = match (&args.endpoint, &file.endpoint) {
            (Some(endpoint), _) => endpoint.clone(),
            (None, Some(text)) => text
                .parse()
                .map_err(|err| CliError::usage(format!("config endpoint: {err}")))?,
            (None, None) => Endpoint::default(),
        };

        let role = match (args.role, &file.role) {
            (Some(role), _) => role,
            (None, Some(text)) => text
                .parse()
                .map_err(|err| CliError::usage(format!("config role: {err}")))?,
            (None, None) => default_role,
        };

        let mode = match (args.mode, &file.mode) {
            (Some(mode), _) => mode,
            (None, Some(text)) => text
                .parse()
                .map_err(|err| CliError::usage(format!("config mode: {err}")))?,
            (None, None) => PayloadMode::default(),
        };

        Ok(Self {
            endpoint,
            role,
            mode,
            transport: transport_config(file)?,
            frame: frame_config(file)?,
        })
    }
}

fn transport_config(file: &FileConfig) -> CliResult<TransportConfig> {
    let mut config = TransportConfig::default();

    if let Some(ms) = file.connect_timeout_ms {
        // 0 leaves the connect timeout to the OS.
        config.connect_timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }
    if let Some(ms) = file.poll_interval_ms {
        if ms == 0 {
            return Err(CliError::usage("config poll_interval_ms must be greater than zero"));
        }
        config.poll_interval = Duration::from_millis(ms);
    }
    if let Some(ms) = file.write_timeout_ms {
        config.write_timeout = (ms > 0).then(|| Duration::from_millis(ms));
    }

    Ok(config)
}

fn frame_config(file: &FileConfig) -> CliResult<FrameConfig> {
    let max_payload_size = match file.max_frame_size_kb {
        None => DEFAULT_MAX_PAYLOAD,
        Some(0) => {
            return Err(CliError::usage("config max_frame_size_kb must be greater than zero"))
        }
        Some(kb) => kb
            .checked_mul(1024)
            .ok_or_else(|| CliError::usage("config max_frame_size_kb too large"))?,
    };

    Ok(FrameConfig {
        max_payload_size,
        ..FrameConfig::default()
    })
}

pub fn resolve_delay(flag: Option<Duration>, file: &FileConfig) -> Duration {
    flag.or(file.delay_ms.map(Duration::from_millis))
        .unwrap_or(DEFAULT_DELAY)
}

/// `--fail-fast` wins; otherwise the file's `decode_policy`, otherwise skip.
pub fn resolve_policy(fail_fast: bool, file: &FileConfig) -> CliResult<DecodePolicy> {
    if fail_fast {
        return Ok(DecodePolicy::FailFast);
    }
    match file.decode_policy.as_deref().map(str::trim) {
        None => Ok(DecodePolicy::default()),
        Some("skip") => Ok(DecodePolicy::Skip),
        Some("fail-fast") | Some("fail_fast") => Ok(DecodePolicy::FailFast),
        Some(other) => Err(CliError::usage(format!(
            "config decode_policy {other:?} (expected skip or fail-fast)"
        ))),
    }
}

/// Build the sending-side transform pipeline: XOR first, then base64.
///
/// A flag enables its stage on its own; the file needs `xor_enabled` or
/// `base64_enabled` set to true. The receiving side runs the reversed
/// pipeline.
pub fn resolve_transform(args: &TransformArgs, file: &FileConfig) -> CliResult<Pipeline> {
    let mut pipeline = Pipeline::new();

    let xor_enabled = args.xor_key.is_some() || file.xor_enabled == Some(true);
    if xor_enabled {
        let key = args
            .xor_key
            .as_deref()
            .or(file.xor_key.as_deref())
            .ok_or_else(|| CliError::usage("xor_key must be set when xor is enabled"))?;
        let pad = args
            .xor_pad
            .as_deref()
            .or(file.xor_pad.as_deref())
            .map(parse_hex_byte)
            .transpose()?;
        let xor = XorTransform::from_hex(key, pad)
            .map_err(|err| CliError::usage(format!("xor: {err}")))?;
        pipeline = pipeline.with_stage(xor);
    }

    let direction = match (args.base64, file.base64_enabled) {
        (Some(direction), _) => Some(direction),
        (None, Some(true)) => Some(match file.base64_mode.as_deref() {
            Some(text) => text
                .parse()
                .map_err(|err| CliError::usage(format!("config base64_mode: {err}")))?,
            None => Base64Direction::default(),
        }),
        (None, _) => None,
    };
    if let Some(direction) = direction {
        let padding = !args.no_base64_padding && file.base64_padding.unwrap_or(true);
        pipeline = pipeline.with_stage(Base64Transform::new(direction, padding));
    }

    Ok(pipeline)
}

/// A single byte written as one or two hex digits, optionally `0x`-prefixed.
fn parse_hex_byte(text: &str) -> CliResult<u8> {
    let digits = text.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    u8::from_str_radix(digits, 16).map_err(|_| {
        CliError::usage(format!("invalid xor pad byte {text:?} (expected hex 00-ff)"))
    })
}

/// True when `push` should read its messages from stdin.
///
/// `--stdin`, a lone `-` message or `input_type: "stdin"` all select it.
pub fn resolve_stdin_input(flag: bool, messages: &[String], file: &FileConfig) -> CliResult<bool> {
    if flag || matches!(messages, [only] if only == "-") {
        return Ok(true);
    }
    match file.input_type.as_deref().map(str::trim) {
        None | Some("args") => Ok(false),
        Some("stdin") => Ok(true),
        Some(other) => Err(CliError::usage(format!(
            "config input_type {other:?} (expected args or stdin)"
        ))),
    }
}

/// Parse `1s`, `250ms` or a bare number of seconds. Zero is allowed.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(endpoint: Option<&str>, role: Option<Role>, mode: Option<PayloadMode>) -> RelayArgs {
        RelayArgs {
            endpoint: endpoint.map(|text| text.parse().unwrap()),
            role,
            mode,
        }
    }

    #[test]
    fn defaults_apply_without_flags_or_file() {
        let settings =
            RelaySettings::resolve(&args(None, None, None), &FileConfig::default(), Role::Passive)
                .unwrap();

        assert_eq!(settings.endpoint, Endpoint::localhost(5555));
        assert_eq!(settings.role, Role::Passive);
        assert_eq!(settings.mode, PayloadMode::Text);
        assert_eq!(settings.frame.max_payload_size, DEFAULT_MAX_PAYLOAD);
    }

    #[test]
    fn file_overrides_defaults() {
        let file = FileConfig::parse(
            r#"{
                "endpoint": "tcp://10.0.0.7:6000",
                "role": "bind",
                "mode": "pmt",
                "max_frame_size_kb": 64,
                "connect_timeout_ms": 0,
                "poll_interval_ms": 25
            }"#,
        )
        .unwrap();

        let settings =
            RelaySettings::resolve(&args(None, None, None), &file, Role::Active).unwrap();
        assert_eq!(settings.endpoint, Endpoint::new("10.0.0.7", 6000));
        assert_eq!(settings.role, Role::Passive);
        assert_eq!(settings.mode, PayloadMode::TypedEnvelope);
        assert_eq!(settings.frame.max_payload_size, 64 * 1024);
        assert_eq!(settings.transport.connect_timeout, None);
        assert_eq!(settings.transport.poll_interval, Duration::from_millis(25));
    }

    #[test]
    fn flags_override_file() {
        let file = FileConfig {
            endpoint: Some("10.0.0.7:6000".into()),
            role: Some("passive".into()),
            mode: Some("raw-binary".into()),
            ..FileConfig::default()
        };

        let settings = RelaySettings::resolve(
            &args(Some("127.0.0.1:7000"), Some(Role::Active), Some(PayloadMode::Text)),
            &file,
            Role::Passive,
        )
        .unwrap();
        assert_eq!(settings.endpoint, Endpoint::localhost(7000));
        assert_eq!(settings.role, Role::Active);
        assert_eq!(settings.mode, PayloadMode::Text);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::parse(r#"{"endpont": "127.0.0.1:1"}"#).is_err());
    }

    #[test]
    fn bad_file_values_are_usage_errors() {
        let file = FileConfig {
            role: Some("sideways".into()),
            ..FileConfig::default()
        };
        let err = RelaySettings::resolve(&args(None, None, None), &file, Role::Active).unwrap_err();
        assert_eq!(err.code, USAGE);

        let file = FileConfig {
            poll_interval_ms: Some(0),
            ..FileConfig::default()
        };
        let err = RelaySettings::resolve(&args(None, None, None), &file, Role::Active).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn delay_precedence() {
        let file = FileConfig {
            delay_ms: Some(250),
            ..FileConfig::default()
        };
        assert_eq!(resolve_delay(None, &FileConfig::default()), DEFAULT_DELAY);
        assert_eq!(resolve_delay(None, &file), Duration::from_millis(250));
        assert_eq!(resolve_delay(Some(Duration::ZERO), &file), Duration::ZERO);
    }

    #[test]
    fn policy_precedence() {
        let file = FileConfig {
            decode_policy: Some("fail-fast".into()),
            ..FileConfig::default()
        };
        assert_eq!(
            resolve_policy(false, &FileConfig::default()).unwrap(),
            DecodePolicy::Skip
        );
        assert_eq!(resolve_policy(false, &file).unwrap(), DecodePolicy::FailFast);
        assert_eq!(resolve_policy(true, &FileConfig::default()).unwrap(), DecodePolicy::FailFast);

        let bad = FileConfig {
            decode_policy: Some("ignore".into()),
            ..FileConfig::default()
        };
        assert!(resolve_policy(false, &bad).is_err());
    }

    fn xor_flag(key: &str) -> TransformArgs {
        TransformArgs {
            xor_key: Some(key.to_string()),
            ..TransformArgs::default()
        }
    }

    #[test]
    fn xor_key_flag_enables_xor() {
        let pipeline = resolve_transform(&xor_flag("abcd1234"), &FileConfig::default()).unwrap();
        assert_eq!(pipeline.names(), vec!["xor"]);

        let input = hex::decode("00112233").unwrap();
        assert_eq!(pipeline.process_all(&input).unwrap(), vec![0xab, 0xdc, 0x30, 0x07]);
    }

    #[test]
    fn file_enables_xor_and_base64() {
        let file = FileConfig::parse(
            r#"{
                "xor_enabled": true,
                "xor_key": "abcd1234",
                "base64_enabled": true,
                "base64_mode": "encode",
                "base64_padding": false
            }"#,
        )
        .unwrap();

        let pipeline = resolve_transform(&TransformArgs::default(), &file).unwrap();
        assert_eq!(pipeline.names(), vec!["xor", "base64"]);
        let input = hex::decode("00112233").unwrap();
        assert_eq!(pipeline.process_all(&input).unwrap(), b"q9wwBw");
    }

    #[test]
    fn disabled_stages_stay_off() {
        let file = FileConfig {
            xor_key: Some("abcd1234".into()),
            base64_mode: Some("decode".into()),
            base64_enabled: Some(false),
            ..FileConfig::default()
        };
        assert!(resolve_transform(&TransformArgs::default(), &file)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn flags_override_file_transforms() {
        let file = FileConfig {
            xor_enabled: Some(true),
            xor_key: Some("00".into()),
            base64_enabled: Some(true),
            base64_mode: Some("encode".into()),
            ..FileConfig::default()
        };
        let args = TransformArgs {
            xor_key: Some("ff".into()),
            base64: Some(Base64Direction::Decode),
            ..TransformArgs::default()
        };

        let receive = resolve_transform(&args, &file).unwrap().reversed();
        assert_eq!(receive.names(), vec!["base64", "xor"]);
        assert_eq!(receive.process_all(b"/w==").unwrap(), vec![0x00]);
    }

    #[test]
    fn bad_transform_settings_are_usage_errors() {
        let enabled_without_key = FileConfig {
            xor_enabled: Some(true),
            ..FileConfig::default()
        };
        let err = resolve_transform(&TransformArgs::default(), &enabled_without_key).unwrap_err();
        assert_eq!(err.code, USAGE);

        let err = resolve_transform(&xor_flag("not-hex"), &FileConfig::default()).unwrap_err();
        assert_eq!(err.code, USAGE);

        let bad_pad = TransformArgs {
            xor_pad: Some("100".into()),
            ..xor_flag("ab")
        };
        let err = resolve_transform(&bad_pad, &FileConfig::default()).unwrap_err();
        assert_eq!(err.code, USAGE);

        let bad_mode = FileConfig {
            base64_enabled: Some(true),
            base64_mode: Some("sideways".into()),
            ..FileConfig::default()
        };
        let err = resolve_transform(&TransformArgs::default(), &bad_mode).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn xor_pad_accepts_hex_byte() {
        assert_eq!(parse_hex_byte("ff").unwrap(), 0xff);
        assert_eq!(parse_hex_byte("0x0A").unwrap(), 0x0a);
        assert!(parse_hex_byte("").is_err());
    }

    #[test]
    fn stdin_input_selection() {
        let none = FileConfig::default();
        assert!(!resolve_stdin_input(false, &[], &none).unwrap());
        assert!(resolve_stdin_input(true, &[], &none).unwrap());
        assert!(resolve_stdin_input(false, &["-".to_string()], &none).unwrap());
        assert!(!resolve_stdin_input(false, &["-".to_string(), "x".to_string()], &none).unwrap());

        let file = FileConfig {
            input_type: Some("stdin".into()),
            ..FileConfig::default()
        };
        assert!(resolve_stdin_input(false, &[], &file).unwrap());

        let bad = FileConfig {
            input_type: Some("zmq_pull".into()),
            ..FileConfig::default()
        };
        assert!(resolve_stdin_input(false, &[], &bad).is_err());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("-1s").is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let err = FileConfig::load(Some(Path::new("/nonexistent/pushpull.json"))).unwrap_err();
        assert_ne!(err.code, 0);
        assert!(FileConfig::load(None).unwrap() == FileConfig::default());
    }
}
