use std::fmt;
use std::io;

use pushpull_frame::FrameError;
use pushpull_relay::RelayError;
use pushpull_transport::TransportError;

// Process exit codes, shared by every subcommand.
pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(USAGE, message)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_code(err.kind()), format!("{context}: {err}"))
}

fn io_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::UnexpectedEof => TRANSPORT_ERROR,
        io::ErrorKind::NotFound => FAILURE,
        _ => INTERNAL,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    match err {
        TransportError::Bind { ref source, .. } | TransportError::Connect { ref source, .. } => {
            let code = match io_code(source.kind()) {
                INTERNAL => TRANSPORT_ERROR,
                code => code,
            };
            CliError::new(code, format!("{context}: {err}"))
        }
        TransportError::Accept(source) | TransportError::Io(source) => io_error(context, source),
        TransportError::InvalidEndpoint { .. } | TransportError::InvalidRole(_) => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        TransportError::Cancelled => CliError::new(INTERRUPTED, format!("{context}: {err}")),
    }
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::PayloadTooLarge { .. }
        | FrameError::InvalidMagic
        | FrameError::Truncated { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::ConnectionClosed => CliError::new(TRANSPORT_ERROR, format!("{context}: {err}")),
    }
}

pub fn relay_error(context: &str, err: RelayError) -> CliError {
    match err {
        RelayError::Transport(err) => transport_error(context, err),
        RelayError::Frame(err) => frame_error(context, err),
        RelayError::Encode { .. } | RelayError::Decode { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use pushpull_frame::PayloadError;
    use pushpull_transport::Endpoint;

    use super::*;

    #[test]
    fn refused_connect_is_a_transport_failure() {
        let err = TransportError::Connect {
            endpoint: Endpoint::localhost(5555),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        };
        let cli = transport_error("connect failed", err);
        assert_eq!(cli.code, TRANSPORT_ERROR);
        assert!(cli.message.starts_with("connect failed: "));
        assert!(cli.message.contains("127.0.0.1:5555"));
    }

    #[test]
    fn connect_timeout_maps_to_timeout() {
        let err = TransportError::Connect {
            endpoint: Endpoint::localhost(5555),
            source: io::Error::from(io::ErrorKind::TimedOut),
        };
        assert_eq!(transport_error("connect failed", err).code, TIMEOUT);
    }

    #[test]
    fn cancelled_accept_is_interrupted() {
        assert_eq!(
            transport_error("accept", TransportError::Cancelled).code,
            INTERRUPTED
        );
    }

    #[test]
    fn decode_failure_is_data_invalid() {
        let err = RelayError::Decode {
            index: 2,
            source: PayloadError::TrailingBytes(1),
        };
        assert_eq!(relay_error("receive failed", err).code, DATA_INVALID);
    }

    #[test]
    fn peer_reset_during_send_is_transport() {
        let err = RelayError::Frame(FrameError::Io(io::Error::from(
            io::ErrorKind::BrokenPipe,
        )));
        assert_eq!(relay_error("send failed", err).code, TRANSPORT_ERROR);
    }
}
