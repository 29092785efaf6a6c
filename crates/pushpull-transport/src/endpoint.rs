use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};
use std::str::FromStr;

use crate::error::TransportError;

/// Port used when an endpoint omits one.
pub const DEFAULT_PORT: u16 = 5555;

/// Address used when no endpoint is configured at all.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";

/// Which side of the connection a process plays.
///
/// Fixed for the lifetime of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Initiate a connection to a listening peer.
    Active,
    /// Bind the endpoint and accept exactly one peer.
    Passive,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Active => "active",
            Role::Passive => "passive",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "connect" => Ok(Role::Active),
            "passive" | "bind" => Ok(Role::Passive),
            _ => Err(TransportError::InvalidRole(s.to_string())),
        }
    }
}

/// A TCP address/port pair.
///
/// Accepted text forms:
/// - `host:port`, `[v6-addr]:port`
/// - the same with a `tcp://` prefix
/// - `host` or `[v6-addr]` alone, which uses [`DEFAULT_PORT`]
///
/// The host `*` means "all interfaces" and resolves to `0.0.0.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    address: String,
    port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// Loopback endpoint on the given port.
    pub fn localhost(port: u16) -> Self {
        Self::new(DEFAULT_ADDRESS, port)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Same address with a different port.
    pub fn with_port(&self, port: u16) -> Self {
        Self::new(self.address.clone(), port)
    }

    /// Resolve to concrete socket addresses (DNS lookup for host names).
    pub fn resolve(&self) -> std::io::Result<Vec<SocketAddr>> {
        let host = match self.address.as_str() {
            "*" => "0.0.0.0",
            other => other,
        };
        let addrs: Vec<SocketAddr> = (host, self.port).to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                format!("{host} resolved to no addresses"),
            ));
        }
        Ok(addrs)
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::localhost(DEFAULT_PORT)
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip().to_string(), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.address.contains(':') {
            write!(f, "[{}]:{}", self.address, self.port)
        } else {
            write!(f, "{}:{}", self.address, self.port)
        }
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| TransportError::InvalidEndpoint {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let text = input.trim();
        let text = text.strip_prefix("tcp://").unwrap_or(text);
        if text.is_empty() {
            return Err(invalid("empty endpoint"));
        }

        let (host, port) = if let Some(rest) = text.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid("missing closing ']'"))?;
            if tail.is_empty() {
                (host, None)
            } else {
                let port = tail
                    .strip_prefix(':')
                    .ok_or_else(|| invalid("expected ':' after ']'"))?;
                (host, Some(port))
            }
        } else {
            match text.rsplit_once(':') {
                Some((host, _)) if host.contains(':') => {
                    return Err(invalid("IPv6 addresses must be written as [addr]:port"))
                }
                Some((host, port)) => (host, Some(port)),
                None => (text, None),
            }
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }

        let port = match port {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| invalid("port must be an integer in 0..=65535"))?,
            None => DEFAULT_PORT,
        };

        Ok(Self::new(host, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_host_and_port() {
        let ep: Endpoint = "127.0.0.1:6000".parse().unwrap();
        assert_eq!(ep.address(), "127.0.0.1");
        assert_eq!(ep.port(), 6000);
    }

    #[test]
    fn bare_host_uses_default_port() {
        let ep: Endpoint = "localhost".parse().unwrap();
        assert_eq!(ep, Endpoint::new("localhost", DEFAULT_PORT));
    }

    #[test]
    fn accepts_tcp_scheme_prefix() {
        let ep: Endpoint = "tcp://127.0.0.1:5555".parse().unwrap();
        assert_eq!(ep, Endpoint::localhost(5555));
    }

    #[test]
    fn parses_bracketed_ipv6() {
        let ep: Endpoint = "[::1]:7000".parse().unwrap();
        assert_eq!(ep.address(), "::1");
        assert_eq!(ep.port(), 7000);
        assert_eq!(ep.to_string(), "[::1]:7000");

        let ep: Endpoint = "[::1]".parse().unwrap();
        assert_eq!(ep.port(), DEFAULT_PORT);
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = "127.0.0.1:70000".parse::<Endpoint>().unwrap_err();
        assert!(matches!(err, TransportError::InvalidEndpoint { .. }));
    }

    #[test]
    fn rejects_malformed_input() {
        for bad in ["", "tcp://", ":5555", "::1:5555", "[::1", "[::1]5555", "host:port"] {
            assert!(
                bad.parse::<Endpoint>().is_err(),
                "{bad:?} should not parse as an endpoint"
            );
        }
    }

    #[test]
    fn wildcard_resolves_to_unspecified() {
        let addrs = Endpoint::new("*", 0).resolve().unwrap();
        assert!(addrs.iter().all(|a| a.ip().is_unspecified()));
    }

    #[test]
    fn role_spellings() {
        assert_eq!("active".parse::<Role>().unwrap(), Role::Active);
        assert_eq!("connect".parse::<Role>().unwrap(), Role::Active);
        assert_eq!("Passive".parse::<Role>().unwrap(), Role::Passive);
        assert_eq!("bind".parse::<Role>().unwrap(), Role::Passive);
        assert!(matches!(
            "listen".parse::<Role>(),
            Err(TransportError::InvalidRole(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        let ep = Endpoint::localhost(5555);
        assert_eq!(ep.to_string().parse::<Endpoint>().unwrap(), ep);
        assert_eq!(Role::Passive.to_string(), "passive");
    }
}
