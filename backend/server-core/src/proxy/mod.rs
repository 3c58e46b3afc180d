//! Proxy endpoint model handed from the dispatcher to the settings store.

pub mod codec;

use crate::error::proxy::ProxyConfigError;

use common::{ErrorLocation, RedactedSecret};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;

/// Proxy protocol. The discriminant order is the persisted tag order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    #[default]
    None,
    Socks5,
    Http,
    MtProto,
}

impl ProxyKind {
    /// Tag written by the settings codec.
    pub const fn tag(self) -> i32 {
        match self {
            ProxyKind::None => 0,
            ProxyKind::Socks5 => 1,
            ProxyKind::Http => 2,
            ProxyKind::MtProto => 3,
        }
    }

    /// Map the `protocol` parameter of `set_proxy`.
    ///
    /// Only `"socks5"` selects SOCKS5; any other value, or none at all, means HTTP.
    pub fn from_protocol(protocol: Option<&str>) -> Self {
        match protocol {
            Some("socks5") => ProxyKind::Socks5,
            _ => ProxyKind::Http,
        }
    }
}

impl TryFrom<i32> for ProxyKind {
    type Error = ProxyConfigError;

    #[track_caller]
    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(ProxyKind::None),
            1 => Ok(ProxyKind::Socks5),
            2 => Ok(ProxyKind::Http),
            3 => Ok(ProxyKind::MtProto),
            _ => Err(ProxyConfigError::UnknownKind {
                tag,
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}

impl Display for ProxyKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ProxyKind::None => "none",
            ProxyKind::Socks5 => "socks5",
            ProxyKind::Http => "http",
            ProxyKind::MtProto => "mtproto",
        };
        formatter.write_str(name)
    }
}

/// One proxy endpoint.
///
/// A kind other than [`ProxyKind::None`] always has a non-empty host and a
/// port in `1..=65535`. Empty `user`/`password` mean "unset".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    kind: ProxyKind,
    host: String,
    port: u16,
    user: String,
    password: RedactedSecret,
}

impl ProxyConfig {
    /// Build a validated proxy configuration.
    ///
    /// [`ProxyKind::None`] accepts any host and a port in `0..=65535`.
    ///
    /// # Errors
    ///
    /// - [`ProxyConfigError::EmptyHost`] when a real proxy kind has no host
    /// - [`ProxyConfigError::InvalidPort`] when the port does not fit 16 bits, or is 0
    ///   for a real proxy kind
    #[track_caller]
    pub fn new(
        kind: ProxyKind,
        host: impl Into<String>,
        port: i64,
        user: impl Into<String>,
        password: impl Into<RedactedSecret>,
    ) -> Result<Self, ProxyConfigError> {
        let host = host.into();

        let port = match u16::try_from(port) {
            Ok(port) if port != 0 || kind == ProxyKind::None => port,
            _ => {
                let range = if kind == ProxyKind::None { 0 } else { 1 };
                return Err(ProxyConfigError::InvalidPort {
                    message: format!("{kind} proxy port {port} is outside {range}-65535"),
                    location: ErrorLocation::from(Location::caller()),
                });
            }
        };

        if kind != ProxyKind::None && host.is_empty() {
            return Err(ProxyConfigError::EmptyHost {
                message: format!("{kind} proxy requires a host"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(Self {
            kind,
            host,
            port,
            user: user.into(),
            password: password.into(),
        })
    }

    /// The "no proxy" configuration.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &RedactedSecret {
        &self.password
    }
}

impl Display for ProxyConfig {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        if self.kind == ProxyKind::None {
            return formatter.write_str("none");
        }
        write!(formatter, "{}://{}:{}", self.kind, self.host, self.port)?;
        if !self.user.is_empty() {
            write!(formatter, " (user {})", self.user)?;
        }
        Ok(())
    }
}
