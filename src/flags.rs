//! IMAP connection flags
//!
//! Connection options are written in the slash-separated mailbox
//! specifier syntax used by c-client based tooling, for example
//! `/imap/ssl/novalidate-cert`. Each component becomes a
//! [`ConnectionFlag`]; [`ConnectionFlags`] answers the questions the
//! connection code needs (transport security, certificate checking,
//! read-only access).

use crate::error::{Error, Result};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// A single connection flag.
///
/// # Examples
///
/// ```
/// use imap_mail_steps::ConnectionFlag;
///
/// let flag: ConnectionFlag = "novalidate-cert".parse().unwrap();
/// assert_eq!(flag, ConnectionFlag::NoValidateCert);
/// assert_eq!(flag.as_str(), "novalidate-cert");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionFlag {
    /// Service name (`imap`, `imap2`, `imap2bis`, `imap4`, `imap4rev1`).
    /// Always IMAP.
    Imap,
    /// Implicit TLS from the first byte (`ssl`).
    Ssl,
    /// Upgrade with STARTTLS before logging in (`tls`).
    Tls,
    /// Never negotiate TLS, even when the server offers STARTTLS
    /// (`notls`).
    NoTls,
    /// Verify the server certificate (`validate-cert`).
    ValidateCert,
    /// Accept any server certificate (`novalidate-cert`).
    NoValidateCert,
    /// Open the mailbox with EXAMINE instead of SELECT (`readonly`).
    ReadOnly,
    /// Accepted for compatibility, no effect (`secure`).
    Secure,
    /// Accepted for compatibility, no effect (`norsh`).
    NoRsh,
    /// Accepted for compatibility, no effect (`debug`).
    Debug,
}

impl ConnectionFlag {
    /// The flag as written in a mailbox specifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Imap => "imap",
            Self::Ssl => "ssl",
            Self::Tls => "tls",
            Self::NoTls => "notls",
            Self::ValidateCert => "validate-cert",
            Self::NoValidateCert => "novalidate-cert",
            Self::ReadOnly => "readonly",
            Self::Secure => "secure",
            Self::NoRsh => "norsh",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for ConnectionFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionFlag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "imap" | "imap2" | "imap2bis" | "imap4" | "imap4rev1" => Ok(Self::Imap),
            "ssl" => Ok(Self::Ssl),
            "tls" => Ok(Self::Tls),
            "notls" => Ok(Self::NoTls),
            "validate-cert" => Ok(Self::ValidateCert),
            "novalidate-cert" => Ok(Self::NoValidateCert),
            "readonly" => Ok(Self::ReadOnly),
            "secure" => Ok(Self::Secure),
            "norsh" => Ok(Self::NoRsh),
            "debug" => Ok(Self::Debug),
            other => Err(Error::Config(format!("Unknown IMAP flag: /{other}"))),
        }
    }
}

/// How the transport is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// Plain TCP, credentials in the clear.
    Plain,
    /// Try STARTTLS and stay on plain TCP if the server refuses it.
    Opportunistic,
    /// Plain TCP upgraded with STARTTLS; a refusal is an error.
    StartTls,
    /// TLS from connect.
    Tls,
}

/// The parsed set of connection flags from `imapFlags`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct ConnectionFlags {
    flags: Vec<ConnectionFlag>,
}

impl ConnectionFlags {
    #[must_use]
    pub fn contains(&self, flag: ConnectionFlag) -> bool {
        self.flags.contains(&flag)
    }

    /// Transport security. `ssl` wins over `tls`, which wins over
    /// `notls`. With none of them STARTTLS is used when the server
    /// accepts it.
    #[must_use]
    pub fn security(&self) -> Security {
        if self.contains(ConnectionFlag::Ssl) {
            Security::Tls
        } else if self.contains(ConnectionFlag::Tls) {
            Security::StartTls
        } else if self.contains(ConnectionFlag::NoTls) {
            Security::Plain
        } else {
            Security::Opportunistic
        }
    }

    /// Whether the server certificate must chain to a trusted root.
    /// The last of `validate-cert` / `novalidate-cert` wins; the
    /// default is to validate.
    #[must_use]
    pub fn validate_cert(&self) -> bool {
        self.flags
            .iter()
            .rev()
            .find_map(|f| match f {
                ConnectionFlag::ValidateCert => Some(true),
                ConnectionFlag::NoValidateCert => Some(false),
                _ => None,
            })
            .unwrap_or(true)
    }

    #[must_use]
    pub fn read_only(&self) -> bool {
        self.contains(ConnectionFlag::ReadOnly)
    }

    pub fn iter(&self) -> impl Iterator<Item = ConnectionFlag> + '_ {
        self.flags.iter().copied()
    }
}

impl FromStr for ConnectionFlags {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let flags = s
            .split('/')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::parse::<ConnectionFlag>)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { flags })
    }
}

impl TryFrom<String> for ConnectionFlags {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for ConnectionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for flag in &self.flags {
            write!(f, "/{flag}")?;
        }
        Ok(())
    }
}
