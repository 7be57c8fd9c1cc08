//! Error types for imap-mail-steps

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Login or INBOX selection failed, or the session is not open.
    #[error("IMAP connection error: {0}")]
    Connection(String),

    /// Listing or fetching messages failed.
    #[error("Failed to fetch emails: {0}")]
    Fetch(String),

    #[error("Unread Inbox is Empty")]
    EmptyQueue,

    #[error("No email has been opened")]
    NoOpenedEmail,

    #[error("{0}")]
    Assertion(String),

    #[error("IMAP error: {0}")]
    Imap(String),

    #[error("Email parsing error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TLS error: {0}")]
    Tls(String),
}

impl Error {
    /// Whether this error is a failed test step rather than a fatal
    /// fault. A scenario can keep running after a step failure.
    #[must_use]
    pub const fn is_test_failure(&self) -> bool {
        matches!(
            self,
            Self::Fetch(_) | Self::EmptyQueue | Self::NoOpenedEmail | Self::Assertion(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
