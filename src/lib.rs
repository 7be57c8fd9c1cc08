//! IMAP mailbox test steps
//!
//! Connects to a real IMAP mailbox for the duration of a test
//! scenario, fetches what arrived, narrows it to one recipient, and
//! asserts on the messages one at a time: subject, body, sender,
//! recipients, and the server's `X-Spam-Status` verdict.
//!
//! [`ImapMail`] is the entry point. Step failures come back as
//! [`Error`] values for which [`Error::is_test_failure`] is true;
//! anything else means the scenario cannot continue.

mod assert;
mod client;
mod config;
mod connection;
mod error;
pub mod extract;
mod flags;
mod inbox;
mod message;
mod scenario;
pub mod spam;

pub use client::MailboxClient;
pub use config::ImapConfig;
pub use connection::INBOX;
pub use error::{Error, Result};
pub use flags::{ConnectionFlag, ConnectionFlags, Security};
pub use inbox::Inbox;
pub use message::{AddressEntry, Email, EmailAddress, Header, parse_email};
pub use scenario::ImapMail;
