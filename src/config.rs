//! IMAP connection configuration

use crate::error::{Error, Result};
use crate::flags::ConnectionFlags;
use serde::Deserialize;
use std::collections::HashMap;
use std::env;

const DEFAULT_PORT: u16 = 143;

/// Per-scenario IMAP configuration.
///
/// Deserializes from the camelCase option names used by suite config
/// files (`imapServer`, `imapUser`, `imapPassword`, `imapPort`,
/// `imapFlags`, `deleteEmailsAfterScenario`, `mailboxMapping`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImapConfig {
    #[serde(rename = "imapServer")]
    pub host: String,
    #[serde(rename = "imapPort", default = "default_port")]
    pub port: u16,
    #[serde(rename = "imapFlags", default)]
    pub flags: ConnectionFlags,
    #[serde(rename = "imapUser")]
    pub username: String,
    #[serde(rename = "imapPassword")]
    pub password: String,
    /// Purge the whole INBOX when the scenario ends.
    #[serde(default)]
    pub delete_emails_after_scenario: bool,
    /// Reserved. Parsed but not used by any step.
    #[serde(default)]
    pub mailbox_mapping: HashMap<String, String>,
}

const fn default_port() -> u16 {
    DEFAULT_PORT
}

impl ImapConfig {
    /// Configuration with default port, no flags, and no purge.
    #[must_use]
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            flags: ConnectionFlags::default(),
            username: username.into(),
            password: password.into(),
            delete_emails_after_scenario: false,
            mailbox_mapping: HashMap::new(),
        }
    }

    /// Load IMAP configuration from environment variables
    ///
    /// Reads from `.env` file if present. Required variables:
    /// - `IMAP_SERVER`
    /// - `IMAP_USER`
    /// - `IMAP_PASSWORD`
    ///
    /// Optional (with defaults):
    /// - `IMAP_PORT` (default: `143`)
    /// - `IMAP_FLAGS` (default: empty, e.g. `/imap/ssl/novalidate-cert`)
    /// - `IMAP_DELETE_EMAILS_AFTER_SCENARIO` (default: `false`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required variable is missing or
    /// a value does not parse.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            host: env::var("IMAP_SERVER")
                .map_err(|_| Error::Config("IMAP_SERVER not set".into()))?,
            port: env::var("IMAP_PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|e| Error::Config(format!("Invalid IMAP_PORT: {e}")))?,
            flags: env::var("IMAP_FLAGS").unwrap_or_default().parse()?,
            username: env::var("IMAP_USER")
                .map_err(|_| Error::Config("IMAP_USER not set".into()))?,
            password: env::var("IMAP_PASSWORD")
                .map_err(|_| Error::Config("IMAP_PASSWORD not set".into()))?,
            delete_emails_after_scenario: env::var("IMAP_DELETE_EMAILS_AFTER_SCENARIO")
                .map_or(Ok(false), |v| parse_bool(&v))?,
            mailbox_mapping: HashMap::new(),
        })
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        other => Err(Error::Config(format!(
            "Invalid IMAP_DELETE_EMAILS_AFTER_SCENARIO: {other}"
        ))),
    }
}
