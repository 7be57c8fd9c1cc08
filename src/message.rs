//! Parsed email messages
//!
//! An [`Email`] is an owned snapshot of one INBOX message, built from
//! the raw RFC 5322 bytes returned by `UID FETCH ... BODY.PEEK[]`.
//! Headers, address lists and the first text/plain and text/html
//! parts are decoded with `mailparse`.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use mailparse::{MailAddr, MailHeader, MailHeaderMap, ParsedMail, SingleInfo};
use serde::Serialize;
use std::fmt;

/// A mailbox address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: String,
}

impl EmailAddress {
    #[must_use]
    pub fn new(name: Option<&str>, address: impl Into<String>) -> Self {
        Self {
            name: name.map(str::to_string),
            address: address.into(),
        }
    }

    /// `Name <address>`, or the bare address when there is no name.
    #[must_use]
    pub fn full_address(&self) -> String {
        match self.name.as_deref().filter(|n| !n.is_empty()) {
            Some(name) => format!("{name} <{}>", self.address),
            None => self.address.clone(),
        }
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_address())
    }
}

/// One entry of an address header.
///
/// Entries that could not be resolved to `mailbox@host` are kept as
/// `Unresolved` so nothing is lost, but filtering and extraction only
/// look at `Resolved` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AddressEntry {
    Resolved(EmailAddress),
    Unresolved(String),
}

impl AddressEntry {
    #[must_use]
    pub const fn as_resolved(&self) -> Option<&EmailAddress> {
        match self {
            Self::Resolved(address) => Some(address),
            Self::Unresolved(_) => None,
        }
    }

    fn from_single(info: &SingleInfo) -> Self {
        if info.addr.contains('@') {
            Self::Resolved(EmailAddress::new(info.display_name.as_deref(), &info.addr))
        } else {
            Self::Unresolved(info.addr.clone())
        }
    }
}

/// A decoded header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// A fetched message.
#[derive(Debug, Clone, Serialize)]
pub struct Email {
    pub uid: u32,
    pub date: Option<DateTime<Utc>>,
    pub subject: String,
    pub from: Vec<AddressEntry>,
    pub sender: Vec<AddressEntry>,
    pub to: Vec<AddressEntry>,
    pub cc: Vec<AddressEntry>,
    pub bcc: Vec<AddressEntry>,
    pub reply_to: Vec<AddressEntry>,
    pub headers: Vec<Header>,
    pub html_body: Option<String>,
    pub text_body: Option<String>,
    /// The header block exactly as received, up to and including the
    /// blank line that separates it from the body.
    pub raw_headers: String,
}

impl Email {
    /// First header with this name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Resolved To, Cc and Bcc addresses, in that order.
    pub fn recipients(&self) -> impl Iterator<Item = &EmailAddress> {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .filter_map(AddressEntry::as_resolved)
    }

    /// Whether `address` appears verbatim in To, Cc or Bcc.
    #[must_use]
    pub fn has_recipient(&self, address: &str) -> bool {
        self.recipients().any(|r| r.address == address)
    }
}

/// Parse raw message bytes into an [`Email`].
///
/// # Errors
///
/// Returns [`Error::Parse`] if the header block is malformed.
pub fn parse_email(uid: u32, raw: &[u8]) -> Result<Email> {
    let (_, body_offset) =
        mailparse::parse_headers(raw).map_err(|e| Error::Parse(e.to_string()))?;
    let parsed = mailparse::parse_mail(raw).map_err(|e| Error::Parse(e.to_string()))?;
    let headers = &parsed.headers;

    let mut html_body = None;
    let mut text_body = None;
    walk_text_parts(&parsed, &mut text_body, &mut html_body);

    let from = address_list(headers, "From");
    let mut sender = address_list(headers, "Sender");
    if sender.is_empty() {
        sender.clone_from(&from);
    }

    Ok(Email {
        uid,
        date: headers
            .get_first_value("Date")
            .and_then(|d| mailparse::dateparse(&d).ok())
            .and_then(|ts| DateTime::from_timestamp(ts, 0)),
        subject: headers.get_first_value("Subject").unwrap_or_default(),
        from,
        sender,
        to: address_list(headers, "To"),
        cc: address_list(headers, "Cc"),
        bcc: address_list(headers, "Bcc"),
        reply_to: address_list(headers, "Reply-To"),
        headers: headers
            .iter()
            .map(|h| Header {
                name: h.get_key(),
                value: h.get_value(),
            })
            .collect(),
        html_body,
        text_body,
        raw_headers: String::from_utf8_lossy(&raw[..body_offset]).into_owned(),
    })
}

/// Collect every address from all headers named `name`.
fn address_list(headers: &[MailHeader<'_>], name: &str) -> Vec<AddressEntry> {
    headers
        .iter()
        .filter(|h| h.get_key_ref().eq_ignore_ascii_case(name))
        .flat_map(|h| match mailparse::addrparse_header(h) {
            Ok(list) => list
                .iter()
                .flat_map(|addr| match addr {
                    MailAddr::Single(info) => vec![AddressEntry::from_single(info)],
                    MailAddr::Group(group) => {
                        group.addrs.iter().map(AddressEntry::from_single).collect()
                    }
                })
                .collect::<Vec<_>>(),
            Err(_) => vec![AddressEntry::Unresolved(h.get_value())],
        })
        .collect()
}

/// Keep the first inline text/plain and text/html leaf parts.
fn walk_text_parts(
    part: &ParsedMail<'_>,
    text_body: &mut Option<String>,
    html_body: &mut Option<String>,
) {
    if !part.subparts.is_empty() {
        for sub in &part.subparts {
            walk_text_parts(sub, text_body, html_body);
        }
        return;
    }

    if part.get_content_disposition().disposition == mailparse::DispositionType::Attachment {
        return;
    }

    match part.ctype.mimetype.to_ascii_lowercase().as_str() {
        "text/plain" if text_body.is_none() => *text_body = part.get_body().ok(),
        "text/html" if html_body.is_none() => *html_body = part.get_body().ok(),
        _ => {}
    }
}
