//! Field extractors
//!
//! Pure functions from an [`Email`] to the values test steps compare
//! against. Address lists are rendered as compact JSON arrays of
//! `Name <address>` strings so a step can match on a fragment of the
//! serialized list.

use crate::message::{AddressEntry, Email};
use serde_json::Value;

#[must_use]
pub fn subject(email: &Email) -> &str {
    &email.subject
}

/// HTML body, a blank line, then the text body.
///
/// The separator and text part are appended even when there is no
/// HTML part, so a text-only message yields `"\n\n<text>"`. Existing
/// fixtures compare against this exact shape.
#[must_use]
pub fn body(email: &Email) -> String {
    let mut body = email.html_body.clone().unwrap_or_default();
    body.push_str("\n\n");
    body.push_str(email.text_body.as_deref().unwrap_or_default());
    body
}

/// Address of the first Sender entry.
#[must_use]
pub fn sender(email: &Email) -> Option<&str> {
    email
        .sender
        .first()
        .and_then(AddressEntry::as_resolved)
        .map(|a| a.address.as_str())
}

/// Full addresses of the resolved entries; unresolved ones are dropped.
#[must_use]
pub fn full_addresses(entries: &[AddressEntry]) -> Vec<String> {
    entries
        .iter()
        .filter_map(AddressEntry::as_resolved)
        .map(crate::message::EmailAddress::full_address)
        .collect()
}

fn to_json(addresses: Vec<String>) -> String {
    Value::from(addresses).to_string()
}

#[must_use]
pub fn to(email: &Email) -> String {
    to_json(full_addresses(&email.to))
}

#[must_use]
pub fn cc(email: &Email) -> String {
    to_json(full_addresses(&email.cc))
}

#[must_use]
pub fn bcc(email: &Email) -> String {
    to_json(full_addresses(&email.bcc))
}

#[must_use]
pub fn reply_to(email: &Email) -> String {
    to_json(full_addresses(&email.reply_to))
}

/// To, Cc and Bcc merged into one array, in that order.
#[must_use]
pub fn recipients(email: &Email) -> String {
    let mut all = full_addresses(&email.to);
    all.extend(full_addresses(&email.cc));
    all.extend(full_addresses(&email.bcc));
    to_json(all)
}

/// The `X-Priority` header, if any.
#[must_use]
pub fn priority(email: &Email) -> Option<&str> {
    email.header("X-Priority")
}
