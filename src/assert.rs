//! Assertion steps on the opened email and the inbox
//!
//! Text fields are checked for a contained fragment; the sender is
//! compared whole. Address fields are matched against their JSON
//! rendering, e.g. `"Alice <alice@example.com>"` or just the address.

use crate::error::{Error, Result};
use crate::extract;
use crate::scenario::ImapMail;

fn ensure(condition: bool, message: &str) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::Assertion(message.to_string()))
    }
}

impl ImapMail {
    fn opened_field(&self, field: fn(&crate::Email) -> String) -> Result<String> {
        Ok(field(self.opened_email()?))
    }

    // -- subject --

    /// # Errors
    ///
    /// [`Error::Assertion`] if the subject lacks `expected`.
    pub fn see_in_opened_email_subject(&self, expected: &str) -> Result<()> {
        let subject = extract::subject(self.opened_email()?);
        ensure(
            subject.contains(expected),
            "Email Subject Does Not Contain Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if the subject contains `unexpected`.
    pub fn dont_see_in_opened_email_subject(&self, unexpected: &str) -> Result<()> {
        let subject = extract::subject(self.opened_email()?);
        ensure(
            !subject.contains(unexpected),
            "Email Subject Contains Expected Value",
        )
    }

    // -- body --

    /// # Errors
    ///
    /// [`Error::Assertion`] if the body lacks `expected`.
    pub fn see_in_opened_email_body(&self, expected: &str) -> Result<()> {
        let body = self.opened_field(extract::body)?;
        ensure(
            body.contains(expected),
            "Email Body Does Not Contain Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if the body contains `unexpected`.
    pub fn dont_see_in_opened_email_body(&self, unexpected: &str) -> Result<()> {
        let body = self.opened_field(extract::body)?;
        ensure(
            !body.contains(unexpected),
            "Email Body Contains Expected Value",
        )
    }

    // -- sender --

    /// # Errors
    ///
    /// [`Error::Assertion`] unless the sender address equals `expected`.
    pub fn see_in_opened_email_sender(&self, expected: &str) -> Result<()> {
        let sender = extract::sender(self.opened_email()?);
        ensure(
            sender == Some(expected),
            "Email Sender Does Not Match Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if the sender address equals `unexpected`.
    pub fn dont_see_in_opened_email_sender(&self, unexpected: &str) -> Result<()> {
        let sender = extract::sender(self.opened_email()?);
        ensure(
            sender != Some(unexpected),
            "Email Sender Matches Expected Value",
        )
    }

    // -- address fields --

    /// # Errors
    ///
    /// [`Error::Assertion`] if Reply-To lacks `expected`.
    pub fn see_in_opened_email_reply_to(&self, expected: &str) -> Result<()> {
        let reply_to = self.opened_field(extract::reply_to)?;
        ensure(
            reply_to.contains(expected),
            "Email Reply-To Does Not Contain Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if Reply-To contains `unexpected`.
    pub fn dont_see_in_opened_email_reply_to(&self, unexpected: &str) -> Result<()> {
        let reply_to = self.opened_field(extract::reply_to)?;
        ensure(
            !reply_to.contains(unexpected),
            "Email Reply-To Contains Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if To lacks `expected`.
    pub fn see_in_opened_email_to_field(&self, expected: &str) -> Result<()> {
        let to = self.opened_field(extract::to)?;
        ensure(
            to.contains(expected),
            "Email To Field Does Not Contain Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if To contains `unexpected`.
    pub fn dont_see_in_opened_email_to_field(&self, unexpected: &str) -> Result<()> {
        let to = self.opened_field(extract::to)?;
        ensure(
            !to.contains(unexpected),
            "Email To Field Contains Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if Cc lacks `expected`.
    pub fn see_in_opened_email_cc_field(&self, expected: &str) -> Result<()> {
        let cc = self.opened_field(extract::cc)?;
        ensure(
            cc.contains(expected),
            "Email CC Field Does Not Contain Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if Cc contains `unexpected`.
    pub fn dont_see_in_opened_email_cc_field(&self, unexpected: &str) -> Result<()> {
        let cc = self.opened_field(extract::cc)?;
        ensure(
            !cc.contains(unexpected),
            "Email CC Field Contains Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if Bcc lacks `expected`.
    pub fn see_in_opened_email_bcc_field(&self, expected: &str) -> Result<()> {
        let bcc = self.opened_field(extract::bcc)?;
        ensure(
            bcc.contains(expected),
            "Email BCC Field Does Not Contain Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if Bcc contains `unexpected`.
    pub fn dont_see_in_opened_email_bcc_field(&self, unexpected: &str) -> Result<()> {
        let bcc = self.opened_field(extract::bcc)?;
        ensure(
            !bcc.contains(unexpected),
            "Email BCC Field Contains Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if To, Cc and Bcc together lack `expected`.
    pub fn see_in_opened_email_recipients(&self, expected: &str) -> Result<()> {
        let recipients = self.opened_field(extract::recipients)?;
        ensure(
            recipients.contains(expected),
            "Email Recipients Do Not Contain Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if To, Cc or Bcc contains `unexpected`.
    pub fn dont_see_in_opened_email_recipients(&self, unexpected: &str) -> Result<()> {
        let recipients = self.opened_field(extract::recipients)?;
        ensure(
            !recipients.contains(unexpected),
            "Email Recipients Contain Expected Value",
        )
    }

    // -- priority --

    /// # Errors
    ///
    /// [`Error::Assertion`] unless `X-Priority` equals `expected`.
    pub fn see_in_opened_email_priority(&self, expected: &str) -> Result<()> {
        let priority = extract::priority(self.opened_email()?);
        ensure(
            priority == Some(expected),
            "Email Priority Does Not Match Expected Value",
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if `X-Priority` equals `unexpected`.
    pub fn dont_see_in_opened_email_priority(&self, unexpected: &str) -> Result<()> {
        let priority = extract::priority(self.opened_email()?);
        ensure(
            priority != Some(unexpected),
            "Email Priority Matches Expected Value",
        )
    }

    // -- counts --

    /// # Errors
    ///
    /// [`Error::Assertion`] if the working set is empty.
    pub fn have_emails(&self) -> Result<()> {
        ensure(self.inbox.current_len() > 0, "No emails found")
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if the working set is not empty.
    pub fn dont_have_emails(&self) -> Result<()> {
        ensure(self.inbox.current_len() == 0, "Emails were found")
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if the working set size differs.
    pub fn have_number_of_emails(&self, expected: usize) -> Result<()> {
        let actual = self.inbox.current_len();
        ensure(
            actual == expected,
            &format!("Expected {expected} email(s), found {actual}"),
        )
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if every message has been opened.
    pub fn have_unread_emails(&self) -> Result<()> {
        ensure(self.inbox.unread_len() > 0, "No unread emails found")
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if any message is still unread.
    pub fn dont_have_unread_emails(&self) -> Result<()> {
        ensure(self.inbox.unread_len() == 0, "Unread emails were found")
    }

    /// # Errors
    ///
    /// [`Error::Assertion`] if the number of unread messages differs.
    pub fn have_number_of_unread_emails(&self, expected: usize) -> Result<()> {
        let actual = self.inbox.unread_len();
        ensure(
            actual == expected,
            &format!("Expected {expected} unread email(s), found {actual}"),
        )
    }
}
