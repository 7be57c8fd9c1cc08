//! Per-scenario mail context
//!
//! [`ImapMail`] is what a test holds for the duration of one
//! scenario: the IMAP session, the fetched messages with the current
//! working set, and the message opened for inspection. Construct it
//! with [`ImapMail::before`], drive it through the steps, and finish
//! with [`ImapMail::after`].
//!
//! ```no_run
//! # async fn scenario() -> imap_mail_steps::Result<()> {
//! use imap_mail_steps::{ImapConfig, ImapMail};
//!
//! let mut mail = ImapMail::before(ImapConfig::from_env()?).await?;
//! mail.fetch_emails().await?;
//! mail.access_inbox_for("customer@example.com");
//! mail.open_next_unread_email()?;
//! mail.see_in_opened_email_subject("Your order")?;
//! mail.see_no_relevant_spam_score()?;
//! mail.after().await
//! # }
//! ```

use crate::client::MailboxClient;
use crate::config::ImapConfig;
use crate::error::{Error, Result};
use crate::extract;
use crate::inbox::Inbox;
use crate::message::Email;
use crate::spam;
use tracing::{info, warn};

/// Lifecycle of the scenario's IMAP session. Transitions only go
/// forward; a closed session is never reopened.
enum SessionState {
    Unconnected,
    Connected(MailboxClient),
    Closed,
}

/// The mail steps available to one scenario.
pub struct ImapMail {
    config: ImapConfig,
    state: SessionState,
    pub(crate) inbox: Inbox,
    pub(crate) opened: Option<Email>,
}

impl ImapMail {
    /// A context with no session yet.
    #[must_use]
    pub fn new(config: ImapConfig) -> Self {
        Self {
            config,
            state: SessionState::Unconnected,
            inbox: Inbox::new(),
            opened: None,
        }
    }

    /// Scenario start: connect and open the INBOX.
    ///
    /// # Errors
    ///
    /// Connection errors are fatal for the scenario; see
    /// [`ImapMail::connect`].
    pub async fn before(config: ImapConfig) -> Result<Self> {
        let mut mail = Self::new(config);
        mail.connect().await?;
        Ok(mail)
    }

    /// Scenario end: purge the INBOX if `deleteEmailsAfterScenario`
    /// is set, then close the session.
    ///
    /// # Errors
    ///
    /// See [`ImapMail::disconnect`].
    pub async fn after(mut self) -> Result<()> {
        let purge = self.config.delete_emails_after_scenario;
        self.disconnect(purge).await
    }

    /// Open the session and select the INBOX.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] if login or selection fails or the
    /// session was already used; [`Error::Tls`] / [`Error::Io`] for
    /// transport failures.
    pub async fn connect(&mut self) -> Result<()> {
        match self.state {
            SessionState::Unconnected => {}
            SessionState::Connected(_) => {
                return Err(Error::Connection("Already connected".into()));
            }
            SessionState::Closed => {
                return Err(Error::Connection("Session already closed".into()));
            }
        }

        let client = MailboxClient::connect(&self.config).await?;
        self.state = SessionState::Connected(client);
        Ok(())
    }

    /// Close the session, optionally deleting every INBOX message
    /// first.
    ///
    /// The session is logged out even when the purge fails; the purge
    /// error is returned afterwards. Disconnecting a session that was
    /// never opened just marks it closed.
    ///
    /// # Errors
    ///
    /// Returns the purge or logout error.
    pub async fn disconnect(&mut self, purge_first: bool) -> Result<()> {
        let SessionState::Connected(mut client) =
            std::mem::replace(&mut self.state, SessionState::Closed)
        else {
            return Ok(());
        };

        let purged = if purge_first {
            client.delete_all().await
        } else {
            Ok(())
        };
        if let Err(e) = &purged {
            warn!("Purge before logout failed: {}", e);
        }

        let logged_out = client.logout().await;
        info!("IMAP session closed");
        purged.and(logged_out)
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    #[must_use]
    pub const fn config(&self) -> &ImapConfig {
        &self.config
    }

    fn client(&mut self) -> Result<&mut MailboxClient> {
        match &mut self.state {
            SessionState::Connected(client) => Ok(client),
            SessionState::Unconnected => Err(Error::Connection("Not connected".into())),
            SessionState::Closed => Err(Error::Connection("Session already closed".into())),
        }
    }

    /// Delete every message in the INBOX.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] without a session, [`Error::Imap`] if the
    /// server rejects the deletion.
    pub async fn delete_all_emails(&mut self) -> Result<()> {
        self.client()?.delete_all().await
    }

    /// Fetch all INBOX messages; the working set becomes the whole
    /// INBOX.
    ///
    /// # Errors
    ///
    /// [`Error::Fetch`] on protocol failure, leaving the working set
    /// empty.
    pub async fn fetch_emails(&mut self) -> Result<()> {
        self.inbox.clear();
        let emails = self
            .client()
            .map_err(|e| Error::Fetch(e.to_string()))?
            .fetch_all()
            .await?;
        info!("Fetched {} email(s)", emails.len());
        self.inbox.replace(emails);
        Ok(())
    }

    /// Keep only fetched messages addressed (To, Cc or Bcc) to
    /// `address`, compared exactly.
    pub fn access_inbox_for(&mut self, address: &str) {
        self.inbox.filter_by_recipient(address);
    }

    /// Pop the next unread message of the working set and open it.
    ///
    /// # Errors
    ///
    /// [`Error::EmptyQueue`] when every message has been opened.
    pub fn open_next_unread_email(&mut self) -> Result<&Email> {
        let email = self.inbox.pop_next()?.clone();
        Ok(&*self.opened.insert(email))
    }

    /// The opened message.
    ///
    /// # Errors
    ///
    /// [`Error::NoOpenedEmail`] before the first
    /// [`open_next_unread_email`](Self::open_next_unread_email).
    pub fn opened_email(&self) -> Result<&Email> {
        self.opened.as_ref().ok_or(Error::NoOpenedEmail)
    }

    /// Messages in the working set, in mailbox order.
    #[must_use]
    pub fn current_inbox(&self) -> Vec<&Email> {
        self.inbox.current().collect()
    }

    /// Messages in the working set not opened yet.
    #[must_use]
    pub fn unread_inbox(&self) -> Vec<&Email> {
        self.inbox.unread().collect()
    }

    /// Fail if the opened message was flagged as spam.
    ///
    /// # Errors
    ///
    /// [`Error::Assertion`] with the header value, or
    /// [`Error::NoOpenedEmail`].
    pub fn see_no_relevant_spam_score(&self) -> Result<()> {
        spam::check_spam_status(&self.opened_email()?.raw_headers)
    }

    /// # Errors
    ///
    /// [`Error::NoOpenedEmail`] when nothing is open.
    pub fn grab_body_from_email(&self) -> Result<String> {
        Ok(extract::body(self.opened_email()?))
    }

    /// # Errors
    ///
    /// [`Error::NoOpenedEmail`] when nothing is open.
    pub fn grab_subject_from_email(&self) -> Result<String> {
        Ok(extract::subject(self.opened_email()?).to_string())
    }

    /// # Errors
    ///
    /// [`Error::NoOpenedEmail`] when nothing is open,
    /// [`Error::Assertion`] when the message has no resolvable sender.
    pub fn grab_sender_from_email(&self) -> Result<String> {
        extract::sender(self.opened_email()?)
            .map(str::to_string)
            .ok_or_else(|| Error::Assertion("Opened email has no sender address".into()))
    }

    /// # Errors
    ///
    /// [`Error::NoOpenedEmail`] when nothing is open.
    pub fn grab_to_from_email(&self) -> Result<String> {
        Ok(extract::to(self.opened_email()?))
    }

    /// # Errors
    ///
    /// [`Error::NoOpenedEmail`] when nothing is open.
    pub fn grab_cc_from_email(&self) -> Result<String> {
        Ok(extract::cc(self.opened_email()?))
    }

    /// # Errors
    ///
    /// [`Error::NoOpenedEmail`] when nothing is open.
    pub fn grab_bcc_from_email(&self) -> Result<String> {
        Ok(extract::bcc(self.opened_email()?))
    }

    /// # Errors
    ///
    /// [`Error::NoOpenedEmail`] when nothing is open.
    pub fn grab_recipients_from_email(&self) -> Result<String> {
        Ok(extract::recipients(self.opened_email()?))
    }

    /// # Errors
    ///
    /// [`Error::NoOpenedEmail`] when nothing is open.
    pub fn grab_reply_to_from_email(&self) -> Result<String> {
        Ok(extract::reply_to(self.opened_email()?))
    }
}

#[cfg(test)]
impl ImapMail {
    /// A context with pre-fetched messages and no session, for
    /// exercising steps without a server.
    pub(crate) fn offline(emails: &[&[u8]]) -> Self {
        let mut mail = Self::new(ImapConfig::new("127.0.0.1", "qa", "pw"));
        let parsed = emails
            .iter()
            .zip(1..)
            .map(|(raw, uid)| crate::message::parse_email(uid, raw).unwrap())
            .collect();
        mail.inbox.replace(parsed);
        mail
    }
}
