//! IMAP mailbox client
//!
//! A [`MailboxClient`] holds one logged-in session with the INBOX
//! selected for the lifetime of a scenario.

use crate::config::ImapConfig;
use crate::connection::{self, INBOX, ImapSession};
use crate::error::{Error, Result};
use crate::message::{Email, parse_email};
use async_imap::imap_proto::{MailboxDatum, Response, Status};
use futures::TryStreamExt;
use tracing::{debug, info};

/// Long-lived IMAP session on the INBOX.
pub struct MailboxClient {
    session: ImapSession,
    read_only: bool,
}

impl MailboxClient {
    /// Connect, log in and open the INBOX.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if login or INBOX selection
    /// fails, [`Error::Tls`] or [`Error::Io`] for transport failures.
    pub async fn connect(config: &ImapConfig) -> Result<Self> {
        let read_only = config.flags.read_only();
        let mut session = connection::connect(config).await?;
        connection::open_inbox(&mut session, read_only).await?;
        Ok(Self { session, read_only })
    }

    /// Fetch every INBOX message in mailbox order.
    ///
    /// The INBOX is re-opened first so messages delivered since the
    /// last command are visible.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] on any protocol or parse failure,
    /// including a refused SEARCH.
    pub async fn fetch_all(&mut self) -> Result<Vec<Email>> {
        connection::open_inbox(&mut self.session, self.read_only)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let uids = self.all_uids().await.map_err(|e| Error::Fetch(e.to_string()))?;
        if uids.is_empty() {
            return Ok(vec![]);
        }

        info!("Fetching {} message(s) from {}", uids.len(), INBOX);

        let mut emails = Vec::with_capacity(uids.len());
        for uid in uids {
            let email = self
                .fetch_single(uid)
                .await
                .map_err(|e| Error::Fetch(e.to_string()))?;
            emails.push(email);
        }
        Ok(emails)
    }

    /// Flag every INBOX message `\Deleted` and expunge.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Imap`] if the server refuses SEARCH, STORE or
    /// EXPUNGE, or the connection drops.
    pub async fn delete_all(&mut self) -> Result<()> {
        let uids = self.all_uids().await?;
        if uids.is_empty() {
            debug!("{} already empty", INBOX);
            return Ok(());
        }

        let uid_set = uids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        // uid_store() and expunge() drop the completion status, so a NO
        // would pass as success.
        self.session
            .run_command_and_check_ok(format!("UID STORE {uid_set} +FLAGS.SILENT (\\Deleted)"))
            .await
            .map_err(|e| Error::Imap(format!("Store failed: {e}")))?;

        self.session
            .run_command_and_check_ok("EXPUNGE")
            .await
            .map_err(|e| Error::Imap(format!("Expunge failed: {e}")))?;

        info!("Deleted {} message(s) from {}", uids.len(), INBOX);
        Ok(())
    }

    /// LOGOUT and drop the connection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Imap`] if the server does not acknowledge.
    pub async fn logout(mut self) -> Result<()> {
        self.session
            .logout()
            .await
            .map_err(|e| Error::Imap(format!("Logout failed: {e}")))
    }

    // -- private helpers --

    /// All UIDs in the INBOX, ascending.
    ///
    /// Runs `UID SEARCH ALL` by hand: `Session::uid_search` ignores the
    /// tagged status and turns a refused SEARCH into an empty set.
    async fn all_uids(&mut self) -> Result<Vec<u32>> {
        let tag = self
            .session
            .run_command("UID SEARCH ALL")
            .await
            .map_err(|e| Error::Imap(format!("Search failed: {e}")))?;

        let mut uids = Vec::new();
        loop {
            let response = self
                .session
                .read_response()
                .await
                .map_err(|e| Error::Imap(format!("Search failed: {e}")))?
                .ok_or_else(|| Error::Imap("Search failed: connection lost".to_string()))?;

            match response.parsed() {
                Response::MailboxData(MailboxDatum::Search(found)) => {
                    uids.extend_from_slice(found);
                }
                Response::Done {
                    tag: done,
                    status,
                    information,
                    ..
                } if *done == tag => {
                    if *status != Status::Ok {
                        return Err(Error::Imap(format!(
                            "Search refused: {}",
                            information.as_deref().unwrap_or("no reason given")
                        )));
                    }
                    break;
                }
                _ => {}
            }
        }

        uids.sort_unstable();
        uids.dedup();
        Ok(uids)
    }

    async fn fetch_single(&mut self, uid: u32) -> Result<Email> {
        let uid_set = format!("{uid}");
        let messages = self
            .session
            .uid_fetch(&uid_set, "(BODY.PEEK[])")
            .await
            .map_err(|e| Error::Imap(format!("Fetch failed: {e}")))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| Error::Imap(format!("Fetch error: {e}")))?;

        let body = messages
            .iter()
            .find_map(async_imap::types::Fetch::body)
            .ok_or_else(|| Error::Imap(format!("No body found for UID {uid}")))?;

        parse_email(uid, body)
    }
}
