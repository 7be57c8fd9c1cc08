//! Working set and unread queue
//!
//! The fetched messages are the single source of truth. The working
//! set is a list of indices into them and the unread queue is a cursor
//! over the working set, so every fetch or filter hands the queue a
//! fresh view and there is nothing to keep in sync.

use crate::error::{Error, Result};
use crate::message::Email;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Inbox {
    fetched: Vec<Email>,
    current: Vec<usize>,
    cursor: usize,
}

impl Inbox {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a new fetch; the working set becomes the
    /// whole fetch.
    pub fn replace(&mut self, emails: Vec<Email>) {
        self.current = (0..emails.len()).collect();
        self.fetched = emails;
        self.cursor = 0;
    }

    pub fn clear(&mut self) {
        self.replace(Vec::new());
    }

    /// Narrow the working set to messages of the last fetch that list
    /// `address` in To, Cc or Bcc. Order is preserved and the unread
    /// queue restarts at the first match.
    pub fn filter_by_recipient(&mut self, address: &str) {
        self.current = self
            .fetched
            .iter()
            .enumerate()
            .filter(|(_, email)| email.has_recipient(address))
            .map(|(i, _)| i)
            .collect();
        self.cursor = 0;
        debug!(
            "{} of {} message(s) addressed to {}",
            self.current.len(),
            self.fetched.len(),
            address
        );
    }

    /// Take the next unread message of the working set, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyQueue`] once the working set is exhausted.
    pub fn pop_next(&mut self) -> Result<&Email> {
        let index = *self.current.get(self.cursor).ok_or(Error::EmptyQueue)?;
        self.cursor += 1;
        Ok(&self.fetched[index])
    }

    /// Messages in the working set.
    pub fn current(&self) -> impl Iterator<Item = &Email> {
        self.current.iter().map(|&i| &self.fetched[i])
    }

    /// Messages not yet popped from the working set.
    pub fn unread(&self) -> impl Iterator<Item = &Email> {
        self.current[self.cursor..].iter().map(|&i| &self.fetched[i])
    }

    #[must_use]
    pub fn current_len(&self) -> usize {
        self.current.len()
    }

    #[must_use]
    pub fn unread_len(&self) -> usize {
        self.current.len() - self.cursor
    }

    /// Everything from the last fetch, ignoring filters.
    #[must_use]
    pub fn fetched(&self) -> &[Email] {
        &self.fetched
    }
}
