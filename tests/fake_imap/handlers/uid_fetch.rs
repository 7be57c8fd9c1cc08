//! UID FETCH command handler.
//!
//! Bodies go out as counted literals:
//!
//! ```text
//! * <seq> FETCH (UID <uid> BODY[] {<length>}
//! <exactly length bytes of raw RFC 2822 message>
//! )
//! ```
//!
//! Whatever data items were requested, the answer is always the full
//! `BODY[]`; that covers `BODY.PEEK[]`. `<seq>` is the message's
//! 1-based position in the folder.

use super::expand_uids;
use crate::fake_imap::io::{complete, write_bytes, write_line};
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::sequence::SequenceSet;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

pub async fn handle_uid_fetch<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder) = selected_folder.and_then(|name| mailbox.get_folder(name)) else {
        let _ = complete(stream, tag, "BAD No folder selected").await;
        return;
    };

    for uid in expand_uids(sequence_set, folder.max_uid()) {
        let Some(seq) = folder.emails.iter().position(|e| e.uid == uid) else {
            continue;
        };
        let raw = &folder.emails[seq].raw;

        let prefix = format!("* {} FETCH (UID {uid} BODY[] {{{}}}\r\n", seq + 1, raw.len());
        if write_line(stream, &prefix).await.is_err()
            || write_bytes(stream, raw).await.is_err()
            || write_line(stream, ")\r\n").await.is_err()
        {
            return;
        }
    }

    let _ = complete(stream, tag, "OK FETCH completed").await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::io::collect_output;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use imap_codec::imap_types::sequence::{SeqOrUid, Sequence};
    use std::num::NonZeroU32;

    const RAW: &[u8] = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody";

    fn uid_set(uid: u32) -> SequenceSet {
        SequenceSet(
            vec![Sequence::Single(SeqOrUid::Value(
                NonZeroU32::new(uid).unwrap(),
            ))]
            .try_into()
            .unwrap(),
        )
    }

    async fn run(sequence_set: &SequenceSet, mailbox: &Mailbox, selected: Option<&str>) -> String {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        handle_uid_fetch("A1", sequence_set, mailbox, selected, &mut stream).await;
        drop(stream);
        collect_output(client).await
    }

    #[tokio::test]
    async fn sends_body_as_literal() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(7, RAW)
            .email(42, RAW)
            .build();

        let output = run(&uid_set(42), &mailbox, Some("INBOX")).await;

        let expected = format!("* 2 FETCH (UID 42 BODY[] {{{}}}\r\n", RAW.len());
        assert!(output.starts_with(&expected));
        assert!(output.contains("Subject: Test\r\n\r\nBody)\r\n"));
        assert!(output.ends_with("A1 OK FETCH completed\r\n"));
    }

    #[tokio::test]
    async fn unknown_uid_yields_no_data() {
        let mailbox = MailboxBuilder::new().inbox(&[RAW]).build();

        let output = run(&uid_set(99), &mailbox, Some("INBOX")).await;

        assert_eq!(output, "A1 OK FETCH completed\r\n");
    }

    #[tokio::test]
    async fn requires_selected_folder() {
        let mailbox = MailboxBuilder::new().inbox(&[RAW]).build();

        let output = run(&uid_set(1), &mailbox, None).await;

        assert!(output.contains("A1 BAD No folder selected"));
    }
}
