//! FETCH command handler (sequence numbers, not UIDs).
//!
//! Serves the header overview query the client sends for a page:
//!
//! ```text
//! C: A0007 FETCH 45:50 (UID FLAGS RFC822.SIZE INTERNALDATE BODY.PEEK[HEADER])
//! S: * 45 FETCH (UID 450 FLAGS (\Seen) RFC822.SIZE 312 INTERNALDATE "01-Jan-2024 12:00:00 +0000" BODY[HEADER] {180}
//! S: <exactly 180 bytes of header block>
//! S: )
//! ```
//!
//! The requested items are ignored; every message in the set gets the
//! same attribute list. Numbers past the end of the folder are skipped.
//! A folder built with `failing_fetch` answers with a tagged NO only.

use crate::fake_imap::io::{write_fetch_literal, write_line};
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
use std::collections::BTreeSet;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

const INTERNAL_DATE: &str = "01-Jan-2024 12:00:00 +0000";

/// Expand a sequence set into sorted, in-range sequence numbers.
/// `*` stands for the last message.
fn sequence_numbers(seq_set: &SequenceSet, exists: u32) -> BTreeSet<u32> {
    let value = |v: &SeqOrUid| match v {
        SeqOrUid::Value(n) => n.get(),
        SeqOrUid::Asterisk => exists,
    };
    let mut numbers = BTreeSet::new();
    for seq in seq_set.0.as_ref() {
        let (lo, hi) = match seq {
            Sequence::Single(v) => (value(v), value(v)),
            Sequence::Range(a, b) => (value(a).min(value(b)), value(a).max(value(b))),
        };
        numbers.extend(lo.max(1)..=hi.min(exists));
    }
    numbers
}

/// Handle the FETCH command.
pub async fn handle_fetch<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    sequence_set: &SequenceSet,
    mailbox: &Mailbox,
    selected_folder: Option<&str>,
    stream: &mut BufReader<S>,
) {
    let Some(folder) = selected_folder.and_then(|name| mailbox.get_folder(name)) else {
        let resp = format!("{tag} BAD No folder selected\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    };

    if folder.fetch_fails {
        let resp = format!("{tag} NO [UNAVAILABLE] FETCH failed\r\n");
        let _ = write_line(stream, &resp).await;
        return;
    }

    let exists = u32::try_from(folder.emails.len()).unwrap_or(u32::MAX);
    for seq in sequence_numbers(sequence_set, exists) {
        let email = &folder.emails[(seq - 1) as usize];
        let flags = if email.seen { "\\Seen" } else { "" };
        let prefix = format!(
            "* {seq} FETCH (UID {} FLAGS ({flags}) RFC822.SIZE {} INTERNALDATE \"{INTERNAL_DATE}\" BODY[HEADER] ",
            email.uid,
            email.raw.len(),
        );
        if write_fetch_literal(stream, &prefix, email.header()).await.is_err() {
            return;
        }
    }

    let resp = format!("{tag} OK FETCH completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use std::num::NonZeroU32;
    use tokio::io::BufReader;

    fn value(n: u32) -> SeqOrUid {
        SeqOrUid::Value(NonZeroU32::new(n).unwrap())
    }

    fn range(a: SeqOrUid, b: SeqOrUid) -> SequenceSet {
        SequenceSet(vec![Sequence::Range(a, b)].try_into().unwrap())
    }

    async fn run(sequence_set: &SequenceSet, mailbox: &Mailbox) -> String {
        let (client, server) = tokio::io::duplex(16384);
        let mut stream = BufReader::new(server);

        handle_fetch("A1", sequence_set, mailbox, Some("INBOX"), &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn inbox(count: u32) -> Mailbox {
        (1..=count)
            .fold(MailboxBuilder::new().folder("INBOX"), |builder, n| {
                let raw = format!("Subject: Message {n}\r\n\r\nbody {n}");
                builder.email(n * 10, n % 2 == 0, raw.as_bytes())
            })
            .build()
    }

    #[test]
    fn clamps_range_to_folder() {
        let set = range(value(4), SeqOrUid::Asterisk);
        assert_eq!(sequence_numbers(&set, 6).into_iter().collect::<Vec<_>>(), vec![4, 5, 6]);

        let set = range(value(5), value(9));
        assert_eq!(sequence_numbers(&set, 6).into_iter().collect::<Vec<_>>(), vec![5, 6]);
    }

    #[tokio::test]
    async fn sends_header_only() {
        let output = run(&range(value(2), value(3)), &inbox(4)).await;

        assert!(output.starts_with("* 2 FETCH (UID 20 FLAGS (\\Seen) RFC822.SIZE "));
        assert!(output.contains("* 3 FETCH (UID 30 FLAGS () "));
        assert!(output.contains("Subject: Message 2\r\n\r\n)"));
        assert!(!output.contains("body 2"));
        assert!(!output.contains("Message 1"));
        assert!(output.ends_with("A1 OK FETCH completed\r\n"));
    }

    #[tokio::test]
    async fn failing_folder_answers_no() {
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(1, false, b"Subject: x\r\n\r\nbody")
            .failing_fetch()
            .build();
        let output = run(&range(value(1), value(1)), &mailbox).await;
        assert_eq!(output, "A1 NO [UNAVAILABLE] FETCH failed\r\n");
    }

    #[tokio::test]
    async fn range_past_end_sends_only_ok() {
        let output = run(&range(value(7), value(9)), &inbox(4)).await;
        assert_eq!(output, "A1 OK FETCH completed\r\n");
    }
}
