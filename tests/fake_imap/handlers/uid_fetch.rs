//! UID FETCH command handler.
//!
//! Serves full message bodies for `UID FETCH <uid> (UID BODY.PEEK[])`.
//! The body travels as a counted literal; the sequence number in the
//! response is the message's 1-based position in the folder:
//!
//! ```text
//! * 3 FETCH (UID 42 BODY[] {1234}
//! <exactly 1234 bytes of raw RFC 5322 message>
//! )
//! ```
//!
//! Unknown UIDs produce no untagged data, only the tagged OK, which
//! is what real servers do.

use crate::fake_imap::io::{write_fetch_literal, write_line};
use crate::fake_imap::mailbox::Mailbox;
use imap_codec::imap_types::sequence::{SeqOrUid, Sequence, SequenceSet};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Whether `uid` falls inside `seq_set`. `*` stands for the largest UID.
fn uid_matches(seq_set: &SequenceSet, uid: u32, max_uid: u32) -> bool {
    let value = |v: &SeqOrUid| match v {
        SeqOrUid::Value(n) => n.get(),
        SeqOrUid::Asterisk => max_uid,
    };
    seq_set.0.as_ref().iter().any(|seq| match seq {
        Sequence::Single(v) => value(v) == uid,
        Sequence::Range(a, b) => {
            let (lo, hi) = (value(a).min(value(b)), value(a).max(value(b)));
            (lo..=hi).contains(&uid)
        }
    })
}

/// Handle the UID FETCH command.
pub async fn handle_uid_fetch<S: AsyncRead + AsyncWrite + Unpin>(
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

    let max_uid = folder.emails.iter().map(|e| e.uid).max().unwrap_or(0);
    for (idx, email) in folder.emails.iter().enumerate() {
        if !uid_matches(sequence_set, email.uid, max_uid) {
            continue;
        }
        let prefix = format!("* {} FETCH (UID {} BODY[] ", idx + 1, email.uid);
        if write_fetch_literal(stream, &prefix, &email.raw).await.is_err() {
            return;
        }
    }

    let resp = format!("{tag} OK UID FETCH completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use std::num::NonZeroU32;
    use tokio::io::BufReader;

    fn uid_set(uid: u32) -> SequenceSet {
        SequenceSet(
            vec![Sequence::Single(SeqOrUid::Value(NonZeroU32::new(uid).unwrap()))]
                .try_into()
                .unwrap(),
        )
    }

    async fn run(sequence_set: &SequenceSet, mailbox: &Mailbox, selected: Option<&str>) -> String {
        let (client, server) = tokio::io::duplex(8192);
        let mut stream = BufReader::new(server);

        handle_uid_fetch("A1", sequence_set, mailbox, selected, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn serves_body_as_literal() {
        let raw = b"From: a@b.com\r\nSubject: Test\r\n\r\nBody".to_vec();
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(7, true, b"Subject: other\r\n\r\nx")
            .email(42, false, &raw)
            .build();

        let output = run(&uid_set(42), &mailbox, Some("INBOX")).await;

        let expected = format!("* 2 FETCH (UID 42 BODY[] {{{}}}\r\n", raw.len());
        assert!(output.starts_with(&expected));
        assert!(output.contains("Subject: Test"));
        assert!(!output.contains("Subject: other"));
        assert!(output.ends_with(")\r\nA1 OK UID FETCH completed\r\n"));
    }

    #[tokio::test]
    async fn unknown_uid_yields_only_ok() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let output = run(&uid_set(99), &mailbox, Some("INBOX")).await;
        assert_eq!(output, "A1 OK UID FETCH completed\r\n");
    }

    #[tokio::test]
    async fn requires_selected_folder() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let output = run(&uid_set(1), &mailbox, None).await;
        assert_eq!(output, "A1 BAD No folder selected\r\n");
    }
}
