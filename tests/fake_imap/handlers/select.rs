//! SELECT command handler.
//!
//! Opens a folder and reports its metadata:
//!
//! - `* N EXISTS`: number of messages in the folder.
//! - `* OK [UIDVALIDITY V]` and `* OK [UIDNEXT U]`: the UID space.
//! - `* OK [UNSEEN n]`: sequence number of the first unseen message.
//!
//! Returns the selected folder name, or `None` when it does not exist
//! or is `\Noselect`.
//! A failed SELECT leaves no folder selected (RFC 3501 Section 6.3.1).

use crate::fake_imap::io::write_line;
use crate::fake_imap::mailbox::Mailbox;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the SELECT command.
pub async fn handle_select<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    folder_name: &str,
    mailbox: &Mailbox,
    stream: &mut BufReader<S>,
) -> Option<String> {
    let Some(folder) = mailbox.get_folder(folder_name).filter(|f| !f.noselect) else {
        let resp = format!("{tag} NO [NONEXISTENT] Folder not found\r\n");
        let _ = write_line(stream, &resp).await;
        return None;
    };

    let mut lines = vec![
        "* FLAGS (\\Seen \\Answered \\Flagged \\Deleted \\Draft)\r\n".to_string(),
        format!("* {} EXISTS\r\n", folder.emails.len()),
        "* 0 RECENT\r\n".to_string(),
        "* OK [UIDVALIDITY 1] UIDs valid\r\n".to_string(),
        format!("* OK [UIDNEXT {}] Predicted next UID\r\n", folder.uid_next()),
    ];
    if let Some(pos) = folder.emails.iter().position(|e| !e.seen) {
        lines.push(format!("* OK [UNSEEN {}] First unseen\r\n", pos + 1));
    }
    lines.push(format!("{tag} OK [READ-ONLY] SELECT completed\r\n"));

    for line in &lines {
        if write_line(stream, line).await.is_err() {
            break;
        }
    }
    Some(folder_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake_imap::mailbox::MailboxBuilder;
    use tokio::io::BufReader;

    async fn run(tag: &str, folder_name: &str, mailbox: &Mailbox) -> (String, Option<String>) {
        let (client, server) = tokio::io::duplex(4096);
        let mut stream = BufReader::new(server);

        let selected = handle_select(tag, folder_name, mailbox, &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        (String::from_utf8(buf).unwrap(), selected)
    }

    #[tokio::test]
    async fn reports_folder_metadata() {
        let raw = b"Subject: x\r\n\r\nbody".to_vec();
        let mailbox = MailboxBuilder::new()
            .folder("INBOX")
            .email(5, true, &raw)
            .email(10, false, &raw)
            .build();

        let (output, selected) = run("A1", "INBOX", &mailbox).await;

        assert_eq!(selected.as_deref(), Some("INBOX"));
        assert!(output.contains("* 2 EXISTS\r\n"));
        assert!(output.contains("* OK [UIDNEXT 11]"));
        assert!(output.contains("* OK [UNSEEN 2]"));
        assert!(output.ends_with("A1 OK [READ-ONLY] SELECT completed\r\n"));
    }

    #[tokio::test]
    async fn all_seen_omits_unseen() {
        let raw = b"Subject: x\r\n\r\nbody".to_vec();
        let mailbox = MailboxBuilder::new().folder("INBOX").email(1, true, &raw).build();
        let (output, _) = run("A1", "INBOX", &mailbox).await;
        assert!(!output.contains("UNSEEN"));
    }

    #[tokio::test]
    async fn missing_folder_answers_no() {
        let mailbox = MailboxBuilder::new().folder("INBOX").build();
        let (output, selected) = run("A1", "Archive", &mailbox).await;
        assert!(selected.is_none());
        assert_eq!(output, "A1 NO [NONEXISTENT] Folder not found\r\n");
    }
}
