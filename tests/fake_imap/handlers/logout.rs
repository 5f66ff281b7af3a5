//! LOGOUT command handler.
//!
//! RFC 3501 Section 6.1.3: the untagged BYE must come before the
//! tagged OK, after which the server closes the connection.

use crate::fake_imap::io::write_line;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};

/// Handle the LOGOUT command.
pub async fn handle_logout<S: AsyncRead + AsyncWrite + Unpin>(
    tag: &str,
    stream: &mut BufReader<S>,
) {
    if write_line(stream, "* BYE Fake server logging out\r\n").await.is_err() {
        return;
    }
    let resp = format!("{tag} OK LOGOUT completed\r\n");
    let _ = write_line(stream, &resp).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[tokio::test]
    async fn bye_precedes_tagged_ok() {
        let (client, server) = tokio::io::duplex(1024);
        let mut stream = BufReader::new(server);
        handle_logout("Z9", &mut stream).await;
        drop(stream);

        let mut buf = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut BufReader::new(client), &mut buf)
            .await
            .unwrap();
        let output = String::from_utf8(buf).unwrap();

        assert_eq!(output, "* BYE Fake server logging out\r\nZ9 OK LOGOUT completed\r\n");
    }
}
