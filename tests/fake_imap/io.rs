//! Write helpers shared by the command handlers.
//!
//! Every write is flushed at once so the client never waits on a
//! buffered response.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Write a string to the stream and flush.
pub async fn write_line<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    line: &str,
) -> std::io::Result<()> {
    write_bytes(stream, line.as_bytes()).await
}

/// Write raw bytes to the stream and flush.
pub async fn write_bytes<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    data: &[u8],
) -> std::io::Result<()> {
    stream.get_mut().write_all(data).await?;
    stream.get_mut().flush().await
}

/// Finish a FETCH line with a counted literal (`{len}\r\n<data>`) and
/// the closing parenthesis.
///
/// `prefix` is everything up to the literal, for example
/// `* 1 FETCH (UID 42 BODY[] `.
pub async fn write_fetch_literal<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut BufReader<S>,
    prefix: &str,
    data: &[u8],
) -> std::io::Result<()> {
    write_line(stream, &format!("{prefix}{{{}}}\r\n", data.len())).await?;
    write_bytes(stream, data).await?;
    write_line(stream, ")\r\n").await
}
