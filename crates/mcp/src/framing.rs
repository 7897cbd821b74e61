//! Newline-delimited JSON framing.
//!
//! One message per line. `serde_json` escapes newlines inside strings, so a
//! serialized message never contains a raw `\n` and the terminator is
//! unambiguous.

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Maximum accepted line size (1MB).
/// Sized for large tool outputs (file reads, search results).
pub const MAX_LINE_SIZE: usize = 1024 * 1024;

/// One line read off the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Raw line bytes without the terminator. Not checked for UTF-8.
    Line(Vec<u8>),
    /// A line longer than the cap. Its bytes were read and discarded.
    TooLarge { size: usize },
}

/// Serialize `message` as a single line, write it, and flush.
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let mut line = serde_json::to_string(message).map_err(Error::Serialize)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await.map_err(Error::Write)?;
    writer.flush().await.map_err(Error::Write)?;
    Ok(())
}

/// Read one line of at most `max` bytes, without its terminator.
///
/// Returns `Ok(None)` when the peer closed the stream before a line started.
/// At most `max` bytes of a line are buffered; the rest of an oversized line
/// is consumed and dropped so the next read starts on a fresh line.
pub async fn read_frame<R>(reader: &mut R, max: usize) -> Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    // Room for a `\r\n` terminator on a line of exactly `max` bytes.
    let limit = max.saturating_add(2);
    let mut line = Vec::new();
    let mut size = 0usize;
    let mut oversized = false;

    loop {
        let available = reader.fill_buf().await.map_err(Error::Read)?;
        if available.is_empty() {
            if size == 0 {
                return Ok(None);
            }
            break;
        }

        let (used, done) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        if !oversized {
            line.extend_from_slice(&available[..used]);
            if line.len() > limit {
                oversized = true;
                line = Vec::new();
            }
        }
        size += used;
        reader.consume(used);

        if done {
            break;
        }
    }

    if oversized {
        return Ok(Some(Frame::TooLarge { size }));
    }

    if line.last() == Some(&b'\n') {
        line.pop();
    }
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    if line.len() > max {
        return Ok(Some(Frame::TooLarge { size }));
    }
    Ok(Some(Frame::Line(line)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::BufReader;

    fn line(text: &str) -> Option<Frame> {
        Some(Frame::Line(text.as_bytes().to_vec()))
    }

    #[tokio::test]
    async fn message_is_one_line() {
        let mut out = Vec::new();
        write_message(&mut out, &json!({"text": "a\nb"})).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches('\n').count(), 1);
        assert!(text.ends_with('\n'));
    }

    #[tokio::test]
    async fn reads_lines_then_end_of_stream() {
        let input: &[u8] = b"{\"id\":1}\r\n{\"id\":2}\n";
        let mut reader = BufReader::new(input);

        assert_eq!(read_frame(&mut reader, MAX_LINE_SIZE).await.unwrap(), line("{\"id\":1}"));
        assert_eq!(read_frame(&mut reader, MAX_LINE_SIZE).await.unwrap(), line("{\"id\":2}"));
        assert!(read_frame(&mut reader, MAX_LINE_SIZE).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn final_line_without_terminator_is_returned() {
        let input: &[u8] = b"{\"id\":7}";
        let mut reader = BufReader::new(input);
        assert_eq!(read_frame(&mut reader, MAX_LINE_SIZE).await.unwrap(), line("{\"id\":7}"));
    }

    #[tokio::test]
    async fn oversized_line_is_rejected() {
        let input = vec![b'x'; MAX_LINE_SIZE + 1];
        let mut reader = BufReader::new(input.as_slice());
        let frame = read_frame(&mut reader, MAX_LINE_SIZE).await.unwrap();
        assert_eq!(frame, Some(Frame::TooLarge { size: MAX_LINE_SIZE + 1 }));
    }

    #[tokio::test]
    async fn oversized_line_is_skipped_in_small_chunks() {
        let mut input = vec![b'x'; 100];
        input.extend_from_slice(b"\nok\n");
        // An 8-byte buffer forces the long line across many fills.
        let mut reader = BufReader::with_capacity(8, input.as_slice());

        let frame = read_frame(&mut reader, 16).await.unwrap();
        assert_eq!(frame, Some(Frame::TooLarge { size: 101 }));
        assert_eq!(read_frame(&mut reader, 16).await.unwrap(), line("ok"));
        assert!(read_frame(&mut reader, 16).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn line_at_the_cap_is_accepted() {
        let mut input = vec![b'y'; 16];
        input.extend_from_slice(b"\r\n");
        let mut reader = BufReader::with_capacity(4, input.as_slice());

        let frame = read_frame(&mut reader, 16).await.unwrap();
        assert_eq!(frame, Some(Frame::Line(vec![b'y'; 16])));
    }

    #[tokio::test]
    async fn invalid_utf8_is_passed_through() {
        let input: &[u8] = b"\xff\xfe\n{}\n";
        let mut reader = BufReader::new(input);

        let frame = read_frame(&mut reader, MAX_LINE_SIZE).await.unwrap();
        assert_eq!(frame, Some(Frame::Line(vec![0xff, 0xfe])));
        assert_eq!(read_frame(&mut reader, MAX_LINE_SIZE).await.unwrap(), line("{}"));
    }
}
