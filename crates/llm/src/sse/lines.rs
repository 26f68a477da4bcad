use std::fmt::Display;

use axum::body::Bytes;
use futures::{Stream, StreamExt, stream};

use crate::error::LlmError;

/// Longest line accepted from an upstream, terminator excluded.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Split a byte stream into text lines as the bytes arrive.
///
/// Lines end with `\n` or `\r\n`, the terminator is not part of the line.
/// Partial lines are kept until the rest arrives, and a trailing line without
/// terminator is flushed when the input ends. Invalid UTF-8, a line longer
/// than 1 MiB or a transport failure yields one error and ends the stream.
pub(crate) fn lines<S, E>(input: S) -> impl Stream<Item = crate::Result<String>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    let parsed = stream::unfold(Some((Box::pin(input), LineBuffer::new())), |state| async move {
        let (mut input, mut buffer) = state?;

        match input.next().await {
            Some(Ok(bytes)) => {
                let lines = buffer.push(&bytes);

                let next = if lines.iter().any(Result::is_err) {
                    None
                } else {
                    Some((input, buffer))
                };

                Some((lines, next))
            }
            Some(Err(e)) => {
                log::error!("Stream read error: {e}");
                let error = LlmError::ConnectionError(format!("Stream error: {e}"));

                Some((vec![Err(error)], None))
            }
            None => buffer.finish().map(|line| (vec![line], None)),
        }
    });

    parsed.flat_map(stream::iter)
}

/// Bytes of the line being received.
struct LineBuffer {
    bytes: Vec<u8>,
    /// Prefix of `bytes` already known to contain no newline.
    scanned: usize,
    max_line_length: usize,
}

impl LineBuffer {
    fn new() -> Self {
        Self::with_limit(MAX_LINE_LENGTH)
    }

    fn with_limit(max_line_length: usize) -> Self {
        Self {
            bytes: Vec::new(),
            scanned: 0,
            max_line_length,
        }
    }

    /// Append a chunk and return the lines it completes.
    fn push(&mut self, chunk: &[u8]) -> Vec<crate::Result<String>> {
        self.bytes.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;

        while let Some(offset) = self.bytes[from..].iter().position(|&byte| byte == b'\n') {
            let end = from + offset;
            let line = decode(trim_carriage_return(&self.bytes[start..end]));
            let failed = line.is_err();

            lines.push(line);
            start = end + 1;
            from = start;

            if failed {
                break;
            }
        }

        self.bytes.drain(..start);
        self.scanned = self.bytes.len();

        if self.bytes.len() > self.max_line_length {
            log::error!("Upstream line exceeds {} bytes", self.max_line_length);

            lines.push(Err(LlmError::ConnectionError(format!(
                "Stream line exceeds {} bytes",
                self.max_line_length
            ))));
        }

        lines
    }

    /// The unterminated tail left when the input ends.
    fn finish(self) -> Option<crate::Result<String>> {
        if self.bytes.is_empty() {
            return None;
        }

        Some(decode(trim_carriage_return(&self.bytes)))
    }
}

fn trim_carriage_return(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn decode(line: &[u8]) -> crate::Result<String> {
    std::str::from_utf8(line).map(str::to_string).map_err(|e| {
        log::error!("Invalid UTF-8 in upstream stream: {e}");
        LlmError::ConnectionError(format!("Invalid UTF-8 in stream: {e}"))
    })
}
