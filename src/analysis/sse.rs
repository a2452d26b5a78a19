//! Server-sent-event line buffering and fragment parsing.
//!
//! Streamed chat completions arrive as `data: {json}` lines terminated by a
//! `data: [DONE]` sentinel.  Network chunks do not respect line boundaries:
//! a JSON object may be split across two chunks, and a chunk may even split
//! a multi-byte UTF-8 sequence.  [`SseLineBuffer`] carries partial lines (as
//! raw bytes) across chunks so that only genuinely complete lines are ever
//! handed to [`parse_sse_line`] — a truncated fragment is buffering state,
//! not a parse error.

use serde::Deserialize;

// ---------------------------------------------------------------------------
// SseLineBuffer
// ---------------------------------------------------------------------------

/// Accumulates raw bytes and yields complete, newline-terminated lines.
///
/// The tail after the last `\n` stays buffered until a later chunk completes
/// it.  Carriage returns before the newline are trimmed.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buf: Vec<u8>,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and return every line completed by it, in order.
    pub fn extend(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop(); // the newline itself
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Number of buffered bytes still waiting for a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

// ---------------------------------------------------------------------------
// Stream event wire format
// ---------------------------------------------------------------------------

/// One `data:` payload of a streamed chat completion.
#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// parse_sse_line
// ---------------------------------------------------------------------------

/// Classification of one complete SSE line.
#[derive(Debug, PartialEq)]
pub enum SseLine {
    /// A text fragment to append to the target buffer.
    Fragment(String),
    /// The terminal sentinel — the stream is complete.
    Done,
    /// A `data:` line that could not be parsed.  Non-fatal: the caller logs
    /// it and keeps consuming.
    Malformed(String),
    /// Blank lines, comments, role-only deltas — nothing to do.
    Ignored,
}

/// Parse one complete line of an SSE chat-completion stream.
pub fn parse_sse_line(line: &str) -> SseLine {
    let line = line.trim();
    if line.is_empty() {
        return SseLine::Ignored;
    }

    let data = match line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) {
        Some(data) => data.trim(),
        // Event names, comments and other SSE fields are not fragments.
        None => return SseLine::Ignored,
    };

    if data == "[DONE]" {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamEvent>(data) {
        Ok(event) => match event
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
        {
            Some(content) if !content.is_empty() => SseLine::Fragment(content),
            // Role announcements and finish chunks carry no content.
            _ => SseLine::Ignored,
        },
        Err(e) => SseLine::Malformed(format!("{e}: {data}")),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_line(text: &str) -> String {
        format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":{}}}}}]}}",
            serde_json::to_string(text).unwrap()
        )
    }

    // ---- SseLineBuffer ---

    #[test]
    fn complete_lines_are_yielded_in_order() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.extend(b"one\ntwo\n");
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn partial_line_is_carried_to_next_chunk() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.extend(b"data: {\"cho").is_empty());
        assert_eq!(buf.pending(), 11);

        let lines = buf.extend(b"ices\":[]}\n");
        assert_eq!(lines, vec!["data: {\"choices\":[]}"]);
        assert_eq!(buf.pending(), 0);
    }

    #[test]
    fn crlf_is_trimmed() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.extend(b"data: [DONE]\r\n");
        assert_eq!(lines, vec!["data: [DONE]"]);
    }

    #[test]
    fn split_utf8_sequence_survives_chunk_boundary() {
        let mut buf = SseLineBuffer::new();
        let line = delta_line("né");
        let bytes = line.as_bytes();
        // Split inside the 2-byte 'é' sequence.
        let cut = line.find('é').unwrap() + 1;
        assert!(buf.extend(&bytes[..cut]).is_empty());
        let mut rest = bytes[cut..].to_vec();
        rest.push(b'\n');
        let lines = buf.extend(&rest);
        assert_eq!(lines.len(), 1);
        assert_eq!(parse_sse_line(&lines[0]), SseLine::Fragment("né".into()));
    }

    #[test]
    fn many_lines_in_one_chunk() {
        let mut buf = SseLineBuffer::new();
        let chunk = format!("{}\n\n{}\n", delta_line("a"), delta_line("b"));
        let lines = buf.extend(chunk.as_bytes());
        assert_eq!(lines.len(), 3);
    }

    // ---- parse_sse_line ---

    #[test]
    fn fragment_content_is_extracted() {
        let parsed = parse_sse_line(&delta_line("* Good pacing\n"));
        assert_eq!(parsed, SseLine::Fragment("* Good pacing\n".into()));
    }

    #[test]
    fn done_sentinel_is_recognised() {
        assert_eq!(parse_sse_line("data: [DONE]"), SseLine::Done);
    }

    #[test]
    fn blank_and_non_data_lines_are_ignored() {
        assert_eq!(parse_sse_line(""), SseLine::Ignored);
        assert_eq!(parse_sse_line("event: ping"), SseLine::Ignored);
        assert_eq!(parse_sse_line(": keep-alive"), SseLine::Ignored);
    }

    #[test]
    fn role_only_delta_is_ignored() {
        let line = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}";
        assert_eq!(parse_sse_line(line), SseLine::Ignored);
    }

    #[test]
    fn empty_content_delta_is_ignored() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}";
        assert_eq!(parse_sse_line(line), SseLine::Ignored);
    }

    #[test]
    fn truncated_json_is_malformed_not_a_panic() {
        let parsed = parse_sse_line("data: {\"choices\":[{\"delta\":{\"content\":\"oops");
        assert!(matches!(parsed, SseLine::Malformed(_)));
    }

    #[test]
    fn data_prefix_without_space_is_accepted() {
        let line = "data:[DONE]";
        assert_eq!(parse_sse_line(line), SseLine::Done);
    }

    #[test]
    fn empty_choices_is_ignored() {
        assert_eq!(parse_sse_line("data: {\"choices\":[]}"), SseLine::Ignored);
    }
}
