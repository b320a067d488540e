const EVENT_SEPARATOR: &[u8] = b"\n\n";
const DONE_MARKER: &str = "[DONE]";

/// Incremental server-sent-events decoder.
///
/// Bytes are buffered until a full event has arrived, so a multi-byte UTF-8
/// character split across network reads is decoded intact. Carriage returns are
/// dropped on the way in, which makes `\r\n\r\n` and `\n\n` separators equivalent.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds raw bytes and returns the `data:` payloads of every event completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer
            .extend(bytes.iter().copied().filter(|byte| *byte != b'\r'));

        let mut payloads = Vec::new();
        while let Some(idx) = find_separator(&self.buffer) {
            let event: Vec<u8> = self.buffer.drain(..idx + EVENT_SEPARATOR.len()).collect();
            let event = String::from_utf8_lossy(&event[..idx]);
            if let Some(payload) = extract_event_payload(&event) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flushes a trailing event that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        let event = String::from_utf8_lossy(&rest);
        extract_event_payload(&event)
    }
}

fn find_separator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(EVENT_SEPARATOR.len())
        .position(|window| window == EVENT_SEPARATOR)
}

fn extract_event_payload(event: &str) -> Option<String> {
    if event.trim().is_empty() {
        return None;
    }

    let data_lines: Vec<&str> = event
        .lines()
        .filter_map(|line| line.trim_end().strip_prefix("data:"))
        .map(str::trim_start)
        .collect();

    if data_lines.is_empty() {
        return None;
    }

    let payload = data_lines.join("\n");
    if payload.is_empty() || payload == DONE_MARKER {
        None
    } else {
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_extracts_complete_events() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: one\n\ndata: two\n\n");
        assert_eq!(events, vec!["one".to_string(), "two".to_string()]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn crlf_separators_are_accepted() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"event: message\r\ndata: {\"a\":\"b\"}\r\n\r\ndata: [DONE]");
        assert_eq!(events, vec!["{\"a\":\"b\"}".to_string()]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn events_split_across_reads_are_reassembled() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"text\":").is_empty());
        assert!(decoder.push(b"\"hi\"}\n").is_empty());
        assert_eq!(decoder.push(b"\n"), vec!["{\"text\":\"hi\"}".to_string()]);
    }

    #[test]
    fn multibyte_characters_split_across_reads_survive() {
        let encoded = "data: 東京\n\n".as_bytes();
        let (head, tail) = encoded.split_at(8);
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(head).is_empty());
        assert_eq!(decoder.push(tail), vec!["東京".to_string()]);
    }

    #[test]
    fn multiline_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let events = decoder.push(b"data: first\ndata: second\n\n");
        assert_eq!(events, vec!["first\nsecond".to_string()]);
    }

    #[test]
    fn finish_flushes_trailing_event() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some("tail".to_string()));
    }

    #[test]
    fn comment_only_events_are_ignored() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b": keep-alive\n\n").is_empty());
    }
}
