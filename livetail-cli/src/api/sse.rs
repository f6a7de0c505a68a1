//! Server-Sent Events parser
//!
//! Incremental: bytes go in as they arrive, complete events come out.
//! Comments (keep-alives) and events of unknown type are skipped.

use livetail_core::domain::event::{Event, EventKind};

#[derive(Debug, Default)]
pub struct SseParser {
    pending: Vec<u8>,
    id: Option<String>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    /// Feed a chunk of the response body
    ///
    /// # Returns
    /// Every event completed by this chunk, in order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Event> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches('\n').trim_end_matches('\r');

            if let Some(event) = self.line(line) {
                events.push(event);
            }
        }

        events
    }

    fn line(&mut self, line: &str) -> Option<Event> {
        if line.is_empty() {
            return self.dispatch();
        }

        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "id" => self.id = Some(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }

        None
    }

    fn dispatch(&mut self) -> Option<Event> {
        let id = self.id.take();
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);

        if event.is_none() && data.is_empty() {
            return None;
        }

        let kind = event
            .as_deref()
            .unwrap_or("message")
            .parse::<EventKind>()
            .ok()?;

        Some(Event {
            id: id.unwrap_or_default(),
            kind,
            data: data.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_events_split_across_chunks() {
        let mut parser = SseParser::default();

        assert!(parser.feed(b"id: 1\nevent: log\nda").is_empty());
        let events = parser.feed(b"ta: cloning\n\nevent: EOF\r\ndata: End Of Feed\r\n\r\n");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, "1");
        assert_eq!(events[0].kind, EventKind::Log);
        assert_eq!(events[0].data, "cloning");
        assert_eq!(events[1].kind, EventKind::Eof);
        assert_eq!(events[1].data, "End Of Feed");
    }

    #[test]
    fn test_skips_keep_alive_and_unknown_events() {
        let mut parser = SseParser::default();

        let events =
            parser.feed(b":\n\nevent: ping\ndata: x\n\nevent: error\ndata: pod evicted\n\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, EventKind::Error);
        assert_eq!(events[0].data, "pod evicted");
    }

    #[test]
    fn test_joins_multi_line_data() {
        let mut parser = SseParser::default();

        let events = parser.feed(b"event: log\ndata: first\ndata: second\n\n");

        assert_eq!(events[0].data, "first\nsecond");
    }
}
