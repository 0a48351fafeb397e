//! Event-stream decoding.
//!
//! The broker's message-search endpoint answers with a server-sent-event
//! style body: blocks separated by a blank line, data blocks prefixed with
//! `data:`, each carrying one JSON record tagged by `type`.
//!
//! Decoding operates on the complete response body rather than incremental
//! frames; searches are bounded by `limit`, so the broker closes the stream
//! after at most one window of events. Heartbeats and comment blocks are
//! dropped silently. A malformed data block is logged and dropped without
//! aborting the rest of the batch.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Prefix marking a data block in the event stream.
pub const EVENT_DATA_PREFIX: &str = "data:";

/// Separator between event blocks.
const EVENT_SEPARATOR: &str = "\n\n";

/// Payload of a `MESSAGE` event.
///
/// `content` is itself a JSON-encoded string; the classifier runs the second
/// parse pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    /// JSON-encoded message content.
    pub content: String,
    /// Broker-level message headers.
    #[serde(default)]
    pub headers: Map<String, Value>,
    /// Remaining broker metadata (partition, offset, timestamp, key, ...).
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// One decoded record from the event stream.
///
/// `PHASE`, `CONSUMING` and `DONE` are control events describing the search
/// itself; `MESSAGE` carries an actual topic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RawEvent {
    #[serde(rename = "PHASE")]
    Phase {
        #[serde(flatten)]
        detail: Map<String, Value>,
    },
    #[serde(rename = "CONSUMING")]
    Consuming {
        #[serde(flatten)]
        detail: Map<String, Value>,
    },
    #[serde(rename = "MESSAGE")]
    Message { message: MessageBody },
    #[serde(rename = "DONE")]
    Done {
        #[serde(flatten)]
        detail: Map<String, Value>,
    },
}

impl RawEvent {
    /// The wire discriminator of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            RawEvent::Phase { .. } => "PHASE",
            RawEvent::Consuming { .. } => "CONSUMING",
            RawEvent::Message { .. } => "MESSAGE",
            RawEvent::Done { .. } => "DONE",
        }
    }

    /// Whether this is a payload-bearing `MESSAGE` event.
    pub fn is_message(&self) -> bool {
        matches!(self, RawEvent::Message { .. })
    }
}

/// Decode a complete event-stream body into typed events, preserving server
/// emission order.
pub fn decode_events(body: &str) -> Vec<RawEvent> {
    body.split(EVENT_SEPARATOR)
        .filter_map(decode_block)
        .collect()
}

/// Decode one block. Non-data blocks yield `None`; malformed data blocks are
/// logged and yield `None`.
fn decode_block(block: &str) -> Option<RawEvent> {
    let block = block.trim();
    let json = block.strip_prefix(EVENT_DATA_PREFIX)?.trim();
    match serde_json::from_str(json) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!(error = %err, "dropping malformed event block");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE_BLOCK: &str = r#"data: {"type":"MESSAGE","message":{"partition":3,"offset":120,"content":"{\"source_context\":{\"submission_number\":\"SUB-1001\"}}","headers":{"trace-id":"abc"}}}"#;

    #[test]
    fn test_decode_single_done_event() {
        let events = decode_events("data: {\"type\":\"DONE\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "DONE");
        assert!(!events[0].is_message());
    }

    #[test]
    fn test_decode_preserves_order() {
        let body = format!(
            "data: {{\"type\":\"PHASE\",\"phase\":{{\"name\":\"start\"}}}}\n\ndata: {{\"type\":\"CONSUMING\"}}\n\n{}\n\ndata: {{\"type\":\"DONE\"}}\n\n",
            MESSAGE_BLOCK
        );
        let events = decode_events(&body);
        let kinds: Vec<_> = events.iter().map(RawEvent::kind).collect();
        assert_eq!(kinds, vec!["PHASE", "CONSUMING", "MESSAGE", "DONE"]);
    }

    #[test]
    fn test_decode_message_payload() {
        let events = decode_events(&format!("{}\n\n", MESSAGE_BLOCK));
        match &events[0] {
            RawEvent::Message { message } => {
                assert!(message.content.contains("SUB-1001"));
                assert_eq!(
                    message.headers.get("trace-id").and_then(Value::as_str),
                    Some("abc")
                );
                assert_eq!(message.rest.get("partition").and_then(Value::as_u64), Some(3));
            }
            other => panic!("expected MESSAGE, got {}", other.kind()),
        }
    }

    #[test]
    fn test_heartbeats_and_comments_dropped() {
        let body = ": keep-alive\n\n\n\ndata: {\"type\":\"DONE\"}\n\n";
        let events = decode_events(body);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "DONE");
    }

    #[test]
    fn test_malformed_block_dropped_without_aborting() {
        let body = "data: {not json\n\ndata: {\"type\":\"DONE\"}\n\n";
        let events = decode_events(body);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "DONE");
    }

    #[test]
    fn test_decode_is_idempotent() {
        let body = format!("{}\n\ndata: {{\"type\":\"DONE\"}}\n\n", MESSAGE_BLOCK);
        let first = decode_events(&body);
        let second = decode_events(&body);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_body() {
        assert!(decode_events("").is_empty());
    }
}
