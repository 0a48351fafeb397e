//! Event classification and content extraction.
//!
//! Separates payload (`MESSAGE`) events from control events and runs the
//! second JSON parse over a message's `content` string. A message whose
//! content does not parse is skipped with a warning; it never fails the
//! batch.

use crate::stream::{MessageBody, RawEvent};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::warn;

/// A fully decoded payload message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    /// Broker-level message headers.
    pub headers: Map<String, Value>,
    /// The parsed message content.
    pub content: Value,
}

impl DecodedMessage {
    /// Pipeline stage from `ingestion_context.stage`.
    pub fn stage(&self) -> Option<&str> {
        self.content
            .get("ingestion_context")?
            .get("stage")?
            .as_str()
    }

    /// Broker-reported failure text from `ingestion_context.message`.
    pub fn failure_message(&self) -> Option<&str> {
        self.content
            .get("ingestion_context")?
            .get("message")?
            .as_str()
    }

    /// Submission identifier from `source_context.submission_number`.
    pub fn submission_number(&self) -> Option<&str> {
        self.content
            .get("source_context")?
            .get("submission_number")?
            .as_str()
    }

    /// Originating email subject from `source_context.email_subject`.
    pub fn email_subject(&self) -> Option<&str> {
        self.content
            .get("source_context")?
            .get("email_subject")?
            .as_str()
    }

    /// Source reference from `source_context.source_reference_number`.
    pub fn source_reference_number(&self) -> Option<&str> {
        self.content
            .get("source_context")?
            .get("source_reference_number")?
            .as_str()
    }
}

/// Filter a batch down to its `MESSAGE` events, preserving order.
pub fn only_messages(events: &[RawEvent]) -> Vec<&MessageBody> {
    events
        .iter()
        .filter_map(|event| match event {
            RawEvent::Message { message } => Some(message),
            _ => None,
        })
        .collect()
}

/// Decode the content of every `MESSAGE` event in a batch, preserving order.
///
/// Messages with unparseable content are dropped with a warning.
pub fn decode_content(events: &[RawEvent]) -> Vec<DecodedMessage> {
    only_messages(events)
        .into_iter()
        .filter_map(decode_message)
        .collect()
}

fn decode_message(message: &MessageBody) -> Option<DecodedMessage> {
    match serde_json::from_str(&message.content) {
        Ok(content) => Some(DecodedMessage {
            headers: message.headers.clone(),
            content,
        }),
        Err(err) => {
            warn!(error = %err, "dropping message with unparseable content");
            None
        }
    }
}
