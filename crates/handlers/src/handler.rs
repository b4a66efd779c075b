use chrono::{DateTime, Utc};
use models::{HandledMessage, MessageBase};

use crate::message::HandlerMessage;

/// Extracts structured data from one message type family. Handlers never
/// fail the pipeline: on malformed content they log a warning and fall
/// back to base fields plus `StructuredData::Unknown` (or whatever
/// partial payload they managed to build), per spec §4.3.
pub trait Handler: Send + Sync {
    fn can_handle(&self, message_type: &str) -> bool;

    fn extract(&self, message: &HandlerMessage) -> HandledMessage;

    fn name(&self) -> &'static str;
}

/// Fields every handler includes regardless of message type.
pub fn base_fields(message: &HandlerMessage) -> MessageBase {
    MessageBase {
        id: message.id.clone(),
        timestamp: parse_timestamp(message),
        sender_id: message.sender_id.clone(),
        sender_name: message.sender_name.clone(),
        message_type: message.message_type.clone(),
        is_edited: message.is_edited,
    }
}

fn parse_timestamp(message: &HandlerMessage) -> DateTime<Utc> {
    message
        .timestamp_raw
        .as_deref()
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| {
            tracing::warn!(
                message_id = %message.id,
                timestamp_raw = ?message.timestamp_raw,
                "message has no parseable originalarrivaltime, defaulting to epoch"
            );
            DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is always representable")
        })
}
