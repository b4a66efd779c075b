use models::{CallData, CallParticipant, HandledMessage, StructuredData};

use crate::handler::{base_fields, Handler};
use crate::message::HandlerMessage;
use crate::regexes::{capture1, CALL_DURATION, CALL_PARTICIPANT};

/// `Call`, `Event/Call` -- a voice/video call summary with duration and
/// participant list.
pub struct CallHandler;

impl Handler for CallHandler {
    fn can_handle(&self, message_type: &str) -> bool {
        let lower = message_type.to_lowercase();
        lower == "call" || lower == "event/call"
    }

    fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        let content = &message.content;
        let mut data = CallData::default();

        if let Some(duration) = capture1(&CALL_DURATION, content) {
            data.call_duration = duration.parse().ok();
        }
        data.call_participants = CALL_PARTICIPANT
            .captures_iter(content)
            .map(|c| CallParticipant {
                id: c[1].to_string(),
                name: Some(c[2].to_string()),
            })
            .collect();

        HandledMessage {
            base: base_fields(message),
            data: StructuredData::Call(data),
            extras: Default::default(),
        }
    }

    fn name(&self) -> &'static str {
        "CallHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn matches_call_types() {
        let handler = CallHandler;
        assert!(handler.can_handle("Call"));
        assert!(handler.can_handle("Event/Call"));
        assert!(!handler.can_handle("RichText"));
    }

    #[test]
    fn extracts_duration_and_participants() {
        let handler = CallHandler;
        let message = HandlerMessage {
            id: "1".into(),
            timestamp_raw: Some("2021-06-01T00:00:00Z".into()),
            sender_id: "8:alice".into(),
            sender_name: None,
            message_type: "Event/Call".into(),
            content: r#"<duration>120</duration><participant id="8:alice" name="Alice"></participant>"#.into(),
            is_edited: false,
            properties: Value::Null,
        };
        let handled = handler.extract(&message);
        match handled.data {
            StructuredData::Call(data) => {
                assert_eq!(data.call_duration, Some(120));
                assert_eq!(data.call_participants.len(), 1);
                assert_eq!(data.call_participants[0].id, "8:alice");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
