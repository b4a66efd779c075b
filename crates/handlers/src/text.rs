use models::{HandledMessage, StructuredData, TextData};

use crate::handler::{base_fields, Handler};
use crate::message::HandlerMessage;

/// `Text`, `RichText`, `RichText/HTML` -- the plain chat message family.
pub struct TextHandler;

impl Handler for TextHandler {
    fn can_handle(&self, message_type: &str) -> bool {
        matches!(
            message_type.to_lowercase().as_str(),
            "text" | "richtext" | "richtext/html"
        )
    }

    fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        let data = TextData {
            has_mentions: message.property("mentioned").is_some(),
            has_emotions: message.property("emotions").is_some(),
        };

        HandledMessage {
            base: base_fields(message),
            data: StructuredData::Text(data),
            extras: Default::default(),
        }
    }

    fn name(&self) -> &'static str {
        "TextHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(message_type: &str, properties: serde_json::Value) -> HandlerMessage {
        HandlerMessage {
            id: "1".into(),
            timestamp_raw: Some("2021-06-01T00:00:00Z".into()),
            sender_id: "8:alice".into(),
            sender_name: Some("Alice".into()),
            message_type: message_type.into(),
            content: "<p>hi</p>".into(),
            is_edited: false,
            properties,
        }
    }

    #[test]
    fn matches_known_text_types() {
        let handler = TextHandler;
        assert!(handler.can_handle("RichText"));
        assert!(handler.can_handle("text"));
        assert!(handler.can_handle("RichText/HTML"));
        assert!(!handler.can_handle("RichText/Media_Video"));
    }

    #[test]
    fn detects_mentions_and_emotions_from_properties() {
        let handler = TextHandler;
        let handled = handler.extract(&message(
            "RichText",
            serde_json::json!({"mentioned": [{"mri": "8:bob"}]}),
        ));
        match handled.data {
            StructuredData::Text(data) => {
                assert!(data.has_mentions);
                assert!(!data.has_emotions);
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
