use models::HandledMessage;

use crate::call::CallHandler;
use crate::contacts::ContactsHandler;
use crate::handler::Handler;
use crate::location::LocationHandler;
use crate::media::MediaHandler;
use crate::message::HandlerMessage;
use crate::poll::PollHandler;
use crate::scheduled_call::ScheduledCallHandler;
use crate::text::TextHandler;
use crate::thread_activity::ThreadActivityHandler;
use crate::unknown::UnknownHandler;

/// Owns the registry of handlers and dispatches by `messagetype`, in
/// order of specificity, mirroring the teacher's `Vec<Box<dyn Handler>>`
/// linear `can_handle` scan (`crates/agent/src/handlers.rs`), generalized
/// here from "dispatch by DB table name" to "dispatch by message type".
pub struct Factory {
    handlers: Vec<Box<dyn Handler>>,
}

impl Factory {
    pub fn new() -> Self {
        Self {
            handlers: vec![
                Box::new(TextHandler),
                Box::new(MediaHandler),
                Box::new(PollHandler),
                Box::new(CallHandler),
                Box::new(LocationHandler),
                Box::new(ContactsHandler),
                Box::new(ThreadActivityHandler),
                Box::new(ScheduledCallHandler),
                Box::new(UnknownHandler),
            ],
        }
    }

    /// Finds the first handler that claims `message_type`. Always
    /// returns a handler: `UnknownHandler` is terminal and matches
    /// everything.
    pub fn get_handler(&self, message_type: &str) -> &dyn Handler {
        self.handlers
            .iter()
            .find(|handler| handler.can_handle(message_type))
            .map(|handler| handler.as_ref())
            .expect("UnknownHandler matches every message type")
    }

    pub fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        self.get_handler(&message.message_type).extract(message)
    }
}

impl Default for Factory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::StructuredData;
    use serde_json::Value;

    fn message(message_type: &str, content: &str) -> HandlerMessage {
        HandlerMessage {
            id: "1".into(),
            timestamp_raw: Some("2021-06-01T00:00:00Z".into()),
            sender_id: "8:alice".into(),
            sender_name: None,
            message_type: message_type.into(),
            content: content.into(),
            is_edited: false,
            properties: Value::Null,
        }
    }

    #[test]
    fn dispatches_by_message_type() {
        let factory = Factory::new();
        assert_eq!(factory.get_handler("RichText").name(), "TextHandler");
        assert_eq!(factory.get_handler("Poll").name(), "PollHandler");
        assert_eq!(
            factory.get_handler("RichText/ScheduledCallInvite").name(),
            "ScheduledCallHandler"
        );
        assert_eq!(factory.get_handler("something/weird").name(), "UnknownHandler");
    }

    #[test]
    fn never_panics_on_malformed_content() {
        let factory = Factory::new();
        let handled = factory.extract(&message("Poll", "not even close to valid markup"));
        match handled.data {
            StructuredData::Poll(data) => assert!(data.poll_question.is_none()),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
