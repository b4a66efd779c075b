use models::{HandledMessage, StructuredData};
use serde_json::Map;

use crate::handler::{base_fields, Handler};
use crate::message::HandlerMessage;

/// Terminal fallback: every `messagetype` this registry doesn't know
/// about still gets base fields and its raw properties preserved.
pub struct UnknownHandler;

impl Handler for UnknownHandler {
    fn can_handle(&self, _message_type: &str) -> bool {
        true
    }

    fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        let mut extras = Map::new();
        if !message.properties.is_null() {
            extras.insert("raw_properties".to_string(), message.properties.clone());
        }

        HandledMessage {
            base: base_fields(message),
            data: StructuredData::Unknown,
            extras,
        }
    }

    fn name(&self) -> &'static str {
        "UnknownHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_matches() {
        assert!(UnknownHandler.can_handle("anything/at/all"));
    }
}
