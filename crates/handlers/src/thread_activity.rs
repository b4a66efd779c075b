use models::{HandledMessage, StructuredData, ThreadActivityData};

use crate::handler::{base_fields, Handler};
use crate::message::HandlerMessage;
use crate::regexes::{capture1, ACTIVITY_INITIATOR, ACTIVITY_MEMBER, ACTIVITY_VALUE};

/// `ThreadActivity/*` -- membership and topic changes. `activity_type`
/// canonicalization intentionally isn't uniform: `AddMember` and
/// `TopicUpdate` keep their exact names, anything else is Titlecased from
/// whatever follows the last `/`. Replicated as-is rather than cleaned
/// up, since downstream consumers may already branch on these exact
/// strings.
pub struct ThreadActivityHandler;

impl Handler for ThreadActivityHandler {
    fn can_handle(&self, message_type: &str) -> bool {
        message_type.to_lowercase().starts_with("threadactivity")
    }

    fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        let message_type = &message.message_type;
        let lower = message_type.to_lowercase();
        let content = &message.content;

        let activity_type_raw = message_type.rsplit('/').next().unwrap_or("Unknown");
        let activity_type = match activity_type_raw.to_lowercase().as_str() {
            "addmember" => "AddMember".to_string(),
            "topicupdate" => "TopicUpdate".to_string(),
            _ => titlecase(activity_type_raw),
        };

        let mut data = ThreadActivityData {
            activity_type,
            ..Default::default()
        };

        if lower.contains("addmember") {
            data.activity_members = ACTIVITY_MEMBER
                .captures_iter(content)
                .map(|c| c[2].to_string())
                .collect();
            data.activity_initiator = capture1(&ACTIVITY_INITIATOR, content);
        } else if lower.contains("topicupdate") {
            data.activity_value = capture1(&ACTIVITY_VALUE, content);
            data.activity_initiator = capture1(&ACTIVITY_INITIATOR, content);
        }

        HandledMessage {
            base: base_fields(message),
            data: StructuredData::ThreadActivity(data),
            extras: Default::default(),
        }
    }

    fn name(&self) -> &'static str {
        "ThreadActivityHandler"
    }
}

fn titlecase(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn canonicalizes_addmember_and_topicupdate() {
        let handler = ThreadActivityHandler;
        let handled = handler.extract(&message(
            "ThreadActivity/AddMember",
            r#"<member id="8:bob" name="Bob"></member><initiator name="Alice"></initiator>"#,
        ));
        match handled.data {
            StructuredData::ThreadActivity(data) => {
                assert_eq!(data.activity_type, "AddMember");
                assert_eq!(data.activity_members, vec!["Bob".to_string()]);
                assert_eq!(data.activity_initiator.as_deref(), Some("Alice"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn titlecases_unrecognized_activity_types() {
        let handler = ThreadActivityHandler;
        let handled = handler.extract(&message("ThreadActivity/deletemember", ""));
        match handled.data {
            StructuredData::ThreadActivity(data) => assert_eq!(data.activity_type, "Deletemember"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
