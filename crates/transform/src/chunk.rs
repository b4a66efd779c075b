use std::collections::HashMap;

use extract::{RawConversation, RawMessage};
use handlers::{Factory, HandlerMessage};
use models::{Attachment, Message, Participant, StructuredData};

use crate::content::ContentExtractor;

/// Participant rows plus a `mri -> display_name` lookup used to fill in
/// `sender_name` when a message doesn't carry its own `displayName`.
pub fn build_participants(conv: &RawConversation, user_id: &str) -> (Vec<Participant>, HashMap<String, String>) {
    let mut participants = Vec::with_capacity(conv.properties.participants.len());
    let mut lookup = HashMap::with_capacity(conv.properties.participants.len());

    for raw in &conv.properties.participants {
        if let Some(name) = &raw.display_name {
            lookup.insert(raw.mri.clone(), name.clone());
        }
        participants.push(Participant {
            conversation_id: conv.id.clone(),
            user_id: raw.mri.clone(),
            is_self: raw.mri == user_id,
        });
    }

    (participants, lookup)
}

/// Processes one chunk's messages sequentially, preserving their input
/// order (spec §4.4: "order within a chunk is preserved"). A message
/// that can't be handled at all (no `messagetype`) is logged and
/// skipped; everything else degrades to base fields via the handler
/// registry rather than failing.
pub fn process_chunk(
    messages: &[RawMessage],
    factory: &Factory,
    extractor: &ContentExtractor,
    conversation_id: &str,
    participant_names: &HashMap<String, String>,
) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    for raw in messages {
        match build_message(raw, factory, extractor, conversation_id, participant_names) {
            Ok(message) => out.push(message),
            Err(reason) => {
                tracing::warn!(conversation_id, reason, "skipping unparseable message");
            }
        }
    }
    out
}

fn build_message(
    raw: &RawMessage,
    factory: &Factory,
    extractor: &ContentExtractor,
    conversation_id: &str,
    participant_names: &HashMap<String, String>,
) -> Result<Message, String> {
    let message_type = raw
        .messagetype
        .clone()
        .ok_or_else(|| "message is missing messagetype".to_string())?;

    let sender_id = raw.from.clone().unwrap_or_default();
    let sender_name = raw
        .sender_display_name
        .clone()
        .or_else(|| participant_names.get(&sender_id).cloned());

    let handler_message = HandlerMessage {
        id: raw.id.clone().unwrap_or_default(),
        timestamp_raw: raw.originalarrivaltime.clone(),
        sender_id: sender_id.clone(),
        sender_name: sender_name.clone(),
        message_type: message_type.clone(),
        content: raw.content.clone(),
        is_edited: raw.edittime.is_some(),
        properties: raw.properties.clone(),
    };

    let handled = factory.extract(&handler_message);
    let content_text = extractor.extract_cleaned_content(&raw.content);
    let attachments = attachments_from_data(&handled.data);

    Ok(Message {
        id: handler_message.id,
        conversation_id: conversation_id.to_string(),
        sender_id,
        sender_name,
        timestamp: handled.base.timestamp,
        message_type,
        content_html: raw.content.clone(),
        content_text,
        is_edited: handled.base.is_edited,
        structured_data: handled.to_json(),
        attachments,
    })
}

fn attachments_from_data(data: &StructuredData) -> Vec<Attachment> {
    match data {
        StructuredData::Media(media) => media
            .attachments
            .iter()
            .map(|a| Attachment {
                attachment_type: a.kind.clone(),
                name: a.name.clone(),
                url: a.url.clone(),
                content_type: a.content_type.clone(),
                size: a.size,
                local_path: None,
                thumbnail_path: None,
                image_metadata: None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extract::{RawConversationProperties, RawParticipant};

    fn raw_message(id: &str, message_type: Option<&str>, timestamp: &str) -> RawMessage {
        RawMessage {
            id: Some(id.to_string()),
            originalarrivaltime: Some(timestamp.to_string()),
            from: Some("8:alice".to_string()),
            sender_display_name: None,
            content: "<p>hi</p>".to_string(),
            messagetype: message_type.map(str::to_string),
            edittime: None,
            properties: serde_json::Value::Null,
        }
    }

    #[test]
    fn skips_messages_without_a_messagetype() {
        let factory = Factory::new();
        let extractor = ContentExtractor::new();
        let messages = vec![
            raw_message("1", Some("RichText"), "2021-06-01T00:00:00Z"),
            raw_message("2", None, "2021-06-01T00:01:00Z"),
        ];
        let out = process_chunk(&messages, &factory, &extractor, "conv1", &HashMap::new());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "1");
    }

    #[test]
    fn resolves_sender_name_from_participants() {
        let factory = Factory::new();
        let extractor = ContentExtractor::new();
        let mut names = HashMap::new();
        names.insert("8:alice".to_string(), "Alice".to_string());
        let messages = vec![raw_message("1", Some("RichText"), "2021-06-01T00:00:00Z")];
        let out = process_chunk(&messages, &factory, &extractor, "conv1", &names);
        assert_eq!(out[0].sender_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn builds_participants_and_marks_self() {
        let conv = RawConversation {
            id: "conv1".into(),
            properties: RawConversationProperties {
                participants: vec![
                    RawParticipant { mri: "8:alice".into(), display_name: Some("Alice".into()) },
                    RawParticipant { mri: "8:bob".into(), display_name: None },
                ],
                ..Default::default()
            },
            message_list: vec![],
        };
        let (participants, lookup) = build_participants(&conv, "8:alice");
        assert_eq!(participants.len(), 2);
        assert!(participants.iter().find(|p| p.user_id == "8:alice").unwrap().is_self);
        assert!(!participants.iter().find(|p| p.user_id == "8:bob").unwrap().is_self);
        assert_eq!(lookup.get("8:alice").map(String::as_str), Some("Alice"));
    }
}
