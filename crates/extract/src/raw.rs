use serde::{Deserialize, Serialize};

/// The fully-materialized result of extraction: run metadata plus every
/// conversation in file order. Spec §4.2 names this `RawExport {userId,
/// exportDate, conversations: LazySeq<Conversation>}`; conversations are
/// populated by the streaming reader in `crate::streaming`, which never
/// holds more than one conversation's `serde_json::Value` tree at a time,
/// so the `Vec` here is an accumulation point rather than a buffering
/// strategy.
#[derive(Debug, Clone)]
pub struct RawExport {
    pub user_id: String,
    pub export_date: chrono::DateTime<chrono::Utc>,
    pub conversations: Vec<RawConversation>,
}

/// One entry of the source's `conversations` array, matching the shape
/// `original_source/src/db/etl/transformer.py` reads (`Properties`,
/// `MessageList`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConversation {
    pub id: String,
    #[serde(default, rename = "Properties")]
    pub properties: RawConversationProperties,
    #[serde(default, rename = "MessageList")]
    pub message_list: Vec<RawMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConversationProperties {
    #[serde(default, rename = "conversationType")]
    pub conversation_type: Option<String>,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub participants: Vec<RawParticipant>,
    #[serde(default, rename = "creationTime")]
    pub creation_time: Option<String>,
    #[serde(default, rename = "lastUpdatedTime")]
    pub last_updated_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawParticipant {
    #[serde(default)]
    pub mri: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
}

/// One entry of a conversation's `MessageList`. Field names follow the
/// raw Skype export vocabulary (`originalarrivaltime`, `from`,
/// `messagetype`, `edittime`) rather than the normalized `models::Message`
/// shape the Transformer produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub id: Option<String>,
    pub originalarrivaltime: Option<String>,
    pub from: Option<String>,
    #[serde(default, rename = "displayName")]
    pub sender_display_name: Option<String>,
    #[serde(default)]
    pub content: String,
    pub messagetype: Option<String>,
    #[serde(default)]
    pub edittime: Option<String>,
    #[serde(default)]
    pub properties: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_raw_conversation() {
        let json = serde_json::json!({
            "id": "19:abc@thread.skype",
            "Properties": {
                "conversationType": "Group",
                "displayName": "Friends",
                "participants": [{"mri": "8:alice", "displayName": "Alice"}],
                "creationTime": "2021-01-01T00:00:00Z",
                "lastUpdatedTime": "2021-06-01T00:00:00Z"
            },
            "MessageList": [{
                "id": "1",
                "originalarrivaltime": "2021-01-02T10:00:00Z",
                "from": "8:alice",
                "content": "<p>Hi</p>",
                "messagetype": "RichText"
            }]
        });

        let conversation: RawConversation = serde_json::from_value(json).unwrap();
        assert_eq!(conversation.id, "19:abc@thread.skype");
        assert_eq!(conversation.properties.participants.len(), 1);
        assert_eq!(conversation.message_list.len(), 1);
        assert_eq!(conversation.message_list[0].from.as_deref(), Some("8:alice"));
    }
}
