use std::collections::HashMap;

use chrono::{DateTime, Utc};
use models::{Conversation, ConversationType, Message, Participant};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedUser {
    pub id: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMetadata {
    pub message_count: i64,
    pub participant_count: i64,
}

/// One entry of `TransformedData.conversations`, matching spec §4.4's
/// shape. `conversation`/`participants`/`messages` reuse the Loader's own
/// entity types rather than a parallel transform-only shape, since
/// nothing distinguishes them once transformed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedConversation {
    pub conversation: Conversation,
    pub participants: Vec<Participant>,
    pub messages: Vec<Message>,
    pub metadata: ConversationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformMetadata {
    pub transformed_at: DateTime<Utc>,
    pub conversation_count: usize,
    pub message_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformedData {
    pub user: TransformedUser,
    pub conversations: HashMap<String, TransformedConversation>,
    pub metadata: TransformMetadata,
}

pub fn conversation_type_from_raw(raw: Option<&str>) -> ConversationType {
    match raw.map(str::to_lowercase).as_deref() {
        Some("group") => ConversationType::Group,
        Some(other) if !other.is_empty() && other != "unknown" => ConversationType::OneToOne,
        _ => ConversationType::Unknown,
    }
}
