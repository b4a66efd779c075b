use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::ExportId;

/// One pipeline run, landed as a single row in `archives`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
    pub export_id: Option<ExportId>,
    pub task_id: uuid::Uuid,
    pub user_id: String,
    pub user_display_name: Option<String>,
    pub export_date: DateTime<Utc>,
    pub file_source: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}

impl Archive {
    /// Spec invariant 4: `archives.file_path` must satisfy `LIKE '%.tar'`.
    /// Rewrites a missing or wrong extension, returning whether a rewrite
    /// happened so the caller can log the warning spec §8 requires.
    pub fn normalize_file_source(source: &str) -> (String, bool) {
        if source.ends_with(".tar") {
            (source.to_string(), false)
        } else if let Some(stripped) = source.strip_suffix(".json") {
            (format!("{stripped}.tar"), true)
        } else {
            (format!("{source}.tar"), true)
        }
    }
}

/// A participant identity, keyed by Skype MRI. One canonical row is kept
/// across all conversations it appears in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub display_name: Option<String>,
    pub properties: Value,
    pub is_self: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationType {
    OneToOne,
    Group,
    Unknown,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneToOne => "one_to_one",
            Self::Group => "group",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ConversationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A thread, scoped to a single export run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub display_name: String,
    pub conversation_type: ConversationType,
    pub export_id: Option<ExportId>,
    pub first_message_time: Option<DateTime<Utc>>,
    pub last_message_time: Option<DateTime<Utc>>,
    pub message_count: i64,
    pub participant_count: i64,
}

/// A (conversation, user) membership.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub conversation_id: String,
    pub user_id: String,
    pub is_self: bool,
}

/// One message within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub message_type: String,
    pub content_html: String,
    pub content_text: String,
    pub is_edited: bool,
    pub structured_data: Value,
    pub attachments: Vec<Attachment>,
}

/// A file or media reference belonging to one message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub attachment_type: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<i64>,
    pub local_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub image_metadata: Option<Value>,
}
