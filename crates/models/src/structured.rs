use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Fields every handler produces, regardless of message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBase {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub message_type: String,
    pub is_edited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: Option<String>,
    pub url: Option<String>,
    pub content_type: Option<String>,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextData {
    pub has_mentions: bool,
    pub has_emotions: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaData {
    pub attachments: Vec<AttachmentRef>,
    pub media_type: Option<String>,
    pub media_filename: Option<String>,
    pub media_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollOption {
    pub text: String,
    pub vote_count: i64,
    pub is_selected: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollMetadata {
    pub status: Option<String>,
    pub vote_visibility: Option<String>,
    pub creator: Option<String>,
    pub total_votes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollData {
    pub poll_question: Option<String>,
    pub poll_options: Vec<PollOption>,
    pub poll_metadata: PollMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallParticipant {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallData {
    pub call_duration: Option<i64>,
    pub call_participants: Vec<CallParticipant>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationData {
    pub location_latitude: Option<f64>,
    pub location_longitude: Option<f64>,
    pub location_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub mri: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactsData {
    pub contacts: Vec<Contact>,
}

/// `ThreadActivity/{AddMember|TopicUpdate|...}`. `activity_type`
/// canonicalization is intentionally inconsistent, replicating the
/// original system (see spec §9's Open Questions): `AddMember` and
/// `TopicUpdate` keep their exact casing, anything else is Titlecased.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThreadActivityData {
    pub activity_type: String,
    pub activity_members: Vec<String>,
    pub activity_initiator: Option<String>,
    pub activity_value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduledCallData {
    pub title: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<i64>,
    pub organizer: Option<String>,
    pub participants: Vec<String>,
    pub description: Option<String>,
    pub meeting_link: Option<String>,
    pub call_id: Option<String>,
}

/// Tagged union over every known `messagetype` family, per spec §9's
/// "dynamic typing → typed variants" redesign note. `extras` retains any
/// payload a handler observed but didn't model, so nothing is silently
/// dropped even for the typed variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StructuredData {
    Text(TextData),
    Media(MediaData),
    Poll(PollData),
    Call(CallData),
    Location(LocationData),
    Contacts(ContactsData),
    ThreadActivity(ThreadActivityData),
    ScheduledCall(ScheduledCallData),
    Unknown,
}

/// The full output of a handler: base fields shared by all message types,
/// the typed payload, and anything left over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandledMessage {
    pub base: MessageBase,
    pub data: StructuredData,
    #[serde(default)]
    pub extras: Map<String, Value>,
}

impl HandledMessage {
    /// Collapses `base` + `data` + `extras` into the single JSON document
    /// stored as `messages.structured_data`.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
