/// Input to a `Handler`, decoupled from `extract::RawMessage` so this
/// crate depends only on `models`. The `transform` crate is responsible
/// for resolving `sender_name` against the conversation's participant
/// list before building one of these.
#[derive(Debug, Clone)]
pub struct HandlerMessage {
    pub id: String,
    pub timestamp_raw: Option<String>,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub message_type: String,
    pub content: String,
    pub is_edited: bool,
    pub properties: serde_json::Value,
}

impl HandlerMessage {
    pub fn property(&self, key: &str) -> Option<&serde_json::Value> {
        self.properties.get(key)
    }
}
