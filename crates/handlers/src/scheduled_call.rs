use chrono::{DateTime, Utc};
use models::{HandledMessage, ScheduledCallData, StructuredData};
use serde_json::{Map, Value};

use crate::handler::{base_fields, Handler};
use crate::message::HandlerMessage;
use crate::regexes::{capture1, ATTR_DURATION, ATTR_TIME, ATTR_TITLE, SCHEDULED_CALL_TAG};

/// `RichText/ScheduledCallInvite` -- a scheduled meeting invite. Simple
/// `<scheduledcall title="..">` markup is parsed directly; richer fields
/// (organizer, meeting link, call id) come from the message's
/// `scheduledCallData` property object when present, which can override
/// anything the markup gave.
pub struct ScheduledCallHandler;

impl Handler for ScheduledCallHandler {
    fn can_handle(&self, message_type: &str) -> bool {
        message_type.eq_ignore_ascii_case("richtext/scheduledcallinvite")
    }

    fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        let content = &message.content;
        let mut data = ScheduledCallData {
            title: Some("Scheduled Call".to_string()),
            ..Default::default()
        };
        let mut extras = Map::new();

        if SCHEDULED_CALL_TAG.is_match(content) {
            if let Some(title) = capture1(&ATTR_TITLE, content) {
                data.title = Some(title);
            }
            if let Some(time) = capture1(&ATTR_TIME, content) {
                data.start_time = parse_timestamp(&time);
                if data.start_time.is_none() {
                    extras.insert("scheduled_call_time_raw".into(), Value::String(time));
                }
            }
            if let Some(duration) = capture1(&ATTR_DURATION, content) {
                data.duration_minutes = duration.parse().ok();
            }
        }

        if let Some(call_props) = message.property("scheduledCallData") {
            let parsed = match call_props {
                Value::String(s) => serde_json::from_str::<Value>(s).unwrap_or(Value::Null),
                other => other.clone(),
            };
            if let Some(obj) = parsed.as_object() {
                if let Some(title) = obj.get("title").and_then(Value::as_str) {
                    data.title = Some(title.to_string());
                }
                if let Some(start) = obj.get("startTime").and_then(Value::as_str) {
                    data.start_time = parse_timestamp(start).or(data.start_time);
                }
                if let Some(end) = obj.get("endTime").and_then(Value::as_str) {
                    data.end_time = parse_timestamp(end);
                }
                if let Some(organizer) = obj.get("organizer").and_then(Value::as_str) {
                    data.organizer = Some(organizer.to_string());
                }
                if let Some(link) = obj.get("meetingLink").and_then(Value::as_str) {
                    data.meeting_link = Some(link.to_string());
                }
                if let Some(call_id) = obj.get("callId").and_then(Value::as_str) {
                    data.call_id = Some(call_id.to_string());
                }
            } else {
                tracing::warn!(message_id = %message.id, "scheduledCallData property was not a JSON object");
            }
        }

        if let (Some(start), Some(end)) = (data.start_time, data.end_time) {
            data.duration_minutes = Some((end - start).num_minutes());
        }

        HandledMessage {
            base: base_fields(message),
            data: StructuredData::ScheduledCall(data),
            extras,
        }
    }

    fn name(&self) -> &'static str {
        "ScheduledCallHandler"
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_scheduled_call_invite() {
        let handler = ScheduledCallHandler;
        assert!(handler.can_handle("RichText/ScheduledCallInvite"));
        assert!(!handler.can_handle("RichText"));
    }

    #[test]
    fn extracts_simple_markup() {
        let handler = ScheduledCallHandler;
        let message = HandlerMessage {
            id: "1".into(),
            timestamp_raw: Some("2021-06-01T00:00:00Z".into()),
            sender_id: "8:alice".into(),
            sender_name: None,
            message_type: "RichText/ScheduledCallInvite".into(),
            content: r#"<scheduledcall title="Planning" duration="30"></scheduledcall>"#.into(),
            is_edited: false,
            properties: Value::Null,
        };
        let handled = handler.extract(&message);
        match handled.data {
            StructuredData::ScheduledCall(data) => {
                assert_eq!(data.title.as_deref(), Some("Planning"));
                assert_eq!(data.duration_minutes, Some(30));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn overrides_from_properties() {
        let handler = ScheduledCallHandler;
        let message = HandlerMessage {
            id: "1".into(),
            timestamp_raw: Some("2021-06-01T00:00:00Z".into()),
            sender_id: "8:alice".into(),
            sender_name: None,
            message_type: "RichText/ScheduledCallInvite".into(),
            content: String::new(),
            is_edited: false,
            properties: serde_json::json!({
                "scheduledCallData": {
                    "title": "Standup",
                    "organizer": "Alice",
                    "callId": "abc123"
                }
            }),
        };
        let handled = handler.extract(&message);
        match handled.data {
            StructuredData::ScheduledCall(data) => {
                assert_eq!(data.title.as_deref(), Some("Standup"));
                assert_eq!(data.organizer.as_deref(), Some("Alice"));
                assert_eq!(data.call_id.as_deref(), Some("abc123"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
