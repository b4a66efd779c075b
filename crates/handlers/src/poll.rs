use models::{HandledMessage, PollData, PollOption, StructuredData};
use serde_json::Value;

use crate::handler::{base_fields, Handler};
use crate::message::HandlerMessage;
use crate::regexes::{capture1, POLL_OPTION, POLL_QUESTION};

/// `Poll` messages: a question plus a flat list of option labels. Vote
/// counts and selection state require the richer HTML poll widget markup
/// this export format doesn't carry, so `vote_count`/`is_selected`
/// default to zero/false per option.
pub struct PollHandler;

impl Handler for PollHandler {
    fn can_handle(&self, message_type: &str) -> bool {
        message_type.eq_ignore_ascii_case("poll")
    }

    fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        let mut data = PollData::default();

        let content = if !message.content.is_empty() {
            message.content.clone()
        } else {
            message
                .property("htmlContent")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        if !content.is_empty() && !content.contains("<invalid>") {
            data.poll_question = capture1(&POLL_QUESTION, &content);
            data.poll_options = POLL_OPTION
                .captures_iter(&content)
                .map(|c| PollOption {
                    text: c[1].to_string(),
                    vote_count: 0,
                    is_selected: false,
                })
                .collect();
        }

        HandledMessage {
            base: base_fields(message),
            data: StructuredData::Poll(data),
            extras: Default::default(),
        }
    }

    fn name(&self) -> &'static str {
        "PollHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_poll_case_insensitively() {
        let handler = PollHandler;
        assert!(handler.can_handle("Poll"));
        assert!(handler.can_handle("poll"));
        assert!(!handler.can_handle("RichText"));
    }

    #[test]
    fn extracts_question_and_options() {
        let handler = PollHandler;
        let message = HandlerMessage {
            id: "1".into(),
            timestamp_raw: Some("2021-06-01T00:00:00Z".into()),
            sender_id: "8:alice".into(),
            sender_name: None,
            message_type: "Poll".into(),
            content: "<pollquestion>Lunch?</pollquestion><polloption>Pizza</polloption><polloption>Sushi</polloption>".into(),
            is_edited: false,
            properties: Value::Null,
        };
        let handled = handler.extract(&message);
        match handled.data {
            StructuredData::Poll(data) => {
                assert_eq!(data.poll_question.as_deref(), Some("Lunch?"));
                assert_eq!(data.poll_options.len(), 2);
                assert_eq!(data.poll_options[0].text, "Pizza");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
