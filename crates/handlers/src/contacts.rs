use models::{Contact, ContactsData, HandledMessage, StructuredData};

use crate::handler::{base_fields, Handler};
use crate::message::HandlerMessage;
use crate::regexes::CONTACT;

/// `Contacts` -- one or more shared contact cards.
pub struct ContactsHandler;

impl Handler for ContactsHandler {
    fn can_handle(&self, message_type: &str) -> bool {
        message_type.eq_ignore_ascii_case("contacts")
    }

    fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        let contacts = CONTACT
            .captures_iter(&message.content)
            .map(|c| Contact {
                name: Some(c[1].to_string()),
                phone: Some(c[2].to_string()),
                email: Some(c[3].to_string()),
                mri: None,
            })
            .collect();

        HandledMessage {
            base: base_fields(message),
            data: StructuredData::Contacts(ContactsData { contacts }),
            extras: Default::default(),
        }
    }

    fn name(&self) -> &'static str {
        "ContactsHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn extracts_contacts() {
        let handler = ContactsHandler;
        let message = HandlerMessage {
            id: "1".into(),
            timestamp_raw: Some("2021-06-01T00:00:00Z".into()),
            sender_id: "8:alice".into(),
            sender_name: None,
            message_type: "Contacts".into(),
            content: r#"<contact name="Bob" phone="555-1234" email="bob@example.com"></contact>"#.into(),
            is_edited: false,
            properties: Value::Null,
        };
        let handled = handler.extract(&message);
        match handled.data {
            StructuredData::Contacts(data) => {
                assert_eq!(data.contacts.len(), 1);
                assert_eq!(data.contacts[0].name.as_deref(), Some("Bob"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
