use models::{HandledMessage, LocationData, StructuredData};

use crate::handler::{base_fields, Handler};
use crate::message::HandlerMessage;
use crate::regexes::{capture1, LOCATION_ADDRESS, LOCATION_LATITUDE, LOCATION_LONGITUDE};

/// `Location` -- a shared position, latitude/longitude plus a free-text
/// address.
pub struct LocationHandler;

impl Handler for LocationHandler {
    fn can_handle(&self, message_type: &str) -> bool {
        message_type.eq_ignore_ascii_case("location")
    }

    fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        let content = &message.content;
        let mut data = LocationData::default();

        if let Some(lat) = capture1(&LOCATION_LATITUDE, content) {
            data.location_latitude = lat.parse().ok();
        }
        if let Some(long) = capture1(&LOCATION_LONGITUDE, content) {
            data.location_longitude = long.parse().ok();
        }
        data.location_address = capture1(&LOCATION_ADDRESS, content);

        HandledMessage {
            base: base_fields(message),
            data: StructuredData::Location(data),
            extras: Default::default(),
        }
    }

    fn name(&self) -> &'static str {
        "LocationHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn extracts_coordinates_and_address() {
        let handler = LocationHandler;
        let message = HandlerMessage {
            id: "1".into(),
            timestamp_raw: Some("2021-06-01T00:00:00Z".into()),
            sender_id: "8:alice".into(),
            sender_name: None,
            message_type: "Location".into(),
            content: r#"<location latitude="37.7" longitude="-122.4"></location><address>SF</address>"#.into(),
            is_edited: false,
            properties: Value::Null,
        };
        let handled = handler.extract(&message);
        match handled.data {
            StructuredData::Location(data) => {
                assert_eq!(data.location_latitude, Some(37.7));
                assert_eq!(data.location_longitude, Some(-122.4));
                assert_eq!(data.location_address.as_deref(), Some("SF"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
