use models::{AttachmentRef, HandledMessage, MediaData, StructuredData};
use serde_json::{Map, Value};

use crate::handler::{base_fields, Handler};
use crate::message::HandlerMessage;
use crate::regexes::{capture1, ALBUM_IMG, ATTR_DESCRIPTION, ATTR_FILENAME, ATTR_FILESIZE, ATTR_FILETYPE, ATTR_FROM, ATTR_TITLE, ATTR_TO, ATTR_TYPE, ATTR_URL, TRANSLATION_ORIGINAL, TRANSLATION_TEXT};

/// `RichText/Media_*`, plus the generic `media`/`image`/`video`/`file`/`uri`
/// aliases some export shapes use directly.
pub struct MediaHandler;

impl Handler for MediaHandler {
    fn can_handle(&self, message_type: &str) -> bool {
        let lower = message_type.to_lowercase();
        lower.starts_with("richtext/media")
            || lower.starts_with("richtext/popcard")
            || lower.starts_with("richtext/translation")
            || matches!(lower.as_str(), "media" | "image" | "video" | "file" | "uri")
    }

    fn extract(&self, message: &HandlerMessage) -> HandledMessage {
        let mut data = MediaData::default();
        let mut extras = Map::new();
        let lower = message.message_type.to_lowercase();
        let content = &message.content;

        if lower.contains("media_video") || lower.contains("media_image") {
            data.media_filename = capture1(&ATTR_FILENAME, content);
            data.media_url = capture1(&ATTR_URL, content);
            if let Some(size) = capture1(&ATTR_FILESIZE, content) {
                extras.insert("media_filesize".into(), Value::String(size));
            }
            if let Some(kind) = capture1(&ATTR_FILETYPE, content) {
                extras.insert("media_filetype".into(), Value::String(kind));
            }
            data.media_type = Some(if lower.contains("media_video") { "video" } else { "image" }.into());
        } else if lower.contains("media_album") {
            let items: Vec<Value> = ALBUM_IMG
                .captures_iter(content)
                .map(|c| {
                    serde_json::json!({
                        "src": &c[1],
                        "thumbnail": &c[2],
                        "width": &c[3],
                        "height": &c[4],
                    })
                })
                .collect();
            extras.insert("media_album_count".into(), Value::from(items.len()));
            extras.insert("media_album_items".into(), Value::Array(items));
            data.media_type = Some("album".into());
        } else if lower.contains("media_card") {
            if let Some(title) = capture1(&ATTR_TITLE, content) {
                extras.insert("card_title".into(), Value::String(title));
            }
            if let Some(desc) = capture1(&ATTR_DESCRIPTION, content) {
                extras.insert("card_description".into(), Value::String(desc));
            }
            data.media_url = capture1(&ATTR_URL, content);
            data.media_type = Some("card".into());
        } else if lower.starts_with("richtext/popcard") {
            if let Some(title) = capture1(&ATTR_TITLE, content) {
                extras.insert("popcard_title".into(), Value::String(title));
            }
            if let Some(kind) = capture1(&ATTR_TYPE, content) {
                extras.insert("popcard_type".into(), Value::String(kind));
            }
            data.media_type = Some("popcard".into());
        } else if lower.starts_with("richtext/translation") {
            if let Some(from) = capture1(&ATTR_FROM, content) {
                extras.insert("translation_from_language".into(), Value::String(from));
            }
            if let Some(to) = capture1(&ATTR_TO, content) {
                extras.insert("translation_to_language".into(), Value::String(to));
            }
            if let Some(original) = capture1(&TRANSLATION_ORIGINAL, content) {
                extras.insert("translation_original".into(), Value::String(original));
            }
            if let Some(text) = capture1(&TRANSLATION_TEXT, content) {
                extras.insert("translation_text".into(), Value::String(text));
            }
            data.media_type = Some("translation".into());
        }

        if let Some(attachments) = message
            .property("attachments")
            .and_then(Value::as_array)
        {
            for attachment in attachments {
                data.attachments.push(AttachmentRef {
                    kind: attachment
                        .get("type")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown")
                        .to_string(),
                    name: attachment.get("name").and_then(Value::as_str).map(str::to_string),
                    url: attachment.get("url").and_then(Value::as_str).map(str::to_string),
                    content_type: attachment
                        .get("contentType")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    size: attachment.get("size").and_then(Value::as_i64),
                });
            }
        }

        HandledMessage {
            base: base_fields(message),
            data: StructuredData::Media(data),
            extras,
        }
    }

    fn name(&self) -> &'static str {
        "MediaHandler"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(message_type: &str, content: &str) -> HandlerMessage {
        HandlerMessage {
            id: "1".into(),
            timestamp_raw: Some("2021-06-01T00:00:00Z".into()),
            sender_id: "8:alice".into(),
            sender_name: None,
            message_type: message_type.into(),
            content: content.into(),
            is_edited: false,
            properties: Value::Null,
        }
    }

    #[test]
    fn handles_richtext_media_prefixes() {
        let handler = MediaHandler;
        assert!(handler.can_handle("RichText/Media_Video"));
        assert!(handler.can_handle("RichText/Media_Image"));
        assert!(!handler.can_handle("RichText"));
    }

    #[test]
    fn extracts_video_attributes() {
        let handler = MediaHandler;
        let handled = handler.extract(&message(
            "RichText/Media_Video",
            r#"<uriobject filename="clip.mp4" filesize="1024" filetype="mp4" url="https://example.com/clip.mp4"></uriobject>"#,
        ));
        match handled.data {
            StructuredData::Media(data) => {
                assert_eq!(data.media_filename.as_deref(), Some("clip.mp4"));
                assert_eq!(data.media_type.as_deref(), Some("video"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert_eq!(
            handled.extras.get("media_filesize").and_then(Value::as_str),
            Some("1024")
        );
    }

    #[test]
    fn extracts_album_items() {
        let handler = MediaHandler;
        let handled = handler.extract(&message(
            "RichText/Media_Album",
            r#"<img src="a.jpg" thumbnail="a_t.jpg" width="100" height="100" /><img src="b.jpg" thumbnail="b_t.jpg" width="100" height="100" />"#,
        ));
        assert_eq!(handled.extras.get("media_album_count"), Some(&Value::from(2)));
    }
}
