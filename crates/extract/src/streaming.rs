//! Incremental parsing of the `conversations` array without holding the
//! whole document in memory, per spec §4.2's "Streaming JSON Reader."
//! `serde_json` has no built-in support for streaming one array field out
//! of a larger object, so this hand-rolls the `Visitor`/`DeserializeSeed`
//! pair serde's own documentation describes for that case: the visitor
//! driving `SeqAccess::next_element` hands each `RawConversation` to a
//! caller-supplied callback the moment it's parsed, instead of collecting
//! into a `Vec` first.

use std::fmt;
use std::io::Read;

use serde::de::{DeserializeSeed, Deserializer as _, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::error::ExtractError;
use crate::raw::RawConversation;

type ConversationSink<'a> = &'a mut dyn FnMut(RawConversation) -> Result<(), ExtractError>;

/// Metadata discovered while streaming a document, independent of shape.
#[derive(Debug, Default, Clone)]
pub struct RawExportMeta {
    pub user_id: Option<String>,
    pub export_date_raw: Option<String>,
    pub conversation_count: usize,
    pub saw_conversations: bool,
}

/// Parses `reader` as a Skype export document (either shape from spec
/// §6), invoking `on_conversation` once per conversation in file order.
/// Returns the document's metadata once the whole document has been
/// consumed.
pub fn stream_document<R: Read>(
    reader: R,
    mut on_conversation: impl FnMut(RawConversation) -> Result<(), ExtractError>,
) -> Result<RawExportMeta, ExtractError> {
    let mut de = serde_json::Deserializer::from_reader(reader);
    let meta = (&mut de).deserialize_map(DocumentVisitor {
        on_conversation: &mut on_conversation,
    })?;
    de.end()?;
    Ok(meta)
}

struct DocumentVisitor<'a> {
    on_conversation: ConversationSink<'a>,
}

impl<'de, 'a> Visitor<'de> for DocumentVisitor<'a> {
    type Value = RawExportMeta;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a Skype export document object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut meta = RawExportMeta::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "messages" => {
                    meta = map.next_value_seed(MessagesArraySeed {
                        on_conversation: &mut *self.on_conversation,
                    })?;
                }
                "userId" => meta.user_id = Some(map.next_value()?),
                "exportDate" => meta.export_date_raw = Some(map.next_value()?),
                "conversations" => {
                    meta.conversation_count = map.next_value_seed(ConversationsSeed {
                        on_conversation: &mut *self.on_conversation,
                    })?;
                    meta.saw_conversations = true;
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(meta)
    }
}

/// The nested shape's `messages` array. In every export this pipeline
/// has seen it holds exactly one element carrying the real metadata; any
/// further elements are drained and discarded.
struct MessagesArraySeed<'a> {
    on_conversation: ConversationSink<'a>,
}

impl<'de, 'a> DeserializeSeed<'de> for MessagesArraySeed<'a> {
    type Value = RawExportMeta;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        deserializer.deserialize_seq(MessagesArrayVisitor {
            on_conversation: self.on_conversation,
        })
    }
}

struct MessagesArrayVisitor<'a> {
    on_conversation: ConversationSink<'a>,
}

impl<'de, 'a> Visitor<'de> for MessagesArrayVisitor<'a> {
    type Value = RawExportMeta;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("the nested shape's single-element messages array")
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let meta = seq
            .next_element_seed(MetaObjectSeed {
                on_conversation: &mut *self.on_conversation,
            })?
            .unwrap_or_default();
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(meta)
    }
}

/// The `{userId, exportDate, conversations}` object, used for the first
/// element of a nested-shape `messages` array.
struct MetaObjectSeed<'a> {
    on_conversation: ConversationSink<'a>,
}

impl<'de, 'a> DeserializeSeed<'de> for MetaObjectSeed<'a> {
    type Value = RawExportMeta;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        deserializer.deserialize_map(MetaObjectVisitor {
            on_conversation: self.on_conversation,
        })
    }
}

struct MetaObjectVisitor<'a> {
    on_conversation: ConversationSink<'a>,
}

impl<'de, 'a> Visitor<'de> for MetaObjectVisitor<'a> {
    type Value = RawExportMeta;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a Skype export document object")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut meta = RawExportMeta::default();
        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "userId" => meta.user_id = Some(map.next_value()?),
                "exportDate" => meta.export_date_raw = Some(map.next_value()?),
                "conversations" => {
                    meta.conversation_count = map.next_value_seed(ConversationsSeed {
                        on_conversation: &mut *self.on_conversation,
                    })?;
                    meta.saw_conversations = true;
                }
                _ => {
                    map.next_value::<IgnoredAny>()?;
                }
            }
        }
        Ok(meta)
    }
}

struct ConversationsSeed<'a> {
    on_conversation: ConversationSink<'a>,
}

impl<'de, 'a> DeserializeSeed<'de> for ConversationsSeed<'a> {
    type Value = usize;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        deserializer.deserialize_seq(ConversationsVisitor {
            on_conversation: self.on_conversation,
            count: 0,
        })
    }
}

struct ConversationsVisitor<'a> {
    on_conversation: ConversationSink<'a>,
    count: usize,
}

impl<'de, 'a> Visitor<'de> for ConversationsVisitor<'a> {
    type Value = usize;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of conversation objects")
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while let Some(conversation) = seq.next_element::<RawConversation>()? {
            (self.on_conversation)(conversation).map_err(serde::de::Error::custom)?;
            self.count += 1;
        }
        Ok(self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn streams_the_flat_shape() {
        let json = br#"{
            "userId": "8:alice",
            "exportDate": "2021-06-01T00:00:00Z",
            "conversations": [
                {"id": "c1", "Properties": {}, "MessageList": []},
                {"id": "c2", "Properties": {}, "MessageList": []}
            ]
        }"#;

        let mut seen = Vec::new();
        let meta = stream_document(&json[..], |c| {
            seen.push(c.id);
            Ok(())
        })
        .unwrap();

        assert_eq!(meta.user_id.as_deref(), Some("8:alice"));
        assert_eq!(meta.conversation_count, 2);
        assert_eq!(seen, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[test]
    fn streams_the_nested_shape() {
        let json = br#"{
            "messages": [
                {
                    "userId": "8:alice",
                    "exportDate": "2021-06-01T00:00:00Z",
                    "conversations": [{"id": "c1", "Properties": {}, "MessageList": []}]
                }
            ]
        }"#;

        let mut seen = Vec::new();
        let meta = stream_document(&json[..], |c| {
            seen.push(c.id);
            Ok(())
        })
        .unwrap();

        assert_eq!(meta.user_id.as_deref(), Some("8:alice"));
        assert_eq!(meta.conversation_count, 1);
        assert_eq!(seen, vec!["c1".to_string()]);
    }
}
