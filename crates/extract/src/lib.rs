//! Turns a Skype export source (tar or JSON) into run metadata and a
//! stream of raw conversations, per spec §4.2.

mod error;
mod extractor;
mod raw;
mod source;
mod streaming;

pub use error::ExtractError;
pub use extractor::Extractor;
pub use raw::{RawConversation, RawConversationProperties, RawExport, RawMessage, RawParticipant};
pub use source::Source;
pub use streaming::{stream_document, RawExportMeta};
