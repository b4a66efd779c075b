//! Shared value types for the ETL workspace: identifiers, configuration,
//! the relational entities the Loader writes, and the typed structured
//! message payloads the handler registry produces.

mod config;
mod entities;
mod error;
mod id;
mod structured;

pub use config::{AttachmentsConfig, Config, DatabaseConfig, EtlConfig};
pub use entities::{Archive, Attachment, Conversation, ConversationType, Message, Participant, User};
pub use error::{ErrorRecord, PipelineError};
pub use id::{ExportId, TaskId};
pub use structured::{
    AttachmentRef, CallData, CallParticipant, Contact, ContactsData, HandledMessage,
    LocationData, MediaData, MessageBase, PollData, PollMetadata, PollOption, ScheduledCallData,
    StructuredData, TextData, ThreadActivityData,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_missing_extension() {
        let (path, rewrote) = Archive::normalize_file_source("export");
        assert_eq!(path, "export.tar");
        assert!(rewrote);
    }

    #[test]
    fn normalizes_json_extension() {
        let (path, rewrote) = Archive::normalize_file_source("export.json");
        assert_eq!(path, "export.tar");
        assert!(rewrote);
    }

    #[test]
    fn leaves_tar_extension_alone() {
        let (path, rewrote) = Archive::normalize_file_source("export.tar");
        assert_eq!(path, "export.tar");
        assert!(!rewrote);
    }
}
