use sqlx::PgPool;

use crate::error::DbError;

const CREATE_ARCHIVES: &str = r#"
CREATE TABLE IF NOT EXISTS archives (
    id BIGSERIAL PRIMARY KEY,
    task_id UUID NOT NULL,
    user_id TEXT NOT NULL,
    user_display_name TEXT,
    export_date TIMESTAMP NOT NULL,
    file_source TEXT NOT NULL CHECK (file_source LIKE '%.tar'),
    file_size BIGINT NOT NULL,
    created_at TIMESTAMP NOT NULL DEFAULT now()
)"#;

const CREATE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    display_name TEXT,
    properties JSONB NOT NULL DEFAULT '{}',
    is_self BOOLEAN NOT NULL DEFAULT false
)"#;

const CREATE_CONVERSATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS conversations (
    id TEXT PRIMARY KEY,
    archive_id BIGINT NOT NULL REFERENCES archives(id),
    display_name TEXT NOT NULL,
    conversation_type TEXT NOT NULL,
    first_message_time TIMESTAMP,
    last_message_time TIMESTAMP,
    message_count BIGINT NOT NULL DEFAULT 0,
    participant_count BIGINT NOT NULL DEFAULT 0
)"#;

const CREATE_PARTICIPANTS: &str = r#"
CREATE TABLE IF NOT EXISTS participants (
    conversation_id TEXT NOT NULL REFERENCES conversations(id),
    user_id TEXT NOT NULL REFERENCES users(id),
    is_self BOOLEAN NOT NULL DEFAULT false,
    PRIMARY KEY (conversation_id, user_id)
)"#;

const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    id TEXT NOT NULL,
    conversation_id TEXT NOT NULL REFERENCES conversations(id),
    sender_id TEXT NOT NULL,
    sender_name TEXT,
    timestamp TIMESTAMP NOT NULL,
    message_type TEXT NOT NULL,
    content_html TEXT NOT NULL,
    content_text TEXT NOT NULL,
    is_edited BOOLEAN NOT NULL DEFAULT false,
    structured_data JSONB NOT NULL DEFAULT '{}',
    PRIMARY KEY (conversation_id, id)
)"#;

const CREATE_ATTACHMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS attachments (
    id BIGSERIAL PRIMARY KEY,
    message_id TEXT NOT NULL,
    conversation_id TEXT NOT NULL,
    attachment_type TEXT NOT NULL,
    name TEXT,
    url TEXT,
    content_type TEXT,
    size BIGINT,
    local_path TEXT,
    thumbnail_path TEXT,
    image_metadata JSONB,
    FOREIGN KEY (conversation_id, message_id) REFERENCES messages(conversation_id, id)
)"#;

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_messages_conversation_id ON messages (conversation_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_from_id ON messages (sender_id)",
    "CREATE INDEX IF NOT EXISTS idx_messages_timestamp ON messages (timestamp)",
    "CREATE INDEX IF NOT EXISTS idx_attachments_message_id ON attachments (conversation_id, message_id)",
];

/// Idempotent DDL, per spec §4.7. `CREATE TABLE/INDEX IF NOT EXISTS`
/// gives the same idempotency spec §4.7's "check existence via
/// information schema, create if missing" asks for in a single round
/// trip per statement, rather than a separate existence query plus a
/// conditional `CREATE TABLE`.
pub struct SchemaManager;

impl SchemaManager {
    pub async fn ensure_schema(pool: &PgPool) -> Result<(), DbError> {
        for statement in [
            CREATE_ARCHIVES,
            CREATE_USERS,
            CREATE_CONVERSATIONS,
            CREATE_PARTICIPANTS,
            CREATE_MESSAGES,
            CREATE_ATTACHMENTS,
        ] {
            sqlx::query(statement).execute(pool).await.map_err(DbError::Schema)?;
        }
        for statement in INDEXES {
            sqlx::query(statement).execute(pool).await.map_err(DbError::Schema)?;
        }
        Ok(())
    }
}
