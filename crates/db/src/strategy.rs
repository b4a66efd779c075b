use sqlx::{Postgres, QueryBuilder, Transaction};
use transform::TransformedData;

use crate::error::DbError;

const MIN_BATCH: usize = 100;
const MAX_BATCH: usize = 5000;

#[derive(Debug, Clone, Copy, Default)]
pub struct InsertCounts {
    pub archives: i64,
    pub users: i64,
    pub conversations: i64,
    pub messages: i64,
    pub attachments: i64,
}

/// Common interface both strategies implement, per spec §4.6. `data`
/// has already had its Archive row inserted by the Loader; `archive_id`
/// is threaded through to stamp `conversations.archive_id`.
#[async_trait::async_trait]
pub trait InsertionStrategy: Send + Sync {
    async fn insert(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        archive_id: i64,
        data: &TransformedData,
    ) -> Result<InsertCounts, DbError>;
}

/// Batches per table with adaptive sizing, per spec §4.6: starts at
/// `initial_batch_size`, grows `x1.5` on success (capped at
/// `MAX_BATCH`), and on failure halves the shared batch size (floored at
/// `MIN_BATCH`) while re-splitting the failed rows themselves into
/// smaller sub-batches to retry, surfacing the error once it can no
/// longer split further.
pub struct BulkStrategy {
    batch_size: std::sync::Mutex<usize>,
}

impl BulkStrategy {
    pub fn new(initial_batch_size: usize) -> Self {
        Self {
            batch_size: std::sync::Mutex::new(initial_batch_size.clamp(MIN_BATCH, MAX_BATCH)),
        }
    }

    fn current_batch_size(&self) -> usize {
        *self.batch_size.lock().unwrap()
    }

    fn grow(&self) {
        let mut size = self.batch_size.lock().unwrap();
        *size = ((*size as f64 * 1.5) as usize).min(MAX_BATCH);
    }

    fn shrink(&self) -> bool {
        let mut size = self.batch_size.lock().unwrap();
        if *size <= MIN_BATCH {
            return false;
        }
        *size = ((*size as f64 * 0.5) as usize).max(MIN_BATCH);
        true
    }

    async fn insert_users(&self, tx: &mut Transaction<'static, Postgres>, data: &TransformedData) -> Result<i64, DbError> {
        let mut users: Vec<(&str, Option<&str>, bool)> = data
            .conversations
            .values()
            .flat_map(|conv| conv.participants.iter())
            .map(|p| (p.user_id.as_str(), None, p.is_self))
            .collect();
        users.push((data.user.id.as_str(), data.user.display_name.as_deref(), true));
        users.sort_by(|a, b| a.0.cmp(b.0));
        users.dedup_by(|a, b| a.0 == b.0);

        let inserted = users.len() as i64;
        let batch_size = self.current_batch_size();
        for chunk in users.chunks(batch_size) {
            self.run_batch(tx, chunk, |rows| {
                let mut builder = QueryBuilder::new(
                    "INSERT INTO users (id, display_name, properties, is_self) ",
                );
                builder.push_values(rows, |mut b, (id, display_name, is_self)| {
                    b.push_bind(*id)
                        .push_bind(*display_name)
                        .push_bind(serde_json::Value::Object(Default::default()))
                        .push_bind(*is_self);
                });
                builder.push(" ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name, is_self = EXCLUDED.is_self");
                builder
            })
            .await?;
        }
        Ok(inserted)
    }

    async fn insert_conversations(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        archive_id: i64,
        data: &TransformedData,
    ) -> Result<i64, DbError> {
        let conversations: Vec<_> = data.conversations.values().collect();
        let inserted = conversations.len() as i64;
        let batch_size = self.current_batch_size();
        for chunk in conversations.chunks(batch_size) {
            self.run_batch(tx, chunk, |rows| {
                let mut builder = QueryBuilder::new(
                    "INSERT INTO conversations (id, archive_id, display_name, conversation_type, first_message_time, last_message_time, message_count, participant_count) ",
                );
                builder.push_values(rows.iter(), |mut b, conv| {
                    let c = &conv.conversation;
                    b.push_bind(&c.id)
                        .push_bind(archive_id)
                        .push_bind(&c.display_name)
                        .push_bind(c.conversation_type.as_str())
                        .push_bind(c.first_message_time)
                        .push_bind(c.last_message_time)
                        .push_bind(c.message_count)
                        .push_bind(c.participant_count);
                });
                builder.push(" ON CONFLICT (id) DO NOTHING");
                builder
            })
            .await?;
        }

        for conv in &conversations {
            let batch_size = self.current_batch_size();
            for chunk in conv.participants.chunks(batch_size) {
                self.run_batch(tx, chunk, |rows| {
                    let mut builder = QueryBuilder::new("INSERT INTO participants (conversation_id, user_id, is_self) ");
                    builder.push_values(rows.iter(), |mut b, p| {
                        b.push_bind(&p.conversation_id).push_bind(&p.user_id).push_bind(p.is_self);
                    });
                    builder.push(" ON CONFLICT (conversation_id, user_id) DO NOTHING");
                    builder
                })
                .await?;
            }
        }
        Ok(inserted)
    }

    async fn insert_messages(&self, tx: &mut Transaction<'static, Postgres>, data: &TransformedData) -> Result<(i64, i64), DbError> {
        let mut message_count = 0i64;
        let mut attachment_count = 0i64;

        for conv in data.conversations.values() {
            let batch_size = self.current_batch_size();
            for chunk in conv.messages.chunks(batch_size) {
                self.run_batch(tx, chunk, |rows| {
                    let mut builder = QueryBuilder::new(
                        "INSERT INTO messages (id, conversation_id, sender_id, sender_name, timestamp, message_type, content_html, content_text, is_edited, structured_data) ",
                    );
                    builder.push_values(rows.iter(), |mut b, m| {
                        b.push_bind(&m.id)
                            .push_bind(&m.conversation_id)
                            .push_bind(&m.sender_id)
                            .push_bind(&m.sender_name)
                            .push_bind(m.timestamp)
                            .push_bind(&m.message_type)
                            .push_bind(&m.content_html)
                            .push_bind(&m.content_text)
                            .push_bind(m.is_edited)
                            .push_bind(&m.structured_data);
                    });
                    builder.push(" ON CONFLICT (conversation_id, id) DO NOTHING");
                    builder
                })
                .await?;
                message_count += chunk.len() as i64;

                let attachments: Vec<_> = chunk
                    .iter()
                    .flat_map(|m| m.attachments.iter().map(move |a| (m, a)))
                    .collect();
                let attachment_batch_size = self.current_batch_size();
                for attachment_chunk in attachments.chunks(attachment_batch_size) {
                    if attachment_chunk.is_empty() {
                        continue;
                    }
                    self.run_batch(tx, attachment_chunk, |rows| {
                        let mut builder = QueryBuilder::new(
                            "INSERT INTO attachments (message_id, conversation_id, attachment_type, name, url, content_type, size, local_path, thumbnail_path, image_metadata) ",
                        );
                        builder.push_values(rows.iter(), |mut b, (m, a)| {
                            b.push_bind(&m.id)
                                .push_bind(&m.conversation_id)
                                .push_bind(&a.attachment_type)
                                .push_bind(&a.name)
                                .push_bind(&a.url)
                                .push_bind(&a.content_type)
                                .push_bind(a.size)
                                .push_bind(&a.local_path)
                                .push_bind(&a.thumbnail_path)
                                .push_bind(&a.image_metadata);
                        });
                        builder
                    })
                    .await?;
                    attachment_count += attachment_chunk.len() as i64;
                }
            }
        }
        Ok((message_count, attachment_count))
    }

    /// Executes `rows` with the adaptive-size retry policy, per spec
    /// §4.6: on failure, halves the batch size and re-splits the *same
    /// failed rows* into two sub-batches, retrying each independently
    /// (recursively halving again if one of those also fails); once
    /// `shrink` can no longer reduce below `MIN_BATCH`, or a single row
    /// still fails on its own, the error is surfaced. Each attempt runs
    /// in its own `SAVEPOINT` (via `Transaction::begin`) so a failed
    /// batch doesn't poison the rest of the outer transaction the way a
    /// bare statement error would in Postgres.
    async fn run_batch<'a, T, F>(&self, tx: &mut Transaction<'static, Postgres>, rows: &'a [T], build: F) -> Result<(), DbError>
    where
        F: Fn(&'a [T]) -> QueryBuilder<'a, Postgres>,
    {
        if rows.is_empty() {
            return Ok(());
        }

        let mut pending: Vec<&'a [T]> = vec![rows];
        while let Some(batch) = pending.pop() {
            let mut savepoint = tx.begin().await.map_err(DbError::Transaction)?;
            match build(batch).build().execute(&mut *savepoint).await {
                Ok(_) => {
                    savepoint.commit().await.map_err(DbError::Transaction)?;
                    self.grow();
                }
                Err(err) => {
                    savepoint.rollback().await.map_err(DbError::Transaction)?;
                    if batch.len() == 1 || !self.shrink() {
                        tracing::error!(error = %err, batch_len = batch.len(), "batch insert failed and cannot be split further");
                        return Err(DbError::Query(err));
                    }
                    tracing::warn!(error = %err, batch_len = batch.len(), "batch insert failed, retrying as two smaller batches");
                    let half = batch.len() / 2;
                    let (left, right) = batch.split_at(half);
                    pending.push(right);
                    pending.push(left);
                }
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl InsertionStrategy for BulkStrategy {
    async fn insert(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        archive_id: i64,
        data: &TransformedData,
    ) -> Result<InsertCounts, DbError> {
        let users = self.insert_users(tx, data).await?;
        let conversations = self.insert_conversations(tx, archive_id, data).await?;
        let (messages, attachments) = self.insert_messages(tx, data).await?;

        Ok(InsertCounts {
            archives: 1,
            users,
            conversations,
            messages,
            attachments,
        })
    }
}

/// One row per statement, per spec §4.6: used for small inputs,
/// debugging, or as the Loader's fallback once Bulk exhausts its retry.
pub struct IndividualStrategy;

#[async_trait::async_trait]
impl InsertionStrategy for IndividualStrategy {
    async fn insert(
        &self,
        tx: &mut Transaction<'static, Postgres>,
        archive_id: i64,
        data: &TransformedData,
    ) -> Result<InsertCounts, DbError> {
        let mut counts = InsertCounts {
            archives: 1,
            ..Default::default()
        };

        let mut seen_users = std::collections::HashSet::new();
        for conv in data.conversations.values() {
            for p in &conv.participants {
                if seen_users.insert(p.user_id.clone()) {
                    sqlx::query(
                        "INSERT INTO users (id, display_name, properties, is_self) VALUES ($1, $2, $3, $4) ON CONFLICT (id) DO UPDATE SET is_self = EXCLUDED.is_self",
                    )
                    .bind(&p.user_id)
                    .bind(Option::<&str>::None)
                    .bind(serde_json::Value::Object(Default::default()))
                    .bind(p.is_self)
                    .execute(&mut **tx)
                    .await?;
                    counts.users += 1;
                }
            }
        }
        if seen_users.insert(data.user.id.clone()) {
            sqlx::query(
                "INSERT INTO users (id, display_name, properties, is_self) VALUES ($1, $2, $3, true) ON CONFLICT (id) DO UPDATE SET display_name = EXCLUDED.display_name, is_self = true",
            )
            .bind(&data.user.id)
            .bind(&data.user.display_name)
            .bind(serde_json::Value::Object(Default::default()))
            .execute(&mut **tx)
            .await?;
            counts.users += 1;
        }

        for conv in data.conversations.values() {
            let c = &conv.conversation;
            sqlx::query(
                "INSERT INTO conversations (id, archive_id, display_name, conversation_type, first_message_time, last_message_time, message_count, participant_count) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (id) DO NOTHING",
            )
            .bind(&c.id)
            .bind(archive_id)
            .bind(&c.display_name)
            .bind(c.conversation_type.as_str())
            .bind(c.first_message_time)
            .bind(c.last_message_time)
            .bind(c.message_count)
            .bind(c.participant_count)
            .execute(&mut **tx)
            .await?;
            counts.conversations += 1;

            for p in &conv.participants {
                sqlx::query(
                    "INSERT INTO participants (conversation_id, user_id, is_self) VALUES ($1, $2, $3) ON CONFLICT (conversation_id, user_id) DO NOTHING",
                )
                .bind(&p.conversation_id)
                .bind(&p.user_id)
                .bind(p.is_self)
                .execute(&mut **tx)
                .await?;
            }

            for m in &conv.messages {
                sqlx::query(
                    "INSERT INTO messages (id, conversation_id, sender_id, sender_name, timestamp, message_type, content_html, content_text, is_edited, structured_data) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) ON CONFLICT (conversation_id, id) DO NOTHING",
                )
                .bind(&m.id)
                .bind(&m.conversation_id)
                .bind(&m.sender_id)
                .bind(&m.sender_name)
                .bind(m.timestamp)
                .bind(&m.message_type)
                .bind(&m.content_html)
                .bind(&m.content_text)
                .bind(m.is_edited)
                .bind(&m.structured_data)
                .execute(&mut **tx)
                .await?;
                counts.messages += 1;

                for a in &m.attachments {
                    sqlx::query(
                        "INSERT INTO attachments (message_id, conversation_id, attachment_type, name, url, content_type, size, local_path, thumbnail_path, image_metadata) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
                    )
                    .bind(&m.id)
                    .bind(&m.conversation_id)
                    .bind(&a.attachment_type)
                    .bind(&a.name)
                    .bind(&a.url)
                    .bind(&a.content_type)
                    .bind(a.size)
                    .bind(&a.local_path)
                    .bind(&a.thumbnail_path)
                    .bind(&a.image_metadata)
                    .execute(&mut **tx)
                    .await?;
                    counts.attachments += 1;
                }
            }
        }

        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulk_batch_size_grows_and_shrinks_within_bounds() {
        let strategy = BulkStrategy::new(1000);
        assert_eq!(strategy.current_batch_size(), 1000);
        strategy.grow();
        assert_eq!(strategy.current_batch_size(), 1500);

        let tiny = BulkStrategy::new(MIN_BATCH);
        assert!(!tiny.shrink());
        assert_eq!(tiny.current_batch_size(), MIN_BATCH);

        let large = BulkStrategy::new(MAX_BATCH);
        large.grow();
        assert_eq!(large.current_batch_size(), MAX_BATCH);
    }
}
