//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use super::HistoryError;
use crate::db::{Database, DbError, HistoryRecord, Message};
use async_trait::async_trait;
use std::sync::Arc;

/// Durable per-user collection of conversation records
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Create a record titled `title` and return its new id
    async fn create(
        &self,
        user_id: &str,
        title: &str,
        messages: &[Message],
    ) -> Result<String, HistoryError>;

    /// Replace a record's messages; `NotFound` if it no longer exists
    async fn update(
        &self,
        user_id: &str,
        record_id: &str,
        messages: &[Message],
    ) -> Result<(), HistoryError>;

    /// All of a user's records, newest `updated_at` first
    async fn list(&self, user_id: &str) -> Result<Vec<HistoryRecord>, HistoryError>;

    /// Delete a record; `NotFound` if already absent
    async fn delete(&self, user_id: &str, record_id: &str) -> Result<(), HistoryError>;
}

/// Blocking interaction with the person at the keyboard
pub trait UserPrompt: Send + Sync {
    /// Ask a yes/no question and wait for the answer
    fn confirm(&self, question: &str) -> bool;

    /// Tell the user something went wrong with what they just did
    fn alert(&self, message: &str);
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    async fn create(
        &self,
        user_id: &str,
        title: &str,
        messages: &[Message],
    ) -> Result<String, HistoryError> {
        (**self).create(user_id, title, messages).await
    }

    async fn update(
        &self,
        user_id: &str,
        record_id: &str,
        messages: &[Message],
    ) -> Result<(), HistoryError> {
        (**self).update(user_id, record_id, messages).await
    }

    async fn list(&self, user_id: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
        (**self).list(user_id).await
    }

    async fn delete(&self, user_id: &str, record_id: &str) -> Result<(), HistoryError> {
        (**self).delete(user_id, record_id).await
    }
}

impl<T: UserPrompt + ?Sized> UserPrompt for Arc<T> {
    fn confirm(&self, question: &str) -> bool {
        (**self).confirm(question)
    }

    fn alert(&self, message: &str) {
        (**self).alert(message);
    }
}

// ============================================================================
// Production Adapters
// ============================================================================

/// Adapter to use Database as `HistoryStore`
#[derive(Clone)]
pub struct DatabaseHistory {
    db: Database,
}

impl DatabaseHistory {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl From<DbError> for HistoryError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::RecordNotFound(id) => HistoryError::NotFound(id),
            other => HistoryError::Persistence(other.to_string()),
        }
    }
}

#[async_trait]
impl HistoryStore for DatabaseHistory {
    async fn create(
        &self,
        user_id: &str,
        title: &str,
        messages: &[Message],
    ) -> Result<String, HistoryError> {
        let id = uuid::Uuid::new_v4().to_string();
        let record = self.db.create_record(&id, user_id, title, messages)?;
        Ok(record.id)
    }

    async fn update(
        &self,
        user_id: &str,
        record_id: &str,
        messages: &[Message],
    ) -> Result<(), HistoryError> {
        self.db.update_record_messages(user_id, record_id, messages)?;
        Ok(())
    }

    async fn list(&self, user_id: &str) -> Result<Vec<HistoryRecord>, HistoryError> {
        Ok(self.db.list_records(user_id)?)
    }

    async fn delete(&self, user_id: &str, record_id: &str) -> Result<(), HistoryError> {
        Ok(self.db.delete_record(user_id, record_id)?)
    }
}
