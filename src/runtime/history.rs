//! History synchronizer
//!
//! Mirrors the live transcript into the `HistoryStore` and owns the cached
//! listing shown to the user. The listing is only ever replaced wholesale
//! after a store round trip succeeds.

use super::traits::HistoryStore;
use crate::auth::{self, AuthenticationMissing, Identity};
use crate::db::{HistoryRecord, Message};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History record not found: {0}")]
    NotFound(String),
    #[error("History store failed: {0}")]
    Persistence(String),
    #[error(transparent)]
    AuthenticationMissing(#[from] AuthenticationMissing),
    #[error("Nothing to save in an empty transcript")]
    EmptyTranscript,
}

pub struct HistorySync<H> {
    store: H,
    listing: Vec<HistoryRecord>,
}

impl<H: HistoryStore> HistorySync<H> {
    pub fn new(store: H) -> Self {
        Self {
            store,
            listing: Vec::new(),
        }
    }

    /// Cached listing, newest first
    pub fn listing(&self) -> &[HistoryRecord] {
        &self.listing
    }

    pub fn find(&self, record_id: &str) -> Option<&HistoryRecord> {
        self.listing.iter().find(|r| r.id == record_id)
    }

    /// Save a transcript and return the id of the record it now lives in
    ///
    /// Creates a record titled after the first message when `record_id` is
    /// `None`, updates it in place otherwise. A bound record that has been
    /// deleted underneath the session is created again under a new id.
    pub async fn persist(
        &mut self,
        caller: Option<&Identity>,
        record_id: Option<&str>,
        messages: &[Message],
    ) -> Result<String, HistoryError> {
        let caller = auth::require(caller)?;
        let first = messages.first().ok_or(HistoryError::EmptyTranscript)?;
        let user_id = caller.user_id.as_str();

        let id = match record_id {
            Some(id) => match self.store.update(user_id, id, messages).await {
                Ok(()) => id.to_string(),
                Err(HistoryError::NotFound(_)) => {
                    tracing::warn!(record_id = %id, "Bound record vanished, creating it again");
                    self.store.create(user_id, &first.text, messages).await?
                }
                Err(e) => return Err(e),
            },
            None => self.store.create(user_id, &first.text, messages).await?,
        };
        tracing::debug!(record_id = %id, messages = messages.len(), "Transcript saved");

        // The write went through; a failed reload only leaves the listing stale
        if let Err(e) = self.reload(user_id).await {
            tracing::warn!(error = %e, "Failed to refresh history after save");
        }
        Ok(id)
    }

    /// Reload the listing from the store
    pub async fn refresh(&mut self, caller: Option<&Identity>) -> Result<&[HistoryRecord], HistoryError> {
        let caller = auth::require(caller)?;
        self.reload(&caller.user_id).await?;
        Ok(&self.listing)
    }

    /// Delete a record and drop it from the listing
    ///
    /// `NotFound` from the store is returned, not swallowed, and leaves the
    /// listing untouched.
    pub async fn delete(
        &mut self,
        caller: Option<&Identity>,
        record_id: &str,
    ) -> Result<(), HistoryError> {
        let caller = auth::require(caller)?;
        self.store.delete(&caller.user_id, record_id).await?;
        tracing::info!(record_id = %record_id, "History record deleted");

        if let Err(e) = self.reload(&caller.user_id).await {
            tracing::warn!(error = %e, "Failed to refresh history after delete");
            self.listing.retain(|r| r.id != record_id);
        }
        Ok(())
    }

    async fn reload(&mut self, user_id: &str) -> Result<(), HistoryError> {
        let mut records = self.store.list(user_id).await?;
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        self.listing = records;
        Ok(())
    }
}
