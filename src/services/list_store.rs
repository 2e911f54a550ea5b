use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

use crate::{
    db::SnapshotStore,
    error::AppResult,
    models::{EntryUpdate, ListCounts, Lists, MediaId, MediaItem, Status, UserEntry},
};

/// Result of a list mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MutationOutcome {
    /// Entries added, removed or updated
    pub affected: usize,
    /// Whether the snapshot write after the mutation succeeded
    pub persisted: bool,
}

/// What startup hydration found in the snapshot store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Hydration {
    /// Nothing stored yet
    Empty,
    /// Stored lists loaded
    Restored { entries: usize },
    /// Stored record unreadable; the store starts empty
    Discarded { reason: String },
}

/// Owns the five status buckets of the user's entries.
///
/// Every mutation writes the full snapshot before returning. Write failures are
/// reported in [`MutationOutcome`] and never undo the in-memory change, so the
/// next successful write heals the durable copy. Observers get the revision
/// counter through [`ListStore::subscribe`].
pub struct ListStore {
    lists: RwLock<Lists>,
    snapshots: Arc<dyn SnapshotStore>,
    revision: watch::Sender<u64>,
}

impl ListStore {
    /// Creates an empty store backed by the given snapshot store
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            lists: RwLock::new(Lists::default()),
            snapshots,
            revision,
        }
    }

    /// Creates a store and hydrates it from the snapshot store
    pub async fn open(snapshots: Arc<dyn SnapshotStore>) -> Self {
        let store = Self::new(snapshots);
        store.hydrate().await;
        store
    }

    /// Replaces the in-memory lists with the persisted snapshot.
    ///
    /// A record that fails to load or parse is discarded and the store is left
    /// empty; the stored record is overwritten by the next mutation.
    pub async fn hydrate(&self) -> Hydration {
        let outcome = match self.snapshots.load().await {
            Ok(None) => {
                *self.lists.write().await = Lists::default();
                Hydration::Empty
            }
            Ok(Some(document)) => match serde_json::from_str::<Lists>(&document) {
                Ok(lists) => {
                    let entries = lists.counts().total;
                    *self.lists.write().await = lists;
                    Hydration::Restored { entries }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Persisted lists are malformed, starting empty");
                    *self.lists.write().await = Lists::default();
                    Hydration::Discarded {
                        reason: e.to_string(),
                    }
                }
            },
            Err(e) => {
                tracing::error!(
                    error = %e,
                    backend = self.snapshots.name(),
                    "Failed to load persisted lists, starting empty"
                );
                *self.lists.write().await = Lists::default();
                Hydration::Discarded {
                    reason: e.to_string(),
                }
            }
        };

        tracing::info!(outcome = ?outcome, backend = self.snapshots.name(), "Lists hydrated");
        self.bump_revision();
        outcome
    }

    /// Appends a new entry to the bucket. Never checks for an existing entry.
    pub async fn add(&self, media: MediaItem, status: Status) -> MutationOutcome {
        let mut lists = self.lists.write().await;
        let media_id = media.id;
        lists
            .bucket_mut(status)
            .push(UserEntry::new(media, status, Utc::now()));

        tracing::info!(media_id, status = %status, "Entry added");
        self.commit(&lists, 1).await
    }

    /// Removes every entry for the media id from this bucket only
    pub async fn remove(&self, media_id: MediaId, status: Status) -> MutationOutcome {
        let mut lists = self.lists.write().await;
        let bucket = lists.bucket_mut(status);
        let before = bucket.len();
        bucket.retain(|entry| entry.media.id != media_id);
        let affected = before - bucket.len();

        tracing::info!(media_id, status = %status, removed = affected, "Entry removal");
        self.commit(&lists, affected).await
    }

    /// Merges the partial update into matching entries of this bucket.
    ///
    /// Fails only on an invalid update, before anything is touched.
    pub async fn update(
        &self,
        media_id: MediaId,
        status: Status,
        update: &EntryUpdate,
    ) -> AppResult<MutationOutcome> {
        update.validate()?;

        let mut lists = self.lists.write().await;
        let mut affected = 0;
        for entry in lists
            .bucket_mut(status)
            .iter_mut()
            .filter(|entry| entry.media.id == media_id)
        {
            update.apply(entry);
            affected += 1;
        }

        tracing::info!(media_id, status = %status, updated = affected, "Entry update");
        Ok(self.commit(&lists, affected).await)
    }

    /// First entry for the media id across all buckets, watched bucket first
    pub async fn lookup(&self, media_id: MediaId) -> Option<UserEntry> {
        self.lists.read().await.find(media_id).cloned()
    }

    /// Copy of the current lists
    pub async fn snapshot(&self) -> Lists {
        self.lists.read().await.clone()
    }

    pub async fn counts(&self) -> ListCounts {
        self.lists.read().await.counts()
    }

    /// Receiver of the revision counter, bumped after every mutation and hydration
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    async fn commit(&self, lists: &Lists, affected: usize) -> MutationOutcome {
        let persisted = self.persist(lists).await;
        self.bump_revision();
        MutationOutcome {
            affected,
            persisted,
        }
    }

    async fn persist(&self, lists: &Lists) -> bool {
        let document = match serde_json::to_string(lists) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to serialize lists");
                return false;
            }
        };

        match self.snapshots.save(&document).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.snapshots.name(),
                    "Failed to persist lists, keeping in-memory state"
                );
                false
            }
        }
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}
