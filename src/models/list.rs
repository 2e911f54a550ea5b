use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{MediaId, MediaItem};
use crate::error::{AppError, AppResult};

/// Status bucket a user entry lives in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Status {
    #[serde(rename = "WATCHING", alias = "watching")]
    Watching,
    #[serde(rename = "PLANNED", alias = "planned")]
    Planned,
    #[serde(rename = "WATCHED", alias = "watched")]
    Watched,
    #[serde(rename = "DROPPED", alias = "dropped")]
    Dropped,
    #[serde(rename = "REWATCHING", alias = "rewatching")]
    Rewatching,
}

impl Status {
    /// Every status, in the order lookups scan the buckets
    pub const ALL: [Status; 5] = [
        Status::Watched,
        Status::Watching,
        Status::Planned,
        Status::Dropped,
        Status::Rewatching,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Watching => "WATCHING",
            Status::Planned => "PLANNED",
            Status::Watched => "WATCHED",
            Status::Dropped => "DROPPED",
            Status::Rewatching => "REWATCHING",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's tracking record for one media item within one bucket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserEntry {
    #[serde(rename = "anime", alias = "media")]
    pub media: MediaItem,
    pub status: Status,
    pub progress: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "addedAt")]
    pub added_at: DateTime<Utc>,
}

impl UserEntry {
    /// Fresh entry with no progress, rating or notes
    pub fn new(media: MediaItem, status: Status, added_at: DateTime<Utc>) -> Self {
        Self {
            media,
            status,
            progress: 0,
            rating: None,
            notes: None,
            added_at,
        }
    }
}

/// Partial update merged into an existing entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EntryUpdate {
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl EntryUpdate {
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 10;

    pub fn validate(&self) -> AppResult<()> {
        match self.rating {
            Some(rating) if !(Self::MIN_RATING..=Self::MAX_RATING).contains(&rating) => {
                Err(AppError::InvalidInput(format!(
                    "Rating must be between {} and {}, got {}",
                    Self::MIN_RATING,
                    Self::MAX_RATING,
                    rating
                )))
            }
            _ => Ok(()),
        }
    }

    /// Overwrites only the fields present in the update
    pub fn apply(&self, entry: &mut UserEntry) {
        if let Some(progress) = self.progress {
            entry.progress = progress;
        }
        if let Some(rating) = self.rating {
            entry.rating = Some(rating);
        }
        if let Some(notes) = &self.notes {
            entry.notes = Some(notes.clone());
        }
    }
}

/// The five status buckets, each in insertion order.
///
/// This is also the persisted document: every bucket key must be present for
/// a stored snapshot to deserialize.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Lists {
    pub watched: Vec<UserEntry>,
    pub watching: Vec<UserEntry>,
    pub planned: Vec<UserEntry>,
    pub dropped: Vec<UserEntry>,
    pub rewatching: Vec<UserEntry>,
}

impl Lists {
    pub fn bucket(&self, status: Status) -> &[UserEntry] {
        match status {
            Status::Watched => &self.watched,
            Status::Watching => &self.watching,
            Status::Planned => &self.planned,
            Status::Dropped => &self.dropped,
            Status::Rewatching => &self.rewatching,
        }
    }

    pub fn bucket_mut(&mut self, status: Status) -> &mut Vec<UserEntry> {
        match status {
            Status::Watched => &mut self.watched,
            Status::Watching => &mut self.watching,
            Status::Planned => &mut self.planned,
            Status::Dropped => &mut self.dropped,
            Status::Rewatching => &mut self.rewatching,
        }
    }

    /// All entries, bucket by bucket in [`Status::ALL`] order
    pub fn entries(&self) -> impl Iterator<Item = &UserEntry> {
        Status::ALL
            .into_iter()
            .flat_map(move |status| self.bucket(status).iter())
    }

    /// First entry for the media id, scanning buckets in [`Status::ALL`] order
    pub fn find(&self, media_id: MediaId) -> Option<&UserEntry> {
        self.entries().find(|entry| entry.media.id == media_id)
    }

    /// Whether the media id appears in any bucket
    pub fn contains_media(&self, media_id: MediaId) -> bool {
        self.find(media_id).is_some()
    }

    pub fn is_empty(&self) -> bool {
        Status::ALL
            .into_iter()
            .all(|status| self.bucket(status).is_empty())
    }

    pub fn counts(&self) -> ListCounts {
        ListCounts {
            watched: self.watched.len(),
            watching: self.watching.len(),
            planned: self.planned.len(),
            dropped: self.dropped.len(),
            rewatching: self.rewatching.len(),
            total: self.entries().count(),
        }
    }
}

/// Entry count per bucket
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListCounts {
    pub watched: usize,
    pub watching: usize,
    pub planned: usize,
    pub dropped: usize,
    pub rewatching: usize,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: MediaId, status: Status) -> UserEntry {
        UserEntry::new(MediaItem::new(id, format!("Title {}", id), vec![]), status, Utc::now())
    }

    #[test]
    fn test_status_serialization() {
        assert_eq!(serde_json::to_string(&Status::Rewatching).unwrap(), "\"REWATCHING\"");
        let upper: Status = serde_json::from_str("\"PLANNED\"").unwrap();
        let lower: Status = serde_json::from_str("\"planned\"").unwrap();
        assert_eq!(upper, Status::Planned);
        assert_eq!(lower, Status::Planned);
    }

    #[test]
    fn test_bucket_mapping_is_exhaustive() {
        let mut lists = Lists::default();
        for (i, status) in Status::ALL.into_iter().enumerate() {
            lists.bucket_mut(status).push(entry(i as MediaId, status));
        }
        for (i, status) in Status::ALL.into_iter().enumerate() {
            let bucket = lists.bucket(status);
            assert_eq!(bucket.len(), 1);
            assert_eq!(bucket[0].media.id, i as MediaId);
            assert_eq!(bucket[0].status, status);
        }
    }

    #[test]
    fn test_find_scans_watched_first() {
        let mut lists = Lists::default();
        lists.planned.push(entry(7, Status::Planned));
        lists.watched.push(entry(7, Status::Watched));

        assert_eq!(lists.find(7).unwrap().status, Status::Watched);
        assert!(lists.find(8).is_none());
    }

    #[test]
    fn test_counts() {
        let mut lists = Lists::default();
        lists.watching.push(entry(1, Status::Watching));
        lists.watching.push(entry(2, Status::Watching));
        lists.dropped.push(entry(3, Status::Dropped));

        let counts = lists.counts();
        assert_eq!(counts.watching, 2);
        assert_eq!(counts.dropped, 1);
        assert_eq!(counts.watched, 0);
        assert_eq!(counts.total, 3);
        assert!(!lists.is_empty());
        assert!(Lists::default().is_empty());
    }

    #[test]
    fn test_missing_bucket_key_is_rejected() {
        let json = r#"{"watched":[],"watching":[],"planned":[],"dropped":[]}"#;
        assert!(serde_json::from_str::<Lists>(json).is_err());
    }

    #[test]
    fn test_entry_update_leaves_absent_fields() {
        let mut target = entry(1, Status::Watching);
        target.rating = Some(8);
        target.notes = Some("great opening".to_string());

        let update = EntryUpdate {
            progress: Some(5),
            ..EntryUpdate::default()
        };
        update.apply(&mut target);

        assert_eq!(target.progress, 5);
        assert_eq!(target.rating, Some(8));
        assert_eq!(target.notes.as_deref(), Some("great opening"));
    }

    #[test]
    fn test_entry_update_rating_bounds() {
        for rating in [0u8, 11] {
            let update = EntryUpdate {
                rating: Some(rating),
                ..EntryUpdate::default()
            };
            assert!(matches!(update.validate(), Err(AppError::InvalidInput(_))));
        }
        for rating in [1u8, 10] {
            let update = EntryUpdate {
                rating: Some(rating),
                ..EntryUpdate::default()
            };
            assert!(update.validate().is_ok());
        }
    }

    #[test]
    fn test_entry_serializes_added_at_and_skips_empty_fields() {
        let value = serde_json::to_value(entry(3, Status::Watched)).unwrap();
        assert!(value.get("addedAt").is_some());
        assert!(value.get("rating").is_none());
        assert!(value.get("notes").is_none());
        assert_eq!(value["status"], "WATCHED");
    }
}
