use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

mod list;

pub use list::{EntryUpdate, ListCounts, Lists, Status, UserEntry};

/// Catalog identifier for a media title
pub type MediaId = i64;

// ============================================================================
// Catalog Types
// ============================================================================

/// Immutable catalog record for a single title
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MediaItem {
    pub id: MediaId,
    pub title: MediaTitle,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub episodes: Option<u32>,
    /// Minutes per episode
    #[serde(default)]
    pub duration: Option<u32>,
    /// Genre tags in the order the catalog returned them
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub status: Option<AiringStatus>,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub season_year: Option<i32>,
    #[serde(default)]
    pub average_score: Option<u32>,
    #[serde(default)]
    pub mean_score: Option<u32>,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub studios: Vec<String>,
}

impl MediaItem {
    /// Creates a bare item with only an id, a title and genres
    pub fn new(id: MediaId, title: impl Into<String>, genres: Vec<String>) -> Self {
        Self {
            id,
            title: MediaTitle {
                romaji: Some(title.into()),
                english: None,
                native: None,
            },
            cover_image: None,
            description: None,
            episodes: None,
            duration: None,
            genres,
            status: None,
            season: None,
            season_year: None,
            average_score: None,
            mean_score: None,
            popularity: None,
            studios: Vec::new(),
        }
    }

    pub fn display_title(&self) -> &str {
        self.title.display()
    }
}

/// Title variants as published by the catalog
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

impl MediaTitle {
    /// English title when present, otherwise romaji, otherwise native
    pub fn display(&self) -> &str {
        self.english
            .as_deref()
            .or(self.romaji.as_deref())
            .or(self.native.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiringStatus {
    Finished,
    Releasing,
    NotYetReleased,
    Cancelled,
    Hiatus,
    #[serde(other)]
    Unknown,
}

/// Broadcast season, one per calendar quarter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    /// Maps a zero-indexed month (0 = January) to its season.
    ///
    /// March through May is spring, June through August summer, September
    /// through November fall; December, January and February are winter.
    pub fn from_month0(month0: u32) -> Self {
        match month0 {
            2..=4 => Season::Spring,
            5..=7 => Season::Summer,
            8..=10 => Season::Fall,
            _ => Season::Winter,
        }
    }

    /// Season and calendar year for the given instant
    pub fn at(now: DateTime<Utc>) -> (Self, i32) {
        (Self::from_month0(now.month0()), now.year())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Season::Winter => "WINTER",
            Season::Spring => "SPRING",
            Season::Summer => "SUMMER",
            Season::Fall => "FALL",
        }
    }
}

impl Display for Season {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Search Types
// ============================================================================

/// Catalog search filters
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SearchFilters {
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub season: Option<Season>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub sort_by: Option<SortBy>,
    #[serde(default)]
    pub sort_order: Option<SortOrder>,
}

impl SearchFilters {
    /// Filters matching a single genre
    pub fn genre(genre: impl Into<String>) -> Self {
        Self {
            genre: Some(genre.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortBy {
    Popularity,
    Score,
    Title,
    Date,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_season_quarter_mapping() {
        let expected = [
            Season::Winter,
            Season::Winter,
            Season::Spring,
            Season::Spring,
            Season::Spring,
            Season::Summer,
            Season::Summer,
            Season::Summer,
            Season::Fall,
            Season::Fall,
            Season::Fall,
            Season::Winter,
        ];
        for (month0, season) in expected.iter().enumerate() {
            assert_eq!(Season::from_month0(month0 as u32), *season, "month0 {}", month0);
        }
    }

    #[test]
    fn test_season_at_uses_calendar_year() {
        let now = Utc.with_ymd_and_hms(2024, 4, 15, 12, 0, 0).unwrap();
        assert_eq!(Season::at(now), (Season::Spring, 2024));

        let december = Utc.with_ymd_and_hms(2023, 12, 31, 23, 0, 0).unwrap();
        assert_eq!(Season::at(december), (Season::Winter, 2023));
    }

    #[test]
    fn test_season_serialization() {
        assert_eq!(serde_json::to_string(&Season::Fall).unwrap(), "\"FALL\"");
        let season: Season = serde_json::from_str("\"SUMMER\"").unwrap();
        assert_eq!(season, Season::Summer);
    }

    #[test]
    fn test_display_title_preference() {
        let mut item = MediaItem::new(1, "Shingeki no Kyojin", vec![]);
        assert_eq!(item.display_title(), "Shingeki no Kyojin");

        item.title.english = Some("Attack on Titan".to_string());
        assert_eq!(item.display_title(), "Attack on Titan");

        item.title = MediaTitle::default();
        assert_eq!(item.display_title(), "");
    }

    #[test]
    fn test_unknown_airing_status() {
        let status: AiringStatus = serde_json::from_str("\"SOMETHING_NEW\"").unwrap();
        assert_eq!(status, AiringStatus::Unknown);
    }
}
