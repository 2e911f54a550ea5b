use std::collections::HashMap;

use crate::models::{MediaItem, Status, UserEntry};

const WATCHED_WEIGHT: u32 = 2;
const DEFAULT_WEIGHT: u32 = 1;

/// Genre weight contributed by one entry
fn entry_weight(entry: &UserEntry) -> u32 {
    match entry.status {
        Status::Watched => WATCHED_WEIGHT,
        _ => DEFAULT_WEIGHT,
    }
}

/// Ranks genres by aggregate weight across the entries, heaviest first.
///
/// Each entry adds its weight to every genre of its media. Genres with equal
/// weight keep the order in which they were first seen.
pub fn rank_genres<'a>(entries: impl IntoIterator<Item = &'a UserEntry>) -> Vec<String> {
    let mut totals: Vec<(&'a str, u32)> = Vec::new();
    let mut positions: HashMap<&'a str, usize> = HashMap::new();

    for entry in entries {
        let weight = entry_weight(entry);
        for genre in &entry.media.genres {
            match positions.get(genre.as_str()) {
                Some(&index) => totals[index].1 += weight,
                None => {
                    positions.insert(genre.as_str(), totals.len());
                    totals.push((genre.as_str(), weight));
                }
            }
        }
    }

    // sort_by is stable, ties stay in first-seen order
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals
        .into_iter()
        .map(|(genre, _)| genre.to_string())
        .collect()
}

/// Genres of the media that appear in the ranked list, in the media's own order
pub fn matching_genres(media: &MediaItem, ranked: &[String], limit: usize) -> Vec<String> {
    media
        .genres
        .iter()
        .filter(|genre| ranked.contains(genre))
        .take(limit)
        .cloned()
        .collect()
}
