//! Filtering and sorting of a collection snapshot.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use super::favorites::FavoriteSet;
use super::models::ReleaseRecord;

/// Ordering applied after filtering.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    /// Artist, then title.
    #[default]
    Artist,
    ArtistDesc,
    Title,
    TitleDesc,
    /// Newest first; undated records come first.
    Year,
    /// Oldest first; undated records come last.
    YearOld,
    FavoritesFirst,
    /// Upstream arrival order.
    Added,
}

impl SortKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::Artist => "artist",
            SortKey::ArtistDesc => "artist_desc",
            SortKey::Title => "title",
            SortKey::TitleDesc => "title_desc",
            SortKey::Year => "year",
            SortKey::YearOld => "year_old",
            SortKey::FavoritesFirst => "favorites_first",
            SortKey::Added => "added",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "artist" => Ok(SortKey::Artist),
            "artist_desc" => Ok(SortKey::ArtistDesc),
            "title" => Ok(SortKey::Title),
            "title_desc" => Ok(SortKey::TitleDesc),
            "year" => Ok(SortKey::Year),
            "year_old" => Ok(SortKey::YearOld),
            "favorites_first" => Ok(SortKey::FavoritesFirst),
            "added" => Ok(SortKey::Added),
            other => Err(format!("Unknown sort key: {}", other)),
        }
    }
}

/// User-selected filters. Unset or blank fields do not filter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub query: String,
    #[serde(deserialize_with = "blank_as_none")]
    pub genre: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub style: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub decade: Option<u32>,
    #[serde(deserialize_with = "blank_as_none")]
    pub label: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub format: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub year_from: Option<u32>,
    #[serde(deserialize_with = "lenient_number")]
    pub year_to: Option<u32>,
    pub only_favorites: bool,
    pub sort: SortKey,
}

impl FilterState {
    /// State selected by the reset control: nothing filtered, arrival order.
    pub fn reset() -> Self {
        Self {
            sort: SortKey::Added,
            ..Self::default()
        }
    }

    /// Whether `record` passes every set predicate.
    pub fn matches(&self, record: &ReleaseRecord, favorites: &FavoriteSet) -> bool {
        let query = self.query.trim().to_lowercase();
        if !query.is_empty()
            && !record.artist.to_lowercase().contains(&query)
            && !record.title.to_lowercase().contains(&query)
        {
            return false;
        }

        if !member(&self.genre, &record.genres)
            || !member(&self.style, &record.styles)
            || !member(&self.label, &record.labels)
            || !member(&self.format, &record.formats)
        {
            return false;
        }

        if self.year_from.is_some() || self.year_to.is_some() {
            let Some(year) = record.year else {
                return false;
            };
            if self.year_from.is_some_and(|from| year < from)
                || self.year_to.is_some_and(|to| year > to)
            {
                return false;
            }
        }

        if let Some(decade) = self.decade {
            if record.decade() != Some(decade) {
                return false;
            }
        }

        if self.only_favorites && !is_favorite(record, favorites) {
            return false;
        }

        true
    }
}

fn member(selected: &Option<String>, values: &[String]) -> bool {
    selected
        .as_deref()
        .map_or(true, |s| values.iter().any(|v| v == s))
}

fn is_favorite(record: &ReleaseRecord, favorites: &FavoriteSet) -> bool {
    record
        .release_id
        .as_ref()
        .is_some_and(|id| favorites.contains(id))
}

/// Filter then sort. Returns references into `snapshot`.
pub fn apply<'a>(
    snapshot: &'a [ReleaseRecord],
    state: &FilterState,
    favorites: &FavoriteSet,
) -> Vec<&'a ReleaseRecord> {
    let mut items: Vec<&ReleaseRecord> = snapshot
        .iter()
        .filter(|record| state.matches(record, favorites))
        .collect();
    sort_items(&mut items, state.sort, favorites);
    items
}

/// Stable sort by `key`.
pub fn sort_items(items: &mut [&ReleaseRecord], key: SortKey, favorites: &FavoriteSet) {
    match key {
        SortKey::Added => {}
        SortKey::Artist => items.sort_by(|a, b| by_artist(a, b)),
        SortKey::ArtistDesc => items.sort_by(|a, b| by_artist(b, a)),
        SortKey::Title => items.sort_by(|a, b| text_cmp(&a.title, &b.title)),
        SortKey::TitleDesc => items.sort_by(|a, b| text_cmp(&b.title, &a.title)),
        SortKey::Year => items.sort_by(|a, b| {
            year_key(b)
                .cmp(&year_key(a))
                .then_with(|| by_artist(a, b))
        }),
        SortKey::YearOld => items.sort_by(|a, b| {
            year_key(a)
                .cmp(&year_key(b))
                .then_with(|| by_artist(a, b))
        }),
        SortKey::FavoritesFirst => items.sort_by(|a, b| {
            is_favorite(b, favorites)
                .cmp(&is_favorite(a, favorites))
                .then_with(|| by_artist(a, b))
        }),
    }
}

/// Undated records sort as the latest possible year.
fn year_key(record: &ReleaseRecord) -> u32 {
    record.year.unwrap_or(u32::MAX)
}

fn by_artist(a: &ReleaseRecord, b: &ReleaseRecord) -> Ordering {
    text_cmp(&a.artist, &b.artist).then_with(|| text_cmp(&a.title, &b.title))
}

fn text_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

/// Accepts `1980`, `"1980"`, `""` and `null`.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrText {
        Number(u32),
        Text(String),
    }

    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
