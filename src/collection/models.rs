//! Data models for the collection engine.
//!
//! Upstream records are read field by field from the JSON returned by the
//! remote catalog: a missing or mistyped field degrades to its default.
//! Normalization into [`ReleaseRecord`] happens in exactly one place,
//! [`normalize_release`], so nothing downstream re-checks field presence.
//! Strings are trimmed there too.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Placeholder used when the upstream record has no artist credit.
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// Placeholder used when the upstream record has no title.
pub const UNTITLED: &str = "Untitled";

// =============================================================================
// Normalized Types
// =============================================================================

/// Normalized unit of the collection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    /// Opaque identifier. `None` only when the upstream carried no id at all;
    /// such records are kept so the collection count stays honest.
    pub release_id: Option<String>,
    pub artist: String,
    pub title: String,
    pub year: Option<u32>,
    pub country: Option<String>,
    pub genres: Vec<String>,
    pub styles: Vec<String>,
    pub labels: Vec<String>,
    pub formats: Vec<String>,
    pub format_descriptions: Vec<String>,
    pub thumb: Option<String>,
    pub cover_image: Option<String>,
}

impl ReleaseRecord {
    /// Decade bucket of the release year, if any.
    pub fn decade(&self) -> Option<u32> {
        self.year.map(decade_of)
    }

    /// Image to show in grid views: thumb first, cover as fallback.
    pub fn grid_image(&self) -> Option<&str> {
        self.thumb.as_deref().or(self.cover_image.as_deref())
    }
}

/// `floor(year / 10) * 10`
pub fn decade_of(year: u32) -> u32 {
    year / 10 * 10
}

/// Ordered sequence of records; append-only while a sync is running.
pub type CollectionSnapshot = Vec<ReleaseRecord>;

/// Position inside the remote collection, derived fresh from each page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationCursor {
    pub current_page: u32,
    pub total_pages: u32,
    pub per_page: u32,
    pub total_items: u64,
}

impl PaginationCursor {
    /// Cursor assumed before the first response arrives.
    pub fn initial(per_page: u32) -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            per_page,
            total_items: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }
}

/// One page of the collection as served to consumers.
#[derive(Clone, Debug, Serialize)]
pub struct CollectionPage {
    pub pagination: PaginationCursor,
    pub releases: Vec<ReleaseRecord>,
}

/// A track in the release detail view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackEntry {
    pub position: String,
    pub title: String,
    pub duration: Option<String>,
}

/// Full metadata of a single release.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDetail {
    pub country: Option<String>,
    pub year: Option<u32>,
    pub labels: Vec<String>,
    pub catalog_numbers: Vec<String>,
    pub formats: Vec<String>,
    pub tracklist: Vec<TrackEntry>,
    pub notes: Option<String>,
}

// =============================================================================
// Raw Upstream Types
// =============================================================================

/// Successful collection response, before record normalization.
#[derive(Clone, Debug)]
pub struct RawCollectionPage {
    pub releases: Vec<Value>,
    pub pagination: PaginationCursor,
}

impl RawCollectionPage {
    /// Split a parsed response body into records and pagination metadata.
    ///
    /// `requested` is used for any pagination field the upstream omitted.
    pub fn from_body(body: &Value, requested: PaginationCursor) -> Self {
        let releases = body
            .get("releases")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let raw_pagination = body
            .get("pagination")
            .cloned()
            .and_then(|p| serde_json::from_value::<RawPagination>(p).ok())
            .unwrap_or_default();

        let pagination = PaginationCursor {
            current_page: raw_pagination.page.unwrap_or(requested.current_page),
            total_pages: raw_pagination.pages.unwrap_or(requested.total_pages).max(1),
            per_page: raw_pagination.per_page.unwrap_or(requested.per_page),
            total_items: raw_pagination
                .items
                .unwrap_or(requested.total_items.max(releases.len() as u64)),
        };

        Self {
            releases,
            pagination,
        }
    }

    /// Normalize every record of the page, in upstream order.
    pub fn normalize(&self) -> Vec<ReleaseRecord> {
        self.releases.iter().map(normalize_release).collect()
    }

    pub fn into_page(self) -> CollectionPage {
        CollectionPage {
            releases: self.normalize(),
            pagination: self.pagination,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPagination {
    page: Option<u32>,
    pages: Option<u32>,
    per_page: Option<u32>,
    items: Option<u64>,
}

// =============================================================================
// Normalization
// =============================================================================

/// Convert one raw collection item into a [`ReleaseRecord`].
///
/// Never fails. Each field is read on its own, so a missing or mistyped field
/// only degrades that field to its placeholder.
pub fn normalize_release(raw: &Value) -> ReleaseRecord {
    let info = raw.get("basic_information").filter(|v| v.is_object());
    if info.is_none() {
        debug!("Release without basic_information, keeping placeholder fields");
    }

    let release_id = raw
        .get("id")
        .and_then(id_string)
        .or_else(|| field(info, "id").and_then(id_string));

    let artist = list(info, "artists")
        .first()
        .and_then(|a| a.get("name"))
        .and_then(non_empty_string)
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    let title = field(info, "title")
        .and_then(non_empty_string)
        .unwrap_or_else(|| UNTITLED.to_string());

    let formats = list(info, "formats");

    ReleaseRecord {
        release_id,
        artist,
        title,
        year: field(info, "year").and_then(positive_year),
        country: field(info, "country").and_then(non_empty_string),
        genres: string_list(list(info, "genres")),
        styles: string_list(list(info, "styles")),
        labels: named_entries(list(info, "labels")),
        formats: named_entries(formats),
        format_descriptions: descriptions(formats),
        thumb: field(info, "thumb").and_then(non_empty_string),
        cover_image: field(info, "cover_image").and_then(non_empty_string),
    }
}

/// Convert a `/releases/{id}` body into a [`ReleaseDetail`].
pub fn normalize_release_detail(raw: &Value) -> ReleaseDetail {
    let detail = Some(raw).filter(|v| v.is_object());

    let tracklist = list(detail, "tracklist")
        .iter()
        .map(|track| TrackEntry {
            position: track
                .get("position")
                .and_then(non_empty_string)
                .unwrap_or_default(),
            title: track
                .get("title")
                .and_then(non_empty_string)
                .unwrap_or_else(|| UNTITLED.to_string()),
            duration: track.get("duration").and_then(non_empty_string),
        })
        .collect();

    let labels = list(detail, "labels");
    ReleaseDetail {
        country: field(detail, "country").and_then(non_empty_string),
        year: field(detail, "year").and_then(positive_year),
        labels: named_entries(labels),
        catalog_numbers: labels
            .iter()
            .filter_map(|l| l.get("catno").and_then(non_empty_string))
            .collect(),
        formats: descriptions(list(detail, "formats")),
        tracklist,
        notes: field(detail, "notes").and_then(non_empty_string),
    }
}

fn field<'a>(object: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    object.and_then(|o| o.get(key))
}

/// Array at `key`; anything else reads as empty.
fn list<'a>(object: Option<&'a Value>, key: &str) -> &'a [Value] {
    field(object, key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Every `descriptions` tag of every format entry, in order.
fn descriptions(formats: &[Value]) -> Vec<String> {
    formats
        .iter()
        .filter_map(|f| f.get("descriptions").and_then(Value::as_array))
        .flat_map(|descriptions| descriptions.iter().filter_map(non_empty_string))
        .collect()
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn non_empty_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

fn positive_year(value: &Value) -> Option<u32> {
    let year = match value {
        Value::Number(n) => n.as_u64().and_then(|y| u32::try_from(y).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }?;
    (year > 0).then_some(year)
}

fn string_list(values: &[Value]) -> Vec<String> {
    values.iter().filter_map(non_empty_string).collect()
}

/// Distinct `name` fields of nested objects, empty entries dropped.
fn named_entries(values: &[Value]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in values
        .iter()
        .filter_map(|v| v.get("name").and_then(non_empty_string))
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
