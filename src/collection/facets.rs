//! Distinct facet values derived from a snapshot.

use std::collections::BTreeSet;

use serde::Serialize;

use super::models::ReleaseRecord;

/// Pages scanned for sampled facets when no valid budget is given.
pub const DEFAULT_SAMPLED_PAGES: u32 = 2;
pub const MAX_SAMPLED_PAGES: u32 = 5;

/// Sorted, de-duplicated facet values. Empty strings never appear.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FacetSet {
    pub genres: Vec<String>,
    pub styles: Vec<String>,
    pub decades: Vec<u32>,
    pub labels: Vec<String>,
    pub formats: Vec<String>,
}

/// Genres and styles only, as derived from a sample of the first pages.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SampledFacets {
    pub genres: Vec<String>,
    pub styles: Vec<String>,
}

fn distinct<'a>(values: impl Iterator<Item = &'a String>) -> Vec<String> {
    values
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Extract every facet of `records`. Pure and order-independent.
pub fn extract(records: &[ReleaseRecord]) -> FacetSet {
    FacetSet {
        genres: distinct(records.iter().flat_map(|r| r.genres.iter())),
        styles: distinct(records.iter().flat_map(|r| r.styles.iter())),
        decades: records
            .iter()
            .filter_map(ReleaseRecord::decade)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
        labels: distinct(records.iter().flat_map(|r| r.labels.iter())),
        formats: distinct(records.iter().flat_map(|r| r.formats.iter())),
    }
}

pub fn extract_sampled(records: &[ReleaseRecord]) -> SampledFacets {
    SampledFacets {
        genres: distinct(records.iter().flat_map(|r| r.genres.iter())),
        styles: distinct(records.iter().flat_map(|r| r.styles.iter())),
    }
}

/// Page budget for sampled facets: `raw` clamped to `1..=5`, default 2.
pub fn sampled_page_budget(raw: &str) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(n) if n != 0 => n.clamp(1, MAX_SAMPLED_PAGES as i64) as u32,
        _ => DEFAULT_SAMPLED_PAGES,
    }
}
